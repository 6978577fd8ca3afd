use crate::db::DatabaseExt;
use crate::models::Category;
use tauri::AppHandle;

#[tauri::command]
pub fn get_categories(app: AppHandle) -> Result<Vec<Category>, String> {
    app.db().categories().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn create_category(app: AppHandle, name: String, image_url: String) -> Result<Category, String> {
    if name.trim().is_empty() {
        return Err("Category name is required".to_string());
    }
    if image_url.is_empty() {
        return Err("Category image is required".to_string());
    }

    app.db()
        .create_category(&name, &image_url)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn update_category(
    app: AppHandle,
    id: String,
    name: String,
    image_url: Option<String>,
) -> Result<Category, String> {
    app.db()
        .update_category(&id, &name, image_url.as_deref())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn delete_category(app: AppHandle, id: String) -> Result<(), String> {
    app.db().delete_category(&id).map_err(|e| e.to_string())
}
