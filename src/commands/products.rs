use crate::db::DatabaseExt;
use crate::models::{filter_products, CreateProduct, IndexedProduct, Product, UpdateProduct,
    VegFilter};
use tauri::AppHandle;

#[tauri::command]
pub fn get_products(
    app: AppHandle,
    category_id: String,
    filter: Option<VegFilter>,
) -> Result<Vec<Product>, String> {
    let products = app.db().products(&category_id).map_err(|e| e.to_string())?;

    Ok(match filter {
        Some(filter) => filter_products(products, filter),
        None => products,
    })
}

#[tauri::command]
pub fn get_all_products(app: AppHandle) -> Result<Vec<IndexedProduct>, String> {
    app.db().all_products().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn search_products(app: AppHandle, query: String) -> Result<Vec<IndexedProduct>, String> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let products = app.db().all_products().map_err(|e| e.to_string())?;

    Ok(products
        .into_iter()
        .filter(|entry| entry.product.matches_query(&query))
        .collect())
}

#[tauri::command]
pub fn create_product(
    app: AppHandle,
    category_id: String,
    product: CreateProduct,
) -> Result<Product, String> {
    app.db()
        .create_product(&category_id, product)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn update_product(
    app: AppHandle,
    category_id: String,
    product: UpdateProduct,
) -> Result<Product, String> {
    app.db()
        .update_product(&category_id, product)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn delete_product(app: AppHandle, category_id: String, id: String) -> Result<(), String> {
    app.db()
        .delete_product(&category_id, &id)
        .map_err(|e| e.to_string())
}
