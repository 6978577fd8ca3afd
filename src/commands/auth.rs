// Shared client-side password gate. Trusted by presence on the frontend,
// not a real security boundary.
const ADMIN_PASSWORD: &str = "Bakery";

#[tauri::command]
pub fn verify_admin_password(password: String) -> Result<bool, String> {
    Ok(password.trim() == ADMIN_PASSWORD)
}
