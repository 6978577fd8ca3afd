use crate::image::{normalize, NormalizedImage};

/// Normalizes an uploaded image for inline storage. The frontend shows
/// `approx_bytes` as the "compressed to" size.
#[tauri::command]
pub fn normalize_upload(bytes: Vec<u8>) -> Result<NormalizedImage, String> {
    normalize(&bytes).map_err(|e| e.to_string())
}
