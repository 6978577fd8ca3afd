use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::DatabaseExt;
use tauri::{AppHandle, Manager};

/// Session-local guard so a running app counts at most one page view.
#[derive(Default)]
pub struct ViewSession {
    counted: AtomicBool,
}

impl ViewSession {
    pub fn should_count(&self) -> bool {
        !self.counted.swap(true, Ordering::SeqCst)
    }
}

#[tauri::command]
pub fn get_delivery_charge(app: AppHandle) -> Result<i64, String> {
    app.db().delivery_charge().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn set_delivery_charge(app: AppHandle, amount: i64) -> Result<(), String> {
    app.db().set_delivery_charge(amount).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_page_views(app: AppHandle) -> Result<i64, String> {
    app.db().page_views().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn record_page_view(app: AppHandle) -> Result<(), String> {
    let session = app.state::<ViewSession>();
    if session.should_count() {
        app.db().increment_page_views().map_err(|e| e.to_string())?;
    }

    Ok(())
}
