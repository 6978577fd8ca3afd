use crate::cart::CartExt;
use crate::checkout::{compose_message, order_url};
use crate::db::DatabaseExt;
use crate::models::{CustomerInfo, OrderMode};
use tauri::AppHandle;
use tauri_plugin_opener::OpenerExt;
use tracing::warn;

#[tauri::command]
pub fn place_order(app: AppHandle, customer: CustomerInfo, mode: OrderMode) -> Result<String, String> {
    let cart = app.cart();
    let charge = app.db().delivery_charge().map_err(|e| e.to_string())?;

    let message =
        compose_message(&cart.items(), &customer, mode, charge).map_err(|e| e.to_string())?;
    let url = order_url(&message);

    // Dispatch is fire and forget: once the message exists the cart clears,
    // whether or not WhatsApp actually opened.
    if let Err(err) = app.opener().open_url(url.as_str(), None::<&str>) {
        warn!(%err, "failed to open WhatsApp link");
    }
    cart.clear();

    Ok(url)
}
