use crate::cart::CartExt;
use crate::db::DatabaseExt;
use crate::models::{CartItem, CartTotals, OrderMode, Portion};
use tauri::AppHandle;

#[tauri::command]
pub fn get_cart(app: AppHandle) -> Result<Vec<CartItem>, String> {
    Ok(app.cart().items())
}

#[tauri::command]
pub fn add_to_cart(
    app: AppHandle,
    category_id: String,
    product_id: String,
    portion: Portion,
    quantity: i64,
    serves: Option<String>,
) -> Result<(), String> {
    if quantity < 1 {
        return Err("Quantity must be at least 1".to_string());
    }

    let product = app
        .db()
        .product(&category_id, &product_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "Product not found".to_string())?;

    app.cart()
        .add(CartItem::capture(&product, portion, quantity, serves));
    Ok(())
}

#[tauri::command]
pub fn adjust_cart_quantity(
    app: AppHandle,
    product_id: String,
    portion: Portion,
    delta: i64,
) -> Result<(), String> {
    app.cart().adjust_quantity(&product_id, portion, delta);
    Ok(())
}

#[tauri::command]
pub fn remove_cart_item(app: AppHandle, product_id: String, portion: Portion) -> Result<(), String> {
    app.cart().remove(&product_id, portion);
    Ok(())
}

#[tauri::command]
pub fn clear_cart(app: AppHandle) -> Result<(), String> {
    app.cart().clear();
    Ok(())
}

#[tauri::command]
pub fn get_cart_totals(app: AppHandle, mode: OrderMode) -> Result<CartTotals, String> {
    let cart = app.cart();
    let subtotal = cart.subtotal();

    match mode {
        OrderMode::Pickup => Ok(CartTotals {
            subtotal,
            delivery_charge: None,
            total: subtotal,
        }),
        OrderMode::Delivery => {
            let charge = app.db().delivery_charge().map_err(|e| e.to_string())?;
            Ok(CartTotals {
                subtotal,
                delivery_charge: Some(charge),
                total: subtotal + charge as f64,
            })
        }
    }
}
