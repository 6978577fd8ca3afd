mod cart;
mod checkout;
mod commands;
mod db;
mod image;
mod live;
mod models;
mod sync;


use std::sync::Arc;

use cart::CartStore;
use commands::settings::ViewSession;
use commands::{auth, categories, images, products, settings};
use db::Database;
use tauri::Manager;
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            // Initialize the store and the persisted cart
            let db = Arc::new(Database::new(&app.handle())?);
            db.initialize()?;
            app.manage(db.clone());

            let app_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");
            let cart = CartStore::open(app_dir.join("cart.json"));
            app.manage(cart.clone());

            // One page view counted per app session
            app.manage(ViewSession::default());

            // Live projections feed the webview through events
            let live_sync = sync::spawn(app.handle().clone(), db, cart);
            app.manage(live_sync);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Categories
            categories::get_categories,
            categories::create_category,
            categories::update_category,
            categories::delete_category,
            // Products
            products::get_products,
            products::get_all_products,
            products::search_products,
            products::create_product,
            products::update_product,
            products::delete_product,
            // Images
            images::normalize_upload,
            // Cart
            commands::cart::get_cart,
            commands::cart::add_to_cart,
            commands::cart::adjust_cart_quantity,
            commands::cart::remove_cart_item,
            commands::cart::clear_cart,
            commands::cart::get_cart_totals,
            // Checkout
            commands::checkout::place_order,
            // Settings
            settings::get_delivery_charge,
            settings::set_delivery_charge,
            settings::get_page_views,
            settings::record_page_view,
            // Admin gate
            auth::verify_admin_password,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
