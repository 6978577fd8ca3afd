//! Bridges live store projections onto webview events. Each sink re-emits
//! the full replacement list; the frontend never patches incrementally.

use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tracing::warn;

use crate::cart::{CartStore, CartSubscription};
use crate::db::Database;
use crate::live::{self, ProductFanout, Subscription};
use crate::models::Product;

#[derive(Serialize, Clone)]
struct ProductsChanged {
    category_id: String,
    products: Vec<Product>,
}

/// Keeps every projection subscription alive for the app's lifetime.
pub struct LiveSync {
    _categories: Subscription,
    _fanout: ProductFanout,
    _delivery_charge: Subscription,
    _page_views: Subscription,
    _cart: CartSubscription,
}

pub fn spawn(app: AppHandle, db: Arc<Database>, cart: CartStore) -> LiveSync {
    let categories = {
        let app = app.clone();
        live::watch_categories(&db, move |list| emit(&app, "categories-changed", list))
    };

    let fanout = {
        let per_category_app = app.clone();
        let index_app = app.clone();
        ProductFanout::spawn(
            db.clone(),
            move |category_id, products| {
                emit(
                    &per_category_app,
                    "products-changed",
                    ProductsChanged {
                        category_id: category_id.to_string(),
                        products,
                    },
                );
            },
            move |index| emit(&index_app, "menu-index-changed", index),
        )
    };

    let delivery_charge = {
        let app = app.clone();
        live::watch_delivery_charge(&db, move |amount| {
            emit(&app, "delivery-charge-changed", amount)
        })
    };

    let page_views = {
        let app = app.clone();
        live::watch_page_views(&db, move |count| emit(&app, "page-views-changed", count))
    };

    let cart_sub = cart.subscribe(move |items| emit(&app, "cart-changed", items.to_vec()));

    LiveSync {
        _categories: categories,
        _fanout: fanout,
        _delivery_charge: delivery_charge,
        _page_views: page_views,
        _cart: cart_sub,
    }
}

fn emit<T: Serialize + Clone>(app: &AppHandle, event: &str, payload: T) {
    if let Err(err) = app.emit(event, payload) {
        warn!(%err, event, "failed to emit event");
    }
}
