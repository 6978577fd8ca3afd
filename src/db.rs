use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use tauri::{AppHandle, Manager};
use tracing::debug;
use uuid::Uuid;

use crate::live::{ChangeHub, Subscription};
use crate::models::{
    format_category_name, Category, CreateProduct, IndexedProduct, Product, UpdateProduct,
    DEFAULT_DELIVERY_CHARGE,
};

pub const CATEGORIES_PATH: &str = "categories";
pub const DELIVERY_CHARGE_PATH: &str = "settings/delivery_charge";
pub const PAGE_VIEWS_PATH: &str = "settings/page_views";

pub fn products_path(category_id: &str) -> String {
    format!("categories/{category_id}/products")
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("store lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

pub struct Database {
    pub conn: Mutex<Connection>,
    hub: Arc<ChangeHub>,
}

impl Database {
    pub fn new(app_handle: &AppHandle) -> rusqlite::Result<Self> {
        let app_dir = app_handle
            .path()
            .app_data_dir()
            .expect("Failed to get app data dir");

        std::fs::create_dir_all(&app_dir).expect("Failed to create app data directory");

        let db_path: PathBuf = app_dir.join("bakery_menu.db");
        let conn = Connection::open(db_path)?;

        Ok(Self::wrap(conn))
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self::wrap(Connection::open_in_memory()?))
    }

    fn wrap(conn: Connection) -> Self {
        Database {
            conn: Mutex::new(conn),
            hub: Arc::new(ChangeHub::new()),
        }
    }

    pub fn initialize(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "
            -- Menu categories. Documents are loosely shaped: everything but
            -- the id may be absent and is defaulted on decode.
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT,
                image_url TEXT,
                created_at INTEGER
            );

            -- Products, one row per document in a category's sub-collection.
            -- category_id is not enforced: deleting a category orphans its
            -- products rather than cascading.
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                category_id TEXT NOT NULL,
                name TEXT,
                price REAL,
                half_price REAL,
                serves TEXT,
                description TEXT,
                image_urls TEXT,
                is_veg INTEGER,
                created_at INTEGER
            );

            -- Singleton documents (delivery_charge, page_views)
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ----- live subscriptions -----

    pub fn watch(
        &self,
        path: &str,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        self.hub.watch(path, callback)
    }

    #[cfg(test)]
    pub(crate) fn notify_watchers(&self, path: &str) {
        self.hub.notify(path);
    }

    // ----- categories -----

    pub fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, image_url, created_at FROM categories
             ORDER BY COALESCE(created_at, 0) DESC, id",
        )?;

        let categories = stmt
            .query_map([], decode_category)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    pub fn create_category(&self, name: &str, image_url: &str) -> Result<Category, StoreError> {
        let name = format_category_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "category name is required".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let category = {
            let conn = self.lock()?;
            let created_at = next_created_at(&conn, "SELECT MAX(created_at) FROM categories", [])?;

            conn.execute(
                "INSERT INTO categories (id, name, image_url, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, name, image_url, created_at],
            )?;

            Category {
                id,
                name,
                image_url: Some(image_url.to_string()),
                created_at: Some(created_at),
            }
        };

        debug!(id = %category.id, name = %category.name, "created category");
        self.hub.notify(CATEGORIES_PATH);
        Ok(category)
    }

    pub fn update_category(
        &self,
        id: &str,
        name: &str,
        image_url: Option<&str>,
    ) -> Result<Category, StoreError> {
        let name = format_category_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "category name is required".to_string(),
            ));
        }

        let category = {
            let conn = self.lock()?;

            let changed = match image_url {
                Some(image) => conn.execute(
                    "UPDATE categories SET name = ?1, image_url = ?2 WHERE id = ?3",
                    rusqlite::params![name, image, id],
                )?,
                None => conn.execute(
                    "UPDATE categories SET name = ?1 WHERE id = ?2",
                    rusqlite::params![name, id],
                )?,
            };

            if changed == 0 {
                return Err(StoreError::NotFound("category"));
            }

            conn.query_row(
                "SELECT id, name, image_url, created_at FROM categories WHERE id = ?1",
                [id],
                decode_category,
            )?
        };

        debug!(id = %category.id, name = %category.name, "updated category");
        self.hub.notify(CATEGORIES_PATH);
        Ok(category)
    }

    /// Removes only the category document. Its product sub-collection is
    /// left orphaned in the store.
    pub fn delete_category(&self, id: &str) -> Result<(), StoreError> {
        {
            let conn = self.lock()?;
            conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
        }

        debug!(id, "deleted category");
        self.hub.notify(CATEGORIES_PATH);
        Ok(())
    }

    // ----- products -----

    pub fn products(&self, category_id: &str) -> Result<Vec<Product>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, category_id, name, price, half_price, serves, description,
                    image_urls, is_veg, created_at
             FROM products
             WHERE category_id = ?1
             ORDER BY COALESCE(created_at, 0) DESC, id",
        )?;

        let products = stmt
            .query_map([category_id], decode_product)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    pub fn product(&self, category_id: &str, id: &str) -> Result<Option<Product>, StoreError> {
        let conn = self.lock()?;

        let product = conn
            .query_row(
                "SELECT id, category_id, name, price, half_price, serves, description,
                        image_urls, is_veg, created_at
                 FROM products
                 WHERE id = ?1 AND category_id = ?2",
                rusqlite::params![id, category_id],
                decode_product,
            )
            .optional()?;

        Ok(product)
    }

    pub fn all_products(&self) -> Result<Vec<IndexedProduct>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT p.id, p.category_id, p.name, p.price, p.half_price, p.serves,
                    p.description, p.image_urls, p.is_veg, p.created_at, c.name
             FROM products p
             LEFT JOIN categories c ON p.category_id = c.id
             ORDER BY COALESCE(p.created_at, 0) DESC, p.id",
        )?;

        let products = stmt
            .query_map([], |row| {
                let product = decode_product(row)?;
                Ok(IndexedProduct {
                    category_id: product.category_id.clone(),
                    category_name: row.get(10)?,
                    product,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    pub fn create_product(
        &self,
        category_id: &str,
        product: CreateProduct,
    ) -> Result<Product, StoreError> {
        let fields = validate_product_fields(
            &product.name,
            product.price,
            product.serves.as_deref(),
            product.description.as_deref(),
            &product.image_urls,
        )?;

        let id = Uuid::new_v4().to_string();
        let created = {
            let conn = self.lock()?;
            let created_at = next_created_at(
                &conn,
                "SELECT MAX(created_at) FROM products WHERE category_id = ?1",
                [category_id],
            )?;

            conn.execute(
                "INSERT INTO products
                     (id, category_id, name, price, half_price, serves, description,
                      image_urls, is_veg, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    category_id,
                    fields.name,
                    product.price,
                    product.half_price,
                    fields.serves,
                    fields.description,
                    fields.image_urls,
                    product.is_veg,
                    created_at
                ],
            )?;

            Product {
                id,
                category_id: category_id.to_string(),
                name: fields.name,
                price: product.price,
                half_price: product.half_price,
                serves: fields.serves,
                description: fields.description,
                image_urls: product.image_urls,
                is_veg: product.is_veg,
                created_at: Some(created_at),
            }
        };

        debug!(id = %created.id, name = %created.name, "created product");
        self.hub.notify(&products_path(category_id));
        Ok(created)
    }

    pub fn update_product(
        &self,
        category_id: &str,
        product: UpdateProduct,
    ) -> Result<Product, StoreError> {
        let fields = validate_product_fields(
            &product.name,
            product.price,
            product.serves.as_deref(),
            product.description.as_deref(),
            &product.image_urls,
        )?;

        let updated = {
            let conn = self.lock()?;

            let changed = conn.execute(
                "UPDATE products
                 SET name = ?1, price = ?2, half_price = ?3, serves = ?4,
                     description = ?5, image_urls = ?6, is_veg = ?7
                 WHERE id = ?8 AND category_id = ?9",
                rusqlite::params![
                    fields.name,
                    product.price,
                    product.half_price,
                    fields.serves,
                    fields.description,
                    fields.image_urls,
                    product.is_veg,
                    product.id,
                    category_id
                ],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound("product"));
            }

            conn.query_row(
                "SELECT id, category_id, name, price, half_price, serves, description,
                        image_urls, is_veg, created_at
                 FROM products WHERE id = ?1",
                [&product.id],
                decode_product,
            )?
        };

        debug!(id = %updated.id, name = %updated.name, "updated product");
        self.hub.notify(&products_path(category_id));
        Ok(updated)
    }

    pub fn delete_product(&self, category_id: &str, id: &str) -> Result<(), StoreError> {
        {
            let conn = self.lock()?;
            conn.execute(
                "DELETE FROM products WHERE id = ?1 AND category_id = ?2",
                rusqlite::params![id, category_id],
            )?;
        }

        debug!(id, "deleted product");
        self.hub.notify(&products_path(category_id));
        Ok(())
    }

    // ----- settings singletons -----

    pub fn delivery_charge(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        let amount: Option<i64> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'delivery_charge'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(amount.unwrap_or(DEFAULT_DELIVERY_CHARGE))
    }

    pub fn set_delivery_charge(&self, amount: i64) -> Result<(), StoreError> {
        if amount < 0 {
            return Err(StoreError::InvalidInput(
                "delivery charge must be 0 or more".to_string(),
            ));
        }

        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO settings (key, value) VALUES ('delivery_charge', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [amount],
            )?;
        }

        debug!(amount, "updated delivery charge");
        self.hub.notify(DELIVERY_CHARGE_PATH);
        Ok(())
    }

    pub fn page_views(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        let count: Option<i64> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'page_views'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(count.unwrap_or(0))
    }

    pub fn increment_page_views(&self) -> Result<(), StoreError> {
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO settings (key, value) VALUES ('page_views', 1)
                 ON CONFLICT(key) DO UPDATE SET value = value + 1",
                [],
            )?;
        }

        self.hub.notify(PAGE_VIEWS_PATH);
        Ok(())
    }
}

struct ProductFields {
    name: String,
    serves: Option<String>,
    description: Option<String>,
    image_urls: Option<String>,
}

fn validate_product_fields(
    name: &str,
    price: f64,
    serves: Option<&str>,
    description: Option<&str>,
    image_urls: &[String],
) -> Result<ProductFields, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput(
            "product name is required".to_string(),
        ));
    }
    if price <= 0.0 {
        return Err(StoreError::InvalidInput(
            "full price must be greater than zero".to_string(),
        ));
    }

    let serves = serves
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    let image_urls = if image_urls.is_empty() {
        None
    } else {
        Some(serde_json::to_string(image_urls)?)
    };

    Ok(ProductFields {
        name: name.to_string(),
        serves,
        description,
        image_urls,
    })
}

// Creation timestamps are server-assigned and strictly increasing within a
// collection, so newest-first ordering stays stable even if the wall clock
// steps backwards.
fn next_created_at(
    conn: &Connection,
    last_query: &str,
    params: impl rusqlite::Params,
) -> Result<i64, rusqlite::Error> {
    let last: Option<i64> = conn.query_row(last_query, params, |row| row.get(0))?;
    let now = Utc::now().timestamp_millis();

    Ok(match last {
        Some(last) => now.max(last + 1),
        None => now,
    })
}

// Every defaulting rule for loosely-shaped documents lives in these two
// decoders and nowhere else.

fn decode_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row
            .get::<_, Option<String>>(1)?
            .unwrap_or_else(|| "Unnamed Category".to_string()),
        image_url: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn decode_product(row: &Row) -> rusqlite::Result<Product> {
    let image_urls: Option<String> = row.get(7)?;

    Ok(Product {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "Unnamed Item".to_string()),
        price: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
        half_price: row.get(4)?,
        serves: row.get(5)?,
        description: row.get(6)?,
        image_urls: image_urls
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default(),
        is_veg: row.get::<_, Option<bool>>(8)?.unwrap_or(true),
        created_at: row.get(9)?,
    })
}

pub trait DatabaseExt {
    fn db(&self) -> Arc<Database>;
}

impl DatabaseExt for AppHandle {
    fn db(&self) -> Arc<Database> {
        self.state::<Arc<Database>>().inner().clone()
    }
}
