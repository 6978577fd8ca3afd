//! Live projections over the document store: every write notifies the hub
//! with its collection path, and each subscription re-reads, re-maps and
//! re-sorts the full set before handing it to its sink. Lists are always
//! replaced whole, never patched.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::error;

use crate::db::{products_path, Database, StoreError, CATEGORIES_PATH, DELIVERY_CHARGE_PATH,
    PAGE_VIEWS_PATH};
use crate::models::{Category, IndexedProduct, Product};

// A panicked subscriber must not wedge the hub.
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Watcher {
    path: String,
    callback: Arc<dyn Fn() + Send + Sync>,
}

pub struct ChangeHub {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<u64, Watcher>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        ChangeHub {
            next_id: AtomicU64::new(1),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn watch(
        self: &Arc<Self>,
        path: &str,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        guard(&self.watchers).insert(
            id,
            Watcher {
                path: path.to_string(),
                callback: Arc::new(callback),
            },
        );

        Subscription {
            hub: Arc::downgrade(self),
            id,
            active: AtomicBool::new(true),
        }
    }

    pub fn notify(&self, path: &str) {
        // Callbacks run without the watcher lock held, so a callback may
        // itself subscribe or unsubscribe.
        let callbacks: Vec<Arc<dyn Fn() + Send + Sync>> = guard(&self.watchers)
            .values()
            .filter(|w| w.path == path)
            .map(|w| w.callback.clone())
            .collect();

        for callback in callbacks {
            callback();
        }
    }
}

/// Handle for one live subscription. Teardown happens at most once no
/// matter how often `unsubscribe` is called, and also on drop.
pub struct Subscription {
    hub: Weak<ChangeHub>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(hub) = self.hub.upgrade() {
            guard(&hub.watchers).remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn watch_collection<T, F, S>(db: &Arc<Database>, path: String, read: F, sink: S) -> Subscription
where
    T: 'static,
    F: Fn(&Database) -> Result<Vec<T>, StoreError> + Send + Sync + 'static,
    S: Fn(Vec<T>) + Send + Sync + 'static,
{
    let weak = Arc::downgrade(db);
    let log_path = path.clone();
    let deliver = move || {
        let Some(db) = weak.upgrade() else { return };
        let list = read(&db).unwrap_or_else(|err| {
            // degrade to an empty list instead of erroring into the sink
            error!(path = %log_path, %err, "live read failed");
            Vec::new()
        });
        sink(list);
    };

    deliver();
    db.watch(&path, deliver)
}

pub fn watch_categories(
    db: &Arc<Database>,
    sink: impl Fn(Vec<Category>) + Send + Sync + 'static,
) -> Subscription {
    watch_collection(db, CATEGORIES_PATH.to_string(), |db| db.categories(), sink)
}

pub fn watch_products(
    db: &Arc<Database>,
    category_id: &str,
    sink: impl Fn(Vec<Product>) + Send + Sync + 'static,
) -> Subscription {
    let id = category_id.to_string();
    watch_collection(db, products_path(category_id), move |db| db.products(&id), sink)
}

pub fn watch_delivery_charge(
    db: &Arc<Database>,
    sink: impl Fn(i64) + Send + Sync + 'static,
) -> Subscription {
    let weak = Arc::downgrade(db);
    let deliver = move || {
        let Some(db) = weak.upgrade() else { return };
        match db.delivery_charge() {
            Ok(amount) => sink(amount),
            Err(err) => error!(%err, "delivery charge read failed"),
        }
    };

    deliver();
    db.watch(DELIVERY_CHARGE_PATH, deliver)
}

pub fn watch_page_views(
    db: &Arc<Database>,
    sink: impl Fn(i64) + Send + Sync + 'static,
) -> Subscription {
    let weak = Arc::downgrade(db);
    let deliver = move || {
        let Some(db) = weak.upgrade() else { return };
        match db.page_views() {
            Ok(count) => sink(count),
            Err(err) => error!(%err, "page views read failed"),
        }
    };

    deliver();
    db.watch(PAGE_VIEWS_PATH, deliver)
}

/// One product subscription per category, diffed against the live category
/// list: new categories gain a watch, removed categories have theirs torn
/// down. Also maintains the flattened all-products index for admin search.
pub struct ProductFanout {
    inner: Arc<FanoutInner>,
    categories_sub: Subscription,
    active: AtomicBool,
}

struct FanoutInner {
    db: Arc<Database>,
    subs: Mutex<HashMap<String, Subscription>>,
    lists: Mutex<HashMap<String, Vec<Product>>>,
    order: Mutex<Vec<(String, Option<String>)>>,
    per_category: Box<dyn Fn(&str, Vec<Product>) + Send + Sync>,
    index: Box<dyn Fn(Vec<IndexedProduct>) + Send + Sync>,
}

impl ProductFanout {
    pub fn spawn(
        db: Arc<Database>,
        per_category: impl Fn(&str, Vec<Product>) + Send + Sync + 'static,
        index: impl Fn(Vec<IndexedProduct>) + Send + Sync + 'static,
    ) -> Self {
        let inner = Arc::new(FanoutInner {
            db: db.clone(),
            subs: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            per_category: Box::new(per_category),
            index: Box::new(index),
        });

        let categories_sub = {
            let weak = Arc::downgrade(&inner);
            watch_categories(&db, move |categories| {
                if let Some(inner) = weak.upgrade() {
                    inner.sync_categories(categories);
                }
            })
        };

        ProductFanout {
            inner,
            categories_sub,
            active: AtomicBool::new(true),
        }
    }

    pub fn shutdown(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.categories_sub.unsubscribe();

        let subs: Vec<Subscription> = guard(&self.inner.subs).drain().map(|(_, s)| s).collect();
        for sub in subs {
            sub.unsubscribe();
        }
    }
}

impl Drop for ProductFanout {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl FanoutInner {
    fn sync_categories(self: &Arc<Self>, categories: Vec<Category>) {
        *guard(&self.order) = categories
            .iter()
            .map(|c| (c.id.clone(), Some(c.name.clone())))
            .collect();

        let current: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();

        let removed: Vec<String> = {
            let mut subs = guard(&self.subs);
            let removed: Vec<String> = subs
                .keys()
                .filter(|id| !current.contains(id.as_str()))
                .cloned()
                .collect();
            for id in &removed {
                if let Some(sub) = subs.remove(id) {
                    sub.unsubscribe();
                }
            }
            removed
        };
        {
            let mut lists = guard(&self.lists);
            for id in &removed {
                lists.remove(id);
            }
        }

        for category in &categories {
            if guard(&self.subs).contains_key(&category.id) {
                continue;
            }
            let id = category.id.clone();
            let weak = Arc::downgrade(self);
            let sub = watch_products(&self.db, &category.id, move |products| {
                if let Some(inner) = weak.upgrade() {
                    inner.store_products(&id, products);
                }
            });
            guard(&self.subs).insert(category.id.clone(), sub);
        }

        // renames and removals both change what the index shows
        self.publish_index();
    }

    fn store_products(&self, category_id: &str, products: Vec<Product>) {
        guard(&self.lists).insert(category_id.to_string(), products.clone());
        (self.per_category)(category_id, products);
        self.publish_index();
    }

    fn publish_index(&self) {
        let order = guard(&self.order).clone();
        let flattened: Vec<IndexedProduct> = {
            let lists = guard(&self.lists);
            order
                .iter()
                .flat_map(|(id, name)| {
                    lists.get(id).into_iter().flatten().map(|product| IndexedProduct {
                        category_id: id.clone(),
                        category_name: name.clone(),
                        product: product.clone(),
                    })
                })
                .collect()
        };
        (self.index)(flattened);
    }
}
