//! Process-wide cart state. Every mutation funnels through one point that
//! prunes dead lines, rewrites the persisted slot and notifies subscribers
//! with the full list. The slot file is meaningful by presence: an empty
//! cart removes it instead of writing an empty array.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::{fs, io};

use tauri::{AppHandle, Manager};
use tracing::warn;

use crate::models::{CartItem, OrderMode, Portion};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type CartWatcher = Arc<dyn Fn(&[CartItem]) + Send + Sync>;

#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    slot: PathBuf,
    items: Mutex<Vec<CartItem>>,
    watchers: Mutex<HashMap<u64, CartWatcher>>,
    next_id: AtomicU64,
}

impl CartStore {
    /// Rehydrates from the slot file. An unparseable slot is discarded and
    /// the cart starts empty.
    pub fn open(slot: PathBuf) -> Self {
        let items = match fs::read(&slot) {
            Ok(bytes) => match serde_json::from_slice::<Vec<CartItem>>(&bytes) {
                Ok(items) => items,
                Err(err) => {
                    warn!(%err, slot = %slot.display(), "discarding unparseable cart slot");
                    let _ = fs::remove_file(&slot);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        CartStore {
            inner: Arc::new(CartInner {
                slot,
                items: Mutex::new(items),
                watchers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&[CartItem]) + Send + Sync + 'static) -> CartSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        guard(&self.inner.watchers).insert(id, Arc::new(callback));

        CartSubscription {
            inner: Arc::downgrade(&self.inner),
            id,
            active: AtomicBool::new(true),
        }
    }

    pub fn items(&self) -> Vec<CartItem> {
        guard(&self.inner.items).clone()
    }

    /// Merges into an existing line when product and portion match. This is
    /// the only place a price is captured; later product edits never touch
    /// lines already in the cart.
    pub fn add(&self, item: CartItem) {
        self.mutate(move |items| {
            let existing = items
                .iter_mut()
                .find(|line| line.product_id == item.product_id && line.portion == item.portion);
            match existing {
                Some(line) => line.quantity += item.quantity,
                None => items.push(item),
            }
        });
    }

    /// One adjustment step never takes a line below 1; lines only leave the
    /// cart through `remove`, `clear` or the global prune.
    pub fn adjust_quantity(&self, product_id: &str, portion: Portion, delta: i64) {
        let product_id = product_id.to_string();
        self.mutate(move |items| {
            for line in items.iter_mut() {
                if line.product_id == product_id && line.portion == portion {
                    line.quantity = (line.quantity + delta).max(1);
                }
            }
        });
    }

    pub fn remove(&self, product_id: &str, portion: Portion) {
        let product_id = product_id.to_string();
        self.mutate(move |items| {
            items.retain(|line| !(line.product_id == product_id && line.portion == portion));
        });
    }

    pub fn clear(&self) {
        self.mutate(|items| items.clear());
    }

    pub fn subtotal(&self) -> f64 {
        guard(&self.inner.items)
            .iter()
            .map(|line| line.price * line.quantity as f64)
            .sum()
    }

    pub fn total(&self, mode: OrderMode, delivery_charge: i64) -> f64 {
        match mode {
            OrderMode::Pickup => self.subtotal(),
            OrderMode::Delivery => self.subtotal() + delivery_charge as f64,
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut Vec<CartItem>)) {
        let snapshot = {
            let mut items = guard(&self.inner.items);
            apply(&mut items);
            // invariant: no persisted line has quantity <= 0
            items.retain(|line| line.quantity > 0);
            self.inner.persist(&items);
            items.clone()
        };
        self.inner.notify(&snapshot);
    }
}

impl CartInner {
    fn persist(&self, items: &[CartItem]) {
        if items.is_empty() {
            if let Err(err) = fs::remove_file(&self.slot) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(%err, "failed to clear cart slot");
                }
            }
            return;
        }

        match serde_json::to_vec(items) {
            Ok(bytes) => {
                if let Err(err) = fs::write(&self.slot, bytes) {
                    warn!(%err, "failed to persist cart slot");
                }
            }
            Err(err) => warn!(%err, "failed to serialize cart"),
        }
    }

    fn notify(&self, items: &[CartItem]) {
        // no lock held across subscriber callbacks
        let callbacks: Vec<CartWatcher> = guard(&self.watchers).values().cloned().collect();
        for callback in callbacks {
            callback(items);
        }
    }
}

pub struct CartSubscription {
    inner: Weak<CartInner>,
    id: u64,
    active: AtomicBool,
}

impl CartSubscription {
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            guard(&inner.watchers).remove(&self.id);
        }
    }
}

impl Drop for CartSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub trait CartExt {
    fn cart(&self) -> CartStore;
}

impl CartExt for AppHandle {
    fn cart(&self) -> CartStore {
        self.state::<CartStore>().inner().clone()
    }
}
