//! Comparison list store
//!
//! A small, deduplicated, capacity-bounded list of selected cars/parts. The
//! in-memory copy is authoritative for the session; durable storage is a
//! write-through cache of it, read lazily on first access.
//!
//! Every successful mutation persists the full list under one key as JSON and
//! then calls each subscriber (no payload; subscribers re-read `get_items`).
//!
//! Stores are plain values: build one per page/context and hand out `Rc`s.
//! Nothing here is a global.

use crate::debug::{self, cat};
use crate::storage::DurableStorage;
use crate::types::{Identified, ItemId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub const DEFAULT_STORAGE_KEY: &str = "compareList";
pub const DEFAULT_CAPACITY: usize = 4;
pub const FAVORITES_STORAGE_KEY: &str = "favoritesList";
pub const FAVORITES_CAPACITY: usize = 50;

/// Zero-argument change callback.
pub type Listener = Rc<dyn Fn()>;

type ListenerList = Rc<RefCell<Vec<Listener>>>;

#[inline]
fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub storage_key: String,
    pub capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StoreOptions {
    /// Saved-for-later list: same mechanics, larger bound, its own key.
    pub fn favorites() -> Self {
        StoreOptions {
            storage_key: FAVORITES_STORAGE_KEY.to_string(),
            capacity: FAVORITES_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Handle returned by `subscribe`. Calling [`Subscription::unsubscribe`]
/// removes exactly the listener it was created for.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    listeners: Weak<RefCell<Vec<Listener>>>,
    listener: Listener,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.detach();
    }

    fn detach(&self) {
        if let Some(list) = self.listeners.upgrade() {
            list.borrow_mut()
                .retain(|l| !same_listener(l, &self.listener));
        }
    }

    /// Turn into a guard that unsubscribes when dropped.
    pub fn scoped(self) -> ScopedSubscription {
        ScopedSubscription(Some(self))
    }
}

/// Unsubscribes on drop.
pub struct ScopedSubscription(Option<Subscription>);

impl Drop for ScopedSubscription {
    fn drop(&mut self) {
        if let Some(sub) = self.0.take() {
            sub.detach();
        }
    }
}

/// The store contract UI adapters program against.
pub trait CollectionStore<T> {
    fn get_items(&self) -> Vec<T>;
    fn add_item(&self, item: T) -> bool;
    fn remove_item(&self, id: &ItemId);
    fn clear_all(&self);
    fn is_in_comparison(&self, id: &ItemId) -> bool;
    fn subscribe(&self, listener: Listener) -> Subscription;
    fn capacity(&self) -> usize;
}

pub struct ComparisonStore<T, S> {
    storage: S,
    options: StoreOptions,
    items: RefCell<Option<Vec<T>>>,
    listeners: ListenerList,
}

impl<T, S> ComparisonStore<T, S>
where
    T: Identified + Clone + Serialize + DeserializeOwned,
    S: DurableStorage,
{
    pub fn new(storage: S) -> Self {
        Self::with_options(storage, StoreOptions::default())
    }

    pub fn with_options(storage: S, options: StoreOptions) -> Self {
        ComparisonStore {
            storage,
            options,
            items: RefCell::new(None),
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Current list in insertion order. Hydrates from storage on first use.
    pub fn get_items(&self) -> Vec<T> {
        self.with_items(|items| items.clone())
    }

    /// Append `item` unless the list is full or already holds its id.
    ///
    /// Returns `false` (and changes nothing) when rejected.
    pub fn add_item(&self, item: T) -> bool {
        let accepted = self.with_items(|items| {
            if items.len() >= self.options.capacity {
                debug::log(cat::STORE, format!("add {} rejected: full", item.item_id()));
                return false;
            }
            if items.iter().any(|i| i.item_id() == item.item_id()) {
                debug::log(cat::STORE, format!("add {} rejected: duplicate", item.item_id()));
                return false;
            }
            items.push(item);
            self.persist(items);
            true
        });
        if accepted {
            self.notify();
        }
        accepted
    }

    /// Remove the item with `id` if present. Persists and notifies either way.
    pub fn remove_item(&self, id: &ItemId) {
        self.with_items(|items| {
            items.retain(|i| i.item_id() != id);
            self.persist(items);
        });
        self.notify();
    }

    pub fn clear_all(&self) {
        self.with_items(|items| {
            items.clear();
            self.persist(items);
        });
        self.notify();
    }

    pub fn is_in_comparison(&self, id: &ItemId) -> bool {
        self.with_items(|items| items.iter().any(|i| i.item_id() == id))
    }

    /// Register a change listener. Registering the same `Rc` twice is a no-op.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        {
            let mut list = self.listeners.borrow_mut();
            if !list.iter().any(|l| same_listener(l, &listener)) {
                list.push(listener.clone());
            }
        }
        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            listener,
        }
    }

    pub fn subscribe_scoped(&self, listener: Listener) -> ScopedSubscription {
        self.subscribe(listener).scoped()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn len(&self) -> usize {
        self.with_items(|items| items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.options.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.options.capacity
    }

    pub fn remaining_slots(&self) -> usize {
        self.options.capacity.saturating_sub(self.len())
    }

    /// Drop the in-memory copy and re-read durable storage, e.g. after another
    /// tab wrote the same key. Notifies subscribers.
    pub fn reload(&self) {
        *self.items.borrow_mut() = None;
        self.notify();
    }

    fn with_items<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let mut slot = self.items.borrow_mut();
        let items = slot.get_or_insert_with(|| self.hydrate());
        f(items)
    }

    fn hydrate(&self) -> Vec<T> {
        let key = &self.options.storage_key;
        let Some(raw) = self.storage.get_item(key) else {
            return Vec::new();
        };
        let parsed: Vec<T> = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("ignoring unreadable {key} entry: {e}");
                return Vec::new();
            }
        };

        // Entries written by older builds may break the bounds; keep the first
        // occurrence of each id, up to capacity.
        let mut items: Vec<T> = Vec::with_capacity(parsed.len().min(self.options.capacity));
        for item in parsed {
            if items.len() >= self.options.capacity {
                break;
            }
            if !items.iter().any(|i| i.item_id() == item.item_id()) {
                items.push(item);
            }
        }
        debug::log(cat::STORE, format!("hydrated {} item(s) from {key}", items.len()));
        items
    }

    fn persist(&self, items: &[T]) {
        let key = &self.options.storage_key;
        let res = serde_json::to_string(items)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.storage.set_item(key, &json));
        if let Err(e) = res {
            log::warn!("failed to persist {key}: {e:#}");
        }
    }

    fn notify(&self) {
        // Copy-on-notify: listeners may subscribe/unsubscribe while we iterate.
        let snapshot: Vec<Listener> = self.listeners.borrow().clone();
        debug::log(cat::STORE, format!("notify {} listener(s)", snapshot.len()));
        for listener in snapshot {
            listener();
        }
    }
}

impl<T, S> CollectionStore<T> for ComparisonStore<T, S>
where
    T: Identified + Clone + Serialize + DeserializeOwned,
    S: DurableStorage,
{
    fn get_items(&self) -> Vec<T> {
        ComparisonStore::get_items(self)
    }

    fn add_item(&self, item: T) -> bool {
        ComparisonStore::add_item(self, item)
    }

    fn remove_item(&self, id: &ItemId) {
        ComparisonStore::remove_item(self, id)
    }

    fn clear_all(&self) {
        ComparisonStore::clear_all(self)
    }

    fn is_in_comparison(&self, id: &ItemId) -> bool {
        ComparisonStore::is_in_comparison(self, id)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        ComparisonStore::subscribe(self, listener)
    }

    fn capacity(&self) -> usize {
        ComparisonStore::capacity(self)
    }
}
