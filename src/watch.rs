//! Reactive adapter between a [`CollectionStore`] and a view.
//!
//! `CollectionWatch` is what a component holds: it subscribes on creation,
//! marks itself dirty on every notification and re-reads the store lazily the
//! next time the view asks for items. Dropping it unsubscribes.

use crate::compare_store::{CollectionStore, ScopedSubscription};
use crate::types::{CompareItem, ItemId};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct CollectionWatch<T> {
    store: Rc<dyn CollectionStore<T>>,
    snapshot: RefCell<Vec<T>>,
    dirty: Rc<Cell<bool>>,
    revision: Rc<Cell<u64>>,
    _subscription: ScopedSubscription,
}

impl<T: Clone> CollectionWatch<T> {
    pub fn new(store: Rc<dyn CollectionStore<T>>) -> Self {
        let dirty = Rc::new(Cell::new(false));
        let revision = Rc::new(Cell::new(0u64));
        let subscription = {
            let dirty = dirty.clone();
            let revision = revision.clone();
            store
                .subscribe(Rc::new(move || {
                    dirty.set(true);
                    revision.set(revision.get() + 1);
                }))
                .scoped()
        };
        let snapshot = RefCell::new(store.get_items());
        CollectionWatch {
            store,
            snapshot,
            dirty,
            revision,
            _subscription: subscription,
        }
    }

    /// Items as of the last notification.
    pub fn items(&self) -> Vec<T> {
        if self.dirty.replace(false) {
            *self.snapshot.borrow_mut() = self.store.get_items();
        }
        self.snapshot.borrow().clone()
    }

    /// Bumped once per store notification; views compare it to skip re-renders.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    pub fn is_stale(&self) -> bool {
        self.dirty.get()
    }

    pub fn store(&self) -> &Rc<dyn CollectionStore<T>> {
        &self.store
    }
}

/// Serializable view of the comparison list for the DOM layer.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSnapshot {
    pub items: Vec<CompareItem>,
    pub count: usize,
    pub capacity: usize,
    pub is_full: bool,
    pub revision: u64,
}

impl ComparisonSnapshot {
    pub fn from_watch(watch: &CollectionWatch<CompareItem>) -> Self {
        let items = watch.items();
        let capacity = watch.store().capacity();
        ComparisonSnapshot {
            count: items.len(),
            is_full: items.len() >= capacity,
            capacity,
            revision: watch.revision(),
            items,
        }
    }
}

/// Mutations the DOM layer can request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ComparisonAction {
    Add { item: CompareItem },
    Remove { id: ItemId },
    /// Add when absent, remove when present.
    Toggle { item: CompareItem },
    Clear,
}

/// Outcome of [`apply_action`]; `false` for a rejected add.
pub fn apply_action(store: &dyn CollectionStore<CompareItem>, action: ComparisonAction) -> bool {
    match action {
        ComparisonAction::Add { item } => store.add_item(item),
        ComparisonAction::Remove { id } => {
            store.remove_item(&id);
            true
        }
        ComparisonAction::Toggle { item } => {
            if store.is_in_comparison(&item.id) {
                store.remove_item(&item.id);
                true
            } else {
                store.add_item(item)
            }
        }
        ComparisonAction::Clear => {
            store.clear_all();
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare_store::ComparisonStore;
    use crate::storage::MemoryStorage;

    fn watched() -> (Rc<ComparisonStore<CompareItem, MemoryStorage>>, CollectionWatch<CompareItem>) {
        let store = Rc::new(ComparisonStore::new(MemoryStorage::new()));
        let dyn_store: Rc<dyn CollectionStore<CompareItem>> = store.clone();
        let watch = CollectionWatch::new(dyn_store);
        (store, watch)
    }

    #[test]
    fn watch_refreshes_after_mutation() {
        let (store, watch) = watched();
        assert!(watch.items().is_empty());
        store.add_item(CompareItem::new("1"));
        assert!(watch.is_stale());
        assert_eq!(watch.items().len(), 1);
        assert!(!watch.is_stale());
        assert_eq!(watch.revision(), 1);
    }

    #[test]
    fn dropping_watch_unsubscribes() {
        let (store, watch) = watched();
        assert_eq!(store.listener_count(), 1);
        drop(watch);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn actions_parse_from_tagged_json() {
        let (store, watch) = watched();
        let add: ComparisonAction =
            serde_json::from_str(r#"{"type":"Add","item":{"id":9,"title":"Civic"}}"#).unwrap();
        assert!(apply_action(store.as_ref(), add));

        let toggle: ComparisonAction =
            serde_json::from_str(r#"{"type":"Toggle","item":{"id":"9"}}"#).unwrap();
        assert!(apply_action(store.as_ref(), toggle));
        assert!(store.is_empty());

        let snap = ComparisonSnapshot::from_watch(&watch);
        assert_eq!(snap.count, 0);
        assert_eq!(snap.capacity, 4);
        assert_eq!(snap.revision, 2);
    }
}
