//! Comparison store tests - capacity, uniqueness, persistence and subscriptions

use partsx::compare_store::{
    CollectionStore, ComparisonStore, StoreOptions, DEFAULT_STORAGE_KEY, FAVORITES_STORAGE_KEY,
};
use partsx::storage::{DurableStorage, MemoryStorage};
use partsx::types::{CompareItem, ItemId};
use partsx::watch::{apply_action, CollectionWatch, ComparisonAction, ComparisonSnapshot};
use std::cell::Cell;
use std::rc::Rc;

type Store = ComparisonStore<CompareItem, MemoryStorage>;

fn item(id: u64) -> CompareItem {
    CompareItem::new(id).with_title(format!("Part #{id}"))
}

fn counter(store: &Store) -> (Rc<Cell<usize>>, partsx::compare_store::Subscription) {
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    let sub = store.subscribe(Rc::new(move || h.set(h.get() + 1)));
    (hits, sub)
}

#[test]
fn fifth_item_is_rejected() {
    let store = Store::new(MemoryStorage::new());
    for id in 1..=4 {
        assert!(store.add_item(item(id)), "item {id} should be accepted");
    }
    assert!(!store.add_item(item(5)));
    assert_eq!(store.get_items().len(), 4);
    assert!(store.is_full());
    assert_eq!(store.remaining_slots(), 0);
    assert!(!store.is_in_comparison(&ItemId::from(5u64)));
}

#[test]
fn duplicate_id_is_rejected_without_notify() {
    let store = Store::new(MemoryStorage::new());
    let (hits, _sub) = counter(&store);

    assert!(store.add_item(item(7)));
    assert!(!store.add_item(CompareItem::new("7").with_title("same id, different title")));

    assert_eq!(store.len(), 1);
    assert_eq!(store.get_items()[0].title.as_deref(), Some("Part #7"));
    assert_eq!(hits.get(), 1);
}

#[test]
fn insertion_order_is_kept() {
    let store = Store::new(MemoryStorage::new());
    for id in [3, 1, 2] {
        store.add_item(item(id));
    }
    store.remove_item(&ItemId::from(1u64));
    store.add_item(item(9));
    let ids: Vec<String> = store.get_items().iter().map(|i| i.id.to_string()).collect();
    assert_eq!(ids, vec!["3", "2", "9"]);
}

#[test]
fn remove_absent_id_is_a_noop_but_notifies() {
    let store = Store::new(MemoryStorage::new());
    store.add_item(item(1));
    let (hits, _sub) = counter(&store);

    store.remove_item(&ItemId::new("missing"));
    assert_eq!(store.len(), 1);
    assert_eq!(hits.get(), 1);

    store.remove_item(&ItemId::from(1u64));
    store.remove_item(&ItemId::from(1u64));
    assert!(store.is_empty());
    assert_eq!(hits.get(), 3);
}

#[test]
fn survives_reload_through_storage() {
    let storage = MemoryStorage::new();
    {
        let store = Store::new(storage.clone());
        store.add_item(item(1));
        store.add_item(item(2).with_price(1200.0).with_sale_price(999.0));
    }

    // Fresh store over the same storage is a page reload.
    let store = Store::new(storage.clone());
    let items = store.get_items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].display_price(), Some(999.0));
    assert!(store.is_in_comparison(&ItemId::from(2u64)));

    store.clear_all();
    assert_eq!(storage.get_item(DEFAULT_STORAGE_KEY).as_deref(), Some("[]"));
    assert!(Store::new(storage).get_items().is_empty());
}

#[test]
fn persisted_entry_keeps_unknown_fields() {
    let storage = MemoryStorage::new();
    storage
        .set_item(
            DEFAULT_STORAGE_KEY,
            r#"[{"id":"c-19","title":"Civic","mileage":42000,"price":18500}]"#,
        )
        .unwrap();
    let store = Store::new(storage.clone());
    store.add_item(item(20));

    let raw = storage.get_item(DEFAULT_STORAGE_KEY).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v[0]["mileage"], 42000);
    assert_eq!(v[1]["id"], "20");
}

#[test]
fn corrupt_storage_reads_as_empty() {
    for raw in ["not json", "{\"id\":1}", "[{\"title\":\"no id\"}]", ""] {
        let storage = MemoryStorage::new();
        storage.set_item(DEFAULT_STORAGE_KEY, raw).unwrap();
        let store = Store::new(storage);
        assert!(store.get_items().is_empty(), "{raw:?} should read as empty");
        assert!(store.add_item(item(1)));
    }
}

#[test]
fn one_notification_per_mutation() {
    let store = Store::new(MemoryStorage::new());
    let (a, _sa) = counter(&store);
    let (b, _sb) = counter(&store);

    store.add_item(item(1));
    store.add_item(item(2));
    store.clear_all();

    assert_eq!(a.get(), 3);
    assert_eq!(b.get(), 3);
}

#[test]
fn unsubscribe_removes_only_that_listener() {
    let store = Store::new(MemoryStorage::new());
    let (a, sub_a) = counter(&store);
    let (b, _sub_b) = counter(&store);

    sub_a.unsubscribe();
    store.add_item(item(1));

    assert_eq!(a.get(), 0);
    assert_eq!(b.get(), 1);
    assert_eq!(store.listener_count(), 1);
}

#[test]
fn scoped_subscription_ends_on_drop() {
    let store = Store::new(MemoryStorage::new());
    let hits = Rc::new(Cell::new(0));
    {
        let h = hits.clone();
        let _guard = store.subscribe_scoped(Rc::new(move || h.set(h.get() + 1)));
        store.add_item(item(1));
    }
    store.add_item(item(2));
    assert_eq!(hits.get(), 1);
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn unsubscribe_after_store_dropped_is_harmless() {
    let store = Store::new(MemoryStorage::new());
    let (_hits, sub) = counter(&store);
    drop(store);
    sub.unsubscribe();
}

#[test]
fn favorites_use_their_own_key_and_bound() {
    let storage = MemoryStorage::new();
    let compare = Store::new(storage.clone());
    let favorites = Store::with_options(storage.clone(), StoreOptions::favorites());

    for id in 1..=10 {
        favorites.add_item(item(id));
    }
    compare.add_item(item(1));

    assert_eq!(favorites.len(), 10);
    assert_eq!(favorites.capacity(), 50);
    assert_eq!(compare.len(), 1);
    assert!(storage.get_item(FAVORITES_STORAGE_KEY).is_some());
}

#[test]
fn watch_rereads_only_after_notify() {
    let store: Rc<Store> = Rc::new(Store::new(MemoryStorage::new()));
    let watch = CollectionWatch::new(store.clone() as Rc<dyn CollectionStore<CompareItem>>);
    assert!(watch.items().is_empty());
    assert_eq!(watch.revision(), 0);

    store.add_item(item(1));
    assert!(watch.is_stale());
    assert_eq!(watch.items().len(), 1);
    assert!(!watch.is_stale());
    assert_eq!(watch.revision(), 1);

    drop(watch);
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn actions_drive_the_store() {
    let store: Rc<Store> = Rc::new(Store::new(MemoryStorage::new()));
    let watch = CollectionWatch::new(store.clone() as Rc<dyn CollectionStore<CompareItem>>);

    let add: ComparisonAction =
        serde_json::from_str(r#"{"type":"Add","item":{"id":11,"title":"Alternator"}}"#).unwrap();
    assert!(apply_action(store.as_ref(), add));

    let toggle: ComparisonAction =
        serde_json::from_str(r#"{"type":"Toggle","item":{"id":11}}"#).unwrap();
    assert!(apply_action(store.as_ref(), toggle));
    assert!(store.is_empty());

    for id in 1..=4 {
        apply_action(store.as_ref(), ComparisonAction::Add { item: item(id) });
    }
    assert!(!apply_action(store.as_ref(), ComparisonAction::Toggle { item: item(5) }));

    let snap = ComparisonSnapshot::from_watch(&watch);
    assert_eq!(snap.count, 4);
    assert!(snap.is_full);
    assert_eq!(snap.revision, 6);

    apply_action(store.as_ref(), ComparisonAction::Clear);
    assert!(store.is_empty());
}
