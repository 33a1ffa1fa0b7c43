//! Integration tests for the document store engine.

use std::sync::Arc;
use std::thread;

use vellumdb::document::{Document, FieldValue};
use vellumdb::error::Error;
use vellumdb::store::{CollectionConfig, QueryParams, Store};

fn person(id: &str, name: &str, age: f64) -> Document {
    Document::new()
        .with_field("id", id)
        .with_field("name", name)
        .with_field("age", age)
}

fn names(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d.get("name").unwrap().as_str().unwrap().to_string())
        .collect()
}

fn query(min: Option<&str>, max: Option<&str>, descending: bool) -> QueryParams {
    QueryParams {
        min_value: min.map(String::from),
        max_value: max.map(String::from),
        descending,
    }
}

#[test]
fn test_put_get_roundtrip() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();

    let original = person("p-1", "Alice", 30.0);
    people.put(original.clone()).unwrap();

    let fetched = people.get("p-1").unwrap();
    assert_eq!(fetched, original);

    // The fetched copy is owned; changing it does not touch the store.
    let mut copy = fetched;
    copy.insert("name", "Mallory");
    assert_eq!(
        people.get("p-1").unwrap().get("name").unwrap().as_str(),
        Some("Alice")
    );
}

#[test]
fn test_range_query_boundaries() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();

    people.put(person("p-1", "Alice", 30.0)).unwrap();
    people.put(person("p-2", "Bob", 25.0)).unwrap();
    people.put(person("p-3", "Charlie", 35.0)).unwrap();
    people.create_index("name").unwrap();

    // Bounds are inclusive on both ends.
    let matches = people.query("name", &query(Some("Alice"), Some("Bob"), false)).unwrap();
    assert_eq!(names(&matches), vec!["Alice", "Bob"]);

    // min == max matches exactly that value.
    let matches = people.query("name", &query(Some("Bob"), Some("Bob"), false)).unwrap();
    assert_eq!(names(&matches), vec!["Bob"]);

    // Unbounded descending walks the whole index in reverse.
    let matches = people.query("name", &query(None, None, true)).unwrap();
    assert_eq!(names(&matches), vec!["Charlie", "Bob", "Alice"]);

    // An inverted range matches nothing.
    let matches = people.query("name", &query(Some("Charlie"), Some("Alice"), false)).unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_query_tracks_mutations() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();
    people.create_index("name").unwrap();

    people.put(person("p-1", "Alice", 30.0)).unwrap();
    people.put(person("p-2", "Bob", 25.0)).unwrap();

    // Replacement moves the index entry to the new value.
    people.put(person("p-1", "Anna", 31.0)).unwrap();
    let matches = people.query("name", &query(None, None, false)).unwrap();
    assert_eq!(names(&matches), vec!["Anna", "Bob"]);

    people.delete("p-2").unwrap();
    let matches = people.query("name", &query(None, None, false)).unwrap();
    assert_eq!(names(&matches), vec!["Anna"]);
}

#[test]
fn test_delete_is_not_idempotent() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();
    people.put(person("p-1", "Alice", 30.0)).unwrap();

    people.delete("p-1").unwrap();
    assert!(matches!(
        people.delete("p-1"),
        Err(Error::DocumentNotFound(_))
    ));
    assert!(matches!(people.get("p-1"), Err(Error::DocumentNotFound(_))));
}

#[test]
fn test_rejected_put_leaves_collection_unchanged() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();
    people.put(person("p-1", "Alice", 30.0)).unwrap();

    let missing_key = Document::new().with_field("name", "Bob");
    assert!(matches!(people.put(missing_key), Err(Error::NoPrimaryKey)));

    let numeric_key = Document::new().with_field("id", 7.0).with_field("name", "Bob");
    assert!(matches!(people.put(numeric_key), Err(Error::InvalidKeyType)));

    let empty_key = Document::new().with_field("id", "").with_field("name", "Bob");
    assert!(matches!(people.put(empty_key), Err(Error::EmptyPrimaryKey)));

    assert_eq!(people.len(), 1);
}

#[test]
fn test_dump_restore_is_byte_identical() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();
    people.put(person("p-2", "Bob", 25.0)).unwrap();
    people.put(person("p-1", "Alice", 30.0)).unwrap();
    people.create_index("name").unwrap();

    let orders = store
        .create_collection("orders", CollectionConfig::new("order_id"))
        .unwrap();
    orders
        .put(Document::new().with_field("order_id", "o-1").with_field("total", 9.5))
        .unwrap();

    let dump = store.dump().unwrap();
    let restored = Store::from_dump(&dump).unwrap();
    assert_eq!(restored.dump().unwrap(), dump);

    // Restored indexes answer queries without re-registration.
    let matches = restored
        .collection("people")
        .unwrap()
        .query("name", &query(Some("Alice"), Some("Alice"), false))
        .unwrap();
    assert_eq!(names(&matches), vec!["Alice"]);
}

#[test]
fn test_concurrent_puts_all_land() {
    let store = Arc::new(Store::new());
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();
    people.create_index("name").unwrap();

    let threads = 8;
    let per_thread = 50;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let collection = store.collection("people").unwrap();
            thread::spawn(move || {
                for i in 0..per_thread {
                    let id = format!("p-{}-{}", t, i);
                    let name = format!("name-{:02}-{:02}", t, i);
                    collection.put(person(&id, &name, i as f64)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let people = store.collection("people").unwrap();
    assert_eq!(people.len(), threads * per_thread);

    let matches = people.query("name", &query(None, None, false)).unwrap();
    assert_eq!(matches.len(), threads * per_thread);
}

#[test]
fn test_queries_run_against_concurrent_deletes() {
    let store = Arc::new(Store::new());
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();
    people.create_index("name").unwrap();

    for i in 0..100 {
        people
            .put(person(&format!("p-{:03}", i), &format!("name-{:03}", i), i as f64))
            .unwrap();
    }

    let deleter = {
        let collection = store.collection("people").unwrap();
        thread::spawn(move || {
            for i in (0..100).step_by(2) {
                collection.delete(&format!("p-{:03}", i)).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let collection = store.collection("people").unwrap();
            thread::spawn(move || {
                for _ in 0..50 {
                    let matches = collection
                        .query("name", &query(None, None, false))
                        .unwrap();
                    // Every returned document is fully formed.
                    for document in &matches {
                        assert!(document.get("name").is_some());
                    }
                    assert!(matches.len() <= 100);
                }
            })
        })
        .collect();

    deleter.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let people = store.collection("people").unwrap();
    assert_eq!(people.len(), 50);
    let matches = people.query("name", &query(None, None, false)).unwrap();
    let survivors = names(&matches);
    assert_eq!(survivors.len(), 50);
    assert!(survivors.iter().all(|name| {
        let i: usize = name.trim_start_matches("name-").parse().unwrap();
        i % 2 == 1
    }));
}

#[test]
fn test_non_string_and_missing_fields_stay_unindexed() {
    let store = Store::new();
    let people = store
        .create_collection("people", CollectionConfig::new("id"))
        .unwrap();

    people.put(person("p-1", "Alice", 30.0)).unwrap();
    people
        .put(Document::new().with_field("id", "p-2").with_field("age", 40.0))
        .unwrap();
    people
        .put(
            Document::new()
                .with_field("id", "p-3")
                .with_field("name", FieldValue::Number(7.0)),
        )
        .unwrap();
    people.create_index("name").unwrap();

    let matches = people.query("name", &query(None, None, false)).unwrap();
    assert_eq!(names(&matches), vec!["Alice"]);
    assert_eq!(people.len(), 3);
}
