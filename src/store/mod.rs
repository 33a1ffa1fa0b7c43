//! The store: a registry of named collections, plus snapshot persistence.
//!
//! The store owns nothing but the name-to-collection mapping. Collection
//! handles are `Arc`s; callers acquire a handle first (releasing the store
//! lock) and only then operate on the collection under its own lock, so no
//! code path ever holds both locks at once.

pub mod collection;
pub mod index;
pub mod snapshot;

pub use collection::{Collection, CollectionConfig, QueryParams};
pub use index::{FieldIndex, RangeScan};
pub use snapshot::{CollectionSnapshot, StoreSnapshot};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::{Error, Result};

/// A registry mapping collection names to collections.
///
/// # Examples
///
/// ```rust
/// use vellumdb::{CollectionConfig, Store};
///
/// # fn main() -> vellumdb::error::Result<()> {
/// let store = Store::new();
/// store.create_collection("users", CollectionConfig::new("id"))?;
///
/// let users = store.collection("users")?;
/// assert_eq!(users.name(), "users");
/// assert!(store.collection("missing").is_err());
/// # Ok(())
/// # }
/// ```
pub struct Store {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new, empty collection and returns a handle to it.
    ///
    /// Fails with `CollectionExists` when the name is already taken.
    pub fn create_collection(
        &self,
        name: &str,
        config: CollectionConfig,
    ) -> Result<Arc<Collection>> {
        let mut collections = self.collections.write();
        match collections.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::CollectionExists(name.to_string())),
            Entry::Vacant(slot) => {
                let collection = Arc::new(Collection::new(name.to_string(), config));
                slot.insert(Arc::clone(&collection));
                info!(collection = %name, "Collection created");
                Ok(collection)
            }
        }
    }

    /// Returns a handle to the named collection.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        let collections = self.collections.read();
        collections
            .get(name)
            .cloned()
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Removes the named collection and everything it owns.
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.remove(name).is_none() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        info!(collection = %name, "Collection deleted");
        Ok(())
    }

    /// Names of the registered collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let collections = self.collections.read();
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots the current set of collection handles, releasing the store
    /// lock before any collection is visited.
    pub(crate) fn collection_handles(&self) -> Vec<(String, Arc<Collection>)> {
        let collections = self.collections.read();
        let mut handles: Vec<(String, Arc<Collection>)> = collections
            .iter()
            .map(|(name, collection)| (name.clone(), Arc::clone(collection)))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }

    pub(crate) fn register(&self, name: String, collection: Arc<Collection>) {
        self.collections.write().insert(name, collection);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
