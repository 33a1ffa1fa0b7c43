//! Snapshot persistence: dump the full store to JSON and restore it.
//!
//! A snapshot carries, per collection, its configuration, its full document
//! table, and the names of its secondary indexes. Index contents are never
//! persisted; restoring replays index creation against the restored
//! documents. Every map in the snapshot is ordered, so dumping the same
//! store state twice produces identical bytes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::store::{Collection, CollectionConfig, Store};

/// Serialized form of a whole store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub collections: BTreeMap<String, CollectionSnapshot>,
}

/// Serialized form of one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub config: CollectionConfig,
    pub documents: BTreeMap<String, Document>,
    pub indexes: Vec<String>,
}

impl Store {
    /// Captures the store as a [`StoreSnapshot`].
    ///
    /// Collection handles are gathered first and the store lock released;
    /// each collection is then exported under its own read lock. Collections
    /// created or deleted while the walk runs may or may not appear, exactly
    /// as with any other interleaved operation.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut collections = BTreeMap::new();
        for (name, collection) in self.collection_handles() {
            let (documents, indexes) = collection.export_state();
            collections.insert(
                name,
                CollectionSnapshot {
                    config: collection.config().clone(),
                    documents,
                    indexes,
                },
            );
        }
        StoreSnapshot { collections }
    }

    /// Serializes the store to its JSON snapshot form.
    pub fn dump(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot()).map_err(Error::DumpFailed)
    }

    /// Rebuilds a store from a snapshot, replaying index creation so index
    /// contents derive from the restored documents. A duplicate index name
    /// in the snapshot is skipped, not fatal.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Store {
        let store = Store::new();
        for (name, collection_snapshot) in snapshot.collections {
            let collection = Arc::new(Collection::from_parts(
                name.clone(),
                collection_snapshot.config,
                collection_snapshot.documents.into_iter().collect(),
            ));
            for field in &collection_snapshot.indexes {
                if let Err(err) = collection.create_index(field) {
                    warn!(
                        collection = %name,
                        field = %field,
                        error = %err,
                        "Skipping index replay"
                    );
                }
            }
            store.register(name, collection);
        }
        store
    }

    /// Parses a JSON snapshot and rebuilds the store from it.
    pub fn from_dump(data: &str) -> Result<Store> {
        let snapshot: StoreSnapshot = serde_json::from_str(data).map_err(Error::ParseFailed)?;
        Ok(Store::from_snapshot(snapshot))
    }

    /// Writes the JSON snapshot to `path`, replacing any existing file.
    pub fn dump_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = self.dump()?;
        std::fs::write(path, data)?;
        info!(path = %path.display(), "Store dumped to file");
        Ok(())
    }

    /// Reads a JSON snapshot from `path` and rebuilds the store.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Store> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let store = Store::from_dump(&data)?;
        info!(path = %path.display(), "Store restored from file");
        Ok(store)
    }
}
