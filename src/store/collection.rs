//! Collections: primary-key tables with secondary indexes.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::document::{Document, FieldValue};
use crate::error::{Error, Result};
use crate::store::index::FieldIndex;

/// Immutable collection configuration, fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Name of the field every stored document must carry as a non-empty
    /// string value.
    pub primary_key: String,
}

impl CollectionConfig {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
        }
    }
}

/// Bounds and direction for a range query. Both bounds are inclusive;
/// either may be left open.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub descending: bool,
}

#[derive(Default)]
struct CollectionState {
    documents: HashMap<String, Document>,
    indexes: BTreeMap<String, FieldIndex>,
}

/// A named set of documents addressed by primary key, with optional
/// secondary indexes supporting ordered range queries.
///
/// All methods take `&self`; a single reader/writer lock guards the
/// document table together with every secondary index, so reads run
/// concurrently and writes are exclusive per collection.
///
/// # Examples
///
/// ```rust
/// use vellumdb::{CollectionConfig, Document, QueryParams, Store};
///
/// # fn main() -> vellumdb::error::Result<()> {
/// let store = Store::new();
/// let users = store.create_collection("users", CollectionConfig::new("id"))?;
///
/// users.put(Document::new().with_field("id", "u-1").with_field("name", "Alice"))?;
/// users.put(Document::new().with_field("id", "u-2").with_field("name", "Bob"))?;
///
/// users.create_index("name")?;
/// let matches = users.query("name", &QueryParams::default())?;
/// assert_eq!(matches.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Collection {
    name: String,
    config: CollectionConfig,
    state: RwLock<CollectionState>,
}

impl Collection {
    pub(crate) fn new(name: String, config: CollectionConfig) -> Self {
        Self {
            name,
            config,
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Rebuilds a collection from restored parts. Documents are trusted as
    /// previously validated; indexes are not carried over and must be
    /// replayed by the caller.
    pub(crate) fn from_parts(
        name: String,
        config: CollectionConfig,
        documents: HashMap<String, Document>,
    ) -> Self {
        Self {
            name,
            config,
            state: RwLock::new(CollectionState {
                documents,
                indexes: BTreeMap::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Stores a document under its primary key, replacing any previous
    /// document with the same key.
    ///
    /// Fails with `NoPrimaryKey` when the primary-key field is absent,
    /// `InvalidKeyType` when it is not a string, and `EmptyPrimaryKey` when
    /// it is the empty string. On failure the collection is untouched; all
    /// index maintenance happens only after validation has passed.
    pub fn put(&self, document: Document) -> Result<()> {
        let key = self.primary_key_of(&document)?;

        let mut guard = self.state.write();
        let state = &mut *guard;

        // Replacement order: retract the old document's index entries before
        // adding the new ones, so an index never holds both at once. Under
        // the write lock no reader can observe the intermediate states.
        if let Some(previous) = state.documents.get(&key) {
            Self::remove_contributions(&self.name, &mut state.indexes, previous, &key);
        }
        Self::add_contributions(&mut state.indexes, &document, &key);
        state.documents.insert(key.clone(), document);

        debug!(collection = %self.name, key = %key, "Document stored");
        Ok(())
    }

    /// Returns an owned copy of the document stored under `key`.
    pub fn get(&self, key: &str) -> Result<Document> {
        let state = self.state.read();
        state
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound(key.to_string()))
    }

    /// Removes the document stored under `key` along with its entries in
    /// every secondary index.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let document = state
            .documents
            .remove(key)
            .ok_or_else(|| Error::DocumentNotFound(key.to_string()))?;
        Self::remove_contributions(&self.name, &mut state.indexes, &document, key);

        debug!(collection = %self.name, key = %key, "Document deleted");
        Ok(())
    }

    /// Returns owned copies of all stored documents, in no particular
    /// order.
    pub fn list(&self) -> Vec<Document> {
        let state = self.state.read();
        state.documents.values().cloned().collect()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a secondary index on `field` from the current document table.
    ///
    /// Documents whose `field` is absent, not a string, or empty contribute
    /// nothing; that is not an error.
    pub fn create_index(&self, field: &str) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.indexes.contains_key(field) {
            return Err(Error::IndexExists(field.to_string()));
        }

        let mut index = FieldIndex::new();
        for (key, document) in &state.documents {
            if let Some(value) = Self::indexable(document, field) {
                // insert only rejects empty keys, filtered out just above
                let _ = index.insert(value, key);
            }
        }

        info!(
            collection = %self.name,
            field = %field,
            entries = index.len(),
            "Index created"
        );
        state.indexes.insert(field.to_string(), index);
        Ok(())
    }

    /// Discards the secondary index on `field`.
    pub fn delete_index(&self, field: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.indexes.remove(field).is_none() {
            return Err(Error::IndexNotFound(field.to_string()));
        }
        info!(collection = %self.name, field = %field, "Index deleted");
        Ok(())
    }

    /// Names of the secondary indexes, in field-name order.
    pub fn index_names(&self) -> Vec<String> {
        let state = self.state.read();
        state.indexes.keys().cloned().collect()
    }

    /// Range-scans the index on `field` and resolves every matching primary
    /// key to an owned document copy, in the index's order.
    pub fn query(&self, field: &str, params: &QueryParams) -> Result<Vec<Document>> {
        let state = self.state.read();
        let index = state
            .indexes
            .get(field)
            .ok_or_else(|| Error::IndexNotFound(field.to_string()))?;

        let mut matches = Vec::new();
        for key in index.scan(
            params.min_value.as_deref(),
            params.max_value.as_deref(),
            params.descending,
        ) {
            match state.documents.get(key) {
                Some(document) => matches.push(document.clone()),
                // The write paths keep indexes and the table in lockstep, so
                // a dangling entry is an internal bug, never a query error.
                None => error!(
                    collection = %self.name,
                    field = %field,
                    key = %key,
                    "Index entry has no matching document"
                ),
            }
        }

        debug!(
            collection = %self.name,
            field = %field,
            matches = matches.len(),
            "Range query executed"
        );
        Ok(matches)
    }

    /// Exports the document table (ordered by primary key) and the index
    /// names under one read lock, so a snapshot sees a single consistent
    /// state of the collection.
    pub(crate) fn export_state(&self) -> (BTreeMap<String, Document>, Vec<String>) {
        let state = self.state.read();
        let documents = state
            .documents
            .iter()
            .map(|(key, document)| (key.clone(), document.clone()))
            .collect();
        let indexes = state.indexes.keys().cloned().collect();
        (documents, indexes)
    }

    fn primary_key_of(&self, document: &Document) -> Result<String> {
        let value = document
            .get(&self.config.primary_key)
            .ok_or(Error::NoPrimaryKey)?;
        let key = match value {
            FieldValue::String(key) => key,
            _ => return Err(Error::InvalidKeyType),
        };
        if key.is_empty() {
            return Err(Error::EmptyPrimaryKey);
        }
        Ok(key.clone())
    }

    /// The indexable view of a document field: present, a string, and
    /// non-empty. Everything else stays out of the index.
    fn indexable<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
        match document.get(field) {
            Some(FieldValue::String(value)) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn add_contributions(
        indexes: &mut BTreeMap<String, FieldIndex>,
        document: &Document,
        key: &str,
    ) {
        for (field, index) in indexes.iter_mut() {
            if let Some(value) = Self::indexable(document, field) {
                // insert only rejects empty keys, filtered by indexable
                let _ = index.insert(value, key);
            }
        }
    }

    fn remove_contributions(
        name: &str,
        indexes: &mut BTreeMap<String, FieldIndex>,
        document: &Document,
        key: &str,
    ) {
        for (field, index) in indexes.iter_mut() {
            if let Some(value) = Self::indexable(document, field) {
                if index.remove(value, key).is_err() {
                    error!(
                        collection = %name,
                        field = %field,
                        key = %key,
                        "Stored document was missing from its index"
                    );
                }
            }
        }
    }
}
