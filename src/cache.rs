//! A bounded LRU cache of documents, built on top of a collection.
//!
//! The cache keeps its entries in a dedicated collection (primary key
//! `"key"`), so cached documents obey the same validation and ownership
//! rules as any other stored document; a separate recency list decides which
//! entry to evict when the cache is full.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::document::Document;
use crate::error::Result;
use crate::store::{Collection, CollectionConfig};

const KEY_FIELD: &str = "key";

/// A thread-safe LRU document cache with a fixed capacity.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroUsize;
/// use vellumdb::{Document, DocumentCache};
///
/// let cache = DocumentCache::new(NonZeroUsize::new(2).unwrap());
/// cache.put("a", Document::new().with_field("n", 1i64)).unwrap();
/// cache.put("b", Document::new().with_field("n", 2i64)).unwrap();
/// cache.put("c", Document::new().with_field("n", 3i64)).unwrap();
///
/// // "a" was least recently used and has been evicted.
/// assert!(cache.get("a").is_none());
/// assert!(cache.get("b").is_some());
/// ```
pub struct DocumentCache {
    collection: Arc<Collection>,
    recency: Mutex<LruCache<String, ()>>,
}

impl DocumentCache {
    /// Creates an empty cache holding at most `capacity` documents.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            collection: Arc::new(Collection::new(
                "cache".to_string(),
                CollectionConfig::new(KEY_FIELD),
            )),
            recency: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Stores a document under `key`, marking it most recently used. When
    /// the cache is full, the least recently used entry is evicted first.
    ///
    /// The key is written into the document's `"key"` field and is subject
    /// to the collection's primary-key rules, so an empty key is rejected.
    pub fn put(&self, key: &str, mut document: Document) -> Result<()> {
        document.insert(KEY_FIELD, key);
        self.collection.put(document)?;

        let evicted = { self.recency.lock().push(key.to_string(), ()) };
        if let Some((evicted_key, ())) = evicted {
            // push also reports a replaced entry under the same key; only a
            // genuinely different key means an eviction.
            if evicted_key != key {
                debug!(key = %evicted_key, "Cache entry evicted");
                if let Err(err) = self.collection.delete(&evicted_key) {
                    error!(
                        key = %evicted_key,
                        error = %err,
                        "Evicted entry was missing from the cache collection"
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns an owned copy of the cached document and promotes `key` to
    /// most recently used. Absent keys return `None` and leave the recency
    /// order untouched.
    pub fn get(&self, key: &str) -> Option<Document> {
        if self.recency.lock().get(key).is_none() {
            return None;
        }
        match self.collection.get(key) {
            Ok(document) => Some(document),
            Err(err) => {
                error!(
                    key = %key,
                    error = %err,
                    "Tracked entry was missing from the cache collection"
                );
                None
            }
        }
    }

    /// Drops the entry under `key`, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.recency.lock().pop(key).is_some();
        if removed {
            if let Err(err) = self.collection.delete(key) {
                error!(
                    key = %key,
                    error = %err,
                    "Removed entry was missing from the cache collection"
                );
            }
        }
        removed
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.recency.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of documents the cache will hold.
    pub fn capacity(&self) -> usize {
        self.recency.lock().cap().get()
    }
}
