// VellumDB - an embeddable, schema-flexible document store
// Collections of typed documents with secondary indexes and range queries

#![warn(rust_2018_idioms)]

pub mod cache;
pub mod document;
pub mod network;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use cache::DocumentCache;
pub use document::{Document, FieldKind, FieldValue, FromDocument, ToDocument};
pub use store::{Collection, CollectionConfig, QueryParams, Store};

/// VellumDB error types
pub mod error {
    use thiserror::Error;

    use crate::document::FieldKind;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("document must have a primary key")]
        NoPrimaryKey,

        #[error("primary key value must be a string")]
        InvalidKeyType,

        #[error("primary key value cannot be empty")]
        EmptyPrimaryKey,

        #[error("document not found: {0}")]
        DocumentNotFound(String),

        #[error("collection not found: {0}")]
        CollectionNotFound(String),

        #[error("collection already exists: {0}")]
        CollectionExists(String),

        #[error("index not found: {0}")]
        IndexNotFound(String),

        #[error("index already exists: {0}")]
        IndexExists(String),

        #[error("empty index key is not allowed")]
        EmptyIndexKey,

        #[error("index entry not found")]
        IndexEntryNotFound,

        #[error("field {field} type mismatch: expected {expected}, got {actual}")]
        TypeMismatch {
            field: String,
            expected: FieldKind,
            actual: FieldKind,
        },

        #[error("failed to dump store: {0}")]
        DumpFailed(#[source] serde_json::Error),

        #[error("failed to parse snapshot: {0}")]
        ParseFailed(#[source] serde_json::Error),

        #[error("io error: {0}")]
        Io(#[from] std::io::Error),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
