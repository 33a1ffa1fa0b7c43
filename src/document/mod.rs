//! The document data model.
//!
//! A [`Document`] is a schema-free mapping from field names to typed
//! [`FieldValue`]s. Two documents in the same collection may carry entirely
//! different field sets. Documents are plain values: handing one to a
//! collection stores a copy, and everything a collection returns is an owned
//! copy, so callers never alias engine-internal state.

pub mod record;
pub mod value;

pub use record::{FromDocument, ToDocument};
pub use value::{FieldKind, FieldValue};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A schema-free record: field names mapped to typed values.
///
/// Fields serialize in lexicographic name order, which keeps snapshots
/// byte-stable for equal documents.
///
/// # Examples
///
/// ```rust
/// use vellumdb::Document;
///
/// let doc = Document::new()
///     .with_field("id", "user-1")
///     .with_field("name", "Alice")
///     .with_field("age", 34i64);
///
/// assert_eq!(doc.get("name").and_then(|v| v.as_str()), Some("Alice"));
/// assert!(doc.get("email").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any previous value under the same name
    /// (builder form).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a field, returning the previous value if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Looks up a field by name. Absent fields are `None`, never an error.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Number of fields in the document.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl From<BTreeMap<String, FieldValue>> for Document {
    fn from(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
