//! Record mapping: explicit conversion between native record types and
//! documents.
//!
//! Each record type opts in by implementing [`ToDocument`] and
//! [`FromDocument`]. The widening direction uses the `From` conversions on
//! [`FieldValue`] (all integer and float primitives become `Number`, maps
//! become `Object`, sequences become `Array`). The narrowing direction goes
//! through the kind-checked `*_field` helpers on [`Document`], which raise
//! `TypeMismatch` naming the offending field when the stored kind differs
//! from the requested one. Absent fields are `Ok(None)`, so record types
//! decide for themselves whether a field is required.

use std::collections::BTreeMap;

use crate::document::{Document, FieldKind, FieldValue};
use crate::error::{Error, Result};

/// Conversion from a native record into a [`Document`].
pub trait ToDocument {
    fn to_document(&self) -> Document;
}

/// Conversion from a [`Document`] back into a native record.
pub trait FromDocument: Sized {
    fn from_document(doc: &Document) -> Result<Self>;
}

impl Document {
    /// Extracts a `String` field. `Ok(None)` when absent, `TypeMismatch`
    /// when present with another kind.
    pub fn string_field(&self, field: &str) -> Result<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(mismatch(field, FieldKind::String, other)),
        }
    }

    /// Extracts a `Number` field.
    pub fn number_field(&self, field: &str) -> Result<Option<f64>> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Number(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(field, FieldKind::Number, other)),
        }
    }

    /// Extracts a `Bool` field.
    pub fn bool_field(&self, field: &str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(field, FieldKind::Bool, other)),
        }
    }

    /// Extracts an `Array` field.
    pub fn array_field(&self, field: &str) -> Result<Option<Vec<FieldValue>>> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Array(values)) => Ok(Some(values.clone())),
            Some(other) => Err(mismatch(field, FieldKind::Array, other)),
        }
    }

    /// Extracts an `Object` field.
    pub fn object_field(&self, field: &str) -> Result<Option<BTreeMap<String, FieldValue>>> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Object(fields)) => Ok(Some(fields.clone())),
            Some(other) => Err(mismatch(field, FieldKind::Object, other)),
        }
    }
}

fn mismatch(field: &str, expected: FieldKind, actual: &FieldValue) -> Error {
    Error::TypeMismatch {
        field: field.to_string(),
        expected,
        actual: actual.kind(),
    }
}
