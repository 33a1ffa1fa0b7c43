//! Field values and their kinds.
//!
//! Every value stored in a document is a [`FieldValue`]: a closed tagged
//! union over five kinds. The kind always travels with the payload, both in
//! memory and on the wire, where a value serializes as
//! `{"type": "<kind>", "value": <payload>}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind tag of a [`FieldValue`], without its payload.
///
/// Used wherever only the shape of a value matters, such as type-mismatch
/// errors raised by record mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Array,
    Object,
}

impl FieldKind {
    /// Returns the lowercase name used in the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed document field value.
///
/// # Examples
///
/// ```rust
/// use vellumdb::FieldValue;
///
/// let value = FieldValue::from("Alice");
/// assert_eq!(value.as_str(), Some("Alice"));
///
/// let json = serde_json::to_string(&value).unwrap();
/// assert_eq!(json, r#"{"type":"string","value":"Alice"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Array(_) => FieldKind::Array,
            FieldValue::Object(_) => FieldKind::Object,
        }
    }

    /// Returns the string payload, or `None` for any other kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the numeric payload, or `None` for any other kind.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean payload, or `None` for any other kind.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the array payload, or `None` for any other kind.
    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the object payload, or `None` for any other kind.
    pub fn as_object(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

// Widening conversions from native types. All integer and float primitives
// land on Number, mirroring the record-mapping rules.

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::Number(value as f64)
            }
        })*
    };
}

impl_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32);

impl From<Vec<FieldValue>> for FieldValue {
    fn from(values: Vec<FieldValue>) -> Self {
        FieldValue::Array(values)
    }
}

impl From<BTreeMap<String, FieldValue>> for FieldValue {
    fn from(fields: BTreeMap<String, FieldValue>) -> Self {
        FieldValue::Object(fields)
    }
}
