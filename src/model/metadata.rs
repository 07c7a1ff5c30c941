//! Opaque metadata attached to nodes and relations

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A metadata value. Stored and returned as-is, never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<MetadataValue>),
    Object(IndexMap<String, MetadataValue>),
}

/// Metadata mapping, keeping the caller's key order
pub type Metadata = IndexMap<String, MetadataValue>;

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Int(n)
    }
}

impl From<u64> for MetadataValue {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => MetadataValue::Int(n),
            Err(_) => MetadataValue::UInt(n),
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Float(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<Vec<MetadataValue>> for MetadataValue {
    fn from(items: Vec<MetadataValue>) -> Self {
        MetadataValue::Array(items)
    }
}

impl From<Metadata> for MetadataValue {
    fn from(map: Metadata) -> Self {
        MetadataValue::Object(map)
    }
}
