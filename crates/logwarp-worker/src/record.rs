//! Documents produced by the pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name the timestamp normalizer rewrites.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Field mapping of one document
pub type Fields = BTreeMap<String, FieldValue>;

/// Typed value of a single document field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Objects, arrays and nulls carried through verbatim
    Composite(serde_json::Value),
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                // Integers beyond i64 are carried verbatim rather than widened to f64
                None if n.is_f64() => match n.as_f64() {
                    Some(f) => FieldValue::Float(f),
                    None => FieldValue::Composite(Value::Number(n)),
                },
                None => FieldValue::Composite(Value::Number(n)),
            },
            Value::String(s) => FieldValue::String(s),
            other => FieldValue::Composite(other),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// One document bound for the store
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub index: String,
    pub fields: Fields,
}

/// Bulk action line: `{"index": {"_id": ..., "_index": ...}}`
#[derive(Debug, Serialize)]
pub(crate) struct BulkAction<'a> {
    pub index: BulkTarget<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkTarget<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    #[serde(rename = "_index")]
    pub index: &'a str,
}

impl Record {
    pub(crate) fn action(&self) -> BulkAction<'_> {
        BulkAction {
            index: BulkTarget {
                id: &self.id,
                index: &self.index,
            },
        }
    }
}
