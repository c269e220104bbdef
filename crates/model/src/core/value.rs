use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt};

/// A single field value flowing through the pipeline.
///
/// Dump files only ever yield `String` (quoted literal), `Raw` (bare token)
/// and `Null`. The typed variants come from live source connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    /// Unquoted token, left for the target store to coerce on insert.
    Raw(String),
    Boolean(bool),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Null,
}

impl Value {
    /// Null, or a string made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) | Value::Raw(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual view of the value, as a human would read it back from the dump.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) | Value::Raw(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Int(v) => Some(Cow::Owned(v.to_string())),
            Value::Uint(v) => Some(Cow::Owned(v.to_string())),
            Value::Float(v) => Some(Cow::Owned(v.to_string())),
            Value::Boolean(v) => Some(Cow::Owned(v.to_string())),
            Value::Date(v) => Some(Cow::Owned(v.format("%Y-%m-%d").to_string())),
            Value::Timestamp(v) => Some(Cow::Owned(v.format("%Y-%m-%d %H:%M:%S").to_string())),
            Value::Bytes(_) | Value::Null => None,
        }
    }

    /// Converts the value into a JSON scalar for report and export documents.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Uint(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Bytes(v) => serde_json::Value::String(hex(v)),
            other => other
                .as_text()
                .map(|t| serde_json::Value::String(t.into_owned()))
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |acc, byte| {
            acc + &format!("{byte:02x}")
        })
}

/// Renders the value as a SQL literal.
///
/// Every non-null value is written as a quoted literal so the target store
/// resolves the type from the column it lands in.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bytes(v) => write!(f, "'\\x{}'", hex(v)),
            other => match other.as_text() {
                Some(text) => write!(f, "'{}'", text.replace('\'', "''")),
                None => write!(f, "NULL"),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        FieldValue {
            name: name.into(),
            value,
        }
    }
}
