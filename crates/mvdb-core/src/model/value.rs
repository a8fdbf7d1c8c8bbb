use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ModelError, Result};

/// Attribute values of one revision, keyed by attribute name
///
/// A missing key means the attribute was never set; `Value::Null` is an
/// explicit null.
pub type State = BTreeMap<String, Value>;

/// Closed set of attribute kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Int,
    Long,
    Timestamp,
    Bool,
    Blob,
    Uuid,
}

impl ValueKind {
    /// Tag stored in the kind column of the backing tables
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Bool => "bool",
            ValueKind::Blob => "blob",
            ValueKind::Uuid => "uuid",
        }
    }

    /// Inverse of [`ValueKind::as_str`]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ValueKind::String),
            "int" => Some(ValueKind::Int),
            "long" => Some(ValueKind::Long),
            "timestamp" => Some(ValueKind::Timestamp),
            "bool" => Some(ValueKind::Bool),
            "blob" => Some(ValueKind::Blob),
            "uuid" => Some(ValueKind::Uuid),
            _ => None,
        }
    }

    /// Kinds whose storage width grows with the value
    pub fn is_sized(&self) -> bool {
        matches!(self, ValueKind::String | ValueKind::Blob)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::String => "String",
            ValueKind::Int => "Int",
            ValueKind::Long => "Long",
            ValueKind::Timestamp => "Timestamp",
            ValueKind::Bool => "Bool",
            ValueKind::Blob => "Blob",
            ValueKind::Uuid => "Uuid",
        };
        f.write_str(name)
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    String(String),
    Int(i32),
    Long(i64),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    Blob(Vec<u8>),
    Uuid(Uuid),
}

impl Value {
    /// Kind of this value, `None` for `Null`
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ValueKind::String),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Long(_) => Some(ValueKind::Long),
            Value::Timestamp(_) => Some(ValueKind::Timestamp),
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Blob(_) => Some(ValueKind::Blob),
            Value::Uuid(_) => Some(ValueKind::Uuid),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Storage width: byte length for strings and blobs, 0 otherwise
    pub fn width(&self) -> u32 {
        let len = match self {
            Value::String(s) => s.len(),
            Value::Blob(b) => b.len(),
            _ => 0,
        };
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    /// Serialize any value into an opaque blob
    ///
    /// # Errors
    ///
    /// `BlobEncoding` if the value cannot be serialized.
    pub fn blob_of<T: Serialize>(value: &T) -> Result<Value> {
        serde_json::to_vec(value)
            .map(Value::Blob)
            .map_err(|e| ModelError::BlobEncoding {
                reason: e.to_string(),
            })
    }

    /// Deserialize a blob produced by [`Value::blob_of`]
    ///
    /// # Errors
    ///
    /// `BlobEncoding` if this is not a blob or the bytes do not decode as `T`.
    pub fn blob_as<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Value::Blob(bytes) => {
                serde_json::from_slice(bytes).map_err(|e| ModelError::BlobEncoding {
                    reason: e.to_string(),
                })
            }
            other => Err(ModelError::BlobEncoding {
                reason: format!("expected a blob, found {}", other.kind_name()),
            }),
        }
    }

    fn kind_name(&self) -> String {
        self.kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "Null".to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}L", l),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Value::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
