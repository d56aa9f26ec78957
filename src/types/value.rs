use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque payload stored next to a key.
///
/// Values never participate in routing; the tree only compares them when a
/// caller deletes a specific `(key, value)` pair, and that comparison is
/// plain value-level equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit double precision float
    Double(f64),
    /// Boolean value
    Boolean(bool),
    /// UTF-8 string
    Text(String),
    /// Raw binary payload
    Bytes(Vec<u8>),
}

impl Value {
    /// Convenience constructor for integer payloads
    pub fn int(value: i64) -> Self {
        Value::Integer(value)
    }

    /// Convenience constructor for text payloads
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Convenience constructor for binary payloads
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(value.into())
    }

    /// Returns a human-readable name for the value's type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
