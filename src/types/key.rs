use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A totally ordered index key.
///
/// Keys are the subset of [`Value`] shapes that carry a usable total order:
/// integers and text. The derived ordering places all integers before all
/// text, then compares naturally within a variant, so any mix of keys still
/// sorts deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// 64-bit signed integer key
    Integer(i64),
    /// UTF-8 string key
    Text(String),
}

impl Key {
    /// Convenience constructor for integer keys
    pub fn int(key: i64) -> Self {
        Key::Integer(key)
    }

    /// Convenience constructor for text keys
    pub fn text(key: impl Into<String>) -> Self {
        Key::Text(key.into())
    }

    /// Converts the key into its payload representation for compression
    pub fn to_value(&self) -> Value {
        match self {
            Key::Integer(i) => Value::Integer(*i),
            Key::Text(s) => Value::Text(s.clone()),
        }
    }

    /// Reconstructs a key from a decoded payload value.
    ///
    /// Returns `None` when the value shape cannot be a key, which a decoder
    /// treats as blob corruption.
    pub fn from_value(value: Value) -> Option<Key> {
        match value {
            Value::Integer(i) => Some(Key::Integer(i)),
            Value::Text(s) => Some(Key::Text(s)),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(i) => write!(f, "{}", i),
            Key::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(key: i64) -> Self {
        Key::Integer(key)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key::Text(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key::Text(key)
    }
}

/// A key paired with its payload; the entry type held by leaf pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Key,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        assert!(Key::int(1) < Key::int(2));
        assert!(Key::text("a") < Key::text("b"));
        // Integers sort before text under the derived total order
        assert!(Key::int(i64::MAX) < Key::text(""));
    }

    #[test]
    fn test_key_value_round_trip() {
        let key = Key::text("user_001");
        let back = Key::from_value(key.to_value()).unwrap();
        assert_eq!(key, back);

        let key = Key::int(-7);
        let back = Key::from_value(key.to_value()).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn test_non_key_value_rejected() {
        assert!(Key::from_value(Value::Double(1.5)).is_none());
        assert!(Key::from_value(Value::Bytes(vec![0])).is_none());
    }
}
