//! Loosely-typed rows as delivered by the store and the change feed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row: a JSON object keyed by column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Convert a JSON value into a record. Returns `None` for non-objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Get a string field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Whether the field is present (null counts as present).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The record's key under `field`, normalised to a string.
    ///
    /// String and integer keys are accepted; anything else has no key.
    pub fn key(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(key_string)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Normalise a key value to its string form.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_accepts_strings_and_integers() {
        let r = Record::new().with("id", "a");
        assert_eq!(r.key("id").as_deref(), Some("a"));

        let r = Record::new().with("id", 42);
        assert_eq!(r.key("id").as_deref(), Some("42"));
    }

    #[test]
    fn test_key_rejects_other_shapes() {
        let r = Record::from_value(json!({"id": 1.5})).unwrap();
        assert_eq!(r.key("id"), None);
        let r = Record::from_value(json!({"id": ""})).unwrap();
        assert_eq!(r.key("id"), None);
        let r = Record::from_value(json!({"id": null})).unwrap();
        assert_eq!(r.key("id"), None);
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("x")).is_none());
    }
}
