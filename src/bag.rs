//! Schema-less per-entity key/value store
//!
//! Behavior code writes whatever it needs restored into the bag during a
//! save capture and reads it back through the typed getters after a load.
//! Entries keep insertion order so serialized documents are deterministic.

use indexmap::IndexMap;

use crate::error::{Result, SaveError};
use crate::value::Value;

/// Heterogeneous state container keyed by string.
///
/// Writes never coerce; conversion happens only in the typed getters, which
/// fail with [`SaveError::KeyNotFound`] for absent keys and
/// [`SaveError::TypeConversion`] for values of the wrong shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateBag {
    pub(crate) entries: IndexMap<String, Value>,
}

impl StateBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an entry with the given key is present.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite the entry for the given key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Borrow the raw stored value, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Remove all entries. Called before every fresh save capture.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bag has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn fetch(&self, key: &str) -> Result<&Value> {
        self.entries
            .get(key)
            .ok_or_else(|| SaveError::KeyNotFound(key.to_string()))
    }

    /// Value for the given key, coerced to a boolean.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.fetch(key)?.to_bool(key)
    }

    /// Value for the given key, coerced to an integer.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.fetch(key)?.to_int(key)
    }

    /// Value for the given key, coerced to a float.
    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.fetch(key)?.to_float(key)
    }

    /// Value for the given key as a string. A stored null yields `Ok(None)`
    /// rather than an error.
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.fetch(key)?.to_string_opt(key)
    }

    /// Value for the given key as a boolean array, each element coerced
    /// independently.
    pub fn get_bool_array(&self, key: &str) -> Result<Vec<bool>> {
        self.fetch(key)?
            .as_array(key)?
            .iter()
            .map(|v| v.to_bool(key))
            .collect()
    }

    /// Value for the given key as an integer array.
    pub fn get_int_array(&self, key: &str) -> Result<Vec<i64>> {
        self.fetch(key)?
            .as_array(key)?
            .iter()
            .map(|v| v.to_int(key))
            .collect()
    }

    /// Value for the given key as a float array.
    pub fn get_float_array(&self, key: &str) -> Result<Vec<f64>> {
        self.fetch(key)?
            .as_array(key)?
            .iter()
            .map(|v| v.to_float(key))
            .collect()
    }

    /// Value for the given key as a string array; null elements come back as
    /// `None`.
    pub fn get_string_array(&self, key: &str) -> Result<Vec<Option<String>>> {
        self.fetch(key)?
            .as_array(key)?
            .iter()
            .map(|v| v.to_string_opt(key))
            .collect()
    }
}

impl FromIterator<(String, Value)> for StateBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_has() {
        let mut bag = StateBag::new();
        assert!(!bag.has("fuel"));
        bag.set("fuel", 42i64);
        assert!(bag.has("fuel"));
        assert_eq!(bag.get_int("fuel").unwrap(), 42);
    }

    #[test]
    fn test_overwrite_changes_shape() {
        // Writes never coerce; a key can legitimately change type.
        let mut bag = StateBag::new();
        bag.set("slot", 3i64);
        bag.set("slot", "left-hand");
        assert_eq!(bag.get_string("slot").unwrap(), Some("left-hand".into()));
        assert!(bag.get_int("slot").is_err());
    }

    #[test]
    fn test_missing_key() {
        let bag = StateBag::new();
        match bag.get_float("mass") {
            Err(SaveError::KeyNotFound(key)) => assert_eq!(key, "mass"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_null_string_returns_none() {
        let mut bag = StateBag::new();
        bag.set("hat", Value::Null);
        assert_eq!(bag.get_string("hat").unwrap(), None);
    }

    #[test]
    fn test_int_array_elementwise_coercion() {
        let mut bag = StateBag::new();
        bag.set(
            "scores",
            vec![Value::Int(1), Value::Float(2.0), Value::String("3".into())],
        );
        assert_eq!(bag.get_int_array("scores").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_array_getter_rejects_scalar() {
        let mut bag = StateBag::new();
        bag.set("speed", 1.5f64);
        assert!(matches!(
            bag.get_float_array("speed"),
            Err(SaveError::TypeConversion { .. })
        ));
    }

    #[test]
    fn test_array_element_failure_propagates() {
        let mut bag = StateBag::new();
        bag.set("mixed", vec![Value::Int(1), Value::Null]);
        assert!(bag.get_int_array("mixed").is_err());
    }

    #[test]
    fn test_clear() {
        let mut bag = StateBag::new();
        bag.set("a", 1i64);
        bag.set("b", 2i64);
        bag.clear();
        assert!(bag.is_empty());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut bag = StateBag::new();
        bag.set("z", 1i64);
        bag.set("a", 2i64);
        bag.set("m", 3i64);
        let keys: Vec<&str> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
