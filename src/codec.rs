//! Document codec
//!
//! The bag portion of a record is schema-less, so the wire format carries no
//! type declarations: an array of integers and an array of strings look the
//! same until the literal tokens are read. Serialization is derived for the
//! fixed record fields and hand-written here for [`Value`]/[`StateBag`],
//! keeping the exact token shape in both directions. Concrete element types
//! are never inferred at decode time; that conversion happens lazily in the
//! typed bag getters.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::bag::StateBag;
use crate::error::Result;
use crate::record::EntityRecord;
use crate::value::Value;

/// Encode the full ordered record sequence as one pretty printed document.
///
/// The whole sequence is encoded in a single pass; nulls are written
/// explicitly, never omitted.
pub fn encode_records(records: &[EntityRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Decode a document back into its ordered record sequence.
///
/// Any malformed token is an unrecoverable parse error; the caller aborts
/// the whole load.
pub fn decode_records(text: &str) -> Result<Vec<EntityRecord>> {
    Ok(serde_json::from_str(text)?)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            // JSON has no byte or date literal; both travel as strings,
            // matching what the original serializer stack emitted.
            Value::Bytes(b) => serializer.serialize_str(&BASE64.encode(b)),
            Value::Timestamp(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a scalar, array, or string-keyed object")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        // Keep magnitude over exactness for the rare out-of-range literal.
        match i64::try_from(v) {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => Ok(Value::Float(v as f64)),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        // Timestamps have no literal of their own on the wire; an RFC 3339
        // string is one coming back.
        match DateTime::parse_from_rfc3339(v) {
            Ok(t) => Ok(Value::Timestamp(t.with_timezone(&Utc))),
            Err(_) => Ok(Value::String(v.to_string())),
        }
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        match DateTime::parse_from_rfc3339(&v) {
            Ok(t) => Ok(Value::Timestamp(t.with_timezone(&Utc))),
            Err(_) => Ok(Value::String(v)),
        }
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(Value::Bytes(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        // Elements stay as the value union; no concrete element type is
        // picked here.
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut entries = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl Serialize for StateBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StateBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(StateBag { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn roundtrip_bag(bag: &StateBag) -> StateBag {
        let text = serde_json::to_string(bag).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_int_array_type_fidelity() {
        let mut bag = StateBag::new();
        bag.set("scores", vec![1i64, 2, 3]);
        let back = roundtrip_bag(&bag);
        assert_eq!(back.get_int_array("scores").unwrap(), vec![1, 2, 3]);
        // The stored shape must still be an array of ints, not strings.
        assert_eq!(back.get("scores").unwrap().kind(), "array");
    }

    #[test]
    fn test_null_roundtrips_as_null() {
        let mut bag = StateBag::new();
        bag.set("hat", Value::Null);
        let back = roundtrip_bag(&bag);
        assert_eq!(back.get("hat"), Some(&Value::Null));
        assert_eq!(back.get_string("hat").unwrap(), None);
    }

    #[test]
    fn test_float_and_int_stay_distinct() {
        let mut bag = StateBag::new();
        bag.set("count", 3i64);
        bag.set("ratio", 1.5f64);
        let back = roundtrip_bag(&bag);
        assert_eq!(back.get("count"), Some(&Value::Int(3)));
        assert_eq!(back.get("ratio"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_nested_map_roundtrip() {
        let mut inner = IndexMap::new();
        inner.insert("x".to_string(), Value::Float(1.0));
        inner.insert("label".to_string(), Value::String("anchor".into()));
        let mut bag = StateBag::new();
        bag.set("pin", inner.clone());
        let back = roundtrip_bag(&bag);
        assert_eq!(back.get("pin"), Some(&Value::Map(inner)));
    }

    #[test]
    fn test_mixed_array_preserves_elements() {
        let mut bag = StateBag::new();
        bag.set(
            "mixed",
            vec![Value::Int(1), Value::String("two".into()), Value::Null],
        );
        let back = roundtrip_bag(&bag);
        let items = back.get("mixed").unwrap().as_array("mixed").unwrap();
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1], Value::String("two".into()));
        assert_eq!(items[2], Value::Null);
    }

    #[test]
    fn test_timestamp_and_bytes_encode_as_strings() {
        let mut bag = StateBag::new();
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        bag.set("stamp", when);
        bag.set("blob", Value::Bytes(vec![1, 2, 3]));
        let text = serde_json::to_string(&bag).unwrap();
        assert!(text.contains("2024-03-01T12:00:00+00:00"));
        assert!(text.contains(&BASE64.encode([1u8, 2, 3])));
    }

    #[test]
    fn test_timestamp_variant_roundtrips() {
        let mut bag = StateBag::new();
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        bag.set("stamp", when);
        let back = roundtrip_bag(&bag);
        assert_eq!(back.get("stamp"), Some(&Value::Timestamp(when)));
        assert_eq!(
            back.get_string("stamp").unwrap().unwrap(),
            when.to_rfc3339()
        );
        // Non-date strings stay strings.
        let mut plain = StateBag::new();
        plain.set("label", "not a date");
        assert_eq!(
            roundtrip_bag(&plain).get("label"),
            Some(&Value::String("not a date".into()))
        );
    }

    #[test]
    fn test_key_order_preserved_on_wire() {
        let mut bag = StateBag::new();
        bag.set("zulu", 1i64);
        bag.set("alpha", 2i64);
        let text = serde_json::to_string(&bag).unwrap();
        assert!(text.find("zulu").unwrap() < text.find("alpha").unwrap());
        let back = roundtrip_bag(&bag);
        let keys: Vec<&str> = back.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zulu", "alpha"]);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(decode_records("[{\"identity\": }]").is_err());
        assert!(decode_records("not json at all").is_err());
    }

    #[test]
    fn test_empty_sequence_roundtrip() {
        let text = encode_records(&[]).unwrap();
        assert_eq!(text.trim(), "[]");
        assert!(decode_records(&text).unwrap().is_empty());
    }
}
