//! Tagged value union stored in a [`StateBag`](crate::StateBag)
//!
//! Values keep their exact shape from write through serialization and back:
//! nothing is narrowed or coerced until a typed getter asks for a concrete
//! type.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::{Result, SaveError};

/// A single schema-less value: scalar, byte payload, timestamp, ordered
/// array, or nested string-keyed map.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Human-readable name of the stored variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    fn conversion_err(&self, key: &str, requested: &'static str) -> SaveError {
        SaveError::TypeConversion {
            key: key.to_string(),
            found: self.kind(),
            requested,
        }
    }

    /// Coerce to a boolean. Numbers convert as nonzero, strings parse
    /// `true`/`false` case-insensitively.
    pub fn to_bool(&self, key: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.conversion_err(key, "bool")),
            },
            _ => Err(self.conversion_err(key, "bool")),
        }
    }

    /// Coerce to an integer. Floats truncate toward zero, booleans map to
    /// 0/1, strings parse.
    pub fn to_int(&self, key: &str) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.is_finite() => Ok(*f as i64),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.conversion_err(key, "int")),
            _ => Err(self.conversion_err(key, "int")),
        }
    }

    /// Coerce to a float. Integers widen, booleans map to 0.0/1.0, strings
    /// parse.
    pub fn to_float(&self, key: &str) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.conversion_err(key, "float")),
            _ => Err(self.conversion_err(key, "float")),
        }
    }

    /// Coerce to the canonical string form. A stored null yields `Ok(None)`
    /// rather than an error. Arrays and maps have no string form.
    pub fn to_string_opt(&self, key: &str) -> Result<Option<String>> {
        match self {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Int(i) => Ok(Some(i.to_string())),
            Value::Float(f) => Ok(Some(f.to_string())),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Timestamp(t) => Ok(Some(t.to_rfc3339())),
            Value::Bytes(b) => Ok(Some(BASE64.encode(b))),
            Value::Array(_) | Value::Map(_) => Err(self.conversion_err(key, "string")),
        }
    }

    /// The array elements, or a conversion error if this is not an array.
    pub fn as_array(&self, key: &str) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            _ => Err(self.conversion_err(key, "array")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}
