use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Serialize, Serializer};

/// A single value carried in a service call frame.
///
/// The vendor protocol only moves flat primitives, so this deliberately
/// has no nested variant.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
}

impl Serialize for WireValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Str(v) => serializer.serialize_str(v),
            // Binary payloads travel as base64 text inside JSON frames
            Self::Bytes(v) => serializer.serialize_str(&BASE64.encode(v)),
        }
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for WireValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for WireValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Flat, string-keyed argument map for a single service call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WireMap(BTreeMap<String, WireValue>);

impl WireMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<WireValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&WireValue> {
        self.0.get(key)
    }

    /// Integer accessor, `None` if the key is absent or not an integer.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(WireValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WireValue)> {
        self.0.iter()
    }
}
