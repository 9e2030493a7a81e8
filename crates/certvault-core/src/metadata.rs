use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Schema-less certificate metadata as a tagged document value.
///
/// Object keys are held in a `BTreeMap`, so the canonical JSON rendering has
/// sorted keys without a separate normalization pass. Numbers are finite
/// `f64`; non-finite values are rejected at conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<MetadataValue>),
    Object(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Convert an arbitrary JSON value into a canonical metadata document.
    ///
    /// Rejects numbers that cannot be represented as a finite `f64`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CoreError> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                let f = n.as_f64().ok_or_else(|| {
                    CoreError::UnsupportedMetadata(format!("number out of range: {}", n))
                })?;
                if !f.is_finite() {
                    return Err(CoreError::UnsupportedMetadata(format!(
                        "non-finite number: {}",
                        n
                    )));
                }
                Ok(Self::Number(f))
            }
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            serde_json::Value::Array(items) => {
                let converted = items
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Array(converted))
            }
            serde_json::Value::Object(map) => {
                let mut converted = BTreeMap::new();
                for (k, v) in map {
                    converted.insert(k.clone(), Self::from_json(v)?);
                }
                Ok(Self::Object(converted))
            }
        }
    }

    /// Convert back to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }

    /// Canonical compact JSON rendering: sorted keys, no whitespace.
    ///
    /// This is the byte representation fed into the certificate hash, so it
    /// must be identical for semantically identical documents regardless of
    /// the key order the caller supplied.
    pub fn canonical_json(&self) -> String {
        // serde_json::Map is ordered (BTreeMap-backed without the
        // preserve_order feature), and compact serialization emits no
        // whitespace, so this rendering is canonical.
        serde_json::to_string(&self.to_json()).unwrap_or_else(|_| "null".into())
    }

    /// Whether this value is an object (the usual top-level shape).
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }
}
