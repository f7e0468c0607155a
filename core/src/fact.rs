//! The persisted unit of memory and its metadata.

use std::collections::BTreeMap;

/// A scalar value attached to a fact's free-form metadata map.
///
/// Metadata is string-keyed but the values themselves may be any JSON
/// scalar, not just text, so this enum covers string/number/bool without
/// opening the door to arbitrary nested JSON.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum MetadataValue {
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Bool(bool),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Arbitrary metadata linked to each stored fact.
pub type Metadata = BTreeMap<String, MetadataValue>;
