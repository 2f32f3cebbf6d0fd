//! Topic data records: typed values flowing through the shared store.

use serde::{Deserialize, Serialize};

/// A typed topic value. The serde tag is the record's type tag on the
/// wire; publish/pull round-trips preserve tag and value exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TopicValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 text.
    Text(String),
    /// Arbitrary structured payload.
    Json(serde_json::Value),
}

impl TopicValue {
    /// The record's type tag.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

/// One topic's latest value, paired with the topic name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TopicDataRecord {
    /// Topic name in the shared store.
    pub topic: String,
    /// Typed value.
    pub value: TopicValue,
}

impl TopicDataRecord {
    /// Construct a record.
    #[must_use]
    pub fn new(topic: impl Into<String>, value: TopicValue) -> Self {
        Self {
            topic: topic.into(),
            value,
        }
    }
}
