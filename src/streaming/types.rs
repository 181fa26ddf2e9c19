//! Tolerant record types for streamed chat-completion chunks.
//!
//! Every field is optional. A field that is missing, `null` or of an
//! unexpected type deserializes as `None` instead of failing the record, so
//! only syntactically invalid JSON is ever an error.

use crate::error::{Result, StreamError};
use crate::Usage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One `data: ` payload of the stream
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkRecord {
    /// Choice entries; an entry that is not an object is kept as `None`
    #[serde(default, deserialize_with = "lenient_objects")]
    pub choices: Option<Vec<Option<ChoiceRecord>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<Usage>,
}

impl ChunkRecord {
    /// Parse a payload.
    ///
    /// Fails only when the payload is not valid JSON. Valid JSON that is not
    /// an object yields an empty record.
    pub fn parse(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload).map_err(|source| StreamError::Decode {
            payload: payload.to_string(),
            source,
        })?;
        Ok(from_object(value).unwrap_or_default())
    }

    /// The first choice, if the array exists and its first entry is usable
    pub fn first_choice(&self) -> Option<&ChoiceRecord> {
        self.choices.as_ref()?.first()?.as_ref()
    }

    /// Take ownership of the first usable choice
    pub fn take_first_choice(&mut self) -> Option<ChoiceRecord> {
        self.choices.as_mut()?.first_mut()?.take()
    }
}

/// An entry of the `choices` array
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChoiceRecord {
    #[serde(default, deserialize_with = "lenient_object")]
    pub delta: Option<DeltaRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub finish_reason: Option<String>,
}

/// The incremental part of a choice
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeltaRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    /// Tool-call fragments; an entry that is not an object is kept as `None`
    #[serde(default, deserialize_with = "lenient_objects")]
    pub tool_calls: Option<Vec<Option<ToolCallDelta>>>,
}

/// A fragment of one tool call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolCallDelta {
    /// Positional slot index; `None` when absent or not integral.
    ///
    /// Integral floats such as `1.0` are accepted as the same index; `1.5`
    /// or a string is not an index.
    #[serde(default, deserialize_with = "lenient_index")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub function: Option<FunctionDelta>,
}

/// A fragment of a tool call's function
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionDelta {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub arguments: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_index<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(index) = value.as_i64() {
        return Ok(Some(index));
    }
    Ok(value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64))
}

fn lenient_object<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(from_object(value))
}

fn lenient_objects<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<Option<T>>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(items.into_iter().map(from_object).collect())),
        _ => Ok(None),
    }
}

// Derived struct impls also accept JSON arrays positionally, so anything that
// is not an object is rejected up front.
fn from_object<T: DeserializeOwned>(value: Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    T::deserialize(value).ok()
}
