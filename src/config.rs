//! Decoder configuration.

use serde::{Deserialize, Serialize};

/// Prefix used for tool-call ids the decoder has to make up
pub const DEFAULT_TOOL_CALL_ID_PREFIX: &str = "call_";

/// Tunables for a decode.
///
/// Deserializable so a calling layer can embed it in its own config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Prefix for generated tool-call ids (`<prefix><ulid>`), used when the
    /// server never sends an id for a slot
    pub tool_call_id_prefix: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            tool_call_id_prefix: DEFAULT_TOOL_CALL_ID_PREFIX.to_string(),
        }
    }
}

impl DecoderConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prefix for generated tool-call ids
    pub fn with_tool_call_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tool_call_id_prefix = prefix.into();
        self
    }

    pub(crate) fn generate_tool_call_id(&self) -> String {
        format!("{}{}", self.tool_call_id_prefix, ulid::Ulid::new())
    }
}
