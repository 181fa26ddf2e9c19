//! Streamed chat-completion decoding
//!
//! This crate turns a single server-sent event stream from an OpenAI-compatible
//! chat-completion endpoint into one coherent result. The server emits many small
//! JSON deltas (text fragments, interleaved tool-call fragments, a finish reason and
//! an optional usage summary); the decoder folds them back together in arrival order
//! while forwarding text tokens and usage to the caller as soon as they are seen.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use umf_stream::{decode_stream, Callbacks};
//!
//! let cancel = CancellationToken::new();
//! let mut sink = Callbacks::new().with_tokens(|token| print!("{token}"));
//! let result = decode_stream(body_reader, &cancel, &mut sink).await?;
//!
//! if let Some(calls) = &result.tool_calls {
//!     for call in calls {
//!         println!("{} -> {}", call.function.name, call.function.arguments);
//!     }
//! }
//! ```
//!
//! ## Components
//!
//! 1. **Event reader** ([`reader`]): splits the transport into lines, picks out
//!    `data: ` payloads and stops at the `[DONE]` sentinel.
//! 2. **Delta merger** ([`streaming`]): parses each payload and accumulates content,
//!    tool-call slots, finish reason and usage into a [`StreamResult`].
//!
//! The merger is synchronous and transport-agnostic. The reader and the
//! [`decode_stream`] entry point live behind the default `reader` feature.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod streaming;

pub use config::DecoderConfig;
pub use error::{Result, StreamError};
pub use streaming::{Callbacks, ChunkRecord, DeltaMerger, StreamSink, ToolCallSlot};

// ============================================================================
// Event Reader (optional feature)
// ============================================================================

#[cfg(feature = "reader")]
pub mod reader;
#[cfg(feature = "reader")]
pub use reader::{byte_stream_reader, EventReader};

#[cfg(feature = "reader")]
mod decoder;
#[cfg(feature = "reader")]
pub use decoder::{decode_stream, StreamDecoder};

// ============================================================================
// Result Types
// ============================================================================

/// Function invocation carried by a finalized tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name (empty when the server never sent one)
    pub name: String,
    /// Raw argument text, concatenated from every streamed fragment
    pub arguments: String,
}

/// A finalized tool call, in the OpenAI wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a `function` tool call
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Render in the OpenAI wire shape
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": self.r#type,
            "function": {
                "name": self.function.name,
                "arguments": self.function.arguments,
            },
        })
    }

    /// Parse the accumulated argument text as JSON.
    ///
    /// An empty argument string parses as an empty object, since servers omit
    /// arguments entirely for parameterless functions.
    pub fn parse_arguments(&self) -> serde_json::Result<serde_json::Value> {
        if self.function.arguments.trim().is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.function.arguments)
    }
}

/// Usage snapshot reported by the server.
///
/// The fields are passed through untouched; only the common token counters
/// get typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usage(serde_json::Map<String, serde_json::Value>);

impl Usage {
    /// Wrap a raw usage object
    pub fn new(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(fields)
    }

    /// Look up a raw usage field
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// All fields as sent by the server
    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    pub fn prompt_tokens(&self) -> Option<u64> {
        self.counter("prompt_tokens")
    }

    pub fn completion_tokens(&self) -> Option<u64> {
        self.counter("completion_tokens")
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.counter("total_tokens")
    }

    fn counter(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(serde_json::Value::as_u64)
    }
}

/// The fully reassembled response of one stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamResult {
    /// Concatenated text content (empty for tool-only turns)
    pub content: String,
    /// Tool calls ordered by slot index; `None` if the stream carried no tool-call deltas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Last finish reason reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Last usage snapshot reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamResult {
    /// Whether the turn requested any tool invocations
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    /// Render the assistant message to append to conversation history.
    ///
    /// `content` is `null` for a tool-only turn, matching what OpenAI-compatible
    /// servers expect back; `tool_calls` is omitted when absent.
    pub fn to_assistant_message(&self) -> serde_json::Value {
        let mut message = serde_json::Map::new();
        message.insert("role".to_string(), "assistant".into());

        let content = if self.content.is_empty() && self.has_tool_calls() {
            serde_json::Value::Null
        } else {
            self.content.clone().into()
        };
        message.insert("content".to_string(), content);

        if let Some(calls) = &self.tool_calls {
            let calls = calls.iter().map(ToolCall::to_json).collect();
            message.insert("tool_calls".to_string(), serde_json::Value::Array(calls));
        }

        serde_json::Value::Object(message)
    }
}

// ============================================================================
// Tests
// ============================================================================
