//! Streaming response accumulation for chat-completion deltas.
//!
//! This module folds the JSON records of one event stream into a
//! [`StreamResult`](crate::StreamResult): text deltas are concatenated, tool-call
//! deltas are merged into slots keyed by their positional index, and the last
//! finish reason and usage snapshot win.

mod accumulator;
mod sink;
mod types;

pub use accumulator::{DeltaMerger, ToolCallSlot};
pub use sink::{Callbacks, StreamSink};
pub use types::{ChoiceRecord, ChunkRecord, DeltaRecord, FunctionDelta, ToolCallDelta};
