//! Delta merger.

use super::sink::StreamSink;
use super::types::{ChunkRecord, ToolCallDelta};
use crate::config::DecoderConfig;
use crate::error::Result;
use crate::{StreamResult, ToolCall, Usage};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// A tool call still being streamed.
///
/// `id` and `name` keep the first value received; `arguments` grows by
/// appending every fragment in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallSlot {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

impl ToolCallSlot {
    fn merge(&mut self, delta: ToolCallDelta) {
        if self.id.is_none() {
            self.id = delta.id;
        }
        if let Some(function) = delta.function {
            if self.name.is_none() {
                self.name = function.name;
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }

    fn finalize(self, config: &DecoderConfig) -> ToolCall {
        let id = self.id.unwrap_or_else(|| config.generate_tool_call_id());
        ToolCall::function(id, self.name.unwrap_or_default(), self.arguments)
    }
}

/// Folds the records of one stream into a [`StreamResult`].
///
/// Tool calls are kept in a `BTreeMap` so that sparse or out-of-order
/// indices finalize in ascending index order. A merger belongs to exactly
/// one stream and is consumed by [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct DeltaMerger {
    config: DecoderConfig,
    content: String,
    tool_calls: BTreeMap<i64, ToolCallSlot>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    records: usize,
}

impl DeltaMerger {
    /// Create a merger with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a merger with a custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Parse one event payload and merge it.
    ///
    /// Invalid JSON is a fatal [`StreamError::Decode`](crate::StreamError::Decode);
    /// state merged from earlier payloads is left as it was.
    pub fn push_payload<K>(&mut self, payload: &str, sink: &mut K) -> Result<()>
    where
        K: StreamSink + ?Sized,
    {
        trace!(payload, "stream record");
        let record = ChunkRecord::parse(payload)?;
        self.push_record(record, sink);
        Ok(())
    }

    /// Merge an already parsed record
    pub fn push_record<K>(&mut self, mut record: ChunkRecord, sink: &mut K)
    where
        K: StreamSink + ?Sized,
    {
        self.records += 1;

        if let Some(usage) = record.usage.take() {
            sink.on_usage(self.usage.insert(usage));
        }

        let Some(choice) = record.take_first_choice() else {
            return;
        };

        if choice.finish_reason.is_some() {
            self.finish_reason = choice.finish_reason;
        }

        let Some(delta) = choice.delta else {
            return;
        };

        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            self.content.push_str(&content);
            sink.on_token(&content);
        }

        for tool_call in delta.tool_calls.into_iter().flatten().flatten() {
            let index = match tool_call.index {
                Some(index) => index,
                None => {
                    warn!("tool call delta without a usable index, merging into slot 0");
                    0
                }
            };
            trace!(index, "tool call fragment");
            self.tool_calls.entry(index).or_default().merge(tool_call);
        }
    }

    /// Text accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Tool-call slots accumulated so far, in index order
    pub fn slots(&self) -> impl Iterator<Item = (i64, &ToolCallSlot)> {
        self.tool_calls.iter().map(|(index, slot)| (*index, slot))
    }

    /// Finalize into the result.
    ///
    /// `tool_calls` is `None` when no slot was ever created.
    pub fn finish(self) -> StreamResult {
        debug!(
            records = self.records,
            content_len = self.content.len(),
            tool_calls = self.tool_calls.len(),
            finish_reason = ?self.finish_reason,
            "stream merged"
        );

        let config = self.config;
        let tool_calls = if self.tool_calls.is_empty() {
            None
        } else {
            Some(
                self.tool_calls
                    .into_values()
                    .map(|slot| slot.finalize(&config))
                    .collect(),
            )
        };

        StreamResult {
            content: self.content,
            tool_calls,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }

    /// Accumulate an entire stream of payloads into a result
    ///
    /// This is a convenience method that merges every payload of the stream
    /// in order and finalizes once the stream ends.
    pub async fn accumulate_stream<S, K>(self, stream: S, sink: &mut K) -> Result<StreamResult>
    where
        S: futures_util::Stream<Item = Result<String>>,
        K: StreamSink + ?Sized,
    {
        use futures_util::StreamExt;

        let mut merger = self;
        futures_util::pin_mut!(stream);

        while let Some(payload) = stream.next().await {
            merger.push_payload(&payload?, sink)?;
        }

        Ok(merger.finish())
    }
}
