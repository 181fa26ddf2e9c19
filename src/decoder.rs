//! Decode entry points: event reader into delta merger.

use crate::config::DecoderConfig;
use crate::error::Result;
use crate::reader::EventReader;
use crate::streaming::{DeltaMerger, StreamSink};
use crate::StreamResult;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Decodes one streamed chat-completion response.
///
/// Each call owns its own reader and merger, so a single decoder can serve
/// any number of concurrent streams.
#[derive(Debug, Clone, Default)]
pub struct StreamDecoder {
    config: DecoderConfig,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Read and merge the whole stream.
    ///
    /// Records are processed strictly in arrival order; `sink` is invoked
    /// in-line as tokens and usage arrive. On any error no result is
    /// produced, though tokens already delivered stay delivered.
    pub async fn decode<R, K>(
        &self,
        reader: R,
        cancel: &CancellationToken,
        sink: &mut K,
    ) -> Result<StreamResult>
    where
        R: AsyncBufRead + Unpin,
        K: StreamSink + ?Sized,
    {
        let mut events = EventReader::new(reader);
        let mut merger = DeltaMerger::with_config(self.config.clone());

        while let Some(payload) = events.next_payload(cancel).await? {
            merger.push_payload(&payload, sink)?;
        }

        debug!(
            sentinel = events.finished_with_sentinel(),
            "event stream complete"
        );
        Ok(merger.finish())
    }
}

/// Decode a stream with the default configuration
pub async fn decode_stream<R, K>(
    reader: R,
    cancel: &CancellationToken,
    sink: &mut K,
) -> Result<StreamResult>
where
    R: AsyncBufRead + Unpin,
    K: StreamSink + ?Sized,
{
    StreamDecoder::new().decode(reader, cancel, sink).await
}
