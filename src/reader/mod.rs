//! Server-sent event reading.
//!
//! Only the `data:` field of the event-stream format is used: each
//! `data: <json>` line carries one record, blank lines separate records, and
//! `data: [DONE]` ends the stream.

mod event_reader;

pub use event_reader::{EventReader, DATA_PREFIX, DONE_SENTINEL};

use bytes::Bytes;
use futures_util::Stream;
use tokio_util::io::StreamReader;

/// Adapt a stream of body chunks into a buffered reader for [`EventReader`].
///
/// HTTP clients hand out response bodies as chunk streams; map their error
/// type into `std::io::Error` first. The returned reader is `Unpin` when the
/// stream is, so pin non-`Unpin` streams with `Box::pin` before passing them in.
pub fn byte_stream_reader<S>(stream: S) -> StreamReader<S, Bytes>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    StreamReader::new(stream)
}

#[cfg(test)]
mod tests;
