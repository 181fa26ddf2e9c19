//! Line-oriented event reader.

use crate::error::{Result, StreamError};
use futures_util::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Prefix of a payload-carrying line
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks the normal end of the stream
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Open,
    Sentinel,
    Eof,
    Cancelled,
}

/// Reads event payloads from a buffered byte stream.
///
/// Lines end at `\n`, `\r\n` or a bare `\r`. The reader performs no JSON
/// validation; it only frames payloads. Once the sentinel or the end of the
/// transport is reached it stays finished, even if more bytes are pending.
/// After a cancellation every further call fails with
/// [`StreamError::Cancelled`].
#[derive(Debug)]
pub struct EventReader<R> {
    reader: R,
    line: Vec<u8>,
    // A line ended in `\r` at the end of a buffer; a leading `\n` in the
    // next buffer belongs to it.
    pending_cr: bool,
    state: ReadState,
}

impl<R> EventReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            pending_cr: false,
            state: ReadState::Open,
        }
    }

    /// Read the next payload.
    ///
    /// Returns `Ok(None)` at `[DONE]` or when the transport is exhausted.
    /// Cancellation is checked before every line read and also interrupts a
    /// read that is waiting for bytes.
    pub async fn next_payload(&mut self, cancel: &CancellationToken) -> Result<Option<String>> {
        loop {
            match self.state {
                ReadState::Open => {}
                ReadState::Cancelled => return Err(StreamError::Cancelled),
                ReadState::Sentinel | ReadState::Eof => return Ok(None),
            }

            if cancel.is_cancelled() {
                self.state = ReadState::Cancelled;
                return Err(StreamError::Cancelled);
            }

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                line = self.read_line() => Some(line?),
            };

            let Some(line) = read else {
                self.state = ReadState::Cancelled;
                return Err(StreamError::Cancelled);
            };

            let Some(line) = line else {
                debug!("transport closed before [DONE]");
                self.state = ReadState::Eof;
                return Ok(None);
            };

            if line.is_empty() {
                continue;
            }

            let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                trace!(line = line.as_str(), "skipping non-data line");
                continue;
            };

            let payload = data.trim();
            if payload == DONE_SENTINEL {
                debug!("received [DONE]");
                self.state = ReadState::Sentinel;
                return Ok(None);
            }

            return Ok(Some(payload.to_string()));
        }
    }

    /// Read one line without its terminator; `None` at end of transport.
    ///
    /// Bytes are only consumed from the reader once they are copied into
    /// `self.line`, so an interrupted call loses nothing.
    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                if self.line.is_empty() {
                    return Ok(None);
                }
                return self.take_line().map(Some);
            }

            let mut start = 0;
            if std::mem::take(&mut self.pending_cr) && buf[0] == b'\n' {
                start = 1;
            }

            match buf[start..].iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    let end = start + pos;
                    self.line.extend_from_slice(&buf[start..end]);
                    let mut used = end + 1;
                    if buf[end] == b'\r' {
                        match buf.get(used) {
                            Some(b'\n') => used += 1,
                            Some(_) => {}
                            None => self.pending_cr = true,
                        }
                    }
                    self.reader.consume(used);
                    return self.take_line().map(Some);
                }
                None => {
                    self.line.extend_from_slice(&buf[start..]);
                    let used = buf.len();
                    self.reader.consume(used);
                }
            }
        }
    }

    fn take_line(&mut self) -> std::io::Result<String> {
        String::from_utf8(std::mem::take(&mut self.line))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Whether the stream ended with the `[DONE]` sentinel
    pub fn finished_with_sentinel(&self) -> bool {
        self.state == ReadState::Sentinel
    }

    /// Whether no further payloads will be produced
    pub fn is_finished(&self) -> bool {
        self.state != ReadState::Open
    }

    /// Turn the reader into a stream of payloads.
    ///
    /// The stream ends after the sentinel, at end of transport, or right
    /// after yielding the first error.
    pub fn into_stream(self, cancel: CancellationToken) -> impl Stream<Item = Result<String>> {
        futures_util::stream::unfold(Some((self, cancel)), |state| async move {
            let (mut reader, cancel) = state?;
            match reader.next_payload(&cancel).await {
                Ok(Some(payload)) => Some((Ok(payload), Some((reader, cancel)))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
