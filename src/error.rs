//! Error types for stream decoding.

use thiserror::Error;

/// Fatal conditions that abort a decode.
///
/// Shape mismatches inside otherwise valid JSON are not errors; the offending
/// field is treated as absent.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The caller cancelled the decode
    #[error("stream decode cancelled")]
    Cancelled,

    /// The underlying byte stream failed (including invalid UTF-8)
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// An event payload was not valid JSON
    #[error("malformed event payload: {source}")]
    Decode {
        /// The offending payload, as received
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StreamError {
    /// Whether this error is a caller-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error came from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether this error is a protocol violation (bad JSON payload)
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinguishable() {
        let cancelled = StreamError::Cancelled;
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_transport());

        let transport = StreamError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer reset",
        ));
        assert!(transport.is_transport());
        assert!(!transport.is_cancelled());
        assert_eq!(transport.to_string(), "transport error: peer reset");

        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let decode = StreamError::Decode {
            payload: "{oops".to_string(),
            source,
        };
        assert!(decode.is_decode());
        assert!(decode.to_string().starts_with("malformed event payload"));
    }
}
