//! Live progress callbacks.

use crate::Usage;

/// Receives progress while a stream is being decoded.
///
/// Both methods are called synchronously on the decoding task, in arrival
/// order. A sink that blocks stalls the decode.
pub trait StreamSink {
    /// A new text fragment, exactly as received in one record
    fn on_token(&mut self, _token: &str) {}

    /// A usage snapshot, each time one is received
    fn on_usage(&mut self, _usage: &Usage) {}
}

/// Discards all progress
impl StreamSink for () {}

type TokenFn<'a> = Box<dyn FnMut(&str) + Send + 'a>;
type UsageFn<'a> = Box<dyn FnMut(&Usage) + Send + 'a>;

/// A [`StreamSink`] built from optional closures
#[derive(Default)]
pub struct Callbacks<'a> {
    on_token: Option<TokenFn<'a>>,
    on_usage: Option<UsageFn<'a>>,
}

impl<'a> Callbacks<'a> {
    /// Create a sink with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token callback
    pub fn with_tokens(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_token = Some(Box::new(f));
        self
    }

    /// Set the usage callback
    pub fn with_usage(mut self, f: impl FnMut(&Usage) + Send + 'a) -> Self {
        self.on_usage = Some(Box::new(f));
        self
    }
}

impl StreamSink for Callbacks<'_> {
    fn on_token(&mut self, token: &str) {
        if let Some(f) = self.on_token.as_mut() {
            f(token);
        }
    }

    fn on_usage(&mut self, usage: &Usage) {
        if let Some(f) = self.on_usage.as_mut() {
            f(usage);
        }
    }
}

impl std::fmt::Debug for Callbacks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_token", &self.on_token.is_some())
            .field("on_usage", &self.on_usage.is_some())
            .finish()
    }
}
