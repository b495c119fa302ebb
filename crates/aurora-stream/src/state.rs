//! Observable state of a chat stream.

use std::fmt;

use serde::Serialize;

/// Lifecycle of a single consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// No request in flight.
    #[default]
    Idle,
    /// A request is in flight and output is being appended.
    Streaming,
    /// The last exchange failed; `ChatSnapshot::error` holds the message.
    Error,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a consumer, published on every transition and append.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    pub state: StreamState,
    /// Text received so far in the current (or last) exchange.
    pub output: String,
    pub error: Option<String>,
}

impl ChatSnapshot {
    pub fn is_streaming(&self) -> bool {
        self.state == StreamState::Streaming
    }
}

/// How a call to `ChatStream::send` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The body was read to the end.
    Completed,
    /// `stop` was called before the body ended.
    Cancelled,
    /// The exchange failed; the message is also stored in the snapshot.
    Failed(String),
    /// Empty input, or another exchange was already streaming. No request was made.
    Ignored,
}
