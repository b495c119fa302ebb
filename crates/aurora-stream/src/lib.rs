//! Aurora streaming chat client.
//!
//! Consumes the token-by-token responses relayed by the Aurora proxy: an
//! incremental UTF-8 decoder, a cancellable single-exchange chat consumer, the
//! agent catalog and a small JSON helper for non-streaming calls.

pub mod agents;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod state;

pub use agents::{AgentKind, PROXY_PREFIX};
pub use consumer::ChatStream;
pub use decoder::Utf8Decoder;
pub use error::{GENERIC_ERROR_MESSAGE, StreamError, StreamResult};
pub use fetch::ApiClient;
pub use state::{ChatSnapshot, ExchangeOutcome, StreamState};
