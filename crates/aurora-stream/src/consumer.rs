//! Streaming chat consumer.
//!
//! `ChatStream` drives one request/response exchange at a time against the
//! proxy: it posts the user's message, decodes the body incrementally and
//! appends each decoded fragment to the output buffer as soon as it arrives.
//! Rendering is left to whoever subscribes to the published snapshots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::decoder::Utf8Decoder;
use crate::error::{StreamError, StreamResult, error_message_from_body, reason_phrase};
use crate::state::{ChatSnapshot, ExchangeOutcome, StreamState};

/// Request body understood by the agent stream endpoints.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    msg: &'a str,
}

/// Why an exchange stopped before reaching end of stream.
enum Interrupt {
    Cancelled,
    Failed(StreamError),
}

#[derive(Debug, Default)]
struct Inner {
    state: StreamState,
    output: String,
    error: Option<String>,
    /// Present exactly while an exchange is streaming.
    cancel: Option<CancellationToken>,
    /// Incremented per exchange; appends from an older exchange are discarded.
    generation: u64,
}

impl Inner {
    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            state: self.state,
            output: self.output.clone(),
            error: self.error.clone(),
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    updates: watch::Sender<ChatSnapshot>,
}

/// Client-side controller for a streaming chat endpoint.
///
/// Cloning yields another handle to the same consumer, so one task can run
/// [`send`](ChatStream::send) while another calls [`stop`](ChatStream::stop).
#[derive(Clone)]
pub struct ChatStream {
    client: Client,
    endpoint: Url,
    shared: Arc<Shared>,
}

impl ChatStream {
    /// Create a consumer with its own cookie-aware HTTP client.
    pub fn new(endpoint: &str) -> StreamResult<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Self::with_client(client, endpoint)
    }

    /// Create a consumer that shares an existing client (and its cookie jar).
    ///
    /// The client should have a cookie store enabled so that session cookies
    /// set by the backend are sent back on later exchanges.
    pub fn with_client(client: Client, endpoint: &str) -> StreamResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| StreamError::InvalidUrl {
            url: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let (updates, _) = watch::channel(ChatSnapshot::default());

        Ok(Self {
            client,
            endpoint,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                updates,
            }),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Current state, output and error.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.lock().snapshot()
    }

    /// Receive a snapshot after every transition and every appended fragment.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn is_streaming(&self) -> bool {
        self.lock().state == StreamState::Streaming
    }

    /// Send a message and stream the reply into the output buffer.
    ///
    /// Returns [`ExchangeOutcome::Ignored`] without touching the network when
    /// the trimmed input is empty or an exchange is already streaming.
    /// Otherwise clears the previous output and error, then runs the request
    /// and read loop to completion, cancellation, or failure. Dropping the
    /// returned future mid-exchange has the same effect as [`stop`](Self::stop).
    pub async fn send(&self, input: &str) -> ExchangeOutcome {
        let message = input.trim();
        if message.is_empty() {
            return ExchangeOutcome::Ignored;
        }

        let (token, generation) = {
            let mut inner = self.lock();
            if inner.state == StreamState::Streaming {
                debug!("send ignored: exchange already streaming");
                return ExchangeOutcome::Ignored;
            }
            let token = CancellationToken::new();
            inner.state = StreamState::Streaming;
            inner.output.clear();
            inner.error = None;
            inner.cancel = Some(token.clone());
            inner.generation += 1;
            self.publish(&inner);
            (token, inner.generation)
        };

        let mut guard = ExchangeGuard {
            stream: self,
            token: token.clone(),
            generation,
            armed: true,
        };

        debug!("Sending message to {}", self.endpoint);
        let result = self.exchange(message, &token, generation).await;
        guard.armed = false;
        self.complete(generation, &token, result)
    }

    /// Cancel the in-flight exchange, if any.
    ///
    /// The consumer is `idle` when this returns, whatever the state of the
    /// underlying request. Bytes that arrive afterwards are discarded. Safe to
    /// call repeatedly or after the exchange has already finished.
    pub fn stop(&self) -> bool {
        let mut inner = self.lock();
        let Some(token) = inner.cancel.take() else {
            return false;
        };
        token.cancel();
        inner.state = StreamState::Idle;
        self.publish(&inner);
        info!("Exchange {} stopped by user", inner.generation);
        true
    }

    async fn exchange(
        &self,
        message: &str,
        token: &CancellationToken,
        generation: u64,
    ) -> Result<(), Interrupt> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .json(&ChatRequest { msg: message })
            .send();

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Interrupt::Cancelled),
            result = request => result.map_err(|e| Interrupt::Failed(e.into()))?,
        };

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let reason = reason_phrase(&response);
            let body = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Interrupt::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };
            return Err(Interrupt::Failed(StreamError::Status {
                status,
                message: error_message_from_body(status, reason.as_deref(), &body),
            }));
        }

        if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
            return Err(Interrupt::Failed(StreamError::EmptyBody(status)));
        }

        let mut body = response.bytes_stream();
        let mut decoder = Utf8Decoder::new();
        let mut chunks: usize = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Interrupt::Cancelled),
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    let text = decoder.decode(&chunk);
                    if !text.is_empty() && !self.append(generation, token, &text) {
                        return Err(Interrupt::Cancelled);
                    }
                }
                Some(Err(err)) => return Err(Interrupt::Failed(err.into())),
                None => {
                    let tail = decoder.finish();
                    if !tail.is_empty() && !self.append(generation, token, &tail) {
                        return Err(Interrupt::Cancelled);
                    }
                    debug!("Stream complete after {} chunk(s)", chunks);
                    return Ok(());
                }
            }
        }
    }

    /// Append decoded text if the exchange is still the live one.
    fn append(&self, generation: u64, token: &CancellationToken, text: &str) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || token.is_cancelled() {
            return false;
        }
        inner.output.push_str(text);
        self.publish(&inner);
        true
    }

    fn complete(
        &self,
        generation: u64,
        token: &CancellationToken,
        result: Result<(), Interrupt>,
    ) -> ExchangeOutcome {
        let mut inner = self.lock();
        if inner.generation != generation {
            // A newer exchange owns the state now.
            return ExchangeOutcome::Cancelled;
        }

        let outcome = match result {
            Ok(()) => ExchangeOutcome::Completed,
            Err(Interrupt::Cancelled) => ExchangeOutcome::Cancelled,
            Err(Interrupt::Failed(_)) if token.is_cancelled() => ExchangeOutcome::Cancelled,
            Err(Interrupt::Failed(err)) => {
                let message = err.user_message();
                warn!("Exchange {} failed: {}", generation, message);
                inner.error = Some(message.clone());
                ExchangeOutcome::Failed(message)
            }
        };

        inner.state = match outcome {
            ExchangeOutcome::Failed(_) => StreamState::Error,
            _ => StreamState::Idle,
        };
        inner.cancel = None;
        self.publish(&inner);
        outcome
    }

    fn publish(&self, inner: &Inner) {
        self.shared.updates.send_replace(inner.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the consumer to `idle` when a `send` future is dropped mid-exchange.
struct ExchangeGuard<'a> {
    stream: &'a ChatStream,
    token: CancellationToken,
    generation: u64,
    armed: bool,
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.token.cancel();

        let mut inner = self.stream.lock();
        if inner.generation != self.generation || inner.cancel.is_none() {
            return;
        }
        inner.cancel = None;
        inner.state = StreamState::Idle;
        self.stream.publish(&inner);
        info!("Exchange {} abandoned by caller", self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_consumer_is_idle() {
        let chat = ChatStream::new("http://example.test/api/aurora/agents/welcome/stream")
            .expect("valid endpoint");
        let snapshot = chat.snapshot();
        assert_eq!(snapshot.state, StreamState::Idle);
        assert_eq!(snapshot.output, "");
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let err = ChatStream::new("not a url").err().expect("should fail");
        assert!(matches!(err, StreamError::InvalidUrl { .. }));
    }

    #[test]
    fn test_stop_without_exchange_is_noop() {
        let chat = ChatStream::new("http://example.test/stream").expect("valid endpoint");
        assert!(!chat.stop());
        assert!(!chat.stop());
        assert_eq!(chat.snapshot().state, StreamState::Idle);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let chat = ChatStream::new("http://example.test/stream").expect("valid endpoint");
        assert_eq!(chat.send("   \n").await, ExchangeOutcome::Ignored);
        assert_eq!(chat.snapshot().state, StreamState::Idle);
    }
}
