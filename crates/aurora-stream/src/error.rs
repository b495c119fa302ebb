//! Stream client error types.

use hyper::ext::ReasonPhrase;
use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Result type for stream client operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Fallback shown when an error carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Errors that can end a streaming exchange or a JSON call.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Transport failure while connecting or reading the body.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The server answered successfully but with nothing to read.
    #[error("Response had no readable body ({0})")]
    EmptyBody(StatusCode),

    /// A success response could not be parsed.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The endpoint or base URL is not a valid URL.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl StreamError {
    /// Human-readable message suitable for display next to the chat output.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Status code reported by the server, when the error came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::EmptyBody(status) => Some(*status),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// Reason phrase the server sent, when it differs from the canonical one.
pub fn reason_phrase(response: &Response) -> Option<String> {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
}

/// Derive a readable message from an error response.
///
/// Prefers a JSON `detail` or `error` string (FastAPI and axum error shapes),
/// then the raw body text, then the status line. The status line uses the
/// server's own reason phrase when one was sent.
pub fn error_message_from_body(status: StatusCode, reason: Option<&str>, body: &str) -> String {
    let trimmed = body.trim();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed)
    {
        for key in ["detail", "error", "message"] {
            if let Some(serde_json::Value::String(text)) = map.get(key)
                && !text.trim().is_empty()
            {
                return text.trim().to_string();
            }
        }
    }

    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    format!(
        "Request failed: {} {}",
        status.as_u16(),
        reason
            .filter(|r| !r.trim().is_empty())
            .or(status.canonical_reason())
            .unwrap_or("")
    )
    .trim_end()
    .to_string()
}
