//! HTTP client for the agent backend.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode};
use hyper::ext::ReasonPhrase;
use log::debug;
use reqwest::redirect::Policy;
use thiserror::Error;

use super::UpstreamConfig;

/// A request ready to be sent to the backend.
pub struct UpstreamRequest {
    pub method: Method,
    /// Fully built target URL (base + path tail + query).
    pub url: String,
    pub headers: HeaderMap,
    /// `None` for GET/HEAD. Streamed, never buffered.
    pub body: Option<Body>,
}

/// The backend's response with an unread, streaming body.
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Reason phrase, when the backend sent a non-canonical one.
    pub reason: Option<ReasonPhrase>,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Transport-level failures talking to the backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Agent backend is unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Agent backend at {url} timed out: {message}")]
    TimedOut { url: String, message: String },

    #[error("Request to agent backend at {url} failed: {message}")]
    Failed { url: String, message: String },
}

impl UpstreamError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        let message = err.to_string();
        if err.is_timeout() {
            Self::TimedOut { url, message }
        } else if err.is_connect() {
            Self::Unreachable { url, message }
        } else {
            Self::Failed { url, message }
        }
    }
}

/// Sends forwarded requests to the backend.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

/// reqwest-backed [`Upstream`].
///
/// No response cache sits in front of the client, redirects are relayed
/// rather than followed, and bodies are streamed in both directions.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let UpstreamRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, &url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, e))?;

        let status = response.status();
        debug!("Upstream {} responded {}", url, status);

        let reason = response.extensions().get::<ReasonPhrase>().cloned();
        let headers = response.headers().clone();
        let body = Body::from_stream(response.bytes_stream());

        Ok(UpstreamResponse {
            status,
            reason,
            headers,
            body,
        })
    }
}
