//! Same-origin forwarder for the agent backend.
//!
//! Everything under `/api/aurora/` is relayed to the configured upstream with
//! the same method, path tail, query and body. Response bodies are streamed
//! through as they arrive so token-by-token output reaches the browser
//! without buffering.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::Response,
};
use log::debug;

use super::super::error::ProxyError;
use super::super::state::AppState;
use super::headers::{relayed_response_headers, upstream_request_headers};
use crate::upstream::{Upstream, UpstreamConfig, UpstreamRequest};

// ============================================================================
// Forwarder
// ============================================================================

/// Relays requests to the upstream origin.
///
/// Holds no per-request state; cloning shares the config and client.
#[derive(Clone)]
pub struct Forwarder {
    config: Arc<UpstreamConfig>,
    upstream: Arc<dyn Upstream>,
}

impl Forwarder {
    pub fn new(config: Arc<UpstreamConfig>, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Forward a request whose URI has already been stripped of the proxy
    /// prefix.
    ///
    /// The base URL is validated before anything touches the network, so a
    /// missing or loopback target fails without an upstream call.
    pub async fn forward(&self, req: Request<Body>) -> Result<Response, ProxyError> {
        let base = self.config.resolve_base()?;

        let (parts, body) = req.into_parts();
        // Raw path keeps the original percent-encoding.
        let tail = parts.uri.path().trim_start_matches('/');
        let url = UpstreamConfig::target_url(&base, tail, parts.uri.query());

        let body = if matches!(parts.method, Method::GET | Method::HEAD) {
            None
        } else {
            Some(body)
        };

        debug!("Forwarding {} {}", parts.method, url);

        let upstream = self
            .upstream
            .send(UpstreamRequest {
                method: parts.method,
                url,
                headers: upstream_request_headers(&parts.headers),
                body,
            })
            .await?;

        let mut response = Response::new(upstream.body);
        *response.status_mut() = upstream.status;
        *response.headers_mut() = relayed_response_headers(&upstream.headers);
        if let Some(reason) = upstream.reason {
            response.extensions_mut().insert(reason);
        }

        Ok(response)
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Proxy any supported method under `/api/aurora/{*path}` to the upstream.
pub async fn forward_to_upstream(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response, ProxyError> {
    state.forwarder.forward(req).await
}
