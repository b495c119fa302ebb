//! Forwarder errors.
//!
//! The chat consumer shows the response body text as its error message, so
//! these render as plain text rather than JSON.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use log::{error, warn};
use thiserror::Error;

use crate::upstream::{UpstreamConfigError, UpstreamError};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Config(#[from] UpstreamConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(UpstreamError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Config(_) => error!("Proxy misconfigured: {}", self),
            Self::Upstream(_) => warn!("Proxy upstream error: {}", self),
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
