//! Upstream origin configuration.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the proxy forwards `/api/aurora/*` requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the agent backend (e.g. "https://aurora-backend.example.com").
    /// Checked on every request, not at startup.
    pub base_url: Option<String>,
    /// Seconds to wait for a TCP/TLS connection to the backend.
    pub connect_timeout_secs: u64,
    /// Accept a loopback base URL. Only meant for local development and tests.
    pub allow_loopback: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            connect_timeout_secs: 10,
            allow_loopback: false,
        }
    }
}

/// Reasons the configured base URL cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamConfigError {
    #[error(
        "Upstream base URL is not set. Set upstream.base_url in the config file or the AURORA__UPSTREAM__BASE_URL environment variable to the agent backend URL."
    )]
    Missing,

    #[error("Upstream base URL '{url}' is invalid: {reason}")]
    Invalid { url: String, reason: String },

    #[error(
        "Upstream base URL is set to a loopback address ({0}). In a deployed environment this points at the proxy host itself, not the agent backend; set it to the backend's public URL instead."
    )]
    Loopback(String),
}

impl UpstreamConfig {
    /// Create a config pointing at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate and parse the base URL.
    pub fn resolve_base(&self) -> Result<Url, UpstreamConfigError> {
        let raw = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(UpstreamConfigError::Missing)?;

        let url = Url::parse(raw).map_err(|e| UpstreamConfigError::Invalid {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(UpstreamConfigError::Invalid {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let host = url.host_str().ok_or_else(|| UpstreamConfigError::Invalid {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        })?;

        if !self.allow_loopback && is_loopback_host(host) {
            return Err(UpstreamConfigError::Loopback(raw.to_string()));
        }

        Ok(url)
    }

    /// Build the upstream target: base + "/" + tail + "?" + query.
    pub fn target_url(base: &Url, tail: &str, query: Option<&str>) -> String {
        let mut target = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            tail.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }
        target
    }
}

/// Literal loopback check; no DNS resolution is attempted.
fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost")
    {
        return true;
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    match bare.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => ip.is_loopback(),
        Ok(IpAddr::V6(ip)) => {
            ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
        Err(_) => false,
    }
}
