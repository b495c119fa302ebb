//! Agent backend (upstream) configuration and client.

mod client;
mod config;

pub use client::{HttpUpstream, Upstream, UpstreamError, UpstreamRequest, UpstreamResponse};
pub use config::{UpstreamConfig, UpstreamConfigError};
