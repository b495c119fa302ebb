//! Aurora server library.
//!
//! Serves the browser-facing `/api/aurora/*` surface by relaying it, streamed,
//! to the agent backend, with an optional session gate in front.

pub mod api;
pub mod auth;
pub mod config;
pub mod upstream;

pub use api::{AppState, ProxyError, create_router};
pub use config::AppConfig;
