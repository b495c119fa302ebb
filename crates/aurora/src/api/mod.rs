//! HTTP API module.
//!
//! Serves the health endpoint and the same-origin proxy to the agent backend.

mod error;
pub mod handlers;
pub mod proxy;
mod routes;
mod state;

pub use error::ProxyError;
pub use routes::{PROXY_PREFIX, create_router};
pub use state::AppState;
