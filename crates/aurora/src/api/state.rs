//! Application state shared across handlers.

use std::sync::Arc;

use super::proxy::Forwarder;
use crate::auth::AuthState;
use crate::upstream::{Upstream, UpstreamConfig};

#[derive(Clone)]
pub struct AppState {
    /// Relays `/api/aurora/*` to the agent backend.
    pub forwarder: Forwarder,
    /// Session gate policy.
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        upstream_config: UpstreamConfig,
        upstream: Arc<dyn Upstream>,
        auth: AuthState,
    ) -> Self {
        Self {
            forwarder: Forwarder::new(Arc::new(upstream_config), upstream),
            auth,
        }
    }
}
