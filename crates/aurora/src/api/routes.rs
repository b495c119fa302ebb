//! API route definitions.

use axum::{Router, middleware, routing::get};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::session_gate;

use super::handlers;
use super::proxy;
use super::state::AppState;

/// Mount point of the forwarder.
pub const PROXY_PREFIX: &str = "/api/aurora";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Any other method under the prefix gets 405 from the method router.
    let proxy_routes = Router::new()
        .route(
            "/{*path}",
            get(proxy::forward_to_upstream)
                .post(proxy::forward_to_upstream)
                .put(proxy::forward_to_upstream)
                .delete(proxy::forward_to_upstream),
        )
        .with_state(state);

    let public_routes = Router::new().route("/api/health", get(handlers::health));

    Router::new()
        .merge(public_routes)
        .nest(PROXY_PREFIX, proxy_routes)
        .layer(middleware::from_fn_with_state(auth_state, session_gate))
        .layer(trace_layer)
}
