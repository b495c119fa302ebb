//! Session gate middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::COOKIE},
    middleware::Next,
    response::Response,
};
use log::debug;

use super::{AuthConfig, AuthError, AuthPolicy};

/// Find a cookie value by name in a `Cookie` header.
pub fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Authentication state shared with the middleware.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    config: Arc<AuthConfig>,
}

impl AuthState {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn policy(&self) -> AuthPolicy {
        self.config.policy
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Check a request against the policy.
    ///
    /// Only presence of the cookie is checked; the upstream validates it.
    pub fn check(&self, path: &str, cookie_header: Option<&str>) -> Result<(), AuthError> {
        if self.config.policy == AuthPolicy::Disabled || !self.config.is_protected(path) {
            return Ok(());
        }

        let has_session = cookie_header
            .and_then(|header| token_from_cookie_header(header, &self.config.cookie_name))
            .is_some_and(|value| !value.is_empty());

        if has_session {
            Ok(())
        } else {
            debug!("Rejecting {} without session cookie", path);
            Err(AuthError::MissingSession(self.config.cookie_name.clone()))
        }
    }
}

/// Session gate.
///
/// Runs on every route. The cookie header is left in place so it still
/// reaches the upstream.
pub async fn session_gate(
    State(auth): State<AuthState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    // Multiple Cookie headers are joined the same way HTTP/2 splits them.
    let cookies = req
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let cookie_header = (!cookies.is_empty()).then_some(cookies.as_str());

    auth.check(req.uri().path(), cookie_header)?;

    Ok(next.run(req).await)
}
