//! Authentication module.
//!
//! A single explicit session policy in front of the proxy. With the default
//! `disabled` policy every route is open; `require_session` rejects protected
//! paths that arrive without the backend's session cookie.

mod config;
mod error;
mod middleware;

pub use config::{AuthConfig, AuthPolicy};
pub use error::AuthError;
pub use middleware::{AuthState, session_gate, token_from_cookie_header};
