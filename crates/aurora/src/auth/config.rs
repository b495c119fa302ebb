//! Session gate configuration.

use serde::{Deserialize, Serialize};

/// Which requests must carry a session cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Every route is open. Session handling is left to the upstream.
    #[default]
    Disabled,
    /// Requests under `protected_paths` need a non-empty session cookie.
    RequireSession,
}

/// Authentication configuration (`[auth]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub policy: AuthPolicy,

    /// Name of the session cookie set by the backend.
    pub cookie_name: String,

    /// Path prefixes gated when the policy is `require_session`.
    pub protected_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            policy: AuthPolicy::Disabled,
            cookie_name: "auth_token".to_string(),
            protected_paths: vec!["/api/aurora".to_string()],
        }
    }
}

impl AuthConfig {
    pub fn require_session() -> Self {
        Self {
            policy: AuthPolicy::RequireSession,
            ..Self::default()
        }
    }

    /// Whether `path` falls under one of the protected prefixes.
    ///
    /// Matches on segment boundaries, so `/api/aurora` covers
    /// `/api/aurora/x` but not `/api/aurora-admin`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_paths.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }
}
