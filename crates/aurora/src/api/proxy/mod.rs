//! HTTP proxy to the agent backend.

mod forward;
pub mod headers;

pub use forward::{Forwarder, forward_to_upstream};
