//! Header filtering for the forwarder.

use axum::http::header::{
    CONNECTION, CONTENT_LENGTH, HOST, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName};

/// Headers that only apply to a single transport leg.
const HOP_BY_HOP: &[&str] = &["keep-alive", "proxy-connection"];

/// Response headers describing the upstream framing of the body.
const RESPONSE_FRAMING: [HeaderName; 2] = [CONTENT_LENGTH, TRANSFER_ENCODING];

/// Copy inbound headers for the upstream request.
///
/// Drops `host`, `content-length`, the hop-by-hop set and any header listed
/// in the inbound `Connection` value.
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<HeaderName> = inbound
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_request_hop_header(name) || connection_listed.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Copy upstream response headers for the browser.
///
/// Only the framing headers are removed; the outer transport recomputes them.
/// Everything else, repeated `set-cookie` included, is kept in order.
pub fn relayed_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if RESPONSE_FRAMING.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn is_request_hop_header(name: &HeaderName) -> bool {
    *name == HOST
        || *name == CONNECTION
        || *name == CONTENT_LENGTH
        || *name == TE
        || *name == TRAILER
        || *name == TRANSFER_ENCODING
        || *name == UPGRADE
        || HOP_BY_HOP.contains(&name.as_str())
}
