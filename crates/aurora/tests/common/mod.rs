//! Test utilities and common setup.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aurora::api::{AppState, create_router};
use aurora::auth::{AuthConfig, AuthState};
use aurora::upstream::{Upstream, UpstreamConfig, UpstreamError, UpstreamRequest, UpstreamResponse};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use hyper::ext::ReasonPhrase;
use tokio::net::TcpListener;

pub const BACKEND_URL: &str = "https://aurora-backend.example.com";

/// What the fake upstream saw.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Canned reply from the fake upstream.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond {
        status: StatusCode,
        reason: Option<&'static str>,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    },
    Unreachable,
    TimedOut,
}

impl Reply {
    pub fn ok(body: &'static str) -> Self {
        Self::Respond {
            status: StatusCode::OK,
            reason: None,
            headers: vec![("content-type", "text/plain; charset=utf-8")],
            body,
        }
    }

    pub fn status(status: StatusCode, body: &'static str) -> Self {
        Self::Respond {
            status,
            reason: None,
            headers: vec![("content-type", "text/plain; charset=utf-8")],
            body,
        }
    }
}

/// Upstream that records requests and counts network calls.
#[derive(Clone)]
pub struct RecordingUpstream {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<RecordedRequest>>>,
    reply: Reply,
}

impl RecordingUpstream {
    pub fn new(reply: Reply) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(Mutex::new(None)),
            reply,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.last
            .lock()
            .unwrap()
            .clone()
            .expect("upstream was never called")
    }
}

#[async_trait]
impl Upstream for RecordingUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let body = match request.body {
            Some(body) => Some(axum::body::to_bytes(body, usize::MAX).await.unwrap()),
            None => None,
        };
        let url = request.url.clone();
        *self.last.lock().unwrap() = Some(RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
        });

        match &self.reply {
            Reply::Respond {
                status,
                reason,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for &(name, value) in headers {
                    map.append(
                        HeaderName::from_static(name),
                        HeaderValue::from_static(value),
                    );
                }
                Ok(UpstreamResponse {
                    status: *status,
                    reason: reason.map(|r| ReasonPhrase::from_static(r.as_bytes())),
                    headers: map,
                    body: Body::from(*body),
                })
            }
            Reply::Unreachable => Err(UpstreamError::Unreachable {
                url,
                message: "connection refused".to_string(),
            }),
            Reply::TimedOut => Err(UpstreamError::TimedOut {
                url,
                message: "operation timed out".to_string(),
            }),
        }
    }
}

/// Router wired to a fake upstream.
pub fn test_app(config: UpstreamConfig, upstream: RecordingUpstream, auth: AuthConfig) -> Router {
    let state = AppState::new(config, Arc::new(upstream), AuthState::new(auth));
    create_router(state)
}

/// Router pointing at [`BACKEND_URL`] with the session gate disabled.
pub fn open_app(upstream: RecordingUpstream) -> Router {
    test_app(
        UpstreamConfig::with_base_url(BACKEND_URL),
        upstream,
        AuthConfig::default(),
    )
}

/// Serve `app` on an ephemeral loopback port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
