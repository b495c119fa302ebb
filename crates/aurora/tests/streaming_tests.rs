//! End-to-end streaming through a real proxy server and a real backend.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aurora::api::{AppState, create_router};
use aurora::auth::{AuthConfig, AuthState};
use aurora::upstream::{HttpUpstream, UpstreamConfig};
use aurora_stream::{AgentKind, ChatSnapshot, ChatStream, ExchangeOutcome, StreamState};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::watch;

mod common;
use common::spawn_server;

const CHUNK_DELAY: Duration = Duration::from_millis(50);

#[derive(Clone, Default)]
struct Backend {
    hits: Arc<AtomicUsize>,
    with_session: Arc<AtomicUsize>,
}

fn paced_body(chunks: Vec<(Duration, &'static [u8])>) -> Body {
    let stream = futures::stream::iter(chunks).then(|(delay, chunk)| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Infallible>(Bytes::from_static(chunk))
    });
    Body::from_stream(stream)
}

async fn welcome(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(req): Json<Value>,
) -> Response {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    assert_eq!(req["msg"], "hello there");

    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("session=abc"));
    if has_session {
        backend.with_session.fetch_add(1, Ordering::SeqCst);
    }

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::SET_COOKIE, "session=abc; Path=/"),
        ],
        paced_body(vec![
            (Duration::ZERO, b"Hel"),
            (CHUNK_DELAY, b"lo, "),
            (CHUNK_DELAY, b"world!"),
        ]),
    )
        .into_response()
}

async fn progress(State(backend): State<Backend>) -> Response {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, "agent unavailable").into_response()
}

async fn skillnav() -> Response {
    // "é" (C3 A9) split across chunks.
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        paced_body(vec![
            (Duration::ZERO, b"caf\xC3"),
            (Duration::from_millis(200), b"\xA9 plan"),
        ]),
    )
        .into_response()
}

/// Backend on loopback plus a proxy pointed at it; returns the proxy address.
async fn spawn_stack(backend: Backend) -> SocketAddr {
    let backend_app = Router::new()
        .route("/agents/welcome/stream", post(welcome))
        .route("/agents/progress/stream", post(progress))
        .route("/agents/skillnav/stream", post(skillnav))
        .with_state(backend);
    let backend_addr = spawn_server(backend_app).await;

    let mut config = UpstreamConfig::with_base_url(format!("http://{backend_addr}"));
    config.allow_loopback = true;
    let upstream = HttpUpstream::new(&config).unwrap();
    let state = AppState::new(
        config,
        Arc::new(upstream),
        AuthState::new(AuthConfig::default()),
    );
    spawn_server(create_router(state)).await
}

fn chat_for(agent: AgentKind, proxy: SocketAddr) -> ChatStream {
    ChatStream::new(&agent.stream_url(&format!("http://{proxy}"))).unwrap()
}

fn record_outputs(mut rx: watch::Receiver<ChatSnapshot>) -> tokio::task::JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut seen = vec![rx.borrow_and_update().output.clone()];
        let mut saw_streaming = false;
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if seen.last() != Some(&snapshot.output) {
                seen.push(snapshot.output.clone());
            }
            if snapshot.is_streaming() {
                saw_streaming = true;
            } else if saw_streaming {
                break;
            }
        }
        seen
    })
}

#[tokio::test]
async fn test_chunks_stream_through_proxy_in_order() {
    let backend = Backend::default();
    let proxy = spawn_stack(backend.clone()).await;
    let chat = chat_for(AgentKind::Welcome, proxy);

    let recorder = record_outputs(chat.subscribe());
    let outcome = chat.send("hello there").await;
    assert_eq!(outcome, ExchangeOutcome::Completed);

    let seen = recorder.await.unwrap();
    assert_eq!(seen, vec!["", "Hel", "Hello, ", "Hello, world!"]);
    assert_eq!(chat.snapshot().state, StreamState::Idle);
    assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_cookie_round_trips_through_proxy() {
    let backend = Backend::default();
    let proxy = spawn_stack(backend.clone()).await;
    let chat = chat_for(AgentKind::Welcome, proxy);

    assert_eq!(chat.send("hello there").await, ExchangeOutcome::Completed);
    assert_eq!(chat.send("hello there").await, ExchangeOutcome::Completed);

    assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
    assert_eq!(backend.with_session.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_error_reaches_consumer() {
    let backend = Backend::default();
    let proxy = spawn_stack(backend.clone()).await;
    let chat = chat_for(AgentKind::Progress, proxy);

    match chat.send("how am I doing?").await {
        ExchangeOutcome::Failed(message) => assert!(message.contains("agent unavailable")),
        other => panic!("expected failure, got {other:?}"),
    }

    let snapshot = chat.snapshot();
    assert_eq!(snapshot.state, StreamState::Error);
    assert!(
        snapshot
            .error
            .as_deref()
            .is_some_and(|e| e.contains("agent unavailable"))
    );
    assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_split_multibyte_survives_proxy() {
    let proxy = spawn_stack(Backend::default()).await;
    let chat = chat_for(AgentKind::SkillNav, proxy);

    assert_eq!(chat.send("plan please").await, ExchangeOutcome::Completed);
    let output = chat.snapshot().output;
    assert_eq!(output, "café plan");
    assert!(!output.contains('\u{FFFD}'));
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    // Bind and drop to get a port with nothing listening.
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut config = UpstreamConfig::with_base_url(format!("http://{dead}"));
    config.allow_loopback = true;
    let upstream = HttpUpstream::new(&config).unwrap();
    let state = AppState::new(config, Arc::new(upstream), AuthState::default());
    let proxy = spawn_server(create_router(state)).await;

    let chat = chat_for(AgentKind::Welcome, proxy);
    match chat.send("anyone?").await {
        ExchangeOutcome::Failed(message) => {
            assert!(message.contains("unreachable"), "{message}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
