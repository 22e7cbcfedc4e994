#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use booking_gate::config::AppConfig;
use booking_gate::routes::RouteTable;
use booking_gate::server::{app, AppState};
use booking_gate::validator::HttpIdentityClient;

/// Call counters kept by the mock identity backend.
#[derive(Default)]
pub struct BackendStats {
    pub identity_calls: AtomicUsize,
    pub no_store_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub socket_auth_headers: AtomicUsize,
}

impl BackendStats {
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub fn no_store_calls(&self) -> usize {
        self.no_store_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub socket_url: String,
    pub stats: Arc<BackendStats>,
}

pub fn user_json(role: &str) -> Value {
    json!({
        "id": format!("{}_1", role.to_lowercase()),
        "email": format!("{}@example.com", role.to_lowercase()),
        "name": "Test Person",
        "role": role,
        "emailVerified": true,
        "organizationId": if role == "ORGANIZATION" { json!("org_1") } else { Value::Null },
    })
}

async fn user_me(State(stats): State<Arc<BackendStats>>, headers: HeaderMap) -> Response {
    stats.identity_calls.fetch_add(1, Ordering::SeqCst);
    if headers.get("cache-control").and_then(|v| v.to_str().ok()) == Some("no-store") {
        stats.no_store_calls.fetch_add(1, Ordering::SeqCst);
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    match token {
        "org-token" => Json(json!({ "success": true, "data": { "user": user_json("ORGANIZATION") } })).into_response(),
        "user-token" => Json(json!({ "success": true, "data": { "user": user_json("USER") } })).into_response(),
        "refused-token" => Json(json!({ "success": false, "error": "token revoked" })).into_response(),
        "garbled-token" => (StatusCode::OK, "<html>oops</html>").into_response(),
        "down-token" => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "success": false }))).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": "invalid token" }))).into_response(),
    }
}

async fn logout(State(stats): State<Arc<BackendStats>>, Json(body): Json<Value>) -> Response {
    stats.logout_calls.fetch_add(1, Ordering::SeqCst);
    if body.get("refreshToken").and_then(Value::as_str).is_some() {
        Json(json!({ "success": true })).into_response()
    } else {
        StatusCode::BAD_REQUEST.into_response()
    }
}

async fn socket(State(stats): State<Arc<BackendStats>>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    if headers.contains_key("authorization") {
        stats.socket_auth_headers.fetch_add(1, Ordering::SeqCst);
    }
    ws.on_upgrade(echo_rooms)
}

/// Acknowledge every room event by echoing the frame back.
async fn echo_rooms(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else { continue };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
        let ack = json!({ "event": "room:ack", "data": frame });
        if socket.send(Message::Text(ack.to_string())).await.is_err() {
            break;
        }
    }
}

async fn bind(router: Router) -> Result<u16> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(port)
}

pub async fn spawn_backend() -> Result<MockBackend> {
    let stats = Arc::new(BackendStats::default());
    let router = Router::new()
        .route("/api/user/me", get(user_me))
        .route("/api/auth/logout", post(logout))
        .route("/socket", get(socket))
        .with_state(stats.clone());

    let port = bind(router).await?;
    Ok(MockBackend {
        base_url: format!("http://127.0.0.1:{}/api", port),
        socket_url: format!("ws://127.0.0.1:{}/socket", port),
        stats,
    })
}

pub struct TestGate {
    pub base_url: String,
}

pub fn gate_config(backend_url: &str) -> AppConfig {
    let mut config = AppConfig::development();
    config.gate.backend_url = backend_url.to_string();
    config.server.enable_request_logging = false;
    config
}

pub async fn spawn_gate(config: AppConfig) -> Result<TestGate> {
    let validator = HttpIdentityClient::from_config(&config.gate)?;
    let state = AppState::new(config, RouteTable::default(), Arc::new(validator));

    let port = bind(app(state)).await?;
    Ok(TestGate { base_url: format!("http://127.0.0.1:{}", port) })
}

/// Gate wired the way the server binary wires it, honoring `routes_file`.
pub async fn spawn_gate_from_config(config: AppConfig) -> Result<TestGate> {
    let state = AppState::from_config(config)?;
    let port = bind(app(state)).await?;
    Ok(TestGate { base_url: format!("http://127.0.0.1:{}", port) })
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect()
}

pub fn cookie_named<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    cookies.iter().find(|c| c.starts_with(&format!("{}=", name)))
}

pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// `user` cookie value for a cached identity.
pub fn user_cookie(role: &str) -> String {
    urlencoding::encode(&user_json(role).to_string()).into_owned()
}
