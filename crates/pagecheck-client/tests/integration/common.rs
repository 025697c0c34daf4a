use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use tokio::net::TcpListener;
use url::Url;

/// Requests `/warming` and `/warming-health` answer "not ready" before switching.
pub const WARMUP_REQUESTS: usize = 2;

#[derive(Default)]
struct FixtureState {
    warming_hits: AtomicUsize,
    health_hits: AtomicUsize,
}

fn frontend_page(status: &str, message: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Fullstack App</title></head>
  <body>
    <main>
      <h1>Fullstack App</h1>
      <div class="status">Backend status: {status}</div>
      <div class="message-box"><h2>Backend Message</h2><p>{message}</p></div>
    </main>
  </body>
</html>"#
    ))
}

async fn index() -> Html<String> {
    frontend_page("connected", "You've successfully integrated the backend!")
}

async fn broken() -> Html<String> {
    frontend_page("disconnected", "Failed to connect to backend")
}

async fn warming(State(state): State<Arc<FixtureState>>) -> Html<String> {
    let hits = state.warming_hits.fetch_add(1, Ordering::SeqCst);
    if hits < WARMUP_REQUESTS {
        frontend_page("connecting", "Loading...")
    } else {
        frontend_page("connected", "You've successfully integrated the backend!")
    }
}

async fn server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "ok"}))
}

async fn api_health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "message": "Backend is running successfully"
    }))
}

async fn api_message() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "message": "You've successfully integrated the backend!"
    }))
}

async fn warming_health(State(state): State<Arc<FixtureState>>) -> impl IntoResponse {
    let hits = state.health_hits.fetch_add(1, Ordering::SeqCst);
    if hits < WARMUP_REQUESTS {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// Start the fixture server on an ephemeral port and return its base URL.
pub async fn spawn_fixture() -> Url {
    let state = Arc::new(FixtureState::default());
    let app = Router::new()
        .route("/", get(index))
        .route("/broken", get(broken))
        .route("/warming", get(warming))
        .route("/error", get(server_error))
        .route("/health", get(health))
        .route("/api/health", get(api_health))
        .route("/api/message", get(api_message))
        .route("/warming-health", get(warming_health))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fixture listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fixture server failed");
    });

    Url::parse(&format!("http://{addr}")).expect("Invalid fixture URL")
}

/// A base URL nothing listens on.
pub async fn unused_base_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind a free port");
    let addr = listener.local_addr().expect("Failed to read local addr");
    drop(listener);
    Url::parse(&format!("http://{addr}")).expect("Invalid URL")
}
