//! Axum HTTP channel: the service's only inbound surface.
//!
//! ## URL layout
//!
//! ```text
//! POST /chat                  {sessionId, message} → {response, extractedData}
//! GET  /history/{session_id}  → [{role, text, id}, ...]
//! GET  /data/{session_id}     → extractedData object, or {}
//! GET  /health                → {"status": "ok"}
//! ```
//!
//! `run` drives the axum event loop; the [`CancellationToken`] is wired to
//! axum's graceful shutdown.

mod api;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::HttpConfig;
use crate::error::AppError;
use crate::subsystems::agents::SalesAgent;

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone: the agent is reference-counted.
#[derive(Clone)]
pub struct ChannelState {
    pub agent: Arc<SalesAgent>,
}

impl ChannelState {
    pub fn new(agent: SalesAgent) -> Self {
        Self { agent: Arc::new(agent) }
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

pub async fn run(
    config: &HttpConfig,
    state: ChannelState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(state, &config.cors_allowed_origins);
    let bind_addr = config.bind.as_str();

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("server error: {e}")))?;

    info!("http channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: ChannelState, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/chat",                 post(api::chat))
        .route("/history/{session_id}", get(api::history))
        .route("/data/{session_id}",    get(api::data))
        .route("/health",               get(api::health))
        .layer(cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin unless a list is configured; unparsable entries are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(parsed)
    }
}
