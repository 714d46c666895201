//! Axum handlers for the chat routes.
//!
//! Each handler receives [`ChannelState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Bodies are JSON throughout.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::ChannelState;
use crate::subsystems::agents::AgentError;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn agent_error(err: AgentError) -> Response {
    match err {
        AgentError::MissingField => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": AgentError::MissingField.to_string() })),
        )
            .into_response(),
        AgentError::Memory(e) => {
            error!(error = %e, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /chat
pub(super) async fn chat(
    State(state): State<ChannelState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    // An unreadable body is reported the same way as missing fields.
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!(error = %rejection, "rejected chat body");
            return agent_error(AgentError::MissingField);
        }
    };

    let session_id = req.session_id.unwrap_or_default();
    let message = req.message.unwrap_or_default();

    match state.agent.submit_message(&session_id, &message).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => agent_error(e),
    }
}

/// GET /history/{session_id}
pub(super) async fn history(
    State(state): State<ChannelState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.agent.history(&session_id).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => agent_error(e),
    }
}

/// GET /data/{session_id}
///
/// "Nothing recorded yet" is answered with `{}`, the same body as an empty
/// extraction, so clients cannot tell the two apart here.
pub(super) async fn data(
    State(state): State<ChannelState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.agent.extracted_data(&session_id).await {
        Ok(Some(data)) => (StatusCode::OK, Json(data)).into_response(),
        Ok(None) => {
            debug!(%session_id, "no extracted data recorded");
            (StatusCode::OK, Json(json!({}))).into_response()
        }
        Err(e) => agent_error(e),
    }
}

/// GET /health
pub(super) async fn health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}
