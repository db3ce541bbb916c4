//! HTTP API handlers
//!
//! Request handlers for session start and chat relay.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use relay_core::Turn;

use crate::error::{ApiError, Result};
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Start response payload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub chat_id: String,
}

/// Chat request payload
///
/// Both fields are optional at the wire level so that a missing field
/// yields a 400 with an `error` body instead of a bare rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Session ID returned by `/start`
    #[serde(default)]
    pub chat_id: Option<String>,
    /// User message
    #[serde(default)]
    pub message: Option<String>,
}

/// Chat response payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply
    pub text: String,
}

/// Session info response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoResponse {
    pub chat_id: String,
    pub turns: Vec<Turn>,
    pub created_at: String,
    pub last_active: String,
}

/// Generic API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Start a new chat session
pub async fn start(State(state): State<AppState>) -> Json<StartResponse> {
    let chat_id = state.sessions.create_session();
    Json(StartResponse { chat_id })
}

/// Chat endpoint - relay a user message and return the reply
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(req) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    debug!("Chat request: {:?}", req);

    let chat_id = req.chat_id.unwrap_or_default();
    let message = req.message.unwrap_or_default();

    let text = state.relay.respond(&chat_id, &message).await?;
    Ok(Json(ChatResponse { text }))
}

/// Get session info
pub async fn session_info(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<SessionInfoResponse>> {
    let session = state.sessions.store().snapshot(&chat_id)?;

    Ok(Json(SessionInfoResponse {
        chat_id: session.id,
        turns: session.turns,
        created_at: session.created_at.to_rfc3339(),
        last_active: session.last_active.to_rfc3339(),
    }))
}
