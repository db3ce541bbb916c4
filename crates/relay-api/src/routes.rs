//! Route definitions
//!
//! Defines all HTTP API endpoints. The widget calls either the bare paths or
//! their `/api` prefixed aliases depending on how it is deployed.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{chat, health, session_info, start};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Session start
        .route("/start", post(start))
        .route("/api/start", post(start))
        // Chat endpoint
        .route("/chat", post(chat))
        .route("/api/chat", post(chat))
        // Session inspection
        .route("/api/session/{chat_id}", get(session_info))
}
