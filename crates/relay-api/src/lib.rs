//! relay-api: HTTP API for the chat relay
//!
//! Provides the REST endpoints the chat widget talks to.
//! Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{AppState, app, start_server};
