//! Session management module
//!
//! Provides the in-memory store and lifecycle management for conversation history.

mod manager;
mod store;
mod types;

pub use manager::SessionManager;
pub use store::SessionStore;
pub use types::{Role, Session, Turn};
