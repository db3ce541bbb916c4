//! Session management

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::session::{Session, SessionStore};

/// Session manager that handles session lifecycle
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    /// Idle time after which a session is dropped
    ttl: Duration,
    /// How often the cleanup task sweeps the store
    cleanup_interval: StdDuration,
}

impl SessionManager {
    /// Create a session manager over a store
    pub fn new(store: SessionStore, config: &SessionConfig) -> Self {
        Self {
            store,
            ttl: i64::try_from(config.ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            cleanup_interval: StdDuration::from_secs(config.cleanup_interval_secs),
        }
    }

    /// Create a session manager with default settings (for testing)
    pub fn in_memory() -> Self {
        Self::new(SessionStore::new(), &SessionConfig::default())
    }

    /// Start a new conversation and return its id
    pub fn create_session(&self) -> String {
        let session = Session::new();
        let id = session.id.clone();
        self.store.insert(session);
        info!("New session: {}", id);
        id
    }

    /// The store this manager registers sessions in
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Get session count
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Clean up expired sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.store.remove_idle(self.ttl);
        for id in &removed {
            info!("Cleaned up expired session: {}", id);
        }
        debug!("{} sessions remain after cleanup", self.store.len());
        removed.len()
    }

    /// Start a background task to clean up expired sessions
    pub fn start_cleanup_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(self.cleanup_interval);
            // 最初の tick は即座に完了する
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }
}
