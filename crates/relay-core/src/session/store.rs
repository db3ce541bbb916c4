//! In-memory session storage
//!
//! Thread-safe session storage using DashMap. Every session carries a gate
//! that the relay holds while a reply is being produced.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::session::{Session, Turn};
use crate::{Error, Result};

struct SessionSlot {
    session: Session,
    gate: Arc<Mutex<()>>,
}

/// In-memory session store
///
/// Cloning yields another handle to the same map.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionSlot>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, replacing any session with the same id
    pub fn insert(&self, session: Session) {
        let id = session.id.clone();
        self.sessions.insert(
            id,
            SessionSlot {
                session,
                gate: Arc::new(Mutex::new(())),
            },
        );
    }

    /// Check whether a session is registered
    pub fn exists(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Get the ordered turns of a session
    pub fn get(&self, id: &str) -> Result<Vec<Turn>> {
        self.sessions
            .get(id)
            .map(|slot| slot.session.turns.clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Get a full copy of a session
    pub fn snapshot(&self, id: &str) -> Result<Session> {
        self.sessions
            .get(id)
            .map(|slot| slot.session.clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Append a turn to the end of a session
    pub fn append(&self, id: &str, turn: Turn) -> Result<()> {
        let mut slot = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        slot.session.push(turn);
        Ok(())
    }

    /// Per-session gate serializing replies for one conversation
    pub fn gate(&self, id: &str) -> Result<Arc<Mutex<()>>> {
        self.sessions
            .get(id)
            .map(|slot| Arc::clone(&slot.gate))
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Remove a session entirely
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, slot)| slot.session)
    }

    /// Remove sessions idle for longer than `ttl`
    ///
    /// Sessions whose gate is held are kept even if idle. A `ttl` reaching
    /// past the representable date range expires nothing.
    pub fn remove_idle(&self, ttl: Duration) -> Vec<String> {
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return Vec::new();
        };
        let mut removed = Vec::new();

        self.sessions.retain(|id, slot| {
            let idle = slot.session.last_active < cutoff;
            let busy = slot.gate.try_lock().is_err();
            if idle && !busy {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });

        removed
    }

    /// Get session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
