//! Session registry.
//!
//! Tracks which sessions are currently connected. Broadcasts go to every
//! registered session, so the registry is the single source of truth for
//! "currently connected". Sessions are kept in a `BTreeMap` so that broadcast
//! recipients are always listed in the same order.

use std::collections::BTreeMap;

/// Relay-side bookkeeping for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// History replays served to this session.
    pub history_requests: u64,
    /// Messages this session got appended to the log.
    pub messages_sent: u64,
}

impl SessionInfo {
    /// Fresh session with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Registry of connected sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<u64, SessionInfo>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// Returns `false` if the session id is already registered.
    pub fn register_session(&mut self, session_id: u64, info: SessionInfo) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, info);
        true
    }

    /// Unregister a session. Returns its info if it was registered.
    pub fn unregister_session(&mut self, session_id: u64) -> Option<SessionInfo> {
        self.sessions.remove(&session_id)
    }

    /// Session metadata. `None` if the session doesn't exist.
    pub fn session(&self, session_id: u64) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// Mutable session metadata. `None` if the session doesn't exist.
    pub fn session_mut(&mut self, session_id: u64) -> Option<&mut SessionInfo> {
        self.sessions.get_mut(&session_id)
    }

    /// Session is registered.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// All registered session ids in ascending order.
    pub fn session_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.sessions.keys().copied()
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
