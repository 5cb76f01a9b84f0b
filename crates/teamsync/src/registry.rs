//! Interface to the external session registry.
//!
//! The registry owns session lifecycle and metadata persistence. The engine
//! only reads sessions, writes the team-related metadata fields, and asks
//! for sessions to be closed.

use std::collections::BTreeMap;

use crate::errors::RegistryError;
use crate::types::{SessionMetadata, SessionStatus, TeamLinkFields};

pub trait SessionRegistry {
    /// All sessions the registry currently knows about.
    fn get_sessions(&self) -> Vec<SessionMetadata>;

    /// Overwrite the team fields of a session's metadata.
    fn update_session_metadata(
        &mut self,
        session_id: &str,
        fields: &TeamLinkFields,
    ) -> Result<(), RegistryError>;

    /// Close a session. `Ok(false)` means the registry declined or the
    /// session was already gone.
    fn close_session(&mut self, session_id: &str) -> Result<bool, RegistryError>;
}

/// Registry held entirely in memory, keyed by session id.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionRegistry {
    sessions: BTreeMap<String, SessionMetadata>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a session.
    pub fn insert(&mut self, session: SessionMetadata) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionMetadata> {
        self.sessions.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn get_sessions(&self) -> Vec<SessionMetadata> {
        self.sessions.values().cloned().collect()
    }

    fn update_session_metadata(
        &mut self,
        session_id: &str,
        fields: &TeamLinkFields,
    ) -> Result<(), RegistryError> {
        let session =
            self.sessions
                .get_mut(session_id)
                .ok_or_else(|| RegistryError::SessionNotFound {
                    session_id: session_id.to_string(),
                })?;
        session.apply_team_fields(fields);
        Ok(())
    }

    fn close_session(&mut self, session_id: &str) -> Result<bool, RegistryError> {
        match self.sessions.get_mut(session_id) {
            Some(session) if session.status != SessionStatus::Stopped => {
                session.status = SessionStatus::Stopped;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
