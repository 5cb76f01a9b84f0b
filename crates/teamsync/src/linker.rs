//! Session <-> team role links.
//!
//! The linker owns the session -> (team, agent) map and keeps the session
//! registry's team metadata in step with it. Every link change writes all
//! team fields of the session at once.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::errors::RegistryError;
use crate::reconciler::Reconciler;
use crate::registry::SessionRegistry;
use crate::types::{SessionMetadata, SessionStatus, TeamLinkFields};

/// Default span around "now" in which a new session may be auto-linked as lead.
pub const DEFAULT_AUTO_LINK_WINDOW: Duration = Duration::from_secs(30);

/// The team role a session is linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLink {
    pub team_name: String,
    pub agent_id: String,
}

#[derive(Debug)]
pub struct SessionLinker {
    links: HashMap<String, SessionLink>,
    auto_link_window: TimeDelta,
}

impl Default for SessionLinker {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_LINK_WINDOW)
    }
}

impl SessionLinker {
    pub fn new(auto_link_window: Duration) -> Self {
        Self {
            links: HashMap::new(),
            auto_link_window: TimeDelta::from_std(auto_link_window).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn link(&self, session_id: &str) -> Option<&SessionLink> {
        self.links.get(session_id)
    }

    pub fn team_for_session(&self, session_id: &str) -> Option<&str> {
        self.links.get(session_id).map(|l| l.team_name.as_str())
    }

    /// Session ids linked to a team, sorted.
    pub fn sessions_for_team(&self, team_name: &str) -> Vec<String> {
        let mut sessions: Vec<String> = self
            .links
            .iter()
            .filter(|(_, link)| link.team_name == team_name)
            .map(|(id, _)| id.clone())
            .collect();
        sessions.sort();
        sessions
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    /// Link a session to a team member.
    ///
    /// Returns `false` if the team is unknown, `agent_id` is not one of its
    /// members, or the registry rejects the metadata update; an existing
    /// link is then left as it was. On success any previous link is
    /// replaced, and since every team field is written its metadata is
    /// overwritten rather than merged.
    pub fn link_session_to_team<R: SessionRegistry + ?Sized>(
        &mut self,
        reconciler: &mut Reconciler,
        registry: &mut R,
        session_id: &str,
        team_name: &str,
        agent_id: &str,
    ) -> bool {
        let Some(member) = reconciler
            .team(team_name)
            .and_then(|team| team.member(agent_id))
            .cloned()
        else {
            tracing::warn!(
                event = "teams.linker.link_rejected",
                session_id = session_id,
                team = team_name,
                agent_id = agent_id,
                "Unknown team or member"
            );
            return false;
        };

        let fields = TeamLinkFields::for_member(team_name, &member);
        if let Err(e) = registry.update_session_metadata(session_id, &fields) {
            tracing::warn!(
                event = "teams.linker.metadata_update_failed",
                session_id = session_id,
                team = team_name,
                error = %e
            );
            return false;
        }

        let previous = self.links.insert(
            session_id.to_string(),
            SessionLink {
                team_name: team_name.to_string(),
                agent_id: agent_id.to_string(),
            },
        );
        if let Some(previous) = previous {
            clear_lead(reconciler, &previous.team_name, session_id);
            tracing::info!(
                event = "teams.linker.link_replaced",
                session_id = session_id,
                team = previous.team_name,
                agent_id = previous.agent_id
            );
        }

        if member.is_lead()
            && let Some(team) = reconciler.team_mut(team_name)
        {
            team.lead_session_id = Some(session_id.to_string());
        }

        tracing::info!(
            event = "teams.linker.linked",
            session_id = session_id,
            team = team_name,
            agent_id = agent_id,
            agent_type = %member.agent_type
        );
        true
    }

    /// Remove a session's link and clear its team metadata.
    ///
    /// Returns whether a link existed.
    pub fn unlink_session_from_team<R: SessionRegistry + ?Sized>(
        &mut self,
        reconciler: &mut Reconciler,
        registry: &mut R,
        session_id: &str,
    ) -> bool {
        let Some(link) = self.links.remove(session_id) else {
            return false;
        };

        if let Err(e) = registry.update_session_metadata(session_id, &TeamLinkFields::default()) {
            tracing::warn!(
                event = "teams.linker.metadata_clear_failed",
                session_id = session_id,
                team = link.team_name,
                error = %e
            );
        }

        clear_lead(reconciler, &link.team_name, session_id);

        tracing::info!(
            event = "teams.linker.unlinked",
            session_id = session_id,
            team = link.team_name
        );
        true
    }

    /// Guess which fresh session is the lead of a newly detected team.
    ///
    /// Candidates are unlinked sessions created within the auto-link window
    /// of `now`. A running candidate wins, otherwise the oldest. Only the
    /// lead is ever auto-linked. Returns the linked session id.
    pub fn auto_link_sessions<R: SessionRegistry + ?Sized>(
        &mut self,
        reconciler: &mut Reconciler,
        registry: &mut R,
        team_name: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let lead_id = reconciler
            .team(team_name)?
            .lead()
            .map(|m| m.agent_id.clone());
        let Some(lead_id) = lead_id else {
            tracing::debug!(event = "teams.linker.auto_link_no_lead", team = team_name);
            return None;
        };

        let mut candidates: Vec<SessionMetadata> = registry
            .get_sessions()
            .into_iter()
            .filter(|s| !self.links.contains_key(&s.id) && s.team_name.is_none())
            .filter(|s| (now - s.created_at).abs() <= self.auto_link_window)
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let chosen = candidates
            .iter()
            .find(|s| s.status == SessionStatus::Running)
            .or_else(|| candidates.first())
            .map(|s| s.id.clone());
        let Some(session_id) = chosen else {
            tracing::debug!(
                event = "teams.linker.auto_link_no_candidate",
                team = team_name
            );
            return None;
        };

        if !self.link_session_to_team(reconciler, registry, &session_id, team_name, &lead_id) {
            return None;
        }

        tracing::info!(
            event = "teams.linker.auto_linked",
            session_id = session_id,
            team = team_name,
            candidates = candidates.len()
        );
        Some(session_id)
    }

    /// Close every session linked to a team, drop their links and clear
    /// their team metadata.
    ///
    /// Links outlive a removed team file, so a team that is gone but still
    /// has linked sessions is closed too. Returns `Ok(false)` when the team
    /// is unknown and has no links. A registry error stops the loop;
    /// sessions closed before it stay closed.
    pub fn close_team<R: SessionRegistry + ?Sized>(
        &mut self,
        reconciler: &mut Reconciler,
        registry: &mut R,
        team_name: &str,
    ) -> Result<bool, RegistryError> {
        let sessions = self.sessions_for_team(team_name);
        if reconciler.team(team_name).is_none() && sessions.is_empty() {
            return Ok(false);
        }

        for session_id in sessions {
            let closed = registry.close_session(&session_id)?;
            if !closed {
                tracing::warn!(
                    event = "teams.linker.close_declined",
                    session_id = session_id,
                    team = team_name
                );
            }
            self.links.remove(&session_id);
            if let Err(e) =
                registry.update_session_metadata(&session_id, &TeamLinkFields::default())
            {
                tracing::warn!(
                    event = "teams.linker.metadata_clear_failed",
                    session_id = session_id,
                    team = team_name,
                    error = %e
                );
            }
            clear_lead(reconciler, team_name, &session_id);
        }

        tracing::info!(event = "teams.linker.team_closed", team = team_name);
        Ok(true)
    }
}

fn clear_lead(reconciler: &mut Reconciler, team_name: &str, session_id: &str) {
    if let Some(team) = reconciler.team_mut(team_name)
        && team.lead_session_id.as_deref() == Some(session_id)
    {
        team.lead_session_id = None;
    }
}
