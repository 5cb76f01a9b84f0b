//! Domain types for agent team state.
//!
//! Our own types decoupled from the on-disk JSON format. Raw serde types
//! for team and task files are in `parser.rs`. Everything here serializes
//! with camelCase field names so events can be handed to a UI verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a member within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Lead,
    #[default]
    Teammate,
}

impl AgentType {
    /// Parse a role from the team file. Anything other than `lead` is a teammate.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "lead" => Self::Lead,
            _ => Self::Teammate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Teammate => "teammate",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single member of an agent team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Display name (e.g., "researcher").
    pub name: String,
    /// Agent ID, unique within the team.
    pub agent_id: String,
    pub agent_type: AgentType,
}

impl Member {
    pub fn is_lead(&self) -> bool {
        self.agent_type == AgentType::Lead
    }
}

/// Normalized task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Normalize a free-text status. Unknown or missing values are pending.
    pub fn parse(s: Option<&str>) -> Self {
        let Some(s) = s else {
            return Self::Pending;
        };
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "in_progress" | "inprogress" | "active" | "running" | "started" | "working" => {
                Self::InProgress
            }
            "completed" | "complete" | "done" | "finished" => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// A task attributed to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub subject: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<String>>,
}

/// State of an agent team.
///
/// `members` come from the team file. `tasks`, `lead_session_id` and
/// `created_at` are owned by the reconciler and survive re-parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team name (base name of the team file).
    pub name: String,
    pub members: Vec<Member>,
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Get the lead member, if any.
    pub fn lead(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.is_lead())
    }

    /// Get all non-lead members.
    pub fn teammates(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| !m.is_lead())
    }

    pub fn member(&self, agent_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.agent_id == agent_id)
    }

    pub fn has_member(&self, agent_id: &str) -> bool {
        self.member(agent_id).is_some()
    }
}

/// Lifecycle status of a session, as reported by the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Stopped,
}

/// Session metadata owned by the external session registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    #[serde(default)]
    pub is_teammate: Option<bool>,
}

impl SessionMetadata {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, status: SessionStatus) -> Self {
        Self {
            id: id.into(),
            created_at,
            status,
            team_name: None,
            agent_id: None,
            agent_type: None,
            is_teammate: None,
        }
    }

    /// Overwrite all team fields at once. Fields are replaced, never merged.
    pub fn apply_team_fields(&mut self, fields: &TeamLinkFields) {
        self.team_name = fields.team_name.clone();
        self.agent_id = fields.agent_id.clone();
        self.agent_type = fields.agent_type;
        self.is_teammate = fields.is_teammate;
    }
}

/// The team-related slice of session metadata pushed to the registry.
///
/// All four fields are written together; `TeamLinkFields::default()` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLinkFields {
    pub team_name: Option<String>,
    pub agent_id: Option<String>,
    pub agent_type: Option<AgentType>,
    pub is_teammate: Option<bool>,
}

impl TeamLinkFields {
    pub fn for_member(team_name: &str, member: &Member) -> Self {
        Self {
            team_name: Some(team_name.to_string()),
            agent_id: Some(member.agent_id.clone()),
            agent_type: Some(member.agent_type),
            is_teammate: Some(!member.is_lead()),
        }
    }
}

/// Events emitted when team state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TeamEvent {
    /// A team file was seen for the first time.
    TeamDetected { team: Team },
    /// A member appeared in an already-known team.
    #[serde(rename_all = "camelCase")]
    TeammateAdded { team_name: String, member: Member },
    /// A team's task list changed.
    #[serde(rename_all = "camelCase")]
    TasksUpdated { team_name: String, tasks: Vec<Task> },
    /// A team was removed (team file deleted).
    #[serde(rename_all = "camelCase")]
    TeamRemoved { team_name: String },
}

impl TeamEvent {
    pub fn team_name(&self) -> &str {
        match self {
            Self::TeamDetected { team } => &team.name,
            Self::TeammateAdded { team_name, .. }
            | Self::TasksUpdated { team_name, .. }
            | Self::TeamRemoved { team_name } => team_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(agent_id: &str, agent_type: AgentType) -> Member {
        Member {
            name: agent_id.to_string(),
            agent_id: agent_id.to_string(),
            agent_type,
        }
    }

    #[test]
    fn test_agent_type_parse() {
        assert_eq!(AgentType::parse("lead"), AgentType::Lead);
        assert_eq!(AgentType::parse(" LEAD "), AgentType::Lead);
        assert_eq!(AgentType::parse("teammate"), AgentType::Teammate);
        assert_eq!(AgentType::parse("general-purpose"), AgentType::Teammate);
        assert_eq!(AgentType::parse(""), AgentType::Teammate);
    }

    #[test]
    fn test_task_status_in_progress_synonyms() {
        for s in ["Active", "running", "in-progress", "in_progress", "In Progress"] {
            assert_eq!(TaskStatus::parse(Some(s)), TaskStatus::InProgress, "{s}");
        }
    }

    #[test]
    fn test_task_status_completed_synonyms() {
        for s in ["Done", "finished", "completed", "COMPLETE"] {
            assert_eq!(TaskStatus::parse(Some(s)), TaskStatus::Completed, "{s}");
        }
    }

    #[test]
    fn test_task_status_defaults_to_pending() {
        assert_eq!(TaskStatus::parse(None), TaskStatus::Pending);
        assert_eq!(TaskStatus::parse(Some("")), TaskStatus::Pending);
        assert_eq!(TaskStatus::parse(Some("blocked")), TaskStatus::Pending);
        assert_eq!(TaskStatus::parse(Some("pending")), TaskStatus::Pending);
    }

    #[test]
    fn test_team_lead_and_teammates() {
        let now = Utc::now();
        let team = Team {
            name: "alpha".to_string(),
            members: vec![
                member("worker-1", AgentType::Teammate),
                member("boss", AgentType::Lead),
                member("worker-2", AgentType::Teammate),
            ],
            tasks: Vec::new(),
            lead_session_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(team.lead().map(|m| m.agent_id.as_str()), Some("boss"));
        assert_eq!(team.teammates().count(), 2);
        assert!(team.has_member("worker-2"));
        assert!(!team.has_member("ghost"));
    }

    #[test]
    fn test_team_link_fields_for_member() {
        let fields = TeamLinkFields::for_member("alpha", &member("boss", AgentType::Lead));
        assert_eq!(fields.team_name.as_deref(), Some("alpha"));
        assert_eq!(fields.agent_type, Some(AgentType::Lead));
        assert_eq!(fields.is_teammate, Some(false));
    }

    #[test]
    fn test_apply_team_fields_overwrites() {
        let mut meta = SessionMetadata::new("s-1", Utc::now(), SessionStatus::Running);
        meta.apply_team_fields(&TeamLinkFields::for_member(
            "alpha",
            &member("boss", AgentType::Lead),
        ));
        meta.apply_team_fields(&TeamLinkFields::default());
        assert!(meta.team_name.is_none());
        assert!(meta.agent_id.is_none());
        assert!(meta.agent_type.is_none());
        assert!(meta.is_teammate.is_none());
    }

    #[test]
    fn test_event_serializes_with_tag_and_camel_case() {
        let event = TeamEvent::TeamRemoved {
            team_name: "alpha".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "teamRemoved");
        assert_eq!(json["teamName"], "alpha");
    }

    #[test]
    fn test_task_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
