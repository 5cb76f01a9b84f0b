//! Parsers for team definition and task list files.
//!
//! Raw serde types with `#[serde(default)]` for forward compatibility
//! with unknown/added fields. Parsing is tolerant: a file that fails
//! structural validation yields `None` and a warning, a malformed entry
//! inside an otherwise valid file is skipped with a warning.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::TeamsError;
use crate::types::{AgentType, Member, Task, TaskStatus, Team};

// =============================================================================
// Team file: <teams_dir>/<team>.json
// =============================================================================

/// Raw team file (serde). `members` is required and must be an array.
///
/// Entries are kept as raw values so one bad member does not reject the file.
#[derive(Debug, Deserialize)]
pub struct RawTeamConfig {
    pub members: Vec<Value>,
}

/// Raw team member entry (serde).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawTeamMember {
    pub name: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<String>,
    #[serde(rename = "agentType")]
    pub agent_type: Option<String>,
}

// =============================================================================
// Task file: <tasks_dir>/<name>.json
// =============================================================================

/// The three shapes a task file may take.
///
/// Variant order matters for untagged matching: arrays first (a struct
/// variant would also accept a sequence), then the wrapper object, then a
/// bare task object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTaskFile {
    List(Vec<Value>),
    Wrapped { tasks: Vec<Value> },
    Single(serde_json::Map<String, Value>),
}

impl RawTaskFile {
    /// Flatten into task entries. `None` for an object that is neither a
    /// wrapper with a `tasks` array nor recognisably a single task.
    fn into_entries(self) -> Option<Vec<Value>> {
        match self {
            Self::List(tasks) => Some(tasks),
            Self::Wrapped { tasks } => Some(tasks),
            Self::Single(task) if is_single_task(&task) => Some(vec![Value::Object(task)]),
            Self::Single(_) => None,
        }
    }
}

/// A bare task object carries some task field and no `tasks` key.
///
/// An object with a non-array `tasks` lands in `Single` after `Wrapped`
/// rejects it.
fn is_single_task(object: &serde_json::Map<String, Value>) -> bool {
    !object.contains_key("tasks")
        && ["taskId", "id", "subject"]
            .iter()
            .any(|field| object.contains_key(*field))
}

/// Raw task entry (serde). Identifiers may be strings or numbers.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawTask {
    #[serde(rename = "taskId")]
    pub task_id: Option<Value>,
    pub id: Option<Value>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub owner: Option<String>,
    #[serde(rename = "blockedBy")]
    pub blocked_by: Option<Vec<Value>>,
    pub blocks: Option<Vec<Value>>,
}

// =============================================================================
// Parse functions
// =============================================================================

/// Read a source file.
///
/// Returns `Ok(None)` for a missing file so callers can treat it as a removal.
pub fn read_source(path: &Path) -> Result<Option<String>, TeamsError> {
    match std::fs::read_to_string(path) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Decode a team file without normalizing it.
pub fn decode_team_config(content: &str) -> Result<RawTeamConfig, TeamsError> {
    Ok(serde_json::from_str(content)?)
}

/// Parse a team file into a normalized [`Team`].
///
/// When `existing` is given, its `tasks`, `lead_session_id` and `created_at`
/// carry over; only `members` and `updated_at` come from this parse.
/// Returns `None` (and logs a warning) when the file is structurally invalid.
pub fn parse_team(
    team_name: &str,
    content: &str,
    existing: Option<&Team>,
    now: DateTime<Utc>,
) -> Option<Team> {
    let raw = match decode_team_config(content) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                event = "teams.parser.team_invalid",
                team = team_name,
                error = %e
            );
            return None;
        }
    };

    let members = normalize_members(team_name, raw.members);

    Some(match existing {
        Some(prev) => Team {
            name: team_name.to_string(),
            members,
            tasks: prev.tasks.clone(),
            lead_session_id: prev.lead_session_id.clone(),
            created_at: prev.created_at,
            updated_at: now,
        },
        None => Team {
            name: team_name.to_string(),
            members,
            tasks: Vec::new(),
            lead_session_id: None,
            created_at: now,
            updated_at: now,
        },
    })
}

fn normalize_members(team_name: &str, raw: Vec<Value>) -> Vec<Member> {
    let mut members: Vec<Member> = Vec::with_capacity(raw.len());

    for (index, value) in raw.into_iter().enumerate() {
        let entry: RawTeamMember = match serde_json::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    event = "teams.parser.member_invalid",
                    team = team_name,
                    index = index,
                    error = %e
                );
                continue;
            }
        };

        let Some(agent_id) = entry.agent_id.filter(|id| !id.trim().is_empty()) else {
            tracing::warn!(
                event = "teams.parser.member_missing_agent_id",
                team = team_name,
                index = index
            );
            continue;
        };

        if members.iter().any(|m| m.agent_id == agent_id) {
            tracing::warn!(
                event = "teams.parser.member_duplicate",
                team = team_name,
                agent_id = agent_id
            );
            continue;
        }

        members.push(Member {
            name: entry.name.unwrap_or_else(|| agent_id.clone()),
            agent_type: entry
                .agent_type
                .as_deref()
                .map(AgentType::parse)
                .unwrap_or_default(),
            agent_id,
        });
    }

    members
}

/// Parse a task file in any of its three shapes into normalized tasks.
///
/// Entries without an identifier (`taskId`, else `id`) or a `subject` are
/// dropped. Returns `None` (and logs a warning) when the file itself is not
/// valid JSON or not one of the accepted shapes.
pub fn parse_tasks(file_key: &str, content: &str) -> Option<Vec<Task>> {
    let raw: RawTaskFile = match serde_json::from_str(content) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                event = "teams.parser.task_file_invalid",
                file = file_key,
                error = %e
            );
            return None;
        }
    };

    let Some(entries) = raw.into_entries() else {
        tracing::warn!(
            event = "teams.parser.task_file_invalid",
            file = file_key,
            error = "object is neither a task list wrapper nor a task"
        );
        return None;
    };

    let tasks: Vec<Task> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| normalize_task(file_key, index, value))
        .collect();

    tracing::debug!(
        event = "teams.parser.tasks_parsed",
        file = file_key,
        count = tasks.len()
    );

    Some(tasks)
}

fn normalize_task(file_key: &str, index: usize, value: Value) -> Option<Task> {
    let raw: RawTask = match serde_json::from_value(value) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(
                event = "teams.parser.task_invalid",
                file = file_key,
                index = index,
                error = %e
            );
            return None;
        }
    };

    let task_id = raw
        .task_id
        .as_ref()
        .and_then(id_string)
        .or_else(|| raw.id.as_ref().and_then(id_string));
    let subject = raw.subject.filter(|s| !s.trim().is_empty());

    let (Some(task_id), Some(subject)) = (task_id, subject) else {
        tracing::warn!(
            event = "teams.parser.task_incomplete",
            file = file_key,
            index = index
        );
        return None;
    };

    Some(Task {
        task_id,
        subject,
        description: raw.description.unwrap_or_default(),
        status: TaskStatus::parse(raw.status.as_deref()),
        owner: raw.owner.filter(|o| !o.is_empty()),
        blocked_by: raw.blocked_by.map(|ids| ids.iter().filter_map(id_string).collect()),
        blocks: raw.blocks.map(|ids| ids.iter().filter_map(id_string).collect()),
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_parse_team_valid() {
        let team = parse_team(
            "my-team",
            r#"{
                "members": [
                    { "name": "boss", "agentId": "lead-1", "agentType": "lead" },
                    { "name": "researcher", "agentId": "r-1", "agentType": "teammate" }
                ]
            }"#,
            None,
            now(),
        )
        .unwrap();

        assert_eq!(team.name, "my-team");
        assert_eq!(team.members.len(), 2);
        assert_eq!(team.members[0].agent_type, AgentType::Lead);
        assert_eq!(team.members[1].name, "researcher");
        assert!(team.tasks.is_empty());
        assert!(team.lead_session_id.is_none());
        assert_eq!(team.created_at, team.updated_at);
    }

    #[test]
    fn test_parse_team_agent_type_defaults_to_teammate() {
        let team = parse_team(
            "t",
            r#"{ "members": [
                { "agentId": "a" },
                { "agentId": "b", "agentType": "general-purpose" },
                { "agentId": "c", "agentType": null }
            ] }"#,
            None,
            now(),
        )
        .unwrap();
        assert!(team.members.iter().all(|m| m.agent_type == AgentType::Teammate));
        // Missing name falls back to the agent id
        assert_eq!(team.members[0].name, "a");
    }

    #[test]
    fn test_parse_team_missing_members() {
        assert!(parse_team("t", r#"{ "name": "t" }"#, None, now()).is_none());
    }

    #[test]
    fn test_parse_team_members_not_array() {
        assert!(parse_team("t", r#"{ "members": { "a": 1 } }"#, None, now()).is_none());
        assert!(parse_team("t", r#"{ "members": "nope" }"#, None, now()).is_none());
    }

    #[test]
    fn test_parse_team_malformed_json() {
        assert!(parse_team("t", "not valid json{{{", None, now()).is_none());
        assert!(parse_team("t", "[]", None, now()).is_none());
    }

    #[test]
    fn test_parse_team_skips_bad_members() {
        let team = parse_team(
            "t",
            r#"{ "members": [
                "just-a-string",
                { "name": "no-id" },
                { "agentId": "" },
                { "agentId": "ok", "name": 42 },
                { "agentId": "good" }
            ] }"#,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(team.members.len(), 1);
        assert_eq!(team.members[0].agent_id, "good");
    }

    #[test]
    fn test_parse_team_duplicate_agent_ids_keep_first() {
        let team = parse_team(
            "t",
            r#"{ "members": [
                { "agentId": "x", "name": "first" },
                { "agentId": "x", "name": "second" }
            ] }"#,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(team.members.len(), 1);
        assert_eq!(team.members[0].name, "first");
    }

    #[test]
    fn test_parse_team_extra_unknown_fields() {
        let team = parse_team(
            "t",
            r#"{
                "members": [{ "agentId": "a", "color": "blue", "futureField": 42 }],
                "anotherNewField": "hello"
            }"#,
            None,
            now(),
        )
        .unwrap();
        assert_eq!(team.members.len(), 1);
    }

    #[test]
    fn test_parse_team_preserves_reconciler_owned_fields() {
        let created = now() - chrono::TimeDelta::minutes(5);
        let prev = Team {
            name: "t".to_string(),
            members: Vec::new(),
            tasks: vec![Task {
                task_id: "1".to_string(),
                subject: "keep me".to_string(),
                description: String::new(),
                status: TaskStatus::Pending,
                owner: None,
                blocked_by: None,
                blocks: None,
            }],
            lead_session_id: Some("sess-1".to_string()),
            created_at: created,
            updated_at: created,
        };

        let later = now();
        let team = parse_team("t", r#"{ "members": [{ "agentId": "a" }] }"#, Some(&prev), later)
            .unwrap();

        assert_eq!(team.tasks, prev.tasks);
        assert_eq!(team.lead_session_id.as_deref(), Some("sess-1"));
        assert_eq!(team.created_at, created);
        assert_eq!(team.updated_at, later);
        assert_eq!(team.members.len(), 1);
    }

    #[test]
    fn test_parse_tasks_wrapper_shape() {
        let tasks = parse_tasks(
            "alpha",
            r#"{"tasks":[{"taskId":"t1","subject":"Fix bug","status":"active","owner":"agent-x"}]}"#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_id, "t1");
        assert_eq!(tasks[0].subject, "Fix bug");
        assert_eq!(tasks[0].status, TaskStatus::InProgress);
        assert_eq!(tasks[0].owner.as_deref(), Some("agent-x"));
        assert_eq!(tasks[0].description, "");
    }

    #[test]
    fn test_parse_tasks_array_shape() {
        let tasks = parse_tasks(
            "alpha",
            r#"[
                { "id": "1", "subject": "one", "status": "done" },
                { "id": 2, "subject": "two", "blockedBy": ["1"], "blocks": [3] }
            ]"#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[1].task_id, "2");
        assert_eq!(tasks[1].blocked_by, Some(vec!["1".to_string()]));
        assert_eq!(tasks[1].blocks, Some(vec!["3".to_string()]));
    }

    #[test]
    fn test_parse_tasks_single_object_shape() {
        let tasks = parse_tasks(
            "alpha",
            r#"{ "taskId": "solo", "subject": "Only one", "description": "details" }"#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "details");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert!(tasks[0].blocked_by.is_none());
    }

    #[test]
    fn test_parse_tasks_task_id_preferred_over_id() {
        let tasks = parse_tasks("a", r#"{ "taskId": "primary", "id": "fallback", "subject": "s" }"#)
            .unwrap();
        assert_eq!(tasks[0].task_id, "primary");
    }

    #[test]
    fn test_parse_tasks_drops_incomplete_entries() {
        let tasks = parse_tasks(
            "alpha",
            r#"[
                { "subject": "no id" },
                { "taskId": "no-subject" },
                { "taskId": "blank", "subject": "  " },
                { "taskId": "bad", "subject": "s", "description": 12 },
                7,
                { "taskId": "ok", "subject": "kept" }
            ]"#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_id, "ok");
    }

    #[test]
    fn test_parse_tasks_rejects_invalid_file() {
        assert!(parse_tasks("a", "garbage").is_none());
        assert!(parse_tasks("a", "42").is_none());
        assert!(parse_tasks("a", r#""a string""#).is_none());
    }

    #[test]
    fn test_parse_tasks_rejects_mistyped_wrapper() {
        assert!(parse_tasks("a", r#"{ "tasks": "oops" }"#).is_none());
        assert!(parse_tasks("a", r#"{ "tasks": null }"#).is_none());
        assert!(parse_tasks("a", r#"{ "tasks": { "taskId": "t1" } }"#).is_none());
    }

    #[test]
    fn test_parse_tasks_rejects_object_without_task_fields() {
        assert!(parse_tasks("a", "{}").is_none());
        assert!(parse_tasks("a", r#"{ "foo": 1 }"#).is_none());
    }

    #[test]
    fn test_parse_tasks_single_object_missing_subject_is_empty() {
        // Recognisably a task, just incomplete
        assert!(parse_tasks("a", r#"{ "taskId": "t1" }"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tasks_empty_shapes() {
        assert!(parse_tasks("a", "[]").unwrap().is_empty());
        assert!(parse_tasks("a", r#"{ "tasks": [] }"#).unwrap().is_empty());
    }

    #[test]
    fn test_read_source_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.json");
        assert!(read_source(&path).unwrap().is_none());
    }

    #[test]
    fn test_read_source_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("team.json");
        fs::write(&path, r#"{ "members": [] }"#).unwrap();
        assert_eq!(
            read_source(&path).unwrap().as_deref(),
            Some(r#"{ "members": [] }"#)
        );
    }
}
