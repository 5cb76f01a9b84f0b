//! Authoritative in-memory team map.
//!
//! Applies parsed team and task files, and computes the events each
//! application raises. A team moves through:
//!
//! - absent -> present: `TeamDetected`
//! - present, members changed: one `TeammateAdded` per new `agentId`
//! - present, tasks changed: `TasksUpdated`
//! - present -> absent: `TeamRemoved`
//!
//! Records are rebuilt wholesale on every file change; a reparse that
//! yields the same members only bumps `updated_at`.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::parser;
use crate::types::{Task, Team, TeamEvent};
use crate::watcher::{FeedKind, FileChange};

#[derive(Debug, Default)]
pub struct Reconciler {
    /// Ordered by name so owner-based task attribution is deterministic.
    teams: BTreeMap<String, Team>,
    /// Task file key -> team its tasks were last attributed to.
    task_sources: HashMap<String, String>,
    /// Team -> task file key that last set its tasks.
    task_origins: HashMap<String, String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.get(name)
    }

    pub(crate) fn team_mut(&mut self, name: &str) -> Option<&mut Team> {
        self.teams.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn clear(&mut self) {
        self.teams.clear();
        self.task_sources.clear();
        self.task_origins.clear();
    }

    /// Reload the file behind a change and reconcile it.
    ///
    /// A file that is gone (or vanished between event and read) counts as
    /// removed. Read errors leave state untouched.
    pub fn handle_change(&mut self, change: &FileChange, now: DateTime<Utc>) -> Vec<TeamEvent> {
        let Some(key) = change.key() else {
            tracing::debug!(
                event = "teams.reconciler.unkeyed_path",
                path = %change.path.display()
            );
            return Vec::new();
        };

        let content = match parser::read_source(&change.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    event = "teams.reconciler.read_failed",
                    path = %change.path.display(),
                    error = %e
                );
                return Vec::new();
            }
        };

        match (change.kind, content) {
            (FeedKind::Teams, Some(content)) => self.apply_team_file(&key.name, &content, now),
            (FeedKind::Teams, None) => self.remove_team(&key.name),
            (FeedKind::Tasks, Some(content)) => self.apply_task_file(&key.name, &content, now),
            (FeedKind::Tasks, None) => self.remove_task_file(&key.name, now),
        }
    }

    /// Merge a team file into the map.
    ///
    /// Invalid files leave the previous state in place and raise nothing.
    pub fn apply_team_file(
        &mut self,
        team_name: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Vec<TeamEvent> {
        let existing = self.teams.get(team_name);
        let Some(team) = parser::parse_team(team_name, content, existing, now) else {
            return Vec::new();
        };

        let events = match existing {
            None => {
                tracing::info!(
                    event = "teams.reconciler.team_detected",
                    team = team_name,
                    members = team.members.len()
                );
                vec![TeamEvent::TeamDetected { team: team.clone() }]
            }
            Some(prev) => {
                let known: HashSet<&str> =
                    prev.members.iter().map(|m| m.agent_id.as_str()).collect();
                team.members
                    .iter()
                    .filter(|m| !known.contains(m.agent_id.as_str()))
                    .map(|m| {
                        tracing::info!(
                            event = "teams.reconciler.teammate_added",
                            team = team_name,
                            agent_id = m.agent_id
                        );
                        TeamEvent::TeammateAdded {
                            team_name: team_name.to_string(),
                            member: m.clone(),
                        }
                    })
                    .collect()
            }
        };

        self.teams.insert(team_name.to_string(), team);
        events
    }

    /// Evict a team whose file disappeared.
    pub fn remove_team(&mut self, team_name: &str) -> Vec<TeamEvent> {
        if self.teams.remove(team_name).is_none() {
            return Vec::new();
        }
        self.task_sources.retain(|_, team| team.as_str() != team_name);
        self.task_origins.remove(team_name);

        tracing::info!(event = "teams.reconciler.team_removed", team = team_name);
        vec![TeamEvent::TeamRemoved {
            team_name: team_name.to_string(),
        }]
    }

    /// Merge a task file into the team it belongs to.
    ///
    /// Files that cannot be attributed to a known team are dropped.
    pub fn apply_task_file(
        &mut self,
        file_key: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Vec<TeamEvent> {
        let Some(tasks) = parser::parse_tasks(file_key, content) else {
            return Vec::new();
        };

        let Some(team_name) = self.attribute_tasks(file_key, &tasks) else {
            tracing::debug!(
                event = "teams.reconciler.tasks_unattributed",
                file = file_key,
                tasks = tasks.len()
            );
            return Vec::new();
        };

        self.task_sources
            .insert(file_key.to_string(), team_name.clone());
        self.task_origins
            .insert(team_name.clone(), file_key.to_string());
        self.replace_tasks(&team_name, tasks, now)
    }

    /// Clear the tasks a deleted task file contributed.
    ///
    /// Tasks set since by another file are left alone.
    pub fn remove_task_file(&mut self, file_key: &str, now: DateTime<Utc>) -> Vec<TeamEvent> {
        let Some(team_name) = self.task_sources.remove(file_key) else {
            return Vec::new();
        };
        if self.task_origins.get(&team_name).map(String::as_str) != Some(file_key) {
            tracing::debug!(
                event = "teams.reconciler.task_file_superseded",
                file = file_key,
                team = team_name
            );
            return Vec::new();
        }
        self.task_origins.remove(&team_name);
        self.replace_tasks(&team_name, Vec::new(), now)
    }

    /// Decide which team a task file belongs to.
    ///
    /// 1. A team named like the file.
    /// 2. Else the first team (by name) with a member whose `agentId` owns
    ///    any of the tasks.
    /// 3. Else nobody.
    pub fn attribute_tasks(&self, file_key: &str, tasks: &[Task]) -> Option<String> {
        if self.teams.contains_key(file_key) {
            return Some(file_key.to_string());
        }

        let owners: HashSet<&str> = tasks.iter().filter_map(|t| t.owner.as_deref()).collect();
        if owners.is_empty() {
            return None;
        }

        self.teams
            .values()
            .find(|team| {
                team.members
                    .iter()
                    .any(|m| owners.contains(m.agent_id.as_str()))
            })
            .map(|team| team.name.clone())
    }

    fn replace_tasks(
        &mut self,
        team_name: &str,
        tasks: Vec<Task>,
        now: DateTime<Utc>,
    ) -> Vec<TeamEvent> {
        let Some(team) = self.teams.get_mut(team_name) else {
            return Vec::new();
        };
        if team.tasks == tasks {
            return Vec::new();
        }

        team.tasks = tasks;
        team.updated_at = now;
        tracing::info!(
            event = "teams.reconciler.tasks_updated",
            team = team_name,
            tasks = team.tasks.len()
        );
        vec![TeamEvent::TasksUpdated {
            team_name: team_name.to_string(),
            tasks: team.tasks.clone(),
        }]
    }
}
