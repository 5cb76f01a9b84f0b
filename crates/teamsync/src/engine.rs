//! Public entry point: the team and task coordination engine.
//!
//! Single-threaded and poll-driven. The owner calls [`TeamEngine::poll`]
//! from its event loop; each poll drains both change feeds, advances watch
//! retries, and runs the debounced reconciliations that are due. Events
//! go to the [`EventSink`] synchronously, in the order they were raised.

use std::time::Instant;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::errors::{RegistryError, TeamsError};
use crate::linker::SessionLinker;
use crate::parser;
use crate::reconciler::Reconciler;
use crate::registry::SessionRegistry;
use crate::scanner;
use crate::sink::EventSink;
use crate::types::{SessionMetadata, Team, TeamEvent};
use crate::watcher::{FeedKind, FileChange, FileKey, WatchState, WatchSupervisor};

pub struct TeamEngine<R: SessionRegistry, S: EventSink> {
    config: EngineConfig,
    reconciler: Reconciler,
    linker: SessionLinker,
    registry: R,
    sink: S,
    debouncer: Debouncer<FileKey, FileChange>,
    feeds: Vec<WatchSupervisor>,
}

impl<R: SessionRegistry, S: EventSink> TeamEngine<R, S> {
    pub fn new(config: EngineConfig, registry: R, sink: S) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce),
            linker: SessionLinker::new(config.auto_link_window),
            reconciler: Reconciler::new(),
            feeds: Vec::new(),
            config,
            registry,
            sink,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ensure both directories exist, scan them, then start watching.
    pub fn initialize(&mut self) -> Result<(), TeamsError> {
        self.load()?;
        self.start_watching(Instant::now());
        tracing::info!(
            event = "teams.engine.initialized",
            teams = self.reconciler.len(),
            teams_dir = %self.config.teams_dir.display(),
            tasks_dir = %self.config.tasks_dir.display()
        );
        Ok(())
    }

    /// Ensure both directories exist and run a full scan, without watching.
    ///
    /// Team files are applied before task files so tasks can be attributed.
    pub fn load(&mut self) -> Result<(), TeamsError> {
        std::fs::create_dir_all(&self.config.teams_dir)?;
        std::fs::create_dir_all(&self.config.tasks_dir)?;

        for path in scanner::list_source_files(&self.config.teams_dir) {
            self.reconcile(FileChange {
                kind: FeedKind::Teams,
                path,
                exists: true,
            });
        }
        for path in scanner::list_source_files(&self.config.tasks_dir) {
            self.reconcile(FileChange {
                kind: FeedKind::Tasks,
                path,
                exists: true,
            });
        }
        Ok(())
    }

    /// Stop watching, cancel pending reconciliations and clear all state.
    pub fn destroy(&mut self) {
        for feed in &mut self.feeds {
            feed.stop();
        }
        self.feeds.clear();
        let cancelled = self.debouncer.cancel_all();
        self.reconciler.clear();
        self.linker.clear();
        tracing::info!(event = "teams.engine.destroyed", cancelled = cancelled);
    }

    /// Drain change feeds and run due reconciliations.
    ///
    /// Returns the number of reconciliation passes run.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut changes = Vec::new();
        for feed in &mut self.feeds {
            changes.extend(feed.poll(now));
        }

        for change in changes {
            match change.key() {
                Some(key) => {
                    if self.debouncer.schedule(key, change, now) {
                        tracing::trace!(event = "teams.engine.change_coalesced");
                    }
                }
                None => tracing::debug!(
                    event = "teams.engine.change_ignored",
                    path = %change.path.display()
                ),
            }
        }

        let due = self.debouncer.take_due(now);
        let passes = due.len();
        for (_, change) in due {
            self.reconcile(change);
        }
        passes
    }

    /// The next instant at which `poll` has work to do without new events.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.feeds
            .iter()
            .filter_map(|f| f.next_wakeup())
            .chain(self.debouncer.next_due())
            .min()
    }

    pub fn watch_states(&self) -> Vec<(FeedKind, WatchState)> {
        self.feeds.iter().map(|f| (f.kind(), f.state())).collect()
    }

    /// Reconcile one change right away, bypassing the debouncer.
    pub fn reconcile(&mut self, change: FileChange) {
        let events = self.reconciler.handle_change(&change, Utc::now());
        self.dispatch(events);
    }

    // --- Queries ---

    pub fn get_teams(&self) -> Vec<Team> {
        self.reconciler.teams().cloned().collect()
    }

    pub fn get_team(&self, team_name: &str) -> Option<&Team> {
        self.reconciler.team(team_name)
    }

    pub fn get_team_for_session(&self, session_id: &str) -> Option<&Team> {
        self.linker
            .team_for_session(session_id)
            .and_then(|name| self.reconciler.team(name))
    }

    /// Registry sessions whose metadata names this team.
    pub fn get_team_sessions(&self, team_name: &str) -> Vec<SessionMetadata> {
        self.registry
            .get_sessions()
            .into_iter()
            .filter(|s| s.team_name.as_deref() == Some(team_name))
            .collect()
    }

    // --- Linking ---

    pub fn link_session_to_team(&mut self, session_id: &str, team_name: &str, agent_id: &str) -> bool {
        self.linker.link_session_to_team(
            &mut self.reconciler,
            &mut self.registry,
            session_id,
            team_name,
            agent_id,
        )
    }

    pub fn unlink_session_from_team(&mut self, session_id: &str) -> bool {
        self.linker
            .unlink_session_from_team(&mut self.reconciler, &mut self.registry, session_id)
    }

    pub fn close_team(&mut self, team_name: &str) -> Result<bool, RegistryError> {
        self.linker
            .close_team(&mut self.reconciler, &mut self.registry, team_name)
    }

    pub fn auto_link_sessions(&mut self, team_name: &str) -> Option<String> {
        self.linker.auto_link_sessions(
            &mut self.reconciler,
            &mut self.registry,
            team_name,
            Utc::now(),
        )
    }

    // --- Collaborators ---

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn start_watching(&mut self, now: Instant) {
        let policy = self.config.retry_policy();
        self.feeds = vec![
            WatchSupervisor::with_notify(FeedKind::Teams, self.config.teams_dir.clone(), policy),
            WatchSupervisor::with_notify(FeedKind::Tasks, self.config.tasks_dir.clone(), policy),
        ];
        for feed in &mut self.feeds {
            feed.start(now);
        }
    }

    fn dispatch(&mut self, events: Vec<TeamEvent>) {
        for event in events {
            let detected = match &event {
                TeamEvent::TeamDetected { team } => Some(team.name.clone()),
                _ => None,
            };
            self.sink.emit(event);

            if let Some(team_name) = detected {
                self.auto_link_sessions(&team_name);
                self.attach_named_tasks(&team_name);
            }
        }
    }

    /// Pick up a task file named after a just-detected team.
    ///
    /// Task files written before their team file would otherwise wait for
    /// their next rewrite.
    fn attach_named_tasks(&mut self, team_name: &str) {
        let path = teamsync_paths::TeamsyncPaths::team_file(&self.config.tasks_dir, team_name);
        match parser::read_source(&path) {
            Ok(Some(content)) => {
                let events = self
                    .reconciler
                    .apply_task_file(team_name, &content, Utc::now());
                for event in events {
                    self.sink.emit(event);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(
                event = "teams.engine.task_read_failed",
                team = team_name,
                path = %path.display(),
                error = %e
            ),
        }
    }
}
