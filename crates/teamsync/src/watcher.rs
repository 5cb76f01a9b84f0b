//! Change feed for the teams and tasks directories.
//!
//! Each directory gets a [`WatchSupervisor`] owning one platform watcher
//! (FSEvents on macOS, inotify on Linux) and a channel of raw events. The
//! supervisor is an explicit state machine:
//!
//! ```text
//! Stopped --start--> Watching --error--> Retrying(n) --delay--> Watching
//!                                            |
//!                                            +--retries exhausted--> Abandoned
//! ```
//!
//! `Abandoned` is terminal: the engine keeps serving stale state for that
//! directory and no further updates arrive from it.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::scanner;

/// Which directory a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Teams,
    Tasks,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Tasks => "tasks",
        }
    }
}

/// Debounce key: one per file per feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub kind: FeedKind,
    /// File base name (team name for team files).
    pub name: String,
}

/// A raw change notification for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: FeedKind,
    pub path: PathBuf,
    /// Whether the file existed when the event was drained.
    pub exists: bool,
}

impl FileChange {
    pub fn key(&self) -> Option<FileKey> {
        teamsync_paths::file_key(&self.path).map(|name| FileKey {
            kind: self.kind,
            name: name.to_string(),
        })
    }
}

/// Supervisor state for one watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WatchState {
    Stopped,
    Watching,
    Retrying { attempt: u32 },
    Abandoned,
}

/// Bounded, fixed-delay restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

type EventResult = Result<Event, notify::Error>;

/// Something that can start watching a directory and feed events into a channel.
///
/// The returned guard must be kept alive for events to keep flowing.
pub trait WatchSource {
    type Guard;

    fn start(&mut self, dir: &Path, tx: Sender<EventResult>) -> Result<Self::Guard, notify::Error>;
}

/// Platform-native watcher via `notify`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifySource;

impl WatchSource for NotifySource {
    type Guard = RecommendedWatcher;

    fn start(&mut self, dir: &Path, tx: Sender<EventResult>) -> Result<Self::Guard, notify::Error> {
        let mut watcher = notify::recommended_watcher(tx)?;
        // Flat directories: one file per team or task list
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

/// Watches one directory and restarts the watch on failure.
pub struct WatchSupervisor<S: WatchSource = NotifySource> {
    kind: FeedKind,
    dir: PathBuf,
    source: S,
    policy: RetryPolicy,
    /// Underlying watcher. Must be kept alive.
    guard: Option<S::Guard>,
    receiver: Option<Receiver<EventResult>>,
    state: WatchState,
    retries_used: u32,
    resume_at: Option<Instant>,
}

impl WatchSupervisor<NotifySource> {
    pub fn with_notify(kind: FeedKind, dir: PathBuf, policy: RetryPolicy) -> Self {
        Self::new(kind, dir, NotifySource, policy)
    }
}

impl<S: WatchSource> WatchSupervisor<S> {
    pub fn new(kind: FeedKind, dir: PathBuf, source: S, policy: RetryPolicy) -> Self {
        Self {
            kind,
            dir,
            source,
            policy,
            guard: None,
            receiver: None,
            state: WatchState::Stopped,
            retries_used: 0,
            resume_at: None,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Start watching. A failure to start is not fatal: it enters the retry path.
    pub fn start(&mut self, now: Instant) {
        if let Err(e) = self.try_start() {
            tracing::warn!(
                event = "teams.watcher.start_failed",
                feed = self.kind.as_str(),
                path = %self.dir.display(),
                error = %e
            );
            self.schedule_retry(now);
        }
    }

    /// Tear down the watch and forget any retry schedule.
    pub fn stop(&mut self) {
        self.teardown();
        self.state = WatchState::Stopped;
        self.resume_at = None;
        tracing::debug!(
            event = "teams.watcher.stopped",
            feed = self.kind.as_str(),
            path = %self.dir.display()
        );
    }

    /// Drain pending events and advance the retry state machine.
    ///
    /// Returns one [`FileChange`] per relevant path. After a successful
    /// restart, every file currently in the directory is reported so that
    /// writes missed while the watch was down are picked up.
    pub fn poll(&mut self, now: Instant) -> Vec<FileChange> {
        match self.state {
            WatchState::Watching => self.drain(now),
            WatchState::Retrying { attempt } => {
                if self.resume_at.is_some_and(|at| now < at) {
                    return Vec::new();
                }
                match self.try_start() {
                    Ok(()) => {
                        tracing::info!(
                            event = "teams.watcher.restarted",
                            feed = self.kind.as_str(),
                            path = %self.dir.display(),
                            attempt = attempt
                        );
                        self.resync()
                    }
                    Err(e) => {
                        tracing::warn!(
                            event = "teams.watcher.restart_failed",
                            feed = self.kind.as_str(),
                            path = %self.dir.display(),
                            attempt = attempt,
                            error = %e
                        );
                        self.schedule_retry(now);
                        Vec::new()
                    }
                }
            }
            WatchState::Stopped | WatchState::Abandoned => Vec::new(),
        }
    }

    /// When the supervisor next needs a poll to make progress on its own.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match self.state {
            WatchState::Retrying { .. } => self.resume_at,
            _ => None,
        }
    }

    fn try_start(&mut self) -> Result<(), notify::Error> {
        self.teardown();
        let (tx, rx) = mpsc::channel();
        let guard = self.source.start(&self.dir, tx)?;
        self.guard = Some(guard);
        self.receiver = Some(rx);
        self.state = WatchState::Watching;
        self.resume_at = None;
        tracing::info!(
            event = "teams.watcher.watching",
            feed = self.kind.as_str(),
            path = %self.dir.display()
        );
        Ok(())
    }

    fn teardown(&mut self) {
        self.guard = None;
        self.receiver = None;
    }

    fn schedule_retry(&mut self, now: Instant) {
        self.teardown();

        if self.retries_used >= self.policy.max_retries {
            tracing::error!(
                event = "teams.watcher.abandoned",
                feed = self.kind.as_str(),
                path = %self.dir.display(),
                retries = self.retries_used,
                "Watch retries exhausted; directory updates will no longer be seen"
            );
            self.state = WatchState::Abandoned;
            self.resume_at = None;
            return;
        }

        self.retries_used += 1;
        self.state = WatchState::Retrying {
            attempt: self.retries_used,
        };
        self.resume_at = Some(now + self.policy.delay);
        tracing::warn!(
            event = "teams.watcher.retry_scheduled",
            feed = self.kind.as_str(),
            path = %self.dir.display(),
            attempt = self.retries_used,
            delay_ms = self.policy.delay.as_millis() as u64
        );
    }

    fn drain(&mut self, now: Instant) -> Vec<FileChange> {
        let mut changes: Vec<FileChange> = Vec::new();
        let mut failure: Option<String> = None;

        if let Some(receiver) = &self.receiver {
            loop {
                match receiver.try_recv() {
                    Ok(Ok(event)) => {
                        if !is_relevant_event(&event) {
                            continue;
                        }
                        tracing::debug!(
                            event = "teams.watcher.event_detected",
                            feed = self.kind.as_str(),
                            kind = ?event.kind,
                            paths = ?event.paths
                        );
                        for path in event.paths.into_iter().filter(|p| scanner::is_source_file(p)) {
                            if !changes.iter().any(|c| c.path == path) {
                                changes.push(FileChange {
                                    kind: self.kind,
                                    exists: path.exists(),
                                    path,
                                });
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        failure = Some(e.to_string());
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        failure = Some("event channel disconnected".to_string());
                        break;
                    }
                }
            }
        }

        if let Some(error) = failure {
            tracing::warn!(
                event = "teams.watcher.event_error",
                feed = self.kind.as_str(),
                path = %self.dir.display(),
                error = error
            );
            self.schedule_retry(now);
        }

        changes
    }

    fn resync(&self) -> Vec<FileChange> {
        scanner::list_source_files(&self.dir)
            .into_iter()
            .map(|path| FileChange {
                kind: self.kind,
                path,
                exists: true,
            })
            .collect()
    }
}

/// Check if an event is relevant (create/modify/remove of a `.json` file).
pub fn is_relevant_event(event: &Event) -> bool {
    let is_relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );

    if !is_relevant_kind {
        return false;
    }

    event.paths.iter().any(|p| scanner::is_source_file(p))
}
