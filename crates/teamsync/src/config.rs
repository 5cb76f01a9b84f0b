//! Engine configuration loading and merging.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones, field by field:
//! 1. **Hardcoded defaults** - `~/.claude/teams`, `~/.claude/tasks`, 200ms debounce, ...
//! 2. **User config** - `~/.teamsync/config.toml`, `[engine]` table
//! 3. **CLI arguments** - applied by the caller via [`EngineConfig::apply`]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use teamsync_paths::TeamsyncPaths;

use crate::debounce::DEFAULT_DEBOUNCE;
use crate::errors::ConfigError;
use crate::linker::DEFAULT_AUTO_LINK_WINDOW;
use crate::watcher::RetryPolicy;

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub teams_dir: PathBuf,
    pub tasks_dir: PathBuf,
    pub debounce: Duration,
    pub watch_retry_limit: u32,
    pub watch_retry_delay: Duration,
    pub auto_link_window: Duration,
}

/// Optional overrides, as read from the `[engine]` table or built from CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOverrides {
    pub teams_dir: Option<PathBuf>,
    pub tasks_dir: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub watch_retry_limit: Option<u32>,
    pub watch_retry_delay_ms: Option<u64>,
    pub auto_link_window_secs: Option<u64>,
}

/// On-disk config file layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub engine: EngineOverrides,
}

impl EngineConfig {
    /// Defaults rooted at the given directories.
    pub fn with_dirs(teams_dir: PathBuf, tasks_dir: PathBuf) -> Self {
        let retry = RetryPolicy::default();
        Self {
            teams_dir,
            tasks_dir,
            debounce: DEFAULT_DEBOUNCE,
            watch_retry_limit: retry.max_retries,
            watch_retry_delay: retry.delay,
            auto_link_window: DEFAULT_AUTO_LINK_WINDOW,
        }
    }

    /// Defaults for the standard `~/.claude` layout.
    pub fn defaults(paths: &TeamsyncPaths) -> Self {
        Self::with_dirs(paths.teams_dir(), paths.tasks_dir())
    }

    /// Load defaults merged with the user config file, if present.
    pub fn load(paths: &TeamsyncPaths) -> Result<Self, ConfigError> {
        Self::load_from(paths, &paths.user_config())
    }

    /// Load from the user's home directory.
    pub fn load_default() -> Result<Self, ConfigError> {
        let paths = TeamsyncPaths::resolve()?;
        Self::load(&paths)
    }

    /// Load defaults merged with a specific config file.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load_from(paths: &TeamsyncPaths, config_path: &Path) -> Result<Self, ConfigError> {
        let config = Self::defaults(paths);

        let config = match load_config_file(config_path)? {
            Some(file) => {
                tracing::debug!(
                    event = "teams.config.file_loaded",
                    path = %config_path.display()
                );
                config.apply(file.engine, paths.home())
            }
            None => config,
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides field by field. `~/` in paths expands against `home`.
    pub fn apply(self, overrides: EngineOverrides, home: &Path) -> Self {
        Self {
            teams_dir: overrides
                .teams_dir
                .map(|p| expand_home(&p, home))
                .unwrap_or(self.teams_dir),
            tasks_dir: overrides
                .tasks_dir
                .map(|p| expand_home(&p, home))
                .unwrap_or(self.tasks_dir),
            debounce: overrides
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(self.debounce),
            watch_retry_limit: overrides
                .watch_retry_limit
                .unwrap_or(self.watch_retry_limit),
            watch_retry_delay: overrides
                .watch_retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.watch_retry_delay),
            auto_link_window: overrides
                .auto_link_window_secs
                .map(Duration::from_secs)
                .unwrap_or(self.auto_link_window),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                message: "debounce_ms must be greater than 0".to_string(),
            });
        }
        if self.auto_link_window.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                message: "auto_link_window_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.watch_retry_limit,
            delay: self.watch_retry_delay,
        }
    }
}

fn load_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ConfigParseError {
            message: format!("'{}': {}", path.display(), e),
        })
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
