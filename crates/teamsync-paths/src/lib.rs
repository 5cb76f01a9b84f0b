use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found; set the $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for everything teamsync reads or writes.
///
/// Two roots live under the home directory: `~/.teamsync/` for our own
/// files, and `~/.claude/` where agents publish team and task files. Use
/// `resolve()` in production code and `from_home()` in tests.
#[derive(Debug, Clone)]
pub struct TeamsyncPaths {
    home: PathBuf,
}

impl TeamsyncPaths {
    /// Resolve paths from the user's home directory.
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self { home })
    }

    /// Create paths from an explicit home directory. Use in tests.
    pub fn from_home(home: PathBuf) -> Self {
        Self { home }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    // --- Our own state ---

    /// The base `~/.teamsync` directory.
    pub fn teamsync_dir(&self) -> PathBuf {
        self.home.join(".teamsync")
    }

    pub fn user_config(&self) -> PathBuf {
        self.teamsync_dir().join("config.toml")
    }

    // --- Agent-published files ---

    pub fn claude_dir(&self) -> PathBuf {
        self.home.join(".claude")
    }

    /// Default team definitions directory: `~/.claude/teams/`.
    pub fn teams_dir(&self) -> PathBuf {
        self.claude_dir().join("teams")
    }

    /// Default task lists directory: `~/.claude/tasks/`.
    pub fn tasks_dir(&self) -> PathBuf {
        self.claude_dir().join("tasks")
    }

    /// Team file for a team name: `<teams_dir>/<team>.json`.
    pub fn team_file(teams_dir: &Path, team_name: &str) -> PathBuf {
        let safe_name = team_name.replace('/', "_");
        teams_dir.join(format!("{safe_name}.json"))
    }
}

/// Derive a team or task key from a file path (the file's base name).
///
/// Returns `None` for paths without a UTF-8 stem.
pub fn file_key(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths() -> TeamsyncPaths {
        TeamsyncPaths::from_home(PathBuf::from("/home/user"))
    }

    #[test]
    fn test_resolve_returns_ok_when_home_set() {
        // HOME is set in CI and dev environments
        let result = TeamsyncPaths::resolve();
        assert!(result.is_ok());
    }

    #[test]
    fn test_teamsync_dir() {
        assert_eq!(
            test_paths().teamsync_dir(),
            PathBuf::from("/home/user/.teamsync")
        );
    }

    #[test]
    fn test_user_config() {
        assert_eq!(
            test_paths().user_config(),
            PathBuf::from("/home/user/.teamsync/config.toml")
        );
    }

    #[test]
    fn test_teams_dir() {
        assert_eq!(
            test_paths().teams_dir(),
            PathBuf::from("/home/user/.claude/teams")
        );
    }

    #[test]
    fn test_tasks_dir() {
        assert_eq!(
            test_paths().tasks_dir(),
            PathBuf::from("/home/user/.claude/tasks")
        );
    }

    #[test]
    fn test_team_file_sanitizes_slashes() {
        assert_eq!(
            TeamsyncPaths::team_file(Path::new("/t"), "a/b"),
            PathBuf::from("/t/a_b.json")
        );
    }

    #[test]
    fn test_file_key() {
        assert_eq!(file_key(Path::new("/t/alpha.json")), Some("alpha"));
        assert_eq!(file_key(Path::new("/t/my.team.json")), Some("my.team"));
        assert_eq!(file_key(Path::new("/")), None);
    }
}
