//! Error types for teamsync.

#[derive(Debug, thiserror::Error)]
pub enum TeamsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config file: {message}")]
    ConfigParseError { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Cannot resolve paths: {0}")]
    Paths(#[from] teamsync_paths::PathError),

    #[error("IO error reading config: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

/// Failures reported by the external session registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Session '{session_id}' not found")]
    SessionNotFound { session_id: String },

    #[error("Failed to close session '{session_id}': {message}")]
    CloseFailed { session_id: String, message: String },
}
