//! Enumerate team and task files on disk.
//!
//! Used for the initial full scan and after a watch restart, when events
//! may have been missed.

use std::path::{Path, PathBuf};

/// Extension of every file the engine reads.
pub const SOURCE_EXTENSION: &str = "json";

/// Whether a path looks like a team or task file.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// List the `.json` files directly inside `dir`, sorted by path.
///
/// Silently skips subdirectories and other files. A missing or unreadable
/// directory yields an empty list.
pub fn list_source_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(
                event = "teams.scanner.read_dir_failed",
                path = %dir.display(),
                error = %e
            );
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_source_file(path))
        .collect();
    files.sort();

    tracing::debug!(
        event = "teams.scanner.dir_scanned",
        path = %dir.display(),
        files = files.len()
    );

    files
}
