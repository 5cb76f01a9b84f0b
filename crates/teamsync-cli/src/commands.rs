use std::path::PathBuf;

use clap::ArgMatches;
use tracing::{error, warn};

use teamsync::EngineConfig;
use teamsync::config::EngineOverrides;
use teamsync_paths::TeamsyncPaths;

mod scan;
mod watch;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("scan", sub_matches)) => scan::handle_scan_command(sub_matches),
        Some(("watch", sub_matches)) => watch::handle_watch_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

/// Resolve engine configuration for a subcommand.
///
/// A config file that fails to load is reported and replaced by defaults.
/// `--teams-dir` and `--tasks-dir` override whatever the file says.
fn load_engine_config(matches: &ArgMatches) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let paths = TeamsyncPaths::resolve().inspect_err(|e| {
        error!(event = "cli.config.paths_failed", error = %e);
        eprintln!("Could not resolve teamsync paths: {}", e);
    })?;

    let loaded = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load_from(&paths, path),
        None => EngineConfig::load(&paths),
    };

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.teamsync/config.toml for syntax errors.",
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            EngineConfig::defaults(&paths)
        }
    };

    Ok(config.apply(dir_overrides(matches), paths.home()))
}

fn dir_overrides(matches: &ArgMatches) -> EngineOverrides {
    EngineOverrides {
        teams_dir: matches.get_one::<PathBuf>("teams-dir").cloned(),
        tasks_dir: matches.get_one::<PathBuf>("tasks-dir").cloned(),
        ..Default::default()
    }
}
