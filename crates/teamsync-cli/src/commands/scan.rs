use clap::ArgMatches;
use tracing::{error, info};

use teamsync::{EngineConfig, InMemorySessionRegistry, TeamEngine, TeamsError};

use super::load_engine_config;

pub(crate) fn handle_scan_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_engine_config(matches)?;

    info!(
        event = "cli.scan_started",
        teams_dir = %config.teams_dir.display(),
        tasks_dir = %config.tasks_dir.display()
    );

    let json = match render_teams(config) {
        Ok(json) => json,
        Err(e) => {
            error!(event = "cli.scan_failed", error = %e);
            eprintln!("Scan failed: {}", e);
            return Err(e.into());
        }
    };

    println!("{}", json);
    info!(event = "cli.scan_completed");
    Ok(())
}

/// One-shot reconciliation of both directories, rendered as pretty JSON.
fn render_teams(config: EngineConfig) -> Result<String, TeamsError> {
    let mut engine = TeamEngine::new(config, InMemorySessionRegistry::new(), Vec::new());
    engine.load()?;
    Ok(serde_json::to_string_pretty(&engine.get_teams())?)
}
