use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use clap::ArgMatches;
use tracing::{error, info, warn};

use teamsync::{FeedKind, InMemorySessionRegistry, TeamEngine, TeamEvent, WatchState};

use super::load_engine_config;

pub(crate) fn handle_watch_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick = Duration::from_millis(*matches.get_one::<u64>("poll-ms").unwrap_or(&50));
    let config = load_engine_config(matches)?;

    info!(
        event = "cli.watch_started",
        teams_dir = %config.teams_dir.display(),
        tasks_dir = %config.tasks_dir.display(),
        tick_ms = tick.as_millis() as u64
    );

    let (tx, rx) = mpsc::channel::<TeamEvent>();
    let mut engine = TeamEngine::new(config, InMemorySessionRegistry::new(), tx);
    if let Err(e) = engine.initialize() {
        error!(event = "cli.watch_failed", error = %e);
        eprintln!("Could not start watching: {}", e);
        return Err(e.into());
    }

    let mut abandoned: HashSet<FeedKind> = HashSet::new();
    loop {
        engine.poll(Instant::now());

        for event in rx.try_iter() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(event = "cli.watch.encode_failed", error = %e),
            }
        }

        for (kind, state) in engine.watch_states() {
            if state == WatchState::Abandoned && abandoned.insert(kind) {
                eprintln!(
                    "Warning: stopped watching {} after repeated failures; its view is now stale.",
                    kind.as_str()
                );
            }
        }

        thread::sleep(tick);
    }
}
