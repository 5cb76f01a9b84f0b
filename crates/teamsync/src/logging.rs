//! Tracing subscriber setup for binaries embedding the engine.
//!
//! The library itself only emits `tracing` events; it never installs a
//! subscriber on its own.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
fn default_directive(quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else {
        "teamsync=info,teamsync_cli=info"
    }
}

/// Install a global fmt subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `quiet`. Calling this twice is harmless:
/// the second call leaves the first subscriber in place.
pub fn init_logging(quiet: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!(event = "teams.logging.already_initialized");
    }
}
