mod feeds;
mod global;

#[cfg(test)]
mod tests;

use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(feeds::scan_command())
        .subcommand(feeds::watch_command())
}
