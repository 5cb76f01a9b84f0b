use std::path::PathBuf;

use clap::{Arg, Command};

fn dir_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("teams-dir")
                .long("teams-dir")
                .help("Directory holding team definition files (default: ~/.claude/teams)")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("tasks-dir")
                .long("tasks-dir")
                .help("Directory holding task list files (default: ~/.claude/tasks)")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

pub fn scan_command() -> Command {
    dir_args(Command::new("scan").about("Scan team and task files once and print the teams as JSON"))
}

pub fn watch_command() -> Command {
    dir_args(
        Command::new("watch")
            .about("Watch team and task files and print each change event as a JSON line"),
    )
    .arg(
        Arg::new("poll-ms")
            .long("poll-ms")
            .help("Event loop tick in milliseconds (default: 50)")
            .value_name("MS")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("50"),
    )
}
