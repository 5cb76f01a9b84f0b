use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("teamsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and follow agent teams and their task lists")
        .long_about("teamsync reads the team definitions and task lists that coding agents publish under ~/.claude, reconciles them into a live view of each team, and reports changes as they happen.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Emit logs as JSON on stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Config file to use instead of ~/.teamsync/config.toml")
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
