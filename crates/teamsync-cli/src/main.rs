use teamsync::logging::init_logging;

mod app;
mod commands;

fn main() {
    let app = app::build_cli();
    let matches = app.get_matches();

    let verbose = matches.get_flag("verbose");
    let json_logs = matches.get_flag("json-logs");
    init_logging(!verbose, json_logs);

    if let Err(e) = commands::run_command(&matches) {
        // Already reported on stderr by the handler
        drop(e);
        std::process::exit(1);
    }
}
