use std::path::PathBuf;

use super::*;

#[test]
fn test_cli_build() {
    let app = build_cli();
    assert_eq!(app.get_name(), "teamsync");
}

#[test]
fn test_cli_requires_subcommand() {
    let app = build_cli();
    assert!(app.try_get_matches_from(vec!["teamsync"]).is_err());
}

#[test]
fn test_cli_scan_defaults() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec!["teamsync", "scan"]).unwrap();
    let scan = matches.subcommand_matches("scan").unwrap();
    assert!(scan.get_one::<PathBuf>("teams-dir").is_none());
    assert!(scan.get_one::<PathBuf>("tasks-dir").is_none());
    assert!(!matches.get_flag("verbose"));
}

#[test]
fn test_cli_scan_dirs() {
    let app = build_cli();
    let matches = app
        .try_get_matches_from(vec![
            "teamsync",
            "scan",
            "--teams-dir",
            "/tmp/teams",
            "--tasks-dir",
            "/tmp/tasks",
        ])
        .unwrap();
    let scan = matches.subcommand_matches("scan").unwrap();
    assert_eq!(
        scan.get_one::<PathBuf>("teams-dir").unwrap(),
        &PathBuf::from("/tmp/teams")
    );
    assert_eq!(
        scan.get_one::<PathBuf>("tasks-dir").unwrap(),
        &PathBuf::from("/tmp/tasks")
    );
}

#[test]
fn test_cli_watch_poll_ms() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec!["teamsync", "watch"]).unwrap();
    let watch = matches.subcommand_matches("watch").unwrap();
    assert_eq!(*watch.get_one::<u64>("poll-ms").unwrap(), 50);

    let app = build_cli();
    let matches = app
        .try_get_matches_from(vec!["teamsync", "watch", "--poll-ms", "250"])
        .unwrap();
    let watch = matches.subcommand_matches("watch").unwrap();
    assert_eq!(*watch.get_one::<u64>("poll-ms").unwrap(), 250);
}

#[test]
fn test_cli_watch_rejects_zero_poll() {
    let app = build_cli();
    let result = app.try_get_matches_from(vec!["teamsync", "watch", "--poll-ms", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_global_flags_after_subcommand() {
    let app = build_cli();
    let matches = app
        .try_get_matches_from(vec![
            "teamsync",
            "watch",
            "-v",
            "--json-logs",
            "--config",
            "/etc/teamsync.toml",
        ])
        .unwrap();
    assert!(matches.get_flag("verbose"));
    assert!(matches.get_flag("json-logs"));
    assert_eq!(
        matches.get_one::<PathBuf>("config").unwrap(),
        &PathBuf::from("/etc/teamsync.toml")
    );
}
