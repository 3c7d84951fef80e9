//! Command-line parsing tests.

use clap::Parser;
use driftwatch::cli::{Cli, Commands};

#[test]
fn test_analyze_conversations_with_options() {
    let cli = Cli::try_parse_from([
        "driftwatch",
        "analyze",
        "--conversations",
        "sessions.json",
        "--model",
        "haiku",
        "--rules",
        "missed_command,skipped_tests",
        "--detailed",
        "--json",
    ])
    .unwrap();

    assert!(cli.json);
    let Commands::Analyze(args) = cli.command else {
        panic!("expected analyze command");
    };
    assert_eq!(args.conversations.unwrap().to_str(), Some("sessions.json"));
    assert_eq!(args.model.as_deref(), Some("haiku"));
    assert_eq!(args.rules, vec!["missed_command", "skipped_tests"]);
    assert!(args.detailed);
}

#[test]
fn test_analyze_requires_exactly_one_input() {
    assert!(Cli::try_parse_from(["driftwatch", "analyze"]).is_err());
    assert!(Cli::try_parse_from([
        "driftwatch",
        "analyze",
        "--conversations",
        "a.json",
        "--bundles",
        "b.json",
    ])
    .is_err());
}

#[test]
fn test_global_project_and_config() {
    let cli = Cli::try_parse_from([
        "driftwatch",
        "rules",
        "--project",
        "/work/app",
        "--config",
        "custom.yaml",
    ])
    .unwrap();

    assert!(matches!(cli.command, Commands::Rules));
    assert_eq!(cli.project.to_str(), Some("/work/app"));
    assert_eq!(cli.config.unwrap().to_str(), Some("custom.yaml"));
}
