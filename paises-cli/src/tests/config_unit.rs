//! Focused unit tests covering CLI parsing and configuration layering.

use super::*;
use crate::show::{ShowArgs, ShowConfig};
use crate::sync::{SyncConfig, config_from_layers_for_test};
use camino::Utf8PathBuf;
use clap::Parser;
use paises_data::{DEFAULT_COUNTRIES_URL, DEFAULT_PROBE_URL};
use rstest::rstest;
use std::time::Duration;

#[rstest]
fn sync_defaults_apply_when_nothing_is_configured() {
    let config = SyncConfig::from(SyncArgs::default());
    assert_eq!(config.data_dir, Utf8PathBuf::from(DEFAULT_DATA_DIR));
    assert_eq!(config.api_url, DEFAULT_COUNTRIES_URL);
    assert_eq!(config.probe_url, DEFAULT_PROBE_URL);
    assert!(!config.offline);
    assert_eq!(config.known_bad, ["IOT", "SHN"]);
    assert_eq!(config.flag_timeout, Duration::from_secs(30));
}

#[rstest]
fn sync_flags_parse_into_arguments() {
    let cli = Cli::try_parse_from([
        "paises",
        "sync",
        "--data-dir",
        "/tmp/paises",
        "--offline",
        "--known-bad",
        " iot,shn ,,ata",
        "--flag-timeout-secs",
        "5",
    ])
    .expect("arguments parse");
    let Command::Sync(args) = cli.command else {
        panic!("expected the sync subcommand");
    };

    let config = SyncConfig::from(args);
    assert_eq!(config.data_dir, Utf8PathBuf::from("/tmp/paises"));
    assert!(config.offline);
    assert_eq!(config.known_bad, ["IOT", "SHN", "ATA"]);
    assert_eq!(config.flag_timeout, Duration::from_secs(5));
}

#[rstest]
fn unknown_subcommands_are_rejected() {
    let err = Cli::try_parse_from(["paises", "solve"]).expect_err("unknown subcommand");
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "data_dir": 42 }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "data_dir": "/from-file",
            "api_url": "https://file.test/all",
            "known_bad": ["xkx"],
        }),
        None,
    );
    composer.push_environment(json!({
        "data_dir": "/from-env",
        "offline": true,
    }));
    composer.push_cli(json!({ "data_dir": "/from-cli" }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.data_dir, Utf8PathBuf::from("/from-cli"));
    assert_eq!(config.api_url, "https://file.test/all");
    assert!(config.offline);
    assert_eq!(config.known_bad, ["XKX"]);
    assert_eq!(config.probe_url, DEFAULT_PROBE_URL);
}

#[rstest]
#[case::absent(None)]
#[case::blank(Some("  "))]
fn show_requires_a_code(#[case] code: Option<&str>) {
    let args = ShowArgs {
        code: code.map(str::to_owned),
        ..ShowArgs::default()
    };
    let err = ShowConfig::try_from(args).expect_err("missing code should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_SHOW_CODE);
            assert_eq!(env, ENV_SHOW_CODE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn show_normalises_the_code() {
    let cli = Cli::try_parse_from(["paises", "show", "prt"]).expect("arguments parse");
    let Command::Show(args) = cli.command else {
        panic!("expected the show subcommand");
    };
    let config = ShowConfig::try_from(args).expect("config should build");
    assert_eq!(config.code, "PRT");
    assert_eq!(config.data_dir, Utf8PathBuf::from(DEFAULT_DATA_DIR));
}

#[rstest]
fn subcommands_read_their_own_configuration_section() {
    use clap::CommandFactory;

    assert_eq!(SyncArgs::command().get_name(), "sync");
    assert_eq!(ShowArgs::command().get_name(), "show");
    assert!(ENV_SHOW_CODE.starts_with("PAISES_CMDS_SHOW_"));
}

#[rstest]
#[case::joined(serde_json::json!("ata, xkx"))]
#[case::listed(serde_json::json!(["ata", " xkx"]))]
fn known_bad_accepts_environment_lists(#[case] known_bad: serde_json::Value) {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_environment(json!({ "known_bad": known_bad }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.known_bad, ["ATA", "XKX"]);
}
