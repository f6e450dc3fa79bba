// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::path::{Path, PathBuf};

use nvr_config_types::SectionKey;
use nvr_settings_cli::commands::{outcome_report, read_edits, write_edits, Workspace};
use nvr_settings_cli::persist::read_document;
use nvr_settings_cli::settings::CliSettings;
use nvr_settings_cli::{Cli, Commands, Parser};
use pretty_assertions::assert_eq;
use serde_json::json;
use settings_core::{PendingEdits, SectionRegistry, VersionedSchema};

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../settings-core/tests/fixtures/nvr_schema.json")
}

fn workspace(default_restart: bool) -> Workspace {
    let root = read_document(&fixture_path()).unwrap();
    Workspace::new(
        VersionedSchema::new(root),
        SectionRegistry::builtin(),
        default_restart,
    )
}

const STORED_YAML: &str = "\
mqtt:
  host: broker.local
detect:
  fps: 5
  width: 1280
cameras:
  front:
    record:
      enabled: true
";

#[test]
fn parses_section_command_with_camera_key() {
    let cli = Cli::try_parse_from([
        "nvr-settings",
        "--schema",
        "schema.json",
        "section",
        "front::motion",
        "--defaults",
    ])
    .unwrap();
    assert_eq!(cli.schema, Some(PathBuf::from("schema.json")));
    assert_eq!(
        cli.command,
        Commands::Section {
            key: SectionKey::camera("front", "motion"),
            defaults: true,
        }
    );
    assert_eq!(cli.flag_overrides().default_restart, None);
}

#[test]
fn global_flags_are_accepted_after_the_subcommand() {
    let cli = Cli::try_parse_from([
        "nvr-settings",
        "restart-check",
        "logger",
        "logs.frigate.record",
        "--default-restart",
        "false",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(
        cli.command,
        Commands::RestartCheck {
            key: SectionKey::global("logger"),
            field: "logs.frigate.record".to_string(),
        }
    );
    assert_eq!(cli.default_restart, Some(false));
    assert!(cli.logging.log_level.is_some());
}

#[test]
fn rejects_malformed_section_keys() {
    assert!(Cli::try_parse_from(["nvr-settings", "section", "front::"]).is_err());
    assert!(Cli::try_parse_from(["nvr-settings", "section", "detect..fps"]).is_err());
}

#[test]
fn section_defaults_follow_the_schema() {
    let mut ws = workspace(true);
    let defaults = ws.section(&SectionKey::global("mqtt"), true).unwrap();
    assert_eq!(defaults, json!({"enabled": true, "host": "", "port": 1883}));

    let schema = ws.section(&SectionKey::camera("front", "detect"), false).unwrap();
    assert!(schema["properties"].get("fps").is_some());

    assert!(ws.section(&SectionKey::global("no_such_section"), false).is_err());
}

#[test]
fn detector_defaults_are_suppressed() {
    let mut ws = workspace(true);
    let defaults = ws.section(&SectionKey::global("detectors"), true).unwrap();
    assert_eq!(defaults, serde_json::Value::Null);
}

#[test]
fn plan_reports_bodies_and_invalidated_sections() {
    let mut ws = workspace(true);
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yml");
    std::fs::write(&config, STORED_YAML).unwrap();
    let document = read_document(&config).unwrap();

    let edits: PendingEdits = [
        (SectionKey::global("detect"), json!({"fps": 10, "width": 1280})),
        (SectionKey::global("mqtt"), json!({"host": "broker.local"})),
        (SectionKey::camera("garage", "record"), json!({"enabled": false})),
    ]
    .into_iter()
    .collect();

    let report = ws.plan(&document, &edits);
    assert_eq!(
        report,
        json!({
            "calls": [{
                "requires_restart": 1,
                "update_topic": "config/detect",
                "config_data": {"detect": {"fps": 10}}
            }],
            "unchanged": ["mqtt"],
            "invalidated": ["garage::record"],
            "requires_restart": true
        })
    );
}

#[test]
fn restart_check_uses_section_metadata() {
    let ws = workspace(false);
    assert!(ws.restart_check(&SectionKey::global("logger"), "logs.frigate.record"));
    assert!(!ws.restart_check(&SectionKey::camera("front", "motion"), "threshold"));
    assert!(ws.restart_check(&SectionKey::camera("front", "zones"), "driveway.coordinates"));
    assert!(!ws.restart_check(&SectionKey::global("mqtt"), "host"));
    assert!(workspace(true).restart_check(&SectionKey::global("mqtt"), "host"));
}

#[tokio::test]
async fn apply_writes_config_and_clears_saved_edits() {
    let mut ws = workspace(false);
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yml");
    std::fs::write(&config, STORED_YAML).unwrap();

    let mut edits: PendingEdits = [
        (SectionKey::global("detect"), json!({"fps": 10, "width": 1280})),
        (SectionKey::camera("front", "record"), json!({"enabled": false})),
    ]
    .into_iter()
    .collect();

    let outcome = ws.apply(&config, &mut edits).await.unwrap();
    assert!(outcome.is_success());
    assert!(edits.is_empty());
    assert_eq!(
        outcome_report(&outcome),
        json!({
            "saved": ["detect", "front::record"],
            "unchanged": [],
            "invalidated": [],
            "failed": [],
            "requires_restart": true
        })
    );

    let saved = read_document(&config).unwrap();
    assert_eq!(saved["detect"], json!({"fps": 10, "width": 1280}));
    assert_eq!(saved["cameras"]["front"]["record"], json!({"enabled": false}));
    assert_eq!(saved["mqtt"], json!({"host": "broker.local"}));
}

#[tokio::test]
async fn apply_command_rewrites_the_edits_file() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.json");
    std::fs::copy(fixture_path(), &schema).unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"mqtt": {"host": "broker.local"}}"#).unwrap();
    let edits_path = dir.path().join("edits.json");
    std::fs::write(&edits_path, r#"{"mqtt": {"host": "broker.lan"}}"#).unwrap();

    let settings = CliSettings {
        schema: Some(schema),
        config: Some(config.clone()),
        sections: None,
        default_restart: true,
    };
    Commands::Apply {
        edits: edits_path.clone(),
    }
    .run(&settings)
    .await
    .unwrap();

    assert!(read_edits(&edits_path).unwrap().is_empty());
    assert_eq!(read_document(&config).unwrap()["mqtt"], json!({"host": "broker.lan"}));
}

#[test]
fn edits_file_round_trips_section_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edits.json");
    let edits: PendingEdits = [
        (SectionKey::camera("front", "motion"), json!({"threshold": 30})),
        (SectionKey::global("detect"), json!({"fps": 10})),
    ]
    .into_iter()
    .collect();
    write_edits(&path, &edits).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["front::motion"], json!({"threshold": 30}));
    assert_eq!(read_edits(&path).unwrap(), edits);
}
