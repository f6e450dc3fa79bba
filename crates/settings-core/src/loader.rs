// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Section metadata loading and validation

use std::path::Path;
use std::sync::OnceLock;

use jsonschema::{Draft, JSONSchema};
use nvr_config_types::{SectionRegistry, SectionsFile};
use serde_json::Value as J;
use tracing::debug;

use crate::error::{Error, Result};

/// Parse a `sections.toml` overlay, validating it before deserialization
pub fn parse_sections_toml(content: &str) -> Result<SectionsFile> {
    let toml: toml::Value = content.parse::<toml::Value>()?;
    let json = serde_json::to_value(toml)?;
    validate_sections(&json)?;
    serde_path_to_error::deserialize(json).map_err(|e| Error::Field(e.to_string()))
}

/// Validate JSON against the generated metadata schema
pub fn validate_sections(v: &J) -> Result<()> {
    static SCHEMA: OnceLock<J> = OnceLock::new();
    let schema = SCHEMA.get_or_init(|| {
        let rs = schemars::schema_for!(SectionsFile);
        serde_json::to_value(rs).unwrap_or(J::Bool(true))
    });

    static VALIDATOR: OnceLock<std::result::Result<JSONSchema, String>> = OnceLock::new();
    let validator = VALIDATOR
        .get_or_init(|| {
            JSONSchema::options()
                .with_draft(Draft::Draft202012)
                .compile(schema)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| Error::SchemaValidation(e.clone()))?;

    if let Err(errors) = validator.validate(v) {
        let error_msg = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("\n  - ");
        return Err(Error::SchemaValidation(error_msg));
    }
    Ok(())
}

/// Built-in section metadata, overlaid by the file at `path` when given
pub fn load_registry(path: Option<&Path>) -> Result<SectionRegistry> {
    let mut registry = SectionRegistry::builtin();
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)?;
        let file = parse_sections_toml(&content)?;
        debug!(path = %path.display(), sections = file.section.len(), "loaded section metadata overlay");
        registry.overlay(file)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_valid_overlay() {
        let file = parse_sections_toml(
            r#"
            [[section]]
            path = "record"
            restart-required = ["enabled"]
        "#,
        )
        .unwrap();
        assert_eq!(file.section[0].restart_required, Some(vec!["enabled".to_string()]));
    }

    #[test]
    fn test_schema_rejects_wrong_types() {
        let err = parse_sections_toml(
            r#"
            [[section]]
            path = "record"
            restart-required = "enabled"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::SchemaValidation(_)), "{err}");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(parse_sections_toml("[[section"), Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_registry_overlay_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[section]]
            path = "ffmpeg"
            restart-required = ["inputs"]
        "#
        )
        .unwrap();

        let registry = load_registry(Some(file.path())).unwrap();
        assert_eq!(registry.restart_paths("ffmpeg").unwrap(), &["inputs".to_string()]);
        assert_eq!(registry.restart_paths("motion"), Some(&[][..]));

        let builtin = load_registry(None).unwrap();
        assert_eq!(builtin.restart_paths("ffmpeg"), None);
    }

    #[test]
    fn test_overlay_with_bad_pattern_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[section]]\npath = \"zones\"\nrestart-required = [\"*coordinates\"]").unwrap();
        assert!(matches!(
            load_registry(Some(file.path())),
            Err(Error::Metadata(nvr_config_types::Error::InvalidRestartPattern { .. }))
        ));
    }
}
