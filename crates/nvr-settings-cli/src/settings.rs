// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Layered runtime settings for the CLI
//!
//! Precedence order: settings file < NVR_SETTINGS_* environment < flags

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "NVR_SETTINGS";

/// Resolved paths and policies shared by every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliSettings {
    /// Root JSON schema of the configuration document
    pub schema: Option<PathBuf>,
    /// Stored configuration document (JSON or YAML)
    pub config: Option<PathBuf>,
    /// Section metadata overlay (TOML)
    pub sections: Option<PathBuf>,
    /// Restart policy for sections without declared restart paths
    pub default_restart: bool,
}

/// Values given on the command line; `None` leaves lower layers in effect
#[derive(Debug, Clone, Default)]
pub struct FlagOverrides {
    pub schema: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub sections: Option<PathBuf>,
    pub default_restart: Option<bool>,
}

impl CliSettings {
    /// Load settings from the process environment
    pub fn load(settings_file: Option<&Path>, flags: &FlagOverrides) -> Result<Self> {
        Self::load_with_env(settings_file, None, flags)
    }

    /// Load settings, reading environment variables from `env` instead of the
    /// process environment when given
    pub fn load_with_env(
        settings_file: Option<&Path>,
        env: Option<config::Map<String, String>>,
        flags: &FlagOverrides,
    ) -> Result<Self> {
        let mut builder = config::Config::builder().set_default("default-restart", true)?;

        if let Some(path) = settings_file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        // NVR_SETTINGS_DEFAULT_RESTART -> "default-restart"; a single `_` stays
        // inside the key, `__` nests
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .convert_case(config::Case::Kebab)
                .try_parsing(true)
                .source(env),
        );

        builder = builder
            .set_override_option("schema", path_value(&flags.schema))?
            .set_override_option("config", path_value(&flags.config))?
            .set_override_option("sections", path_value(&flags.sections))?
            .set_override_option("default-restart", flags.default_restart)?;

        let built = builder.build().context("building CLI settings")?;
        built
            .try_deserialize()
            .context("reading CLI settings")
    }

    pub fn schema_path(&self) -> Result<&Path> {
        self.schema
            .as_deref()
            .context("no schema given (use --schema or NVR_SETTINGS_SCHEMA)")
    }

    pub fn config_path(&self) -> Result<&Path> {
        self.config
            .as_deref()
            .context("no config document given (use --config or NVR_SETTINGS_CONFIG)")
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = CliSettings::load_with_env(None, env(&[]), &FlagOverrides::default()).unwrap();
        assert_eq!(
            settings,
            CliSettings {
                schema: None,
                config: None,
                sections: None,
                default_restart: true,
            }
        );
        assert!(settings.schema_path().is_err());
    }

    #[test]
    fn test_layer_precedence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "schema = \"/from/file/schema.json\"\nconfig = \"/from/file/config.yml\"\ndefault-restart = false"
        )
        .unwrap();

        let from_file =
            CliSettings::load_with_env(Some(file.path()), env(&[]), &FlagOverrides::default())
                .unwrap();
        assert_eq!(from_file.schema, Some(PathBuf::from("/from/file/schema.json")));
        assert!(!from_file.default_restart);

        let env_vars = env(&[
            ("NVR_SETTINGS_CONFIG", "/from/env/config.yml"),
            ("NVR_SETTINGS_DEFAULT_RESTART", "true"),
        ]);
        let flags = FlagOverrides {
            schema: Some(PathBuf::from("/from/flag/schema.json")),
            ..Default::default()
        };
        let layered = CliSettings::load_with_env(Some(file.path()), env_vars, &flags).unwrap();
        assert_eq!(layered.schema, Some(PathBuf::from("/from/flag/schema.json")));
        assert_eq!(layered.config, Some(PathBuf::from("/from/env/config.yml")));
        assert!(layered.default_restart);
        assert_eq!(layered.sections, None);
    }

    #[test]
    fn test_env_overrides_multi_word_key() {
        let settings = CliSettings::load_with_env(
            None,
            env(&[("NVR_SETTINGS_DEFAULT_RESTART", "false")]),
            &FlagOverrides::default(),
        )
        .unwrap();
        assert!(!settings.default_restart);

        let flags = FlagOverrides {
            default_restart: Some(true),
            ..Default::default()
        };
        let flagged = CliSettings::load_with_env(
            None,
            env(&[("NVR_SETTINGS_DEFAULT_RESTART", "false")]),
            &flags,
        )
        .unwrap();
        assert!(flagged.default_restart);
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(CliSettings::load_with_env(Some(&missing), env(&[]), &FlagOverrides::default()).is_err());
    }
}
