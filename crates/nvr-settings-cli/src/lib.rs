// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::Subcommand;
use nvr_config_types::SectionKey;
use nvr_logging::CliLoggingArgs;
use std::path::PathBuf;

pub mod commands;
pub mod persist;
pub mod settings;

pub use clap::Parser;

#[derive(clap::Parser)]
#[command(
    name = "nvr-settings",
    about = "Resolve section schemas and compute override saves for NVR configuration",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Settings file (TOML) providing defaults for the options below
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    /// Root JSON schema of the configuration document
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,
    /// Stored configuration document (JSON or YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Section metadata overlay (TOML)
    #[arg(long, global = true)]
    pub sections: Option<PathBuf>,
    /// Restart policy for sections without declared restart paths
    #[arg(long, global = true)]
    pub default_restart: Option<bool>,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn flag_overrides(&self) -> settings::FlagOverrides {
        settings::FlagOverrides {
            schema: self.schema.clone(),
            config: self.config.clone(),
            sections: self.sections.clone(),
            default_restart: self.default_restart,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print the resolved schema of one section
    Section {
        /// Section identity: `path` or `camera::path`
        key: SectionKey,
        /// Print the section's effective defaults instead of its schema
        #[arg(long)]
        defaults: bool,
    },
    /// Print the request bodies that saving pending edits would issue
    Plan {
        /// JSON file mapping section identities to edited values
        #[arg(long)]
        edits: PathBuf,
    },
    /// Save pending edits into the config document
    Apply {
        /// JSON file mapping section identities to edited values; failed
        /// sections are written back to it
        #[arg(long)]
        edits: PathBuf,
    },
    /// Check whether changing a field requires a service restart
    RestartCheck {
        /// Section identity: `path` or `camera::path`
        key: SectionKey,
        /// Dotted field path inside the section
        field: String,
    },
}
