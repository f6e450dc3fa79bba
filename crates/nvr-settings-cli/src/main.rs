// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use nvr_logging::CliLogLevel;
use nvr_settings_cli::settings::CliSettings;
use nvr_settings_cli::{Cli, Parser};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries command output, logs go to stderr or a file
    cli.logging.clone().init("nvr-settings", CliLogLevel::default())?;

    let settings = CliSettings::load(cli.settings.as_deref(), &cli.flag_overrides())?;
    tracing::debug!(?settings, "resolved CLI settings");

    cli.command.run(&settings).await
}
