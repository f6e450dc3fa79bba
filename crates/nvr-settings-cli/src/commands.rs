// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only
#![allow(clippy::disallowed_methods)] // CLI commands intentionally print to stdout/stderr

//! Command implementations
//!
//! Each command builds a JSON report so it can be checked without capturing stdout;
//! [`Commands::run`] prints it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value as J};
use settings_core::quirks::adjust_defaults;
use settings_core::{
    effective_defaults, field_requires_restart, load_registry, plan_all, save_pending,
    PendingEdits, SaveContext, SaveOutcome, SectionKey, SectionRegistry, SectionSchemaCache,
    VersionedSchema, WireFormat,
};
use tracing::{info, info_span, Instrument};

use crate::persist::{read_document, write_atomically, FilePersister};
use crate::settings::CliSettings;
use crate::Commands;

/// Inputs every command works against
pub struct Workspace {
    pub schema: VersionedSchema,
    pub registry: SectionRegistry,
    pub default_restart: bool,
    cache: SectionSchemaCache,
}

impl Workspace {
    pub fn new(schema: VersionedSchema, registry: SectionRegistry, default_restart: bool) -> Self {
        Self {
            schema,
            registry,
            default_restart,
            cache: SectionSchemaCache::new(),
        }
    }

    pub fn load(settings: &CliSettings) -> Result<Self> {
        let schema_path = settings.schema_path()?;
        let root = read_document(schema_path)?;
        let registry = load_registry(settings.sections.as_deref())
            .context("loading section metadata")?;
        Ok(Self::new(
            VersionedSchema::new(root),
            registry,
            settings.default_restart,
        ))
    }

    /// Resolved schema of one section, or its effective defaults
    pub fn section(&mut self, key: &SectionKey, defaults: bool) -> Result<J> {
        let schema = self
            .cache
            .get_or_extract(&self.schema, &key.path, key.scope.kind())
            .with_context(|| format!("no schema for section '{}'", key))?;
        if !defaults {
            return Ok(schema.as_ref().clone());
        }
        let defaults = adjust_defaults(&key.path, effective_defaults(&schema));
        Ok(defaults.unwrap_or(J::Null))
    }

    /// Request bodies that saving `edits` against `document` would issue
    pub fn plan(&mut self, document: &J, edits: &PendingEdits) -> J {
        let ctx = SaveContext {
            document,
            schema: &self.schema,
            registry: &self.registry,
            default_restart: self.default_restart,
        };
        let plan = plan_all(edits, &ctx, &mut self.cache);
        let wire = WireFormat::default();
        json!({
            "calls": plan.calls.iter().map(|c| c.request_body(&wire)).collect::<Vec<_>>(),
            "unchanged": keys(&plan.unchanged),
            "invalidated": keys(&plan.invalidated),
            "requires_restart": plan.needs_restart(),
        })
    }

    /// Save `edits` into the document at `config_path`; failed sections stay in `edits`
    pub async fn apply(
        &mut self,
        config_path: &Path,
        edits: &mut PendingEdits,
    ) -> Result<SaveOutcome> {
        let document = read_document(config_path)?;
        let persister = FilePersister::new(config_path);
        let ctx = SaveContext {
            document: &document,
            schema: &self.schema,
            registry: &self.registry,
            default_restart: self.default_restart,
        };
        let span = info_span!(
            "apply",
            correlation_id = %nvr_logging::correlation_id(),
            sections = edits.len()
        );
        let outcome = save_pending(edits, &ctx, &mut self.cache, &persister)
            .instrument(span)
            .await;
        Ok(outcome)
    }

    pub fn restart_check(&self, key: &SectionKey, field: &str) -> bool {
        field_requires_restart(
            field,
            self.registry.restart_paths(&key.path),
            self.default_restart,
        )
    }
}

fn keys(keys: &[SectionKey]) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

/// JSON report of a finished save
pub fn outcome_report(outcome: &SaveOutcome) -> J {
    json!({
        "saved": keys(&outcome.saved),
        "unchanged": keys(&outcome.unchanged),
        "invalidated": keys(&outcome.invalidated),
        "failed": outcome.failed.iter().map(|f| json!({
            "section": f.key.to_string(),
            "error": f.error.message,
        })).collect::<Vec<_>>(),
        "requires_restart": outcome.needs_restart,
    })
}

pub fn read_edits(path: &Path) -> Result<PendingEdits> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(PendingEdits::new());
    }
    serde_json::from_str(&content).with_context(|| format!("parsing edits {:?}", path))
}

pub fn write_edits(path: &Path, edits: &PendingEdits) -> Result<()> {
    let content = serde_json::to_string_pretty(edits)? + "\n";
    write_atomically(path, &content)
}

fn print_json(value: &J) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Commands {
    pub async fn run(self, settings: &CliSettings) -> Result<()> {
        let mut workspace = Workspace::load(settings)?;
        match self {
            Commands::Section { key, defaults } => print_json(&workspace.section(&key, defaults)?),
            Commands::Plan { edits } => {
                let document = read_document(settings.config_path()?)?;
                let pending = read_edits(&edits)?;
                print_json(&workspace.plan(&document, &pending))
            }
            Commands::Apply { edits } => {
                let mut pending = read_edits(&edits)?;
                let outcome = workspace.apply(settings.config_path()?, &mut pending).await?;
                write_edits(&edits, &pending)?;
                print_json(&outcome_report(&outcome))?;

                if !outcome.is_success() {
                    bail!(
                        "{} section(s) failed to save; they remain in {:?}",
                        outcome.failed.len(),
                        edits
                    );
                }
                if outcome.nothing_to_save() {
                    info!("no changes to save");
                }
                Ok(())
            }
            Commands::RestartCheck { key, field } => {
                print_json(&J::Bool(workspace.restart_check(&key, &field)))
            }
        }
    }
}
