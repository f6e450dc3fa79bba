// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reading configuration documents and persisting section saves to files

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value as J;
use settings_core::{apply_patch_at, ConfigPersister, PersistError, SaveCall};
use tokio::sync::Mutex;
use tracing::debug;

/// Serialization of a configuration document on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yml` and `.yaml` files are YAML, everything else JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }

    pub fn parse(self, content: &str) -> Result<J> {
        match self {
            DocumentFormat::Json => Ok(serde_json::from_str(content)?),
            DocumentFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }

    pub fn render(self, document: &J) -> Result<String> {
        match self {
            DocumentFormat::Json => Ok(serde_json::to_string_pretty(document)? + "\n"),
            DocumentFormat::Yaml => Ok(serde_yaml::to_string(document)?),
        }
    }
}

/// Read a JSON or YAML document; an empty file reads as an empty object
pub fn read_document(path: &Path) -> Result<J> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(J::Object(Default::default()));
    }
    DocumentFormat::from_path(path)
        .parse(&content)
        .with_context(|| format!("parsing {:?}", path))
}

/// Replace `path` with `content` through a sibling temp file renamed over it, so
/// the original survives a failed or interrupted write. Existing permissions
/// are carried over.
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file next to {:?}", path))?;
    tmp.write_all(content.as_bytes())?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {:?}", path))?;
    Ok(())
}

/// Applies each save call to a document file, one call at a time
#[derive(Debug)]
pub struct FilePersister {
    path: PathBuf,
    format: DocumentFormat,
    lock: Mutex<()>,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            format: DocumentFormat::from_path(&path),
            path,
            lock: Mutex::new(()),
        }
    }

    async fn apply(&self, call: &SaveCall) -> Result<()> {
        let _guard = self.lock.lock().await;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {:?}", self.path))?;
        let mut document = if content.trim().is_empty() {
            J::Object(Default::default())
        } else {
            self.format.parse(&content)?
        };

        apply_patch_at(&mut document, &call.base_path, &call.payload);

        let rendered = self.format.render(&document)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &rendered)).await??;
        debug!(path = ?self.path, base_path = %call.base_path, "wrote section to config file");
        Ok(())
    }
}

#[async_trait]
impl ConfigPersister for FilePersister {
    async fn persist(&self, call: &SaveCall) -> std::result::Result<(), PersistError> {
        self.apply(call)
            .await
            .map_err(|e| PersistError::new(format!("{:#}", e)))
    }
}
