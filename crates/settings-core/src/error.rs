// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the settings engine

use nvr_config_types::SectionKey;
use thiserror::Error;

/// Result type alias for settings engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by an external persistence collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct PersistError {
    pub message: String,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur while planning or persisting section saves
#[derive(Debug, Error)]
pub enum Error {
    #[error("Camera '{camera}' referenced by pending edit '{key}' no longer exists")]
    UnknownCamera { key: SectionKey, camera: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Section metadata schema validation failed:\n  - {0}")]
    SchemaValidation(String),

    #[error("Section metadata error: {0}")]
    Metadata(#[from] nvr_config_types::Error),

    #[error("Section metadata field error: {0}")]
    Field(String),
}
