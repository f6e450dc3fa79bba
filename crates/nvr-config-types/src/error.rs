// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// Result type alias for section identity and metadata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing section identities or metadata
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid section key: {0}")]
    InvalidSectionKey(String),

    #[error("Invalid restart path pattern '{pattern}' for section '{section}'")]
    InvalidRestartPattern { section: String, pattern: String },

    #[error("Duplicate section metadata: {0}")]
    DuplicateSection(String),
}
