// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Strongly-typed identity and metadata types for the NVR settings engine.
//!
//! The configuration document itself stays field-agnostic (`serde_json::Value`);
//! this crate only describes *where* an edit lives (`SectionKey`) and the static,
//! per-section metadata the engine consults while saving (`SectionMeta`).

pub mod error;
pub mod scope;
pub mod section;

pub use error::{Error, Result};
pub use scope::{Scope, ScopeKind, SectionKey};
pub use section::{SectionMeta, SectionRegistry, SectionsFile};
