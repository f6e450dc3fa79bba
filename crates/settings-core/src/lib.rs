// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Schema resolution and differential override engine for camera/NVR settings.
//!
//! This crate turns the appliance's generated JSON schema into concrete per-section
//! schemas, computes minimal override payloads for edited sections at global and
//! per-camera scope, and decides whether persisting them requires a restart.
//! All operations work on serde_json::Value snapshots; persistence is delegated to
//! a [`ConfigPersister`].

pub mod defaults;
pub mod diff;
pub mod error;
pub mod extract;
pub mod loader;
pub mod normalize;
pub mod paths;
pub mod pending;
pub mod quirks;
pub mod resolve;
pub mod restart;
pub mod save;
pub mod shape;

pub use defaults::{apply_defaults, effective_defaults};
pub use diff::{apply_patch, apply_patch_at, diff, Patch, WireFormat};
pub use error::{Error, PersistError, Result};
pub use extract::{
    extract_section, SchemaVersion, SectionSchemaCache, VersionedSchema, CAMERA_DEFINITION,
};
pub use loader::{load_registry, parse_sections_toml};
pub use normalize::normalize;
pub use pending::PendingEdits;
pub use resolve::{resolve, resolve_and_strip, DefinitionTable};
pub use restart::{field_requires_restart, requires_restart};
pub use save::{
    plan_all, plan_section, save_pending, ConfigPersister, SaveCall, SaveContext, SaveOutcome,
    SavePlan, SectionFailure,
};
pub use shape::SchemaShape;

pub use nvr_config_types::{Scope, ScopeKind, SectionKey, SectionMeta, SectionRegistry};
