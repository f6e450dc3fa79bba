// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Turn pending section edits into persistence calls and issue them.
//!
//! Every pending identity goes through one extract, defaults, diff, sanitize and
//! restart-check cycle. Sections with no delta count as saved. Calls are issued one
//! at a time so that a failure leaves a well-defined set of still-pending edits;
//! sections that were already persisted are not rolled back.

use async_trait::async_trait;
use nvr_config_types::{SectionKey, SectionRegistry};
use serde_json::{json, Map, Value as J};
use tracing::{debug, error, info, warn};

use crate::defaults::effective_defaults;
use crate::diff::{diff, Patch, WireFormat};
use crate::error::{Error, PersistError, Result};
use crate::extract::{SectionSchemaCache, VersionedSchema};
use crate::paths::get_dotted;
use crate::pending::{camera_exists, PendingEdits};
use crate::quirks;
use crate::restart::requires_restart;

/// One section's persistence request
#[derive(Debug, Clone, PartialEq)]
pub struct SaveCall {
    pub key: SectionKey,
    /// Dotted document path the payload applies to
    pub base_path: String,
    pub payload: Patch,
    /// Subsystem notified after the document changes
    pub update_topic: String,
    pub needs_restart: bool,
}

impl SaveCall {
    /// Request body in the appliance's `config/set` shape
    pub fn request_body(&self, wire: &WireFormat) -> J {
        let mut config_data = Map::new();
        config_data.insert(self.base_path.clone(), self.payload.to_wire(wire));
        json!({
            "requires_restart": u8::from(self.needs_restart),
            "update_topic": self.update_topic,
            "config_data": config_data,
        })
    }
}

/// Persistence boundary; implementations own transport and retries
#[async_trait]
pub trait ConfigPersister: Send + Sync {
    async fn persist(&self, call: &SaveCall) -> std::result::Result<(), PersistError>;
}

/// Snapshot inputs shared by every section of one save
#[derive(Debug, Clone, Copy)]
pub struct SaveContext<'a> {
    pub document: &'a J,
    pub schema: &'a VersionedSchema,
    pub registry: &'a SectionRegistry,
    /// Restart policy for sections without declared restart paths
    pub default_restart: bool,
}

/// Stored value of a section, `None` when nothing is stored yet
pub fn baseline<'a>(document: &'a J, key: &SectionKey) -> Result<Option<&'a J>> {
    if !camera_exists(document, &key.scope) {
        return Err(Error::UnknownCamera {
            key: key.clone(),
            camera: key.scope.camera().unwrap_or_default().to_string(),
        });
    }
    Ok(get_dotted(document, &key.base_path()))
}

/// Plan the save of one section; `Ok(None)` when there is nothing to persist
pub fn plan_section(
    ctx: &SaveContext<'_>,
    cache: &mut SectionSchemaCache,
    key: &SectionKey,
    current: &J,
) -> Result<Option<SaveCall>> {
    let stored = baseline(ctx.document, key)?;

    let schema = cache.get_or_extract(ctx.schema, &key.path, key.scope.kind());
    if schema.is_none() {
        debug!(section = %key, "no schema for section; diffing without defaults");
    }
    let defaults = schema.as_deref().and_then(effective_defaults);
    let defaults = quirks::adjust_defaults(&key.path, defaults);

    let Some(payload) = diff(Some(current), stored, defaults.as_ref())
        .and_then(|delta| quirks::sanitize(&key.path, delta))
    else {
        debug!(section = %key, "section unchanged");
        return Ok(None);
    };

    let needs_restart = requires_restart(
        &payload,
        ctx.registry.restart_paths(&key.path),
        ctx.default_restart,
    );
    debug!(section = %key, paths = ?payload.paths(), needs_restart, "planned section save");

    Ok(Some(SaveCall {
        key: key.clone(),
        base_path: key.base_path(),
        payload,
        update_topic: ctx.registry.update_topic(key),
        needs_restart,
    }))
}

/// Calls to issue for a set of pending edits
#[derive(Debug, Default)]
pub struct SavePlan {
    pub calls: Vec<SaveCall>,
    /// Identities whose edits match what is already stored
    pub unchanged: Vec<SectionKey>,
    /// Identities whose baseline no longer exists
    pub invalidated: Vec<SectionKey>,
}

impl SavePlan {
    pub fn needs_restart(&self) -> bool {
        self.calls.iter().any(|call| call.needs_restart)
    }
}

/// Plan every pending edit; one identity failing to plan does not stop the rest
pub fn plan_all(
    edits: &PendingEdits,
    ctx: &SaveContext<'_>,
    cache: &mut SectionSchemaCache,
) -> SavePlan {
    let mut plan = SavePlan::default();
    for (key, current) in edits.iter() {
        match plan_section(ctx, cache, key, current) {
            Ok(Some(call)) => plan.calls.push(call),
            Ok(None) => plan.unchanged.push(key.clone()),
            Err(e) => {
                warn!(section = %key, error = %e, "pending edit can no longer be saved");
                plan.invalidated.push(key.clone());
            }
        }
    }
    plan
}

/// A section whose persistence call failed
#[derive(Debug, Clone, PartialEq)]
pub struct SectionFailure {
    pub key: SectionKey,
    pub error: PersistError,
}

/// Aggregate result of [`save_pending`]
#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub saved: Vec<SectionKey>,
    pub unchanged: Vec<SectionKey>,
    pub invalidated: Vec<SectionKey>,
    pub failed: Vec<SectionFailure>,
    /// Whether any persisted section requires a service restart
    pub needs_restart: bool,
}

impl SaveOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some sections persisted while others failed
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.saved.is_empty()
    }

    pub fn nothing_to_save(&self) -> bool {
        self.saved.is_empty() && self.failed.is_empty()
    }
}

/// Persist every pending edit sequentially.
///
/// Saved, unchanged and invalidated identities are removed from `edits`; only the
/// failed ones stay pending.
pub async fn save_pending<P>(
    edits: &mut PendingEdits,
    ctx: &SaveContext<'_>,
    cache: &mut SectionSchemaCache,
    persister: &P,
) -> SaveOutcome
where
    P: ConfigPersister + ?Sized,
{
    let plan = plan_all(edits, ctx, cache);
    let mut outcome = SaveOutcome {
        unchanged: plan.unchanged,
        invalidated: plan.invalidated,
        ..SaveOutcome::default()
    };

    for call in plan.calls {
        match persister.persist(&call).await {
            Ok(()) => {
                info!(
                    section = %call.key,
                    base_path = %call.base_path,
                    topic = %call.update_topic,
                    needs_restart = call.needs_restart,
                    "persisted section"
                );
                outcome.needs_restart |= call.needs_restart;
                outcome.saved.push(call.key);
            }
            Err(e) => {
                error!(section = %call.key, error = %e, "failed to persist section");
                outcome.failed.push(SectionFailure {
                    key: call.key,
                    error: e,
                });
            }
        }
    }

    edits.retain(|key| outcome.failed.iter().any(|f| &f.key == key));
    outcome
}
