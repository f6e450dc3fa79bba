// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Locate, resolve and normalize the schema of one configuration section.
//!
//! Global sections live in the root schema's `properties`; per-camera sections live
//! in the properties of the camera definition. Results are cached per schema
//! version in a bounded [`SectionSchemaCache`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nvr_config_types::ScopeKind;
use serde_json::Value as J;
use tracing::debug;

use crate::normalize::{is_null_schema, normalize};
use crate::resolve::{inline_ref, resolve, strip_definitions, DefinitionTable};

/// Definition holding the per-camera schema
pub const CAMERA_DEFINITION: &str = "CameraConfig";

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Process-wide, monotonically increasing identity of a loaded root schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(u64);

impl SchemaVersion {
    fn next() -> Self {
        Self(NEXT_VERSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A root schema paired with its version; every fetch gets a fresh version
#[derive(Debug, Clone)]
pub struct VersionedSchema {
    version: SchemaVersion,
    root: Arc<J>,
}

impl VersionedSchema {
    pub fn new(root: J) -> Self {
        Self {
            version: SchemaVersion::next(),
            root: Arc::new(root),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn root(&self) -> &J {
        &self.root
    }
}

/// Resolved, normalized schema of one section, or `None` if the path does not exist
pub fn extract_section(root: &J, section_path: &str, scope: ScopeKind) -> Option<J> {
    let defs = DefinitionTable::from_root(root);
    let mut container = match scope {
        ScopeKind::Global => root.clone(),
        ScopeKind::Camera => defs.get(CAMERA_DEFINITION)?.clone(),
    };

    let mut located = None;
    for segment in section_path.split('.') {
        let object = object_view(&container, &defs)?;
        let property = object.get("properties")?.get(segment)?;
        container = property.clone();
        located = Some(property.clone());
    }

    let mut section = resolve(&inline_ref(&located?, &defs), &defs);
    strip_definitions(&mut section);
    Some(normalize(&section))
}

/// The node, or its first non-null union branch, with a top-level `$ref` inlined
/// and composition flattened, as long as it declares `properties`
fn object_view(node: &J, defs: &DefinitionTable<'_>) -> Option<J> {
    let node = inline_ref(node, defs);
    if node.get("properties").is_some() {
        return Some(node);
    }
    if node.get("allOf").is_some() {
        let flattened = resolve(&node, defs);
        return flattened.get("properties").is_some().then_some(flattened);
    }
    ["anyOf", "oneOf"]
        .iter()
        .find_map(|key| node.get(*key).and_then(J::as_array))?
        .iter()
        .filter(|branch| !is_null_schema(branch))
        .find_map(|branch| object_view(branch, defs))
}

type CacheKey = (SchemaVersion, ScopeKind, String);

/// Size-bounded cache of extracted section schemas, evicting the oldest entry first
#[derive(Debug)]
pub struct SectionSchemaCache {
    capacity: usize,
    entries: HashMap<CacheKey, Option<Arc<J>>>,
    order: VecDeque<CacheKey>,
}

impl Default for SectionSchemaCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl SectionSchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Cached section schema, extracting it on a miss. Absent sections are
    /// remembered as absent.
    pub fn get_or_extract(
        &mut self,
        schema: &VersionedSchema,
        section_path: &str,
        scope: ScopeKind,
    ) -> Option<Arc<J>> {
        let key = (schema.version(), scope, section_path.to_string());
        if let Some(hit) = self.entries.get(&key) {
            debug!(version = %schema.version(), section = section_path, %scope, "section schema cache hit");
            return hit.clone();
        }

        debug!(version = %schema.version(), section = section_path, %scope, "section schema cache miss");
        let extracted = extract_section(schema.root(), section_path, scope).map(Arc::new);
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, extracted.clone());
        extracted
    }

    /// Drop every entry of one schema version, returning how many were dropped
    pub fn invalidate(&mut self, version: SchemaVersion) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(v, _, _), _| *v != version);
        self.order.retain(|(v, _, _)| *v != version);
        let dropped = before - self.entries.len();
        debug!(%version, dropped, "invalidated section schema cache");
        dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
