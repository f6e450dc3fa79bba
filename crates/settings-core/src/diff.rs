// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Minimal override payloads between an edited section and its stored baseline.
//!
//! [`diff`] returns the smallest [`Patch`] that reproduces the edited value when
//! applied on top of the baseline. Values that match the schema defaults while no
//! baseline is stored count as unchanged. `None` means there is nothing to persist.

use std::collections::BTreeMap;

use serde_json::{Map, Value as J};

use crate::paths::{join, remove_dotted, slot_dotted};

/// A structural change to apply on top of a stored document
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replace the value wholesale
    Set(J),
    /// Remove the stored override
    Delete,
    /// Change individual keys; never empty
    Merge(BTreeMap<String, Patch>),
}

/// How a [`Patch`] is lowered into a request body
#[derive(Debug, Clone, PartialEq)]
pub struct WireFormat {
    /// Value written in place of a deleted key
    pub delete_marker: J,
}

impl Default for WireFormat {
    fn default() -> Self {
        Self {
            delete_marker: J::String(String::new()),
        }
    }
}

impl Patch {
    /// Lower the patch into plain JSON, encoding deletes with the wire marker
    pub fn to_wire(&self, wire: &WireFormat) -> J {
        match self {
            Patch::Set(value) => value.clone(),
            Patch::Delete => wire.delete_marker.clone(),
            Patch::Merge(entries) => J::Object(
                entries
                    .iter()
                    .map(|(key, patch)| (key.clone(), patch.to_wire(wire)))
                    .collect(),
            ),
        }
    }

    /// Dotted paths of every changed leaf, in key order
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        match self {
            Patch::Merge(entries) => {
                for (key, patch) in entries {
                    patch.collect_paths(&join(prefix, key), out);
                }
            }
            _ => out.push(prefix.to_string()),
        }
    }

    /// Single-key patch that sets `value` at a dotted field path
    pub fn at_path(field_path: &str, value: J) -> Patch {
        if field_path.is_empty() {
            return Patch::Set(value);
        }
        field_path
            .rsplit('.')
            .fold(Patch::Set(value), |inner, segment| {
                Patch::Merge(BTreeMap::from([(segment.to_string(), inner)]))
            })
    }

    /// Entry for `key` when this patch is a merge
    pub fn entry(&self, key: &str) -> Option<&Patch> {
        match self {
            Patch::Merge(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Patch::Delete)
    }
}

/// Compute the override payload for `current` against `baseline` and `defaults`.
///
/// `None` and `null` baselines or defaults are treated as absent. A `null` or empty
/// string `current` defers to the baseline and yields no delta.
pub fn diff(current: Option<&J>, baseline: Option<&J>, defaults: Option<&J>) -> Option<Patch> {
    let baseline = baseline.filter(|b| !b.is_null());
    let defaults = defaults.filter(|d| !d.is_null());

    match current? {
        J::Null => None,
        J::String(s) if s.is_empty() => None,
        current @ J::Array(items) => {
            if items.is_empty() && baseline.is_none() && defaults.is_none() {
                return None;
            }
            changed(current, baseline, defaults).then(|| Patch::Set(current.clone()))
        }
        current @ J::Object(entries) => match baseline {
            Some(stored) if !stored.is_object() => Some(Patch::Set(current.clone())),
            _ => diff_object(
                entries,
                baseline.and_then(J::as_object),
                defaults.and_then(J::as_object),
            ),
        },
        scalar => changed(scalar, baseline, defaults).then(|| Patch::Set(scalar.clone())),
    }
}

fn changed(current: &J, baseline: Option<&J>, defaults: Option<&J>) -> bool {
    match baseline {
        Some(stored) => stored != current,
        None => defaults != Some(current),
    }
}

fn diff_object(
    current: &Map<String, J>,
    baseline: Option<&Map<String, J>>,
    defaults: Option<&Map<String, J>>,
) -> Option<Patch> {
    let mut out = BTreeMap::new();

    for (key, value) in current {
        let stored = baseline.and_then(|b| b.get(key)).filter(|v| !v.is_null());
        if value.is_null() {
            // Cleared in the editor while an override is stored
            if stored.is_some() {
                out.insert(key.clone(), Patch::Delete);
            }
            continue;
        }
        if let Some(patch) = diff(Some(value), stored, defaults.and_then(|d| d.get(key))) {
            out.insert(key.clone(), patch);
        }
    }

    for key in baseline.into_iter().flat_map(Map::keys) {
        if !current.contains_key(key) {
            out.insert(key.clone(), Patch::Delete);
        }
    }

    (!out.is_empty()).then_some(Patch::Merge(out))
}

/// Apply a patch in place with object-patch semantics
pub fn apply_patch(target: &mut J, patch: &Patch) {
    match patch {
        Patch::Set(value) => *target = value.clone(),
        Patch::Delete => *target = J::Null,
        Patch::Merge(entries) => {
            if !target.is_object() {
                *target = J::Object(Map::new());
            }
            if let J::Object(map) = target {
                for (key, entry) in entries {
                    if entry.is_delete() {
                        map.remove(key);
                    } else {
                        apply_patch(map.entry(key.as_str()).or_insert(J::Null), entry);
                    }
                }
            }
        }
    }
}

/// Apply a patch at a dotted base path inside a whole document
pub fn apply_patch_at(document: &mut J, base_path: &str, patch: &Patch) {
    if patch.is_delete() {
        remove_dotted(document, base_path);
    } else {
        apply_patch(slot_dotted(document, base_path), patch);
    }
}
