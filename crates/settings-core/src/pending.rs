// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-progress section edits keyed by section identity.

use std::collections::BTreeMap;

use nvr_config_types::{Scope, SectionKey};
use serde::{Deserialize, Serialize};
use serde_json::Value as J;
use tracing::debug;

use crate::paths::get_dotted;

/// Current values of every section with unsaved changes.
///
/// Serializes as a map from `"path"` / `"camera::path"` to the section value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingEdits {
    edits: BTreeMap<SectionKey, J>,
}

impl PendingEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current value of a section, replacing any earlier edit
    pub fn stage(&mut self, key: SectionKey, value: J) {
        self.edits.insert(key, value);
    }

    /// Drop an edit without saving it
    pub fn discard(&mut self, key: &SectionKey) -> Option<J> {
        self.edits.remove(key)
    }

    pub fn get(&self, key: &SectionKey) -> Option<&J> {
        self.edits.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionKey, &J)> {
        self.edits.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SectionKey> {
        self.edits.keys()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&SectionKey) -> bool) {
        self.edits.retain(|key, _| keep(key));
    }

    /// Drop edits whose camera no longer exists in `document`, returning their keys
    pub fn invalidate_stale(&mut self, document: &J) -> Vec<SectionKey> {
        let stale: Vec<SectionKey> = self
            .edits
            .keys()
            .filter(|key| !camera_exists(document, &key.scope))
            .cloned()
            .collect();
        for key in &stale {
            debug!(section = %key, "dropping pending edit for removed camera");
            self.edits.remove(key);
        }
        stale
    }
}

/// Whether the scope's baseline container is present in the document
pub fn camera_exists(document: &J, scope: &Scope) -> bool {
    match scope {
        Scope::Global => true,
        Scope::Camera(camera) => get_dotted(document, "cameras")
            .and_then(J::as_object)
            .is_some_and(|cameras| cameras.contains_key(camera)),
    }
}

impl FromIterator<(SectionKey, J)> for PendingEdits {
    fn from_iter<I: IntoIterator<Item = (SectionKey, J)>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_replaces_and_discard_removes() {
        let mut edits = PendingEdits::new();
        edits.stage(SectionKey::global("detect"), json!({"fps": 5}));
        edits.stage(SectionKey::global("detect"), json!({"fps": 10}));
        assert_eq!(edits.len(), 1);
        assert_eq!(edits.get(&SectionKey::global("detect")), Some(&json!({"fps": 10})));
        assert_eq!(edits.discard(&SectionKey::global("detect")), Some(json!({"fps": 10})));
        assert!(edits.is_empty());
    }

    #[test]
    fn test_serializes_with_string_keys() {
        let edits: PendingEdits = [
            (SectionKey::camera("yard", "motion"), json!({"threshold": 30})),
            (SectionKey::global("record"), json!({"enabled": true})),
        ]
        .into_iter()
        .collect();
        let encoded = serde_json::to_value(&edits).unwrap();
        assert_eq!(
            encoded,
            json!({"record": {"enabled": true}, "yard::motion": {"threshold": 30}})
        );
        let decoded: PendingEdits = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, edits);
    }

    #[test]
    fn test_invalidate_stale_cameras() {
        let mut edits: PendingEdits = [
            (SectionKey::camera("yard", "motion"), json!({})),
            (SectionKey::camera("garage", "detect"), json!({})),
            (SectionKey::global("record"), json!({})),
        ]
        .into_iter()
        .collect();
        let document = json!({"cameras": {"yard": {}}});
        assert_eq!(
            edits.invalidate_stale(&document),
            vec![SectionKey::camera("garage", "detect")]
        );
        assert_eq!(edits.len(), 2);
    }
}
