// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Decide whether persisting an override payload requires a service restart.
//!
//! Restart paths are dotted patterns where a `*` segment matches every element
//! of an array or every value of a map at that level. The live per-field check and
//! the pre-save check share one matcher: a field path becomes a single-key patch
//! first.

use serde_json::Value as J;

use crate::diff::Patch;

/// Position inside a patch, or inside a value set wholesale by a patch
#[derive(Debug, Clone, Copy)]
enum Cursor<'a> {
    Patch(&'a Patch),
    Value(&'a J),
}

impl<'a> Cursor<'a> {
    fn new(patch: &'a Patch) -> Self {
        match patch {
            Patch::Set(value) => Cursor::Value(value),
            other => Cursor::Patch(other),
        }
    }

    fn child(self, segment: &str) -> Option<Cursor<'a>> {
        match self {
            Cursor::Patch(patch) => patch.entry(segment).map(Cursor::new),
            Cursor::Value(J::Object(map)) => map.get(segment).map(Cursor::Value),
            Cursor::Value(J::Array(items)) => {
                items.get(segment.parse::<usize>().ok()?).map(Cursor::Value)
            }
            Cursor::Value(_) => None,
        }
    }

    fn children(self) -> Vec<Cursor<'a>> {
        match self {
            Cursor::Patch(Patch::Merge(entries)) => entries.values().map(Cursor::new).collect(),
            Cursor::Value(J::Object(map)) => map.values().map(Cursor::Value).collect(),
            Cursor::Value(J::Array(items)) => items.iter().map(Cursor::Value).collect(),
            _ => Vec::new(),
        }
    }

    fn matches(self, segments: &[&str]) -> bool {
        match segments.split_first() {
            None => true,
            Some((&"*", rest)) => self.children().into_iter().any(|c| c.matches(rest)),
            Some((segment, rest)) => self.child(segment).is_some_and(|c| c.matches(rest)),
        }
    }
}

/// Whether `pattern` names a path that is present in `delta`
pub fn pattern_matches(delta: &Patch, pattern: &str) -> bool {
    let segments: Vec<&str> = pattern.split('.').collect();
    Cursor::new(delta).matches(&segments)
}

/// Evaluate a section's restart paths against an override payload.
///
/// `None` falls back to `default_policy`; an empty list never requires a restart.
pub fn requires_restart(
    delta: &Patch,
    restart_paths: Option<&[String]>,
    default_policy: bool,
) -> bool {
    match restart_paths {
        None => default_policy,
        Some(patterns) => patterns.iter().any(|p| pattern_matches(delta, p)),
    }
}

/// Restart check for a single field being edited
pub fn field_requires_restart(
    field_path: &str,
    restart_paths: Option<&[String]>,
    default_policy: bool,
) -> bool {
    let single = Patch::at_path(field_path, J::Bool(true));
    requires_restart(&single, restart_paths, default_policy)
}
