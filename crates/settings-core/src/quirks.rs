// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Section-specific corrections applied to override payloads before saving.
//!
//! Each quirk is one row of [`QUIRKS`]: a section path, a [`SanitizeRule`] run on
//! the computed delta and a [`DefaultsRule`] run on the section's schema defaults.

use std::collections::BTreeMap;

use serde_json::{Map, Value as J};

use crate::diff::Patch;
use crate::paths::join;

/// Correction applied to a section's delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeRule {
    None,
    /// Remove backend-generated fields from the section itself
    StripFields(&'static [&'static str]),
    /// Remove backend-generated fields from every entry of a map-of-objects section
    StripEntryFields(&'static [&'static str]),
    /// Rewrite a nested mapping as one level of dotted keys: the named entry, or
    /// the whole section when `None`
    FlattenDotted(Option<&'static str>),
    /// Drop keys whose value is an empty array
    DropEmptyArrays,
}

/// Correction applied to a section's schema defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultsRule {
    Keep,
    /// The generated defaults do not describe a real configuration
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionQuirk {
    pub section: &'static str,
    pub sanitize: SanitizeRule,
    pub defaults: DefaultsRule,
}

impl SectionQuirk {
    const fn rule(section: &'static str, sanitize: SanitizeRule) -> Self {
        Self {
            section,
            sanitize,
            defaults: DefaultsRule::Keep,
        }
    }
}

pub const QUIRKS: &[SectionQuirk] = &[
    SectionQuirk {
        section: "detectors",
        sanitize: SanitizeRule::StripEntryFields(&["model"]),
        defaults: DefaultsRule::Suppress,
    },
    SectionQuirk::rule(
        "motion",
        SanitizeRule::StripFields(&["raw_mask", "enabled_in_config"]),
    ),
    SectionQuirk::rule("zones", SanitizeRule::StripEntryFields(&["raw_coordinates"])),
    SectionQuirk::rule("logger", SanitizeRule::FlattenDotted(Some("logs"))),
    SectionQuirk::rule("environment_vars", SanitizeRule::FlattenDotted(None)),
    SectionQuirk::rule("ffmpeg", SanitizeRule::DropEmptyArrays),
];

/// Quirk row for a section path, if any
pub fn quirk_for(section: &str) -> Option<&'static SectionQuirk> {
    QUIRKS.iter().find(|q| q.section == section)
}

/// Apply the section's sanitize rule; `None` when nothing is left to persist
pub fn sanitize(section: &str, patch: Patch) -> Option<Patch> {
    let rule = quirk_for(section).map_or(SanitizeRule::None, |q| q.sanitize);
    rule.apply(patch)
}

/// Apply the section's defaults rule
pub fn adjust_defaults(section: &str, defaults: Option<J>) -> Option<J> {
    match quirk_for(section).map(|q| q.defaults) {
        Some(DefaultsRule::Suppress) => None,
        _ => defaults,
    }
}

impl SanitizeRule {
    pub fn apply(self, patch: Patch) -> Option<Patch> {
        match self {
            SanitizeRule::None => Some(patch),
            SanitizeRule::StripFields(fields) => strip(patch, fields),
            SanitizeRule::StripEntryFields(fields) => {
                map_entries(patch, |entry| strip(entry, fields))
            }
            SanitizeRule::FlattenDotted(None) => Some(flatten(patch)),
            SanitizeRule::FlattenDotted(Some(key)) => match patch {
                Patch::Merge(mut entries) => {
                    if let Some(nested) = entries.remove(key) {
                        entries.insert(key.to_string(), flatten(nested));
                    }
                    Some(Patch::Merge(entries))
                }
                Patch::Set(J::Object(mut map)) => {
                    if let Some(nested) = map.remove(key) {
                        map.insert(key.to_string(), flatten_value(nested));
                    }
                    Some(Patch::Set(J::Object(map)))
                }
                other => Some(other),
            },
            SanitizeRule::DropEmptyArrays => drop_empty_arrays(patch),
        }
    }
}

fn collapse(entries: BTreeMap<String, Patch>) -> Option<Patch> {
    (!entries.is_empty()).then_some(Patch::Merge(entries))
}

fn strip(patch: Patch, fields: &[&str]) -> Option<Patch> {
    match patch {
        Patch::Merge(mut entries) => {
            entries.retain(|key, _| !fields.contains(&key.as_str()));
            collapse(entries)
        }
        Patch::Set(J::Object(mut map)) => {
            let before = map.len();
            map.retain(|key, _| !fields.contains(&key.as_str()));
            if map.is_empty() && before > 0 {
                None
            } else {
                Some(Patch::Set(J::Object(map)))
            }
        }
        other => Some(other),
    }
}

/// Rewrite every entry of a map-shaped patch, dropping entries mapped to `None`
fn map_entries(patch: Patch, f: impl Fn(Patch) -> Option<Patch>) -> Option<Patch> {
    match patch {
        Patch::Merge(entries) => collapse(
            entries
                .into_iter()
                .filter_map(|(key, entry)| Some((key, f(entry)?)))
                .collect(),
        ),
        Patch::Set(J::Object(map)) => {
            let before = map.len();
            let kept: Map<String, J> = map
                .into_iter()
                .filter_map(|(key, value)| match f(Patch::Set(value))? {
                    Patch::Set(value) => Some((key, value)),
                    _ => None,
                })
                .collect();
            if kept.is_empty() && before > 0 {
                None
            } else {
                Some(Patch::Set(J::Object(kept)))
            }
        }
        other => Some(other),
    }
}

fn flatten(patch: Patch) -> Patch {
    match patch {
        Patch::Merge(entries) => {
            let mut out = BTreeMap::new();
            for (key, entry) in entries {
                flatten_patch_into(&key, entry, &mut out);
            }
            Patch::Merge(out)
        }
        Patch::Set(value) => Patch::Set(flatten_value(value)),
        Patch::Delete => Patch::Delete,
    }
}

fn flatten_patch_into(prefix: &str, patch: Patch, out: &mut BTreeMap<String, Patch>) {
    match patch {
        Patch::Merge(entries) => {
            for (key, entry) in entries {
                flatten_patch_into(&join(prefix, &key), entry, out);
            }
        }
        Patch::Set(J::Object(map)) if !map.is_empty() => {
            for (key, value) in map {
                flatten_patch_into(&join(prefix, &key), Patch::Set(value), out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf);
        }
    }
}

fn flatten_value(value: J) -> J {
    let J::Object(map) = value else {
        return value;
    };
    let mut out = Map::new();
    flatten_value_into("", map, &mut out);
    J::Object(out)
}

fn flatten_value_into(prefix: &str, map: Map<String, J>, out: &mut Map<String, J>) {
    for (key, value) in map {
        let path = join(prefix, &key);
        match value {
            J::Object(nested) if !nested.is_empty() => flatten_value_into(&path, nested, out),
            leaf => {
                out.insert(path, leaf);
            }
        }
    }
}

fn drop_empty_arrays(patch: Patch) -> Option<Patch> {
    match patch {
        Patch::Set(J::Array(items)) if items.is_empty() => None,
        Patch::Set(value) => Some(Patch::Set(without_empty_arrays(value))),
        Patch::Merge(entries) => collapse(
            entries
                .into_iter()
                .filter_map(|(key, entry)| Some((key, drop_empty_arrays(entry)?)))
                .collect(),
        ),
        Patch::Delete => Some(Patch::Delete),
    }
}

fn without_empty_arrays(value: J) -> J {
    match value {
        J::Object(map) => J::Object(
            map.into_iter()
                .filter(|(_, v)| !matches!(v, J::Array(items) if items.is_empty()))
                .map(|(k, v)| (k, without_empty_arrays(v)))
                .collect(),
        ),
        J::Array(items) => J::Array(items.into_iter().map(without_empty_arrays).collect()),
        other => other,
    }
}
