// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Static per-section metadata consulted while saving.
//!
//! Metadata is authored next to the section forms, not by users. A built-in table
//! covers the sections the appliance ships with and can be overlaid from a
//! `sections.toml` file:
//!
//! ```toml
//! [[section]]
//! path = "detect"
//! restart-required = ["width", "height", "fps"]
//!
//! [[section]]
//! path = "motion"
//! restart-required = []
//! update-topic = "motion"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::scope::{Scope, SectionKey};

/// Metadata for one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SectionMeta {
    /// Section path, e.g. `detect` or `record.events`
    pub path: String,
    /// Field path patterns (dotted, `*` matches one level) whose change requires
    /// a service restart. Absent: use the caller's default policy. Empty: never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_required: Option<Vec<String>>,
    /// Subsystem name used in the update topic instead of the section path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_topic: Option<String>,
}

/// On-disk shape of a section metadata overlay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SectionsFile {
    #[serde(default)]
    pub section: Vec<SectionMeta>,
}

// (path, restart-required)
const BUILTIN_SECTIONS: &[(&str, Option<&[&str]>)] = &[
    ("audio", Some(&["enabled", "num_threads"])),
    ("birdseye", Some(&["enabled", "mode", "width", "height"])),
    ("detect", Some(&["width", "height", "fps"])),
    ("detectors", None),
    ("ffmpeg", None),
    ("go2rtc", None),
    ("logger", Some(&["default", "logs.*"])),
    ("motion", Some(&[])),
    ("mqtt", None),
    ("notifications", Some(&[])),
    ("objects", Some(&["filters.*.mask", "mask"])),
    ("record", Some(&[])),
    ("review", Some(&[])),
    ("snapshots", Some(&[])),
    ("timestamp_style", Some(&[])),
    ("zones", Some(&["*.coordinates"])),
];

fn validate_pattern(section: &str, pattern: &str) -> Result<()> {
    let valid = !pattern.is_empty()
        && pattern
            .split('.')
            .all(|segment| !segment.is_empty() && (segment == "*" || !segment.contains('*')));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidRestartPattern {
            section: section.to_string(),
            pattern: pattern.to_string(),
        })
    }
}

impl SectionMeta {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            restart_required: None,
            update_topic: None,
        }
    }

    pub fn with_restart_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restart_required = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() || self.path.split('.').any(str::is_empty) {
            return Err(Error::InvalidSectionKey(self.path.clone()));
        }
        for pattern in self.restart_required.iter().flatten() {
            validate_pattern(&self.path, pattern)?;
        }
        Ok(())
    }
}

/// Lookup table from section path to metadata
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    sections: BTreeMap<String, SectionMeta>,
}

impl SectionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Metadata for the sections the appliance ships with
    pub fn builtin() -> Self {
        let sections = BUILTIN_SECTIONS
            .iter()
            .map(|(path, restart)| {
                let meta = SectionMeta {
                    path: (*path).to_string(),
                    restart_required: restart
                        .map(|paths| paths.iter().map(|p| (*p).to_string()).collect()),
                    update_topic: None,
                };
                ((*path).to_string(), meta)
            })
            .collect();
        Self { sections }
    }

    /// Apply an overlay file; its entries replace existing entries with the same path
    pub fn overlay(&mut self, file: SectionsFile) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for meta in &file.section {
            meta.validate()?;
            if !seen.insert(meta.path.as_str()) {
                return Err(Error::DuplicateSection(meta.path.clone()));
            }
        }
        for meta in file.section {
            self.sections.insert(meta.path.clone(), meta);
        }
        Ok(())
    }

    pub fn insert(&mut self, meta: SectionMeta) -> Result<()> {
        meta.validate()?;
        self.sections.insert(meta.path.clone(), meta);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&SectionMeta> {
        self.sections.get(path)
    }

    pub fn restart_paths(&self, path: &str) -> Option<&[String]> {
        self.get(path).and_then(|meta| meta.restart_required.as_deref())
    }

    pub fn update_topic(&self, key: &SectionKey) -> String {
        match self.get(&key.path).and_then(|meta| meta.update_topic.as_deref()) {
            Some(subsystem) => match &key.scope {
                Scope::Global => format!("config/{}", subsystem),
                Scope::Camera(camera) => format!("config/cameras/{}/{}", camera, subsystem),
            },
            None => key.default_update_topic(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionMeta> {
        self.sections.values()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_distinguishes_absent_and_empty() {
        let registry = SectionRegistry::builtin();
        assert_eq!(registry.restart_paths("ffmpeg"), None);
        assert_eq!(registry.restart_paths("motion"), Some(&[][..]));
        assert_eq!(
            registry.restart_paths("objects").unwrap(),
            &["filters.*.mask".to_string(), "mask".to_string()]
        );
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_builtin_patterns_are_valid() {
        for meta in SectionRegistry::builtin().iter() {
            meta.validate().unwrap();
        }
    }

    #[test]
    fn test_overlay_from_toml() {
        let file: SectionsFile = toml::from_str(
            r#"
            [[section]]
            path = "motion"
            restart-required = ["threshold"]
            update-topic = "motion_tuning"

            [[section]]
            path = "semantic_search"
        "#,
        )
        .unwrap();

        let mut registry = SectionRegistry::builtin();
        registry.overlay(file).unwrap();

        assert_eq!(
            registry.restart_paths("motion").unwrap(),
            &["threshold".to_string()]
        );
        assert_eq!(registry.restart_paths("semantic_search"), None);
        assert_eq!(
            registry.update_topic(&SectionKey::camera("yard", "motion")),
            "config/cameras/yard/motion_tuning"
        );
        assert_eq!(
            registry.update_topic(&SectionKey::global("record")),
            "config/record"
        );
    }

    #[test]
    fn test_overlay_rejects_bad_patterns_and_duplicates() {
        let bad = SectionsFile {
            section: vec![SectionMeta::new("detect").with_restart_paths(["fil*ters.mask"])],
        };
        assert!(matches!(
            SectionRegistry::empty().overlay(bad),
            Err(Error::InvalidRestartPattern { .. })
        ));

        let dup = SectionsFile {
            section: vec![SectionMeta::new("detect"), SectionMeta::new("detect")],
        };
        assert_eq!(
            SectionRegistry::empty().overlay(dup),
            Err(Error::DuplicateSection("detect".into()))
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed: std::result::Result<SectionsFile, _> = toml::from_str(
            r#"
            [[section]]
            path = "detect"
            restart = true
        "#,
        );
        assert!(parsed.is_err());
    }
}
