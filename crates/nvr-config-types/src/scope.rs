// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Section identity: which section is edited and at which override level.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Separator between camera name and section path in a serialized key
pub const CAMERA_SEPARATOR: &str = "::";

/// Override level an edit applies to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Global defaults at the document's top level
    Global,
    /// Per-camera overrides under `cameras.<name>`
    Camera(String),
}

/// Scope without the camera name, used where only the schema shape matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeKind {
    Global,
    Camera,
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Camera(_) => ScopeKind::Camera,
        }
    }

    pub fn camera(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Camera(name) => Some(name),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "global"),
            ScopeKind::Camera => write!(f, "camera"),
        }
    }
}

/// Identity of one independently saved section.
///
/// Serialized as `"path"` for global sections and `"camera::path"` for
/// per-camera sections, which is also the key format of pending edits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionKey {
    pub scope: Scope,
    pub path: String,
}

impl SectionKey {
    pub fn global(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: Scope::Global,
        }
    }

    pub fn camera(camera: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: Scope::Camera(camera.into()),
        }
    }

    /// Dotted path of this section inside the full configuration document
    pub fn base_path(&self) -> String {
        match &self.scope {
            Scope::Global => self.path.clone(),
            Scope::Camera(camera) => format!("cameras.{}.{}", camera, self.path),
        }
    }

    /// Topic used when no metadata override exists
    pub fn default_update_topic(&self) -> String {
        match &self.scope {
            Scope::Global => format!("config/{}", self.path),
            Scope::Camera(camera) => format!("config/cameras/{}/{}", camera, self.path),
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Scope::Global => write!(f, "{}", self.path),
            Scope::Camera(camera) => write!(f, "{}{}{}", camera, CAMERA_SEPARATOR, self.path),
        }
    }
}

fn valid_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|segment| !segment.is_empty())
}

impl FromStr for SectionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.split_once(CAMERA_SEPARATOR) {
            Some((camera, path)) => {
                if camera.is_empty() || path.contains(CAMERA_SEPARATOR) {
                    return Err(Error::InvalidSectionKey(s.to_string()));
                }
                SectionKey::camera(camera, path)
            }
            None => SectionKey::global(s),
        };

        if !valid_path(&key.path) {
            return Err(Error::InvalidSectionKey(s.to_string()));
        }
        Ok(key)
    }
}

impl TryFrom<String> for SectionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SectionKey> for String {
    fn from(key: SectionKey) -> Self {
        key.to_string()
    }
}
