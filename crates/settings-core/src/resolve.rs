// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `$ref` and `allOf` resolution over a read-only definition table.
//!
//! The generated schema keeps every model in a flat `$defs` table and points at it
//! with `$ref`, while inheritance is expressed as `allOf`. Resolution produces a
//! concrete node with neither keyword left. Malformed input (dangling or recursive
//! references) never errors: the offending node is returned unresolved and a
//! warning is logged.

use serde_json::{Map, Value as J};
use tracing::warn;

/// Nesting depth after which resolution stops and returns the node unresolved
pub const MAX_RESOLVE_DEPTH: usize = 64;

/// Keys under which a root schema may carry its definition table
pub const DEFINITION_KEYS: &[&str] = &["$defs", "definitions"];

const REF_PREFIXES: &[&str] = &["#/$defs/", "#/definitions/"];

/// Immutable view of a schema's definition table
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionTable<'a> {
    defs: Option<&'a Map<String, J>>,
}

impl<'a> DefinitionTable<'a> {
    pub fn empty() -> Self {
        Self { defs: None }
    }

    /// Borrow the table carried by a root schema, if any
    pub fn from_root(root: &'a J) -> Self {
        let defs = DEFINITION_KEYS.iter().find_map(|key| root.get(*key)?.as_object());
        Self { defs }
    }

    pub fn get(&self, name: &str) -> Option<&'a J> {
        self.defs?.get(name)
    }

    /// Look up the target of a `$ref` string such as `#/$defs/DetectConfig`
    pub fn lookup_ref(&self, reference: &str) -> Option<&'a J> {
        self.get(ref_target_name(reference)?)
    }
}

/// Definition name referenced by a local `$ref`
pub fn ref_target_name(reference: &str) -> Option<&str> {
    REF_PREFIXES.iter().find_map(|prefix| reference.strip_prefix(prefix))
}

/// Resolve `node` so that no `$ref` or `allOf` remains in it or its children
pub fn resolve(node: &J, defs: &DefinitionTable<'_>) -> J {
    Resolver {
        defs: *defs,
        active: Vec::new(),
    }
    .node(node, 0)
}

/// Resolve a root schema with its own table, then drop the table from the result
pub fn resolve_and_strip(root: &J) -> J {
    let defs = DefinitionTable::from_root(root);
    let mut stripped = root.clone();
    strip_definitions(&mut stripped);
    resolve(&stripped, &defs)
}

/// Remove the definition table from a schema node
pub fn strip_definitions(node: &mut J) {
    if let J::Object(map) = node {
        for key in DEFINITION_KEYS {
            map.remove(*key);
        }
    }
}

/// Replace a top-level `$ref` by its target with the referencing node's sibling
/// keys on top, without resolving anything below it.
pub fn inline_ref(node: &J, defs: &DefinitionTable<'_>) -> J {
    let Some(reference) = node.get("$ref").and_then(J::as_str) else {
        return node.clone();
    };
    match defs.lookup_ref(reference) {
        Some(J::Object(target)) => {
            let mut merged = target.clone();
            if let J::Object(siblings) = node {
                for (key, value) in siblings {
                    if key != "$ref" {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            J::Object(merged)
        }
        _ => {
            warn!(reference, "dangling $ref in schema; leaving node unresolved");
            node.clone()
        }
    }
}

struct Resolver<'a> {
    defs: DefinitionTable<'a>,
    /// Definitions currently being expanded, to stop on recursive models
    active: Vec<String>,
}

impl Resolver<'_> {
    fn node(&mut self, node: &J, depth: usize) -> J {
        let J::Object(obj) = node else {
            return node.clone();
        };
        if depth > MAX_RESOLVE_DEPTH {
            warn!(depth, "schema nesting too deep; leaving node unresolved");
            return node.clone();
        }

        if let Some(reference) = obj.get("$ref").and_then(J::as_str) {
            return self.reference(obj, reference, depth);
        }
        if let Some(J::Array(members)) = obj.get("allOf") {
            return self.all_of(obj, members, depth);
        }

        J::Object(
            obj.iter()
                .map(|(key, value)| (key.clone(), self.child(key, value, depth + 1)))
                .collect(),
        )
    }

    fn reference(&mut self, obj: &Map<String, J>, reference: &str, depth: usize) -> J {
        let unresolved = || J::Object(obj.clone());

        let Some(name) = ref_target_name(reference) else {
            warn!(reference, "non-local $ref in schema; leaving node unresolved");
            return unresolved();
        };
        let Some(target) = self.defs.get(name) else {
            warn!(reference, "dangling $ref in schema; leaving node unresolved");
            return unresolved();
        };
        if self.active.iter().any(|active| active == name) {
            warn!(reference, "recursive $ref in schema; leaving node unresolved");
            return unresolved();
        }

        self.active.push(name.to_string());
        let resolved = self.node(target, depth + 1);
        self.active.pop();

        let J::Object(mut merged) = resolved else {
            return unresolved();
        };
        let siblings = obj.iter().filter(|(key, _)| key.as_str() != "$ref");
        if obj.contains_key("allOf") {
            for (key, value) in siblings {
                merged.insert(key.clone(), value.clone());
            }
            return self.node(&J::Object(merged), depth + 1);
        }
        for (key, value) in siblings {
            let value = self.child(key, value, depth + 1);
            merged.insert(key.clone(), value);
        }
        J::Object(merged)
    }

    fn all_of(&mut self, obj: &Map<String, J>, members: &[J], depth: usize) -> J {
        let mut combined = Map::new();
        for member in members {
            if let J::Object(resolved) = self.node(member, depth + 1) {
                merge_composed(&mut combined, resolved);
            }
        }

        let extras: Map<String, J> = obj
            .iter()
            .filter(|(key, _)| key.as_str() != "allOf")
            .map(|(key, value)| (key.clone(), self.child(key, value, depth + 1)))
            .collect();
        merge_composed(&mut combined, extras);
        J::Object(combined)
    }

    /// Resolve the schema-bearing value stored under `key`
    fn child(&mut self, key: &str, value: &J, depth: usize) -> J {
        match (key, value) {
            ("properties", J::Object(props)) => J::Object(
                props
                    .iter()
                    .map(|(name, schema)| (name.clone(), self.node(schema, depth)))
                    .collect(),
            ),
            ("items" | "anyOf" | "oneOf", J::Array(branches)) => {
                J::Array(branches.iter().map(|branch| self.node(branch, depth)).collect())
            }
            ("items" | "additionalProperties", _) => self.node(value, depth),
            _ => value.clone(),
        }
    }
}

/// Shallow merge where later keys win, except `properties` (per-key union)
/// and `required` (set union).
fn merge_composed(into: &mut Map<String, J>, from: Map<String, J>) {
    for (key, value) in from {
        match value {
            J::Object(incoming) if key == "properties" => {
                let slot = into
                    .entry("properties")
                    .or_insert_with(|| J::Object(Map::new()));
                match slot {
                    J::Object(existing) => existing.extend(incoming),
                    other => *other = J::Object(incoming),
                }
            }
            J::Array(incoming) if key == "required" => {
                let slot = into.entry("required").or_insert_with(|| J::Array(Vec::new()));
                match slot {
                    J::Array(existing) => {
                        for item in incoming {
                            if !existing.contains(&item) {
                                existing.push(item);
                            }
                        }
                    }
                    other => *other = J::Array(incoming),
                }
            }
            value => {
                into.insert(key, value);
            }
        }
    }
}
