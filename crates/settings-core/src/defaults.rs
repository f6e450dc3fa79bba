// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Merge schema-declared defaults into section data without clobbering set values.

use serde_json::{Map, Value as J};

use crate::shape::{first_object_branch, is_nullable, SchemaShape};

/// Return `data` with defaults from `schema` filled in. `data` is not modified.
///
/// `J::Null` stands for "no value"; an object schema then starts from its own
/// non-null `default`, or from an empty object.
pub fn apply_defaults(schema: &J, data: &J) -> J {
    let Some(properties) = object_properties(schema) else {
        return scalar(schema, data);
    };
    match data {
        J::Object(map) => J::Object(fill(properties, map)),
        J::Null => match declared_default(schema) {
            Some(J::Object(seed)) => J::Object(fill(properties, seed)),
            Some(other) => other.clone(),
            None => J::Object(fill(properties, &Map::new())),
        },
        other => other.clone(),
    }
}

/// Defaults of an empty section, or `None` when the schema declares nothing
pub fn effective_defaults(schema: &J) -> Option<J> {
    match apply_defaults(schema, &J::Null) {
        J::Null => None,
        J::Object(map) if map.is_empty() => None,
        defaults => Some(defaults),
    }
}

/// Declared properties of an object schema, looking through a union to its
/// first non-null object branch
fn object_properties(schema: &J) -> Option<&Map<String, J>> {
    match SchemaShape::of(schema) {
        SchemaShape::Object { properties, .. } => properties,
        SchemaShape::Union { branches } => {
            SchemaShape::of(first_object_branch(branches)?).properties()
        }
        _ => None,
    }
}

fn declared_default(schema: &J) -> Option<&J> {
    schema.get("default").filter(|d| !d.is_null())
}

fn scalar(schema: &J, data: &J) -> J {
    match (data, declared_default(schema)) {
        (J::Null, Some(default)) => default.clone(),
        _ => data.clone(),
    }
}

fn fill(properties: &Map<String, J>, data: &Map<String, J>) -> Map<String, J> {
    let mut out = data.clone();
    for (name, prop) in properties {
        match out.get(name).filter(|v| !v.is_null()) {
            Some(existing @ J::Object(_)) if object_properties(prop).is_some() => {
                let merged = apply_defaults(prop, existing);
                out.insert(name.clone(), merged);
            }
            Some(_) => {}
            None => {
                if let Some(default) = declared_default(prop) {
                    let filled = apply_defaults(prop, default);
                    out.insert(name.clone(), filled);
                } else if object_properties(prop).is_some() && !is_nullable(prop) {
                    // default_factory models carry no `default` of their own
                    if let J::Object(nested) = apply_defaults(prop, &J::Null) {
                        if !nested.is_empty() {
                            out.insert(name.clone(), J::Object(nested));
                        }
                    }
                }
            }
        }
    }
    out
}
