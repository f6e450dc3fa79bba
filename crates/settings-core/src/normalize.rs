// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Collapse "value or null" unions into a single nullable schema.
//!
//! Optional fields come out of the schema generator as
//! `{"anyOf": [<schema>, {"type": "null"}]}`. After normalization the same field
//! reads `<schema>` with `type` widened to include `"null"`, so consumers only see
//! unions that are real multi-type choices. A value branch without a `type`
//! (`Optional[Any]` comes out as `{}`) is marked with [`NULLABLE_KEY`] instead.

use serde_json::{Map, Value as J};

const UNION_KEYS: &[&str] = &["anyOf", "oneOf"];

/// Marker set on a collapsed union whose value branch declares no `type`
pub const NULLABLE_KEY: &str = "nullable";

/// Normalize a whole schema tree
pub fn normalize(node: &J) -> J {
    let J::Object(obj) = node else {
        return node.clone();
    };

    let mut out = match collapse_nullable_union(obj) {
        Some(collapsed) => collapsed,
        None => obj
            .iter()
            .map(|(key, value)| (key.clone(), child(key, value)))
            .collect(),
    };
    widen_null_default(&mut out);
    J::Object(out)
}

/// Whether a branch only admits `null`
pub fn is_null_schema(node: &J) -> bool {
    node.get("type").and_then(J::as_str) == Some("null")
}

fn child(key: &str, value: &J) -> J {
    match (key, value) {
        ("properties", J::Object(props)) => J::Object(
            props
                .iter()
                .map(|(name, schema)| (name.clone(), normalize(schema)))
                .collect(),
        ),
        ("items" | "anyOf" | "oneOf", J::Array(branches)) => {
            J::Array(branches.iter().map(normalize).collect())
        }
        ("items" | "additionalProperties", _) => normalize(value),
        _ => value.clone(),
    }
}

fn collapse_nullable_union(obj: &Map<String, J>) -> Option<Map<String, J>> {
    let (union_key, branches) = UNION_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(J::as_array).map(|b| (*key, b)))?;
    if branches.len() != 2 || branches.iter().filter(|b| is_null_schema(b)).count() != 1 {
        return None;
    }
    let value_branch = branches.iter().find(|b| !is_null_schema(b))?;

    let J::Object(mut inner) = normalize(value_branch) else {
        return None;
    };
    if !widen_type(&mut inner) {
        inner.insert(NULLABLE_KEY.to_string(), J::Bool(true));
    }
    if let Some(J::Array(values)) = inner.get_mut("enum") {
        if !values.contains(&J::Null) {
            values.push(J::Null);
        }
    }

    for (key, value) in obj {
        if key != union_key {
            inner.insert(key.clone(), child(key, value));
        }
    }
    Some(inner)
}

/// Add `"null"` to the node's `type`; false when there is no `type` to widen
fn widen_type(node: &mut Map<String, J>) -> bool {
    let Some(slot) = node.get_mut("type") else {
        return false;
    };
    match slot {
        J::String(ty) => {
            if ty.as_str() != "null" {
                let ty = slot.take();
                *slot = J::Array(vec![ty, J::from("null")]);
            }
            true
        }
        J::Array(types) => {
            if !types.iter().any(|t| t == "null") {
                types.push(J::from("null"));
            }
            true
        }
        _ => false,
    }
}

fn widen_null_default(node: &mut Map<String, J>) {
    let null_default = matches!(node.get("default"), Some(J::Null));
    let concrete = matches!(node.get("type"), Some(J::String(ty)) if ty != "null");
    if null_default && concrete {
        widen_type(node);
    }
}
