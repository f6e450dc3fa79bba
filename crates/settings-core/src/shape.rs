// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Closed classification of normalized schema nodes.
//!
//! Later stages (defaults, sanitizing) match on [`SchemaShape`] instead of probing
//! raw `type` arrays and union branches themselves.

use serde_json::{Map, Value as J};

use crate::normalize::{is_null_schema, NULLABLE_KEY};

/// What a normalized schema node describes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaShape<'a> {
    /// An object, either with declared `properties` or an open map
    Object {
        properties: Option<&'a Map<String, J>>,
        additional: Option<&'a J>,
    },
    Array {
        items: Option<&'a J>,
    },
    Scalar,
    /// A genuine multi-type choice left after normalization
    Union {
        branches: &'a [J],
    },
    Unknown,
}

impl<'a> SchemaShape<'a> {
    pub fn of(node: &'a J) -> Self {
        let Some(obj) = node.as_object() else {
            return SchemaShape::Unknown;
        };

        let additional = obj.get("additionalProperties").filter(|a| a.is_object());
        if let Some(properties) = obj.get("properties").and_then(J::as_object) {
            return SchemaShape::Object {
                properties: Some(properties),
                additional,
            };
        }

        let mut types = types(node).filter(|ty| *ty != "null").peekable();
        let declared = types.peek().is_some();
        let mut object = false;
        let mut array = false;
        for ty in types {
            object |= ty == "object";
            array |= ty == "array";
        }

        if object {
            SchemaShape::Object {
                properties: None,
                additional,
            }
        } else if array {
            SchemaShape::Array {
                items: obj.get("items"),
            }
        } else if let Some(branches) = ["anyOf", "oneOf"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(J::as_array))
        {
            SchemaShape::Union { branches }
        } else if additional.is_some() {
            SchemaShape::Object {
                properties: None,
                additional,
            }
        } else if declared || obj.contains_key("enum") || obj.contains_key("const") {
            SchemaShape::Scalar
        } else {
            SchemaShape::Unknown
        }
    }

    pub fn properties(&self) -> Option<&'a Map<String, J>> {
        match self {
            SchemaShape::Object { properties, .. } => *properties,
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, SchemaShape::Object { .. })
    }
}

/// Declared JSON types of a node (`type` as string or array)
pub fn types(node: &J) -> impl Iterator<Item = &str> {
    let declared: &[J] = match node.get("type") {
        Some(J::Array(types)) => types,
        Some(single @ J::String(_)) => std::slice::from_ref(single),
        _ => &[],
    };
    declared.iter().filter_map(J::as_str)
}

/// Whether the node admits `null`
pub fn is_nullable(node: &J) -> bool {
    node.get(NULLABLE_KEY) == Some(&J::Bool(true))
        || types(node).any(|ty| ty == "null")
        || ["anyOf", "oneOf"]
            .iter()
            .filter_map(|key| node.get(*key).and_then(J::as_array))
            .flatten()
            .any(is_null_schema)
}

/// First union branch that is not null-only and is object-shaped
pub fn first_object_branch(branches: &[J]) -> Option<&J> {
    branches
        .iter()
        .find(|branch| !is_null_schema(branch) && SchemaShape::of(branch).is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classifies_nullable_object() {
        let node = json!({"type": ["object", "null"], "properties": {"fps": {"type": "integer"}}});
        let shape = SchemaShape::of(&node);
        assert!(shape.properties().unwrap().contains_key("fps"));
        assert!(is_nullable(&node));
    }

    #[test]
    fn test_classifies_open_map_array_scalar() {
        let map = json!({"type": "object", "additionalProperties": {"type": "string"}});
        assert!(matches!(
            SchemaShape::of(&map),
            SchemaShape::Object { properties: None, additional: Some(_) }
        ));
        assert!(matches!(
            SchemaShape::of(&json!({"type": ["array", "null"], "items": {"type": "string"}})),
            SchemaShape::Array { items: Some(_) }
        ));
        assert_eq!(SchemaShape::of(&json!({"type": "integer"})), SchemaShape::Scalar);
        assert_eq!(SchemaShape::of(&json!({"enum": ["a", "b"]})), SchemaShape::Scalar);
        assert_eq!(SchemaShape::of(&json!({"title": "?"})), SchemaShape::Unknown);
    }

    #[test]
    fn test_collapsed_untyped_union_is_nullable() {
        let node = crate::normalize::normalize(&json!({"anyOf": [{}, {"type": "null"}]}));
        assert_eq!(SchemaShape::of(&node), SchemaShape::Unknown);
        assert!(is_nullable(&node));
        assert!(!is_nullable(&json!({"type": "string"})));
    }

    #[test]
    fn test_union_object_branch() {
        let node = json!({"anyOf": [
            {"type": "null"},
            {"type": "string"},
            {"type": "object", "properties": {"a": {"type": "integer"}}}
        ]});
        let SchemaShape::Union { branches } = SchemaShape::of(&node) else {
            panic!("expected a union");
        };
        let branch = first_object_branch(branches).unwrap();
        assert!(branch["properties"].get("a").is_some());
        assert!(is_nullable(&node));
    }
}
