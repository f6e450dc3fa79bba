// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Dotted-path helpers over JSON documents

use serde_json::{Map, Value as J};

/// Look up a dotted path; an empty path returns the root itself
pub fn get_dotted<'a>(root: &'a J, dotted: &str) -> Option<&'a J> {
    if dotted.is_empty() {
        return Some(root);
    }
    let mut cur = root;
    for p in dotted.split('.') {
        cur = cur.as_object()?.get(p)?;
    }
    Some(cur)
}

/// Return a mutable slot at a dotted path, creating intermediate objects.
///
/// Non-object values met along the way are replaced by empty objects.
pub fn slot_dotted<'a>(root: &'a mut J, dotted: &str) -> &'a mut J {
    if dotted.is_empty() {
        return root;
    }
    let mut cur = root;
    for p in dotted.split('.') {
        if !cur.is_object() {
            *cur = J::Object(Map::new());
        }
        cur = match cur {
            J::Object(map) => map.entry(p).or_insert(J::Null),
            _ => unreachable!("slot was just replaced by an object"),
        };
    }
    cur
}

/// Insert a value at a dotted path in JSON
pub fn insert_dotted(root: &mut J, dotted: &str, v: J) {
    *slot_dotted(root, dotted) = v;
}

/// Remove a dotted key path from JSON, returning the removed value
pub fn remove_dotted(root: &mut J, dotted: &str) -> Option<J> {
    let (parent, last) = match dotted.rsplit_once('.') {
        Some((parent, last)) => (parent, last),
        None => ("", dotted),
    };
    let mut cur = root;
    if !parent.is_empty() {
        for p in parent.split('.') {
            cur = cur.as_object_mut()?.get_mut(p)?;
        }
    }
    cur.as_object_mut()?.remove(last)
}

/// Join a prefix and a key with a dot, skipping an empty prefix
pub fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_dotted() {
        let doc = json!({"cameras": {"front": {"detect": {"fps": 5}}}});
        assert_eq!(get_dotted(&doc, "cameras.front.detect.fps"), Some(&json!(5)));
        assert_eq!(get_dotted(&doc, "cameras.back"), None);
        assert_eq!(get_dotted(&doc, "cameras.front.detect.fps.x"), None);
        assert_eq!(get_dotted(&doc, ""), Some(&doc));
    }

    #[test]
    fn test_insert_dotted_creates_parents() {
        let mut root = json!({"record": 3});
        insert_dotted(&mut root, "record.retain.days", json!(7));
        insert_dotted(&mut root, "detect.fps", json!(5));
        assert_eq!(root, json!({"record": {"retain": {"days": 7}}, "detect": {"fps": 5}}));
    }

    #[test]
    fn test_remove_dotted() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove_dotted(&mut root, "a.b"), Some(json!(1)));
        assert_eq!(remove_dotted(&mut root, "a.zz"), None);
        assert_eq!(remove_dotted(&mut root, "x.y"), None);
        assert_eq!(root, json!({"a": {"c": 2}}));
    }
}
