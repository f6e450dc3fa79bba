// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::{Map, Value as J};
use settings_core::{apply_patch, diff, Patch};

/// Non-null, non-empty leaves: the editor collapses `null` and `""` to "unset"
fn leaf() -> impl Strategy<Value = J> {
    prop_oneof![
        any::<bool>().prop_map(J::from),
        any::<i32>().prop_map(J::from),
        "[a-z]{1,6}".prop_map(J::from),
    ]
}

/// Documents without empty containers, which carry no override of their own
fn document() -> impl Strategy<Value = J> {
    leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(J::Array),
            prop::collection::btree_map("[a-e]", inner, 1..4)
                .prop_map(|m| J::Object(m.into_iter().collect::<Map<String, J>>())),
        ]
    })
}

fn section() -> impl Strategy<Value = J> {
    prop::collection::btree_map("[a-e]", document(), 0..5)
        .prop_map(|m| J::Object(m.into_iter().collect::<Map<String, J>>()))
}

/// Dotted paths of every non-object value reachable through objects
fn leaf_paths(value: &J, prefix: &str, out: &mut Vec<String>) {
    match value {
        J::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                leaf_paths(child, &path, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

proptest! {
    #[test]
    fn diff_of_identical_values_is_empty(x in document(), defaults in proptest::option::of(document())) {
        prop_assert_eq!(diff(Some(&x), Some(&x), defaults.as_ref()), None);
    }

    #[test]
    fn applying_the_delta_reproduces_current(current in section(), baseline in section()) {
        let mut patched = baseline.clone();
        if let Some(delta) = diff(Some(&current), Some(&baseline), None) {
            apply_patch(&mut patched, &delta);
        }
        prop_assert_eq!(patched, current);
    }

    #[test]
    fn values_equal_to_defaults_without_baseline_are_unchanged(x in section()) {
        prop_assert_eq!(diff(Some(&x), None, Some(&x)), None);
    }

    #[test]
    fn single_field_change_touches_only_that_path(
        baseline in section().prop_filter("needs a field", |s| s.as_object().is_some_and(|m| !m.is_empty())),
        pick in any::<Index>(),
        remove in any::<bool>(),
    ) {
        let mut paths = Vec::new();
        leaf_paths(&baseline, "", &mut paths);
        let path = pick.get(&paths).clone();

        let mut current = baseline.clone();
        let expected = if remove {
            settings_core::paths::remove_dotted(&mut current, &path);
            Patch::Delete
        } else {
            // outside the generated i32 range, so always a change
            let value = J::from(i64::MAX);
            settings_core::paths::insert_dotted(&mut current, &path, value.clone());
            Patch::Set(value)
        };

        let delta = diff(Some(&current), Some(&baseline), None).expect("a change was made");
        prop_assert_eq!(delta.paths(), vec![path.clone()]);

        let mut leaf = &delta;
        for segment in path.split('.') {
            leaf = leaf.entry(segment).expect("path exists in delta");
        }
        prop_assert_eq!(leaf, &expected);
    }
}
