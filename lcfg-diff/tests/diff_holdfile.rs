//! End-to-end diff and hold-file tests

use lcfg_diff::{quickdiff, write_holdfile, ComponentChange, DiffProfile, ResourceChange};
use lcfg_test_utils::{arb_component, profile};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_diff_and_hold_scenario() {
    let old = profile(&[("C", &[("a", "1"), ("b", "2")])]);
    let new = profile(&[("C", &[("a", "1"), ("b", "3"), ("c", "4")])]);

    let diff = DiffProfile::diff(&old, &new);
    assert_eq!(diff.len(), 1);
    let comp = diff.find("C").expect("changed component");
    assert_eq!(comp.change(), ComponentChange::Modified);

    let changed: Vec<(&str, ResourceChange)> = comp
        .entries()
        .iter()
        .map(|e| (e.name(), e.change()))
        .collect();
    assert_eq!(
        changed,
        vec![("b", ResourceChange::Modified), ("c", ResourceChange::Added)]
    );

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("hold");
    let signature = new.signature();
    write_holdfile(&diff, &path, &signature).expect("written");

    let text = std::fs::read_to_string(&path).expect("readable");
    let expected = format!(
        "component: C (modified)\n~\nC.b\n2\n3\n+\nC.c\n\n4\nsignature: {}\n",
        signature
    );
    assert_eq!(text, expected);
}

#[test]
fn test_quickdiff_and_full_diff_agree_on_names() {
    let old = profile(&[
        ("keep", &[("x", "1")]),
        ("change", &[("x", "1")]),
        ("drop", &[("x", "1")]),
    ]);
    let new = profile(&[
        ("keep", &[("x", "1")]),
        ("change", &[("x", "2")]),
        ("grow", &[("x", "1")]),
    ]);

    let (modified, added, removed) = quickdiff(&old, &new);
    let diff = DiffProfile::diff(&old, &new);

    for name in &modified {
        assert_eq!(
            diff.find(name).map(|c| c.change()),
            Some(ComponentChange::Modified)
        );
    }
    for name in &added {
        assert_eq!(
            diff.find(name).map(|c| c.change()),
            Some(ComponentChange::Added)
        );
    }
    for name in &removed {
        assert_eq!(
            diff.find(name).map(|c| c.change()),
            Some(ComponentChange::Removed)
        );
    }
    assert_eq!(diff.len(), modified.len() + added.len() + removed.len());
}

proptest! {
    #[test]
    fn prop_self_diff_is_empty(comp in arb_component(8)) {
        let mut profile = lcfg_core::Profile::new();
        profile
            .components_mut()
            .insert(Arc::new(comp))
            .expect("insert");
        let diff = DiffProfile::diff(&profile, &profile);
        prop_assert!(diff.is_empty());

        let (modified, added, removed) = quickdiff(&profile, &profile);
        prop_assert!(modified.is_empty());
        prop_assert!(added.is_empty());
        prop_assert!(removed.is_empty());
    }

    #[test]
    fn prop_added_component_lists_every_resource(comp in arb_component(8)) {
        let empty = lcfg_core::Profile::new();
        let mut grown = lcfg_core::Profile::new();
        let expected = comp.len();
        let name = comp.name().to_string();
        grown
            .components_mut()
            .insert(Arc::new(comp))
            .expect("insert");

        let diff = DiffProfile::diff(&empty, &grown);
        prop_assert_eq!(diff.len(), 1);
        let entry = diff.find(&name).expect("added component");
        prop_assert_eq!(entry.change(), ComponentChange::Added);
        prop_assert_eq!(entry.len(), expected);
        for resource in entry.entries() {
            prop_assert_eq!(resource.change(), ResourceChange::Added);
        }
    }
}
