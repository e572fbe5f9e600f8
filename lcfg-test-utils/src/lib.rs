//! Test utilities, generators, and fixtures for the LCFG workspace
//!
//! The `arb_*` functions are proptest strategies over the core data
//! model; the fixture helpers build small deterministic values for
//! example-based tests.

use lcfg_core::{Component, MergeRules, Profile, Resource, TagList, ValueType};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Strategy over valid LCFG identifiers.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,11}"
}

/// Strategy over value types.
pub fn arb_value_type() -> impl Strategy<Value = ValueType> {
    prop_oneof![
        Just(ValueType::String),
        Just(ValueType::Integer),
        Just(ValueType::Boolean),
        Just(ValueType::List),
        Just(ValueType::Publish),
        Just(ValueType::Subscribe),
    ]
}

/// Strategy over (type, value) pairs where the value satisfies the
/// type's grammar.
pub fn arb_typed_value() -> impl Strategy<Value = (ValueType, String)> {
    prop_oneof![
        "[ -~]{0,24}".prop_map(|v| (ValueType::String, v)),
        any::<i32>().prop_map(|i| (ValueType::Integer, i.to_string())),
        prop_oneof![Just("yes"), Just("no")].prop_map(|v| (ValueType::Boolean, v.to_string())),
        proptest::collection::vec("[a-z0-9]{1,6}", 0..5)
            .prop_map(|tags| (ValueType::List, tags.join(" "))),
    ]
}

/// Strategy over tag lists.
pub fn arb_taglist() -> impl Strategy<Value = TagList> {
    proptest::collection::vec("[a-zA-Z0-9._-]{1,8}", 0..8).prop_map(|tokens| {
        tokens
            .join(" ")
            .parse()
            .expect("generated tokens are valid tags")
    })
}

/// Strategy over valid resources with a type-conforming value.
pub fn arb_resource() -> impl Strategy<Value = Resource> {
    (
        arb_name(),
        arb_typed_value(),
        -10..10i32,
        proptest::option::of("[a-z]{1,6}=[a-z]{1,6}"),
    )
        .prop_map(|(name, (value_type, value), priority, context)| {
            let mut r = Resource::new(&name).expect("generated name is valid");
            r.set_type(value_type).expect("no value set yet");
            r.set_value(&value).expect("generated value fits the type");
            if let Some(context) = context {
                r.set_context(&context);
            }
            r.with_priority(priority)
        })
}

/// Strategy over components holding up to `max` distinct resources.
pub fn arb_component(max: usize) -> impl Strategy<Value = Component> {
    (
        arb_name(),
        proptest::collection::btree_map(arb_name(), arb_typed_value(), 0..max),
    )
        .prop_map(|(name, resources)| {
            let mut comp = Component::new(&name)
                .expect("generated name is valid")
                .with_merge_rules(MergeRules::REPLACE);
            for (rname, (value_type, value)) in resources {
                let mut r = Resource::new(&rname).expect("generated name is valid");
                r.set_type(value_type).expect("no value set yet");
                r.set_value(&value).expect("generated value fits the type");
                comp.merge_resource(Arc::new(r))
                    .expect("replace merges cannot conflict");
            }
            comp
        })
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A string resource with a value and priority.
pub fn resource(name: &str, value: &str, priority: i32) -> Arc<Resource> {
    let mut r = Resource::new(name).expect("fixture name is valid");
    r.set_value(value).expect("fixture value is valid");
    Arc::new(r.with_priority(priority))
}

/// A component populated with string resources.
pub fn component(name: &str, rules: MergeRules, resources: &[(&str, &str)]) -> Component {
    let mut comp = Component::new(name)
        .expect("fixture name is valid")
        .with_merge_rules(rules);
    for (rname, value) in resources {
        comp.merge_resource(resource(rname, value, 0))
            .expect("fixture merge succeeds");
    }
    comp
}

/// A profile populated with components of string resources.
pub fn profile(components: &[(&str, &[(&str, &str)])]) -> Profile {
    let mut profile = Profile::new();
    for (name, resources) in components {
        profile
            .components_mut()
            .insert(Arc::new(component(name, MergeRules::USE_PRIORITY, resources)))
            .expect("fixture insert succeeds");
    }
    profile
}
