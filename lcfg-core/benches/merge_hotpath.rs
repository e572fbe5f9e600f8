//! Hot-path benchmarks: resource merges and signature computation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lcfg_core::{Component, ComponentSet, MergeRules, Resource, SerializeOptions};
use std::sync::Arc;

fn build_resources(count: usize) -> Vec<Arc<Resource>> {
    (0..count)
        .map(|i| {
            let mut r = Resource::new(&format!("res_{}", i)).expect("valid name");
            r.set_value(&format!("value_{}", i)).expect("valid value");
            Arc::new(r.with_priority((i % 7) as i32))
        })
        .collect()
}

fn build_set(components: usize, resources: usize) -> ComponentSet {
    let mut set = ComponentSet::new();
    for c in 0..components {
        let mut comp = Component::new(&format!("comp_{}", c))
            .expect("valid name")
            .with_merge_rules(MergeRules::USE_PRIORITY);
        for r in build_resources(resources) {
            comp.merge_resource(r).expect("merge");
        }
        set.insert(Arc::new(comp)).expect("insert");
    }
    set
}

fn bench_merge_resources(c: &mut Criterion) {
    let resources = build_resources(200);
    c.bench_function("merge_200_resources", |b| {
        b.iter(|| {
            let mut comp = Component::new("bench")
                .expect("valid name")
                .with_merge_rules(MergeRules::USE_PRIORITY);
            for r in &resources {
                comp.merge_resource(Arc::clone(r)).expect("merge");
            }
            black_box(comp.len())
        })
    });
}

fn bench_merge_component(c: &mut Criterion) {
    let mut src = Component::new("src")
        .expect("valid name")
        .with_merge_rules(MergeRules::USE_PRIORITY);
    for r in build_resources(200) {
        src.merge_resource(r).expect("merge");
    }
    c.bench_function("merge_component_200", |b| {
        b.iter(|| {
            let mut dst = Component::new("dst")
                .expect("valid name")
                .with_merge_rules(MergeRules::REPLACE);
            dst.merge_component(black_box(&src)).expect("merge");
            black_box(dst.len())
        })
    });
}

fn bench_signature(c: &mut Criterion) {
    let set = build_set(20, 50);
    c.bench_function("signature_20x50", |b| {
        b.iter(|| black_box(set.signature()))
    });
}

fn bench_status_serialization(c: &mut Criterion) {
    let set = build_set(5, 100);
    c.bench_function("status_lines_5x100", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            set.to_status(&mut out, SerializeOptions::signature())
                .expect("serialize");
            black_box(out.len())
        })
    });
}

criterion_group!(
    benches,
    bench_merge_resources,
    bench_merge_component,
    bench_signature,
    bench_status_serialization
);
criterion_main!(benches);
