//! # Tree Benchmarks
//!
//! Performance benchmarks for stemma-core tree operations.
//!
//! Run with: `cargo bench -p stemma-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use stemma_core::{
    EdgeType, Graph, Member, MemberId, MutationEngine, ReconcileConfig, SequentialIdGenerator,
    TokenSetRatio, TreeMerger, store_to_bytes,
};
use std::hint::black_box;

fn id(i: usize) -> MemberId {
    MemberId::new(format!("M{:06}", i))
}

/// A line of couples, each couple the parents of the next husband.
fn create_lineage(generations: usize) -> Graph {
    let mut graph = Graph::new();
    for i in 0..generations * 2 {
        graph
            .add_member(Member::new(format!("M{:06}", i), format!("Person {} Lineage", i)))
            .expect("insert");
    }
    for g in 0..generations {
        let (husband, wife) = (id(g * 2), id(g * 2 + 1));
        MutationEngine::add_relationship(&mut graph, &husband, &wife, EdgeType::Spouse, false)
            .expect("spouse");
        if g + 1 < generations {
            MutationEngine::add_relationship(
                &mut graph,
                &husband,
                &id(g * 2 + 2),
                EdgeType::ParentToChild,
                true,
            )
            .expect("child");
        }
    }
    graph
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_build_with_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_with_inference");

    for generations in [10, 100, 500].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(generations),
            generations,
            |b, &generations| {
                b.iter(|| black_box(create_lineage(generations)));
            },
        );
    }

    group.finish();
}

fn bench_store_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_roundtrip");

    for generations in [10, 100, 500].iter() {
        let store = create_lineage(*generations).to_store();

        group.bench_with_input(BenchmarkId::new("from_store", generations), &store, |b, store| {
            b.iter(|| black_box(Graph::from_store(store)));
        });
        group.bench_with_input(BenchmarkId::new("to_bytes", generations), &store, |b, store| {
            b.iter(|| black_box(store_to_bytes(store)));
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let merger = TreeMerger::new(&TokenSetRatio, ReconcileConfig::default());

    for generations in [10, 50].iter() {
        let base = create_lineage(*generations).to_store();
        let incoming = create_lineage(*generations / 2).to_store();

        group.bench_with_input(
            BenchmarkId::from_parameter(generations),
            &(base, incoming),
            |b, (base, incoming)| {
                b.iter(|| {
                    let mut ids = SequentialIdGenerator::new("N");
                    black_box(merger.merge(base, incoming, &mut ids))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_with_inference,
    bench_store_roundtrip,
    bench_merge,
);
criterion_main!(benches);
