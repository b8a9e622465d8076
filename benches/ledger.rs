//! Benchmarks for the group ledger hot paths
//!
//! - announcement: one combined placement into a populated group
//! - repair scan: sweep + recount over every object
//! - peer departure: purge one peer from both ledgers

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use replica_ledger::GroupIndex;

const NOW: i64 = 1_700_000_000;

/// Group with `objects` objects, each held by three of `peers` peers.
/// Every tenth object's leases have already lapsed.
fn create_test_group(objects: usize, peers: usize) -> GroupIndex {
    let index = GroupIndex::new();
    for o in 0..objects {
        let ttl = if o % 10 == 0 { NOW - 1 } else { NOW + 3600 };
        for copy in 0..3 {
            let peer = format!("peer-{}", (o + copy) % peers);
            index.place(&format!("obj-{o}"), &peer, ttl);
        }
    }
    index
}

fn benchmark_place(c: &mut Criterion) {
    let index = create_test_group(1_000, 50);
    let mut next = 0u64;

    c.bench_function("place_into_1000_objects", |b| {
        b.iter(|| {
            next += 1;
            index.place(black_box("obj-new"), &format!("peer-{next}"), NOW + 3600)
        });
    });
}

fn benchmark_repair_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("objects_needing_repair");

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || create_test_group(size, 50),
                |index| index.objects_needing_repair_at(black_box(5), NOW),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn benchmark_remove_peer(c: &mut Criterion) {
    c.bench_function("remove_peer_from_1000_objects", |b| {
        b.iter_batched(
            || create_test_group(1_000, 50),
            |index| index.remove_peer(black_box("peer-7")),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    benchmark_place,
    benchmark_repair_scan,
    benchmark_remove_peer
);
criterion_main!(benches);
