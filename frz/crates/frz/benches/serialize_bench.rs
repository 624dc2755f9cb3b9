//! FRZ Serialization Benchmarks
//!
//! Run with: `cargo bench --package frz`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frz::{ObjectId, Serializer};
use std::io::Cursor;

#[path = "../tests/common/mod.rs"]
mod common;

use common::{SyntheticHeap, W};

fn linked_list(heap: &mut SyntheticHeap, nodes: usize) -> ObjectId {
    let ty = heap.ref_type(1, 1);
    let objects: Vec<_> = (0..nodes).map(|_| heap.object(ty)).collect();
    for pair in objects.windows(2) {
        heap.set_field(pair[0], 0, pair[1]);
    }
    objects[0]
}

fn reference_array(heap: &mut SyntheticHeap, len: usize) -> ObjectId {
    let array_ty = heap.ref_array_type();
    let leaf_ty = heap.plain_type(2);
    let root = heap.array(array_ty, len as u32);
    for i in 0..len {
        let leaf = heap.object(leaf_ty);
        heap.set_element(root, i, leaf);
    }
    root
}

fn serialize(serializer: &Serializer, root: ObjectId, capacity: usize) -> usize {
    let mut out = Cursor::new(Vec::with_capacity(capacity));
    let graph = unsafe { serializer.serialize_into(root, &mut out, None, None) }.unwrap();
    graph.stats().bytes as usize
}

fn bench_linked_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("linked_list");
    let serializer = Serializer::default();

    for nodes in [100usize, 1_000, 10_000] {
        let mut heap = SyntheticHeap::new();
        let root = linked_list(&mut heap, nodes);
        let bytes = nodes * 4 * W;

        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &root, |b, root| {
            b.iter(|| black_box(serialize(&serializer, *root, bytes)))
        });
    }

    group.finish();
}

fn bench_reference_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_array");
    let serializer = Serializer::default();

    for len in [100usize, 1_000, 10_000] {
        let mut heap = SyntheticHeap::new();
        let root = reference_array(&mut heap, len);
        let bytes = (3 + len) * W + len * 4 * W;

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &root, |b, root| {
            b.iter(|| black_box(serialize(&serializer, *root, bytes)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_linked_list, bench_reference_array);
criterion_main!(benches);
