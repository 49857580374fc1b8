//! Benchmarks for exhaustive vector search and chunking.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use kassist::models::ChunkRecord;
use kassist::services::{TextChunker, VectorIndex, l2_normalize};

fn unit_vector(seed: usize, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim).map(|j| ((seed * dim + j) as f32).sin()).collect();
    l2_normalize(&mut v);
    v
}

fn build_index(rows: usize, dim: usize) -> VectorIndex {
    let index = VectorIndex::new(dim).unwrap();
    let vectors = (0..rows).map(|i| unit_vector(i, dim)).collect();
    let records = (0..rows)
        .map(|i| ChunkRecord::new(format!("doc-{}.txt", i / 10), format!("chunk {i}")))
        .collect();
    index.add(vectors, records).unwrap();
    index
}

fn bench_search(c: &mut Criterion) {
    let dim = 1536;
    let query = unit_vector(7_919, dim);
    let mut group = c.benchmark_group("search_top5_dim1536");

    for rows in [1_000, 10_000] {
        let index = build_index(rows, dim);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &index, |b, index| {
            b.iter(|| index.search(black_box(&query), 5).unwrap())
        });
    }
    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(2_000);
    let chunker = TextChunker::with_defaults();

    c.bench_function("chunk_114k_chars", |b| {
        b.iter(|| chunker.split(black_box(&text)).unwrap())
    });
}

criterion_group!(benches, bench_search, bench_chunking);
criterion_main!(benches);
