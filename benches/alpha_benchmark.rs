#![cfg(not(target_arch = "wasm32"))]
//! Criterion benchmarks for the alpha transforms.
//!
//! Run with: cargo bench --bench alpha_benchmark
//! Run with native: RUSTFLAGS="-C target-cpu=native" cargo bench --bench alpha_benchmark

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use zenalpha::AlphaOps;

const WIDTH: usize = 1920;
const HEIGHT: usize = 64;

/// Deterministic pseudo-random fill; avoids benchmarking the RNG.
fn fill(buf: &mut [u8], mut state: u32) {
    for b in buf.iter_mut() {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        *b = (state >> 24) as u8;
    }
}

fn bench_merge_extract(c: &mut Criterion) {
    let ops = AlphaOps::new();
    let mut plane = vec![0u8; WIDTH * HEIGHT];
    fill(&mut plane, 0x1837_c21f);
    let mut rgba = vec![0u8; 4 * WIDTH * HEIGHT + 4];

    let mut group = c.benchmark_group("merge_extract");
    group.throughput(Throughput::Bytes((WIDTH * HEIGHT) as u64));
    group.bench_function("merge_alpha", |b| {
        b.iter(|| {
            black_box(ops.merge_alpha(
                black_box(&plane),
                WIDTH,
                WIDTH,
                HEIGHT,
                &mut rgba[3..],
                4 * WIDTH,
            ))
        })
    });
    group.bench_function("extract_alpha", |b| {
        b.iter(|| {
            black_box(ops.extract_alpha(
                black_box(&rgba[3..]),
                4 * WIDTH,
                WIDTH,
                HEIGHT,
                &mut plane,
                WIDTH,
            ))
        })
    });
    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let ops = AlphaOps::new();
    let mut plane = vec![0u8; WIDTH * HEIGHT];
    fill(&mut plane, 0x5eed_5eed);
    let mut words = vec![0u32; WIDTH * HEIGHT];

    let mut group = c.benchmark_group("expand");
    group.throughput(Throughput::Bytes((WIDTH * HEIGHT) as u64));
    group.bench_function("expand_alpha_to_luma", |b| {
        b.iter(|| {
            ops.expand_alpha_to_luma(black_box(&plane), WIDTH, WIDTH, HEIGHT, &mut words, WIDTH);
        })
    });
    group.finish();
}

fn bench_premultiply(c: &mut Criterion) {
    let ops = AlphaOps::new();
    let mut rgba = vec![0u8; 4 * WIDTH];
    fill(&mut rgba, 0x0042_1337);
    let mut words: Vec<u32> = rgba
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    let mut channel = vec![0u8; WIDTH];
    let mut alpha = vec![0u8; WIDTH];
    fill(&mut channel, 0x7777_0001);
    fill(&mut alpha, 0x7777_0002);

    let mut group = c.benchmark_group("premultiply_row");
    group.throughput(Throughput::Bytes((4 * WIDTH) as u64));
    group.bench_function("interleaved", |b| {
        b.iter(|| ops.premultiply_interleaved(black_box(&mut rgba), false, WIDTH, 1, 4 * WIDTH))
    });
    group.bench_function("packed_forward", |b| {
        b.iter(|| ops.premultiply_packed(black_box(&mut words), false))
    });
    group.bench_function("packed_inverse", |b| {
        b.iter(|| ops.premultiply_packed(black_box(&mut words), true))
    });
    group.finish();

    let mut group = c.benchmark_group("premultiply_planar");
    group.throughput(Throughput::Bytes(WIDTH as u64));
    group.bench_function("planar_forward", |b| {
        b.iter(|| ops.premultiply_planar(black_box(&mut channel), &alpha, false))
    });
    group.finish();
}

criterion_group!(benches, bench_merge_extract, bench_expand, bench_premultiply);
criterion_main!(benches);
