//! Criterion benchmarks for modalis-core primitives
//!
//! Run with: cargo bench -p modalis-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use modalis_core::{Curve, ModalBank};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];
const MODAL_COUNTS: &[usize] = &[16, 64, 256];

fn make_bank(num_modals: usize) -> ModalBank {
    let modals: Vec<_> = (0..num_modals)
        .map(|i| (0.01, 2.0 + i as f32 * 0.1, 60.0 + 70.0 * i as f32))
        .collect();
    ModalBank::from_modals(&modals, SAMPLE_RATE)
}

fn bench_modal_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("ModalBank");

    for &modals in MODAL_COUNTS {
        for &block_size in BLOCK_SIZES {
            let mut bank = make_bank(modals);
            let mut out = vec![0.0f32; block_size];
            group.bench_with_input(
                BenchmarkId::new(format!("synthesize_add/{modals}"), block_size),
                &block_size,
                |b, _| {
                    b.iter(|| {
                        bank.synthesize_add(black_box(&mut out));
                    });
                },
            );
        }
    }

    group.bench_function("compact/256", |b| {
        let mut bank = make_bank(256);
        b.iter(|| black_box(bank.compact(black_box(1e-6))));
    });

    group.finish();
}

fn bench_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("Curve");
    let curve = Curve::from_fn(0.0, 1.0, 1024, |x| (x * std::f32::consts::TAU).sin());

    group.bench_function("value_interp", |b| {
        b.iter(|| black_box(curve.value_interp(black_box(0.377))));
    });

    for &block_size in BLOCK_SIZES {
        let mut out = vec![0.0f32; block_size];
        group.bench_with_input(
            BenchmarkId::new("fill_cyclic_interp", block_size),
            &block_size,
            |b, _| {
                b.iter(|| curve.fill_cyclic_interp(black_box(0.1), 0.0021, &mut out, 1));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_modal_bank, bench_curve);
criterion_main!(benches);
