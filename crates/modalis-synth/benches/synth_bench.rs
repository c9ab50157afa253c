//! Criterion benchmarks for modalis-synth generators
//!
//! Run with: cargo bench -p modalis-synth

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use modalis_core::Curve;
use modalis_synth::{
    BurbleGenerator, BurbleParams, DEFAULT_MAX_BURBLES, EngineParams, EngineSetup, NoiseMode,
    StateShape, TwoStateForceGen, TwoStateParams, VehicleEngineSynth,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

// ============================================================================
// Burble benchmarks
// ============================================================================

fn bench_burbles(c: &mut Criterion) {
    let mut group = c.benchmark_group("Burbles");

    let densities = [("Sparse", 200.0f32), ("Dense", 5000.0), ("Flood", 20000.0)];

    for (name, rate) in &densities {
        for &block_size in BLOCK_SIZES {
            let mut burbles = BurbleGenerator::new(SAMPLE_RATE, 1, DEFAULT_MAX_BURBLES);
            let params = BurbleParams {
                spawn_rate: *rate,
                ..BurbleParams::default()
            };
            let mut buffer = vec![0.0f32; block_size];

            group.bench_with_input(BenchmarkId::new(*name, block_size), &block_size, |b, _| {
                b.iter(|| {
                    buffer.fill(0.0);
                    burbles.generate(&mut buffer, &params);
                    black_box(buffer[0])
                })
            });
        }
    }

    group.finish();
}

// ============================================================================
// Two-state force benchmarks
// ============================================================================

fn bench_two_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("TwoStateForce");

    let pulse = Arc::new(Curve::from_fn(0.0, 1.0, 64, |x| (x * core::f32::consts::PI).sin()));
    let rest = Arc::new(Curve::from_samples(vec![0.0, 0.0], 0.0, 1.0));

    let modes = [("Clean", NoiseMode::None), ("Noisy", NoiseMode::Add)];

    for (name, mode) in &modes {
        let params = TwoStateParams {
            freq: 220.0,
            duty_cycle: 0.3,
            first: StateShape {
                noise_mode: *mode,
                ..StateShape::with_curve(Arc::clone(&pulse))
            },
            second: StateShape::with_curve(Arc::clone(&rest)),
            ..TwoStateParams::default()
        };

        for &block_size in BLOCK_SIZES {
            let mut force = TwoStateForceGen::new(SAMPLE_RATE, block_size, 1);
            let mut buffer = vec![0.0f32; block_size];

            group.bench_with_input(BenchmarkId::new(*name, block_size), &block_size, |b, _| {
                b.iter(|| {
                    force.generate(&mut buffer, &params);
                    black_box(buffer[0])
                })
            });
        }
    }

    group.finish();
}

// ============================================================================
// Vehicle engine benchmarks
// ============================================================================

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("VehicleEngine");

    for num_harmonics in [8usize, 32, 64] {
        let setup = EngineSetup {
            pulses_per_cycle: 4,
            harmonics: (1..=num_harmonics)
                .map(|h| (0.5 / h as f32, 0.0, 100.0 * h as f32))
                .collect(),
            max_harmonics: 0,
        };
        let mut params = EngineParams {
            rpm: 2500.0,
            ..EngineParams::default()
        };
        let mut engine = VehicleEngineSynth::new(SAMPLE_RATE, &setup, &params, 1);

        for &block_size in BLOCK_SIZES {
            let mut buffer = vec![0.0f32; block_size];
            let mut tick = 0u32;

            group.bench_with_input(
                BenchmarkId::new(format!("Harmonics{num_harmonics}"), block_size),
                &block_size,
                |b, _| {
                    b.iter(|| {
                        // Slow rpm wobble keeps the frequency path busy
                        tick = tick.wrapping_add(1);
                        params.rpm = 2500.0 + 200.0 * ((tick % 64) as f32 / 64.0);
                        engine.generate(&mut buffer, &params);
                        black_box(buffer[0])
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_burbles, bench_two_state, bench_engine);
criterion_main!(benches);
