//! Stochastic burble generator for liquid sounds.
//!
//! A burble is a short-lived damped sinusoid, optionally chirped, modelling
//! the ring of an air bubble forming in liquid. Burbles are spawned at a
//! fixed rate with a given chance; each one draws its radius from a power
//! law, and the radius sets its pitch, decay and loudness:
//!
//! ```text
//! radius = min(r_min·(1 − 0.97·u)^(−radius_dist) + offset, r_max)
//! freq   = clamp(3·pitch / radius, 20, 20000)
//! decay  = π·freq·(0.0009760646·√freq + 0.0592092)
//! amp    = gain·(amp_offset + (radius·raf + 0.01·(1 − raf))·(1 − 0.95·u₂)^(−amp_dist))
//! ```
//!
//! The pool of live burbles is a structure-of-arrays sized to a multiple of
//! [`LANES`](modalis_core::LANES). Each burble carries its remaining duration
//! `ln(1e-4/amp)/decay`; every 2.5 ms a shrink pass removes expired ones by
//! swapping the last live burble into their slot.
//!
//! Chirp is produced by running a second cosine recursion on the `2R·cos(θ)`
//! coefficient itself, capped at `2R` so the pitch can never fold back over
//! zero frequency.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use core::f32::consts::PI;
use libm::{cosf, logf, powf, roundf, sqrtf};
use modalis_core::{Curve, LANES, ModalBank, ModalCoeffs, Rng, fit_to_lanes, pitch_to_ratio};

/// Default cap on simultaneously live burbles.
pub const DEFAULT_MAX_BURBLES: i32 = 512;

/// Value of `max_burbles` meaning "no cap".
pub const UNLIMITED_BURBLES: i32 = -1;

/// Spawn rates below this never schedule a second spawn.
const MIN_SPAWN_RATE: f32 = 0.05;

/// Shrink interval in seconds.
const SHRINK_INTERVAL: f32 = 0.0025;

/// Initial pool size.
const INITIAL_POOL: usize = 64;

/// Smallest pool extension.
const MIN_POOL_EXTEND: usize = 16;

/// Burbles expected per unit of `chance·rate` when sizing pool growth.
const POOL_ESTIMATE_FACTOR: f32 = 0.032;

/// Amplitude at which a burble is considered finished.
const SILENCE_AMP: f32 = 1e-4;

const NEVER: usize = usize::MAX - 1;

/// Spawn parameters for [`BurbleGenerator`].
///
/// Radii are given in millimetres. Values are clamped to their ranges
/// every time they are applied.
///
/// ## Parameters
/// - `spawn_rate`: Spawn attempts per second (≥ 0, default 1000.0)
/// - `spawn_chance`: Probability an attempt spawns a burble (0.0 to 1.0, default 0.9)
/// - `radius_dist`: Power-law exponent of the radius distribution (0.3 to 2.0, default 1.0)
/// - `radius_min_mm`: Smallest radius (0.15 to 150.0, default 0.15)
/// - `radius_max_mm`: Largest radius (0.15 to 150.0, default 150.0)
/// - `radius_offset_mm`: Offset added to every radius (0.0 to 100.0, default 0.0)
/// - `pitch_shift`: Pitch shift in semitones (default 0.0)
/// - `amp_dist`: Power-law exponent of the amplitude distribution (0.1 to 1.5, default 0.7634)
/// - `radius_amp_factor`: How much radius drives amplitude (0.0 to 1.0, default 1.0)
/// - `amp_offset`: Constant added to the amplitude factor (0.0 to 1.0, default 0.0)
/// - `gain`: Amplitude gain, sign ignored (default 10.0)
/// - `gain_max`: Amplitude ceiling per burble (0.0 to 1.0, default 0.2)
/// - `decay_to_chirp_ratio`: Chirp rate as a fraction of decay rate (-1.0 to 1.0, default 0.1)
/// - `decay_scale`: Multiplier for decays under the threshold (≥ 0.1, default 1.0)
/// - `decay_thresh`: Decays below this are scaled (≥ 1.0, default 1000.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurbleParams {
    /// Spawn attempts per second.
    pub spawn_rate: f32,
    /// Probability that an attempt spawns.
    pub spawn_chance: f32,
    /// Radius distribution exponent.
    pub radius_dist: f32,
    /// Smallest radius in mm.
    pub radius_min_mm: f32,
    /// Largest radius in mm.
    pub radius_max_mm: f32,
    /// Radius offset in mm.
    pub radius_offset_mm: f32,
    /// Pitch shift in semitones.
    pub pitch_shift: f32,
    /// Amplitude distribution exponent.
    pub amp_dist: f32,
    /// Radius-to-amplitude blend.
    pub radius_amp_factor: f32,
    /// Amplitude offset.
    pub amp_offset: f32,
    /// Overall gain.
    pub gain: f32,
    /// Amplitude ceiling.
    pub gain_max: f32,
    /// Chirp rate relative to decay rate.
    pub decay_to_chirp_ratio: f32,
    /// Scale applied to small decays.
    pub decay_scale: f32,
    /// Threshold under which decays are scaled.
    pub decay_thresh: f32,
}

impl Default for BurbleParams {
    fn default() -> Self {
        Self {
            spawn_rate: 1000.0,
            spawn_chance: 0.9,
            radius_dist: 1.0,
            radius_min_mm: 0.15,
            radius_max_mm: 150.0,
            radius_offset_mm: 0.0,
            pitch_shift: 0.0,
            amp_dist: 0.7634,
            radius_amp_factor: 1.0,
            amp_offset: 0.0,
            gain: 10.0,
            gain_max: 0.2,
            decay_to_chirp_ratio: 0.1,
            decay_scale: 1.0,
            decay_thresh: 1000.0,
        }
    }
}

impl BurbleParams {
    /// True when these parameters can spawn new burbles.
    #[inline]
    pub fn can_spawn(&self) -> bool {
        self.spawn_rate > 0.0 && self.spawn_chance > 0.0
    }

    fn resolve(&self) -> SpawnShape {
        SpawnShape {
            spawn_rate: self.spawn_rate,
            spawn_chance: self.spawn_chance,
            radius_exp: -self.radius_dist.clamp(0.3, 2.0),
            radius_min: (self.radius_min_mm * 1e-3).clamp(0.15e-3, 150e-3),
            radius_max: (self.radius_max_mm * 1e-3).clamp(0.15e-3, 150e-3),
            radius_offset: (self.radius_offset_mm * 1e-3).clamp(0.0, 100e-3),
            pitch_scale: pitch_to_ratio(self.pitch_shift),
            amp_exp: -self.amp_dist.clamp(0.1, 1.5),
            radius_amp_factor: self.radius_amp_factor.clamp(0.0, 1.0),
            amp_offset: self.amp_offset.clamp(0.0, 1.0),
            gain: self.gain.abs(),
            gain_max: self.gain_max.clamp(0.0, 1.0),
            decay_to_chirp_ratio: self.decay_to_chirp_ratio.clamp(-1.0, 1.0),
            decay_scale: self.decay_scale.max(0.1),
            decay_thresh: self.decay_thresh.max(1.0),
        }
    }
}

/// Clamped parameters in SI units, resolved once per `generate` call.
#[derive(Debug, Clone, Copy)]
struct SpawnShape {
    spawn_rate: f32,
    spawn_chance: f32,
    radius_exp: f32,
    radius_min: f32,
    radius_max: f32,
    radius_offset: f32,
    pitch_scale: f32,
    amp_exp: f32,
    radius_amp_factor: f32,
    amp_offset: f32,
    gain: f32,
    gain_max: f32,
    decay_to_chirp_ratio: f32,
    decay_scale: f32,
    decay_thresh: f32,
}

/// Decay rate (1/s) of a bubble ringing at `freq`.
///
/// Sum of viscous, thermal and radiation damping fitted for air bubbles in
/// water.
#[inline]
pub fn bubble_decay_rate(freq: f32) -> f32 {
    PI * freq * (sqrtf(freq) * 0.0009760646 + 0.0592092)
}

/// Spawns and renders a pool of chirped burbles.
///
/// # Example
///
/// ```rust
/// use modalis_synth::{BurbleGenerator, BurbleParams};
///
/// let mut burbles = BurbleGenerator::new(48000.0, 7, 512);
/// let mut block = vec![0.0f32; 480];
/// burbles.generate(&mut block, &BurbleParams::default());
/// assert!(burbles.num_burbles() > 0);
/// ```
#[derive(Debug, Clone)]
pub struct BurbleGenerator {
    sample_rate: f32,
    time_step: f32,
    seed: i32,
    max_burbles: Option<usize>,
    samples_per_shrink: usize,
    rng: Rng,
    freq_gain: Option<Arc<Curve>>,
    bank: ModalBank,
    two_r_cos_prev: Vec<f32>,
    two_r_cos_max: Vec<f32>,
    chirp_two_r_cos: Vec<f32>,
    duration: Vec<f32>,
    count: usize,
    since_spawn: usize,
    since_shrink: usize,
}

impl BurbleGenerator {
    /// Create a generator.
    ///
    /// `seed` of [`RANDOM_SEED`](modalis_core::RANDOM_SEED) picks a fresh
    /// stream. `max_burbles ≤ 0` removes the cap on live burbles.
    pub fn new(sample_rate: f32, seed: i32, max_burbles: i32) -> Self {
        let max_burbles = usize::try_from(max_burbles).ok().filter(|&m| m > 0);
        let initial = max_burbles.map_or(INITIAL_POOL, |m| fit_to_lanes(m).min(INITIAL_POOL));

        let mut generator = Self {
            sample_rate,
            time_step: 1.0 / sample_rate,
            seed,
            max_burbles,
            samples_per_shrink: ((SHRINK_INTERVAL * sample_rate) as usize).max(1),
            rng: Rng::from_seed(seed),
            freq_gain: None,
            bank: ModalBank::new(),
            two_r_cos_prev: Vec::new(),
            two_r_cos_max: Vec::new(),
            chirp_two_r_cos: Vec::new(),
            duration: Vec::new(),
            count: 0,
            since_spawn: usize::MAX,
            since_shrink: 0,
        };
        generator.resize_pool(initial);
        generator
    }

    /// Set the curve mapping burble frequency (Hz) to a gain factor.
    pub fn set_freq_gain_curve(&mut self, curve: Option<Arc<Curve>>) {
        self.freq_gain = curve;
    }

    /// Number of live burbles.
    #[inline]
    pub fn num_burbles(&self) -> usize {
        self.count
    }

    /// Allocated pool slots, always a multiple of [`LANES`].
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bank.capacity()
    }

    /// Cap on live burbles, if any.
    #[inline]
    pub fn max_burbles(&self) -> Option<usize> {
        self.max_burbles
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Silence every burble and restart the random stream from the seed.
    ///
    /// Keeps the pool allocation.
    pub fn restart(&mut self) {
        self.rng = Rng::from_seed(self.seed);
        self.bank.reset();
        self.two_r_cos_prev.fill(0.0);
        self.two_r_cos_max.fill(0.0);
        self.chirp_two_r_cos.fill(0.0);
        self.duration.fill(0.0);
        self.count = 0;
        self.since_spawn = usize::MAX;
        self.since_shrink = 0;
    }

    /// Spawn and render burbles, adding into `out`.
    pub fn generate(&mut self, out: &mut [f32], params: &BurbleParams) {
        let shape = params.resolve();
        if self.should_shrink() {
            self.shrink();
        }

        let can_spawn = params.can_spawn();
        let gen_step = if can_spawn && shape.spawn_rate >= MIN_SPAWN_RATE {
            ((self.sample_rate / shape.spawn_rate) as usize).max(1)
        } else {
            NEVER
        };
        if can_spawn && self.since_spawn > gen_step {
            self.spawn(&shape);
        }

        let mut pos = 0;
        while pos < out.len() {
            let remaining = (out.len() - pos).min(self.samples_per_shrink);
            let step = if can_spawn {
                let step = gen_step.saturating_sub(self.since_spawn).min(remaining);
                self.since_spawn += step;
                step
            } else {
                remaining
            };

            if self.count > 0 {
                self.synthesize(&mut out[pos..pos + step]);
            }
            pos += step;
            self.since_shrink += step;

            if self.should_shrink() {
                self.shrink();
            }
            if can_spawn && self.since_spawn >= gen_step {
                self.spawn(&shape);
            }
        }
    }

    #[inline]
    fn should_shrink(&self) -> bool {
        self.since_shrink > self.samples_per_shrink
    }

    fn spawn(&mut self, shape: &SpawnShape) -> bool {
        self.since_spawn = 0;

        let full = self.max_burbles.is_some_and(|m| self.count >= m);
        if full || self.rng.fraction() > shape.spawn_chance {
            return false;
        }

        let radius = self.sample_radius(shape);
        let freq = (3.0 * shape.pitch_scale / radius).clamp(20.0, 20000.0);
        let amp = self.sample_amp(shape, radius, freq);
        if amp == 0.0 || radius == 0.0 {
            return false;
        }

        let mut decay = bubble_decay_rate(freq);
        let chirp_rate = decay * shape.decay_to_chirp_ratio;
        if decay < shape.decay_thresh {
            decay = shape.decay_thresh.min(shape.decay_scale * decay);
        }
        if !ModalCoeffs::is_valid(decay, freq, self.sample_rate) {
            return false;
        }

        let index = self.count;
        if index >= self.capacity() {
            self.grow(shape);
            if index >= self.capacity() {
                return false;
            }
        }
        self.count += 1;

        let coeffs = ModalCoeffs::new(decay, freq, self.sample_rate);
        let chirp_step = chirp_rate * self.time_step;
        self.two_r_cos_prev[index] = 2.0 * coeffs.r * cosf(coeffs.theta * (1.0 - chirp_step));
        self.two_r_cos_max[index] = 2.0 * coeffs.r;
        self.chirp_two_r_cos[index] = 2.0 * cosf(chirp_step * coeffs.theta);

        // Random polarity keeps the summed onsets free of DC
        let signed_amp = amp * self.rng.sign();
        self.bank.set(index, coeffs, coeffs.initial_y1(signed_amp), 0.0);
        self.bank.set_active(self.count);
        self.duration[index] = logf(SILENCE_AMP / amp) / -decay;
        true
    }

    fn sample_radius(&mut self, shape: &SpawnShape) -> f32 {
        let u = 1.0 - self.rng.fraction() * 0.97;
        let radius = shape.radius_min * powf(u, shape.radius_exp);
        (radius + shape.radius_offset).min(shape.radius_max)
    }

    fn sample_amp(&mut self, shape: &SpawnShape, radius: f32, freq: f32) -> f32 {
        let u = 1.0 - self.rng.fraction() * 0.95;
        let raf = shape.radius_amp_factor;
        let radius_factor = radius * raf + 0.01 * (1.0 - raf);
        let mut amp = shape.gain * (shape.amp_offset + radius_factor * powf(u, shape.amp_exp));
        if let Some(curve) = &self.freq_gain {
            amp *= curve.value_interp(freq);
        }
        amp.clamp(0.0, shape.gain_max)
    }

    fn grow(&mut self, shape: &SpawnShape) {
        let capacity = self.capacity();
        let estimate = roundf(shape.spawn_chance * shape.spawn_rate * POOL_ESTIMATE_FACTOR) as usize;
        let mut extend = estimate.saturating_sub(capacity).max(MIN_POOL_EXTEND);
        if let Some(max) = self.max_burbles {
            extend = extend.min(fit_to_lanes(max).saturating_sub(capacity));
        }
        if extend == 0 {
            return;
        }
        self.resize_pool(capacity + extend);
        tracing::debug!(capacity = self.capacity(), "burble pool grown");
    }

    fn resize_pool(&mut self, n: usize) {
        self.bank.ensure_capacity(n);
        let n = self.bank.capacity();
        self.two_r_cos_prev.resize(n, 0.0);
        self.two_r_cos_max.resize(n, 0.0);
        self.chirp_two_r_cos.resize(n, 0.0);
        self.duration.resize(n, 0.0);
    }

    fn synthesize(&mut self, out: &mut [f32]) {
        let n = fit_to_lanes(self.count);
        let parts = self.bank.parts_mut();
        let c = &mut parts.two_r_cos[..n];
        let r2 = &parts.r_square[..n];
        let y1 = &mut parts.y1[..n];
        let y2 = &mut parts.y2[..n];
        let c_prev = &mut self.two_r_cos_prev[..n];
        let c_max = &self.two_r_cos_max[..n];
        let chirp = &self.chirp_two_r_cos[..n];

        for sample in out.iter_mut() {
            let mut acc = [0.0f32; LANES];
            for group in (0..n).step_by(LANES) {
                for (l, a) in acc.iter_mut().enumerate() {
                    let j = group + l;
                    let y0 = c[j] * y1[j] - r2[j] * y2[j];
                    y2[j] = y1[j];
                    y1[j] = y0;
                    *a += y0;

                    let next = c_max[j].min(c[j] * chirp[j] - c_prev[j]);
                    c_prev[j] = c[j];
                    c[j] = next;
                }
            }
            *sample += acc.iter().sum::<f32>();
        }

        let elapsed = out.len() as f32 * self.time_step;
        for d in &mut self.duration[..self.count] {
            *d -= elapsed;
        }
    }

    /// Remove expired burbles by swapping the last live one into their slot.
    fn shrink(&mut self) {
        self.since_shrink = 0;
        let mut i = 0;
        while i < self.count {
            if self.duration[i] > 0.0 {
                i += 1;
                continue;
            }
            let last = self.count - 1;
            if i != last {
                self.move_slot(last, i);
            }
            self.clear_slot(last);
            self.count -= 1;
        }
        self.bank.set_active(self.count);
    }

    fn move_slot(&mut self, from: usize, to: usize) {
        let p = self.bank.parts_mut();
        p.two_r_cos[to] = p.two_r_cos[from];
        p.r_square[to] = p.r_square[from];
        p.y1[to] = p.y1[from];
        p.y2[to] = p.y2[from];
        self.two_r_cos_prev[to] = self.two_r_cos_prev[from];
        self.two_r_cos_max[to] = self.two_r_cos_max[from];
        self.chirp_two_r_cos[to] = self.chirp_two_r_cos[from];
        self.duration[to] = self.duration[from];
    }

    fn clear_slot(&mut self, i: usize) {
        let p = self.bank.parts_mut();
        p.two_r_cos[i] = 0.0;
        p.r_square[i] = 0.0;
        p.y1[i] = 0.0;
        p.y2[i] = 0.0;
        self.two_r_cos_prev[i] = 0.0;
        self.two_r_cos_max[i] = 0.0;
        self.chirp_two_r_cos[i] = 0.0;
        self.duration[i] = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    #[test]
    fn zero_spawn_rate_is_silent() {
        let mut g = BurbleGenerator::new(SR, 1, DEFAULT_MAX_BURBLES);
        let params = BurbleParams {
            spawn_rate: 0.0,
            ..BurbleParams::default()
        };
        let mut out = vec![0.0f32; 4800];
        g.generate(&mut out, &params);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(g.num_burbles(), 0);
    }

    #[test]
    fn spawns_at_time_zero() {
        let mut g = BurbleGenerator::new(SR, 3, DEFAULT_MAX_BURBLES);
        let params = BurbleParams {
            spawn_chance: 1.0,
            ..BurbleParams::default()
        };
        let mut out = vec![0.0f32; 1];
        g.generate(&mut out, &params);
        assert_eq!(g.num_burbles(), 1);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let params = BurbleParams::default();
        let mut a = BurbleGenerator::new(SR, 42, DEFAULT_MAX_BURBLES);
        let mut b = BurbleGenerator::new(SR, 42, DEFAULT_MAX_BURBLES);
        let mut out_a = vec![0.0f32; 2048];
        let mut out_b = vec![0.0f32; 2048];
        a.generate(&mut out_a, &params);
        b.generate(&mut out_b, &params);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn restart_replays_the_stream() {
        let params = BurbleParams::default();
        let mut g = BurbleGenerator::new(SR, 9, DEFAULT_MAX_BURBLES);
        let mut first = vec![0.0f32; 1024];
        g.generate(&mut first, &params);
        g.restart();
        let mut second = vec![0.0f32; 1024];
        g.generate(&mut second, &params);
        assert_eq!(first, second);
    }

    #[test]
    fn live_count_respects_cap() {
        let mut g = BurbleGenerator::new(SR, 5, 10);
        let params = BurbleParams {
            spawn_rate: 20000.0,
            spawn_chance: 1.0,
            decay_thresh: 1.0,
            ..BurbleParams::default()
        };
        let mut out = vec![0.0f32; 512];
        for _ in 0..20 {
            g.generate(&mut out, &params);
            assert!(g.num_burbles() <= 10);
            assert!(g.capacity() <= fit_to_lanes(10));
        }
    }

    #[test]
    fn pool_grows_past_initial_size() {
        let mut g = BurbleGenerator::new(SR, 5, UNLIMITED_BURBLES);
        let params = BurbleParams {
            spawn_rate: 20000.0,
            spawn_chance: 1.0,
            decay_thresh: 1.0,
            radius_min_mm: 5.0,
            ..BurbleParams::default()
        };
        let mut out = vec![0.0f32; 512];
        g.generate(&mut out, &params);
        assert!(g.num_burbles() > INITIAL_POOL, "got {}", g.num_burbles());
        assert_eq!(g.capacity() % LANES, 0);
    }

    #[test]
    fn burbles_expire_after_spawning_stops() {
        let mut g = BurbleGenerator::new(SR, 11, DEFAULT_MAX_BURBLES);
        let mut out = vec![0.0f32; 480];
        g.generate(&mut out, &BurbleParams::default());
        assert!(g.num_burbles() > 0);

        let stopped = BurbleParams {
            spawn_rate: 0.0,
            ..BurbleParams::default()
        };
        // Radii stay under 5 mm, so every burble is gone within ~50 ms
        for _ in 0..50 {
            g.generate(&mut out, &stopped);
        }
        assert_eq!(g.num_burbles(), 0);
    }

    #[test]
    fn output_is_additive() {
        let params = BurbleParams::default();
        let mut a = BurbleGenerator::new(SR, 2, DEFAULT_MAX_BURBLES);
        let mut b = BurbleGenerator::new(SR, 2, DEFAULT_MAX_BURBLES);
        let mut base = vec![0.0f32; 256];
        let mut offset = vec![0.5f32; 256];
        a.generate(&mut base, &params);
        b.generate(&mut offset, &params);
        for (x, y) in base.iter().zip(&offset) {
            assert!((y - x - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn bubble_decay_rises_with_frequency() {
        assert!(bubble_decay_rate(200.0) < bubble_decay_rate(2000.0));
        let f = 1000.0f32;
        let expected = PI * f * (f.sqrt() * 0.0009760646 + 0.0592092);
        assert!((bubble_decay_rate(f) - expected).abs() < 1e-2);
    }

    #[test]
    fn params_clamp_into_range() {
        let wild = BurbleParams {
            radius_dist: 10.0,
            radius_min_mm: 0.0,
            radius_max_mm: 1e6,
            gain: -3.0,
            gain_max: 5.0,
            decay_to_chirp_ratio: 4.0,
            ..BurbleParams::default()
        };
        let s = wild.resolve();
        assert_eq!(s.radius_exp, -2.0);
        assert_eq!(s.radius_min, 0.15e-3);
        assert_eq!(s.radius_max, 150e-3);
        assert_eq!(s.gain, 3.0);
        assert_eq!(s.gain_max, 1.0);
        assert_eq!(s.decay_to_chirp_ratio, 1.0);
    }

    #[test]
    fn frequency_gain_curve_can_mute() {
        let mut g = BurbleGenerator::new(SR, 4, DEFAULT_MAX_BURBLES);
        g.set_freq_gain_curve(Some(Arc::new(Curve::from_samples(vec![0.0, 0.0], 20.0, 20000.0))));
        let mut out = vec![0.0f32; 2048];
        g.generate(&mut out, &BurbleParams::default());
        assert_eq!(g.num_burbles(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn chirp_never_exceeds_cap() {
        let mut g = BurbleGenerator::new(SR, 8, DEFAULT_MAX_BURBLES);
        let params = BurbleParams {
            decay_to_chirp_ratio: -1.0,
            ..BurbleParams::default()
        };
        let mut out = vec![0.0f32; 960];
        g.generate(&mut out, &params);
        for j in 0..g.num_burbles() {
            assert!(g.bank.two_r_cos()[j] <= g.two_r_cos_max[j]);
        }
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
