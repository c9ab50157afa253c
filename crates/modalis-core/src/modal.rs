//! Modal oscillator bank.
//!
//! A modal oscillator is a second-order recursive resonator that produces a
//! damped sinusoid without evaluating any trigonometric function per sample:
//!
//! ```text
//! y[n] = 2R·cos(θ)·y[n-1] − R²·y[n-2] (+ gain·force[n])
//!
//! R = exp(−decay / sample_rate)
//! θ = 2π·freq / sample_rate
//! ```
//!
//! Started from `y[-1] = amp·R·sin(θ)` and `y[-2] = 0`, the free recursion
//! renders `amp·e^(−decay·t)·sin(ωt)`.
//!
//! [`ModalBank`] stores many oscillators as parallel arrays (structure of
//! arrays) sized to a multiple of [`LANES`]. Only the first
//! [`active`](ModalBank::active) oscillators are advanced; everything above is
//! zero and ignored. [`compact`](ModalBank::compact) shrinks the active range
//! once the top oscillators have decayed below a strength threshold.
//!
//! The bank does not guard against unstable coefficients: callers reject
//! modals at or above Nyquist, at non-positive frequency, or with negative
//! decay before loading them (see [`ModalCoeffs::is_valid`]).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::f32::consts::PI;
use libm::{cosf, expf, sinf};

use crate::lanes::{LANES, count_active_from_top, fit_to_lanes, validate_active, zero_range};

/// Recursion coefficients for a single modal oscillator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalCoeffs {
    /// Per-sample decay factor `R = exp(−decay/sr)`.
    pub r: f32,
    /// Angular step per sample in radians.
    pub theta: f32,
    /// `2R·cos(θ)`.
    pub two_r_cos: f32,
    /// `R²`.
    pub r_square: f32,
}

impl ModalCoeffs {
    /// Coefficients for a modal with `decay` (1/s) and `freq` (Hz).
    #[inline]
    pub fn new(decay: f32, freq: f32, sample_rate: f32) -> Self {
        let r = expf(-decay / sample_rate);
        let theta = 2.0 * PI * freq / sample_rate;
        Self {
            r,
            theta,
            two_r_cos: 2.0 * r * cosf(theta),
            r_square: r * r,
        }
    }

    /// Coefficients for an undamped oscillator (`R = 1`).
    #[inline]
    pub fn undamped(freq: f32, sample_rate: f32) -> Self {
        Self::new(0.0, freq, sample_rate)
    }

    /// `y1` that starts the recursion at phase zero with amplitude `amp`.
    #[inline]
    pub fn initial_y1(&self, amp: f32) -> f32 {
        amp * self.r * sinf(self.theta)
    }

    /// Whether a modal with these parameters can be rendered stably.
    #[inline]
    pub fn is_valid(decay: f32, freq: f32, sample_rate: f32) -> bool {
        freq > 0.0 && freq < 0.5 * sample_rate && decay >= 0.0 && decay.is_finite()
    }
}

/// Mutable views over every array of a [`ModalBank`], for custom recursions.
#[derive(Debug)]
pub struct ModalParts<'a> {
    /// `2R·cos(θ)` per oscillator.
    pub two_r_cos: &'a mut [f32],
    /// `R²` per oscillator.
    pub r_square: &'a mut [f32],
    /// Last output per oscillator.
    pub y1: &'a mut [f32],
    /// Output before last per oscillator.
    pub y2: &'a mut [f32],
}

/// Structure-of-arrays bank of modal oscillators.
///
/// # Example
///
/// ```rust
/// use modalis_core::ModalBank;
///
/// // (amplitude, decay 1/s, frequency Hz)
/// let mut bank = ModalBank::from_modals(&[(0.5, 3.0, 440.0), (0.2, 5.0, 880.0)], 48000.0);
/// assert_eq!(bank.active(), 4);
///
/// let mut out = vec![0.0; 256];
/// bank.synthesize_add(&mut out);
/// assert!(out.iter().any(|&s| s != 0.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModalBank {
    two_r_cos: Vec<f32>,
    r_square: Vec<f32>,
    y1: Vec<f32>,
    y2: Vec<f32>,
    active: usize,
}

impl ModalBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bank with room for at least `n` oscillators, all silent.
    pub fn with_capacity(n: usize) -> Self {
        let mut bank = Self::new();
        bank.ensure_capacity(n);
        bank
    }

    /// Build a bank from `(amplitude, decay, frequency)` triples.
    ///
    /// Modals that cannot be rendered stably or have zero amplitude are
    /// skipped. All loaded modals start at phase zero.
    pub fn from_modals(modals: &[(f32, f32, f32)], sample_rate: f32) -> Self {
        let mut bank = Self::with_capacity(modals.len());
        let mut n = 0;
        for &(amp, decay, freq) in modals {
            if amp == 0.0 || !ModalCoeffs::is_valid(decay, freq, sample_rate) {
                continue;
            }
            let coeffs = ModalCoeffs::new(decay, freq, sample_rate);
            bank.set(n, coeffs, coeffs.initial_y1(amp), 0.0);
            n += 1;
        }
        bank.set_active(n);
        bank
    }

    /// Allocated oscillator slots (always a multiple of [`LANES`]).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.y1.len()
    }

    /// Number of oscillators advanced by synthesis (multiple of [`LANES`]).
    #[inline]
    pub fn active(&self) -> usize {
        self.active
    }

    /// True when no oscillator is active.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.active == 0
    }

    /// Set the active count, rounded up to lanes and limited to capacity.
    pub fn set_active(&mut self, n: usize) {
        self.active = fit_to_lanes(n).min(self.capacity());
    }

    /// Grow every array with zeros so that at least `n` slots exist.
    ///
    /// Allocates; keep this off the audio path except for explicit,
    /// infrequent pool growth.
    pub fn ensure_capacity(&mut self, n: usize) {
        let n = fit_to_lanes(n);
        if n > self.capacity() {
            self.two_r_cos.resize(n, 0.0);
            self.r_square.resize(n, 0.0);
            self.y1.resize(n, 0.0);
            self.y2.resize(n, 0.0);
        }
    }

    /// Write coefficients and state of oscillator `i`.
    #[inline]
    pub fn set(&mut self, i: usize, coeffs: ModalCoeffs, y1: f32, y2: f32) {
        self.two_r_cos[i] = coeffs.two_r_cos;
        self.r_square[i] = coeffs.r_square;
        self.y1[i] = y1;
        self.y2[i] = y2;
    }

    /// Overwrite the coefficients of oscillator `i`, keeping its state.
    #[inline]
    pub fn set_coefficients(&mut self, i: usize, two_r_cos: f32, r_square: f32) {
        self.two_r_cos[i] = two_r_cos;
        self.r_square[i] = r_square;
    }

    /// `2R·cos(θ)` of every slot.
    #[inline]
    pub fn two_r_cos(&self) -> &[f32] {
        &self.two_r_cos
    }

    /// `R²` of every slot.
    #[inline]
    pub fn r_square(&self) -> &[f32] {
        &self.r_square
    }

    /// Last output of every slot.
    #[inline]
    pub fn y1(&self) -> &[f32] {
        &self.y1
    }

    /// Output before last of every slot.
    #[inline]
    pub fn y2(&self) -> &[f32] {
        &self.y2
    }

    /// Split borrows of all arrays.
    #[inline]
    pub fn parts_mut(&mut self) -> ModalParts<'_> {
        ModalParts {
            two_r_cos: &mut self.two_r_cos,
            r_square: &mut self.r_square,
            y1: &mut self.y1,
            y2: &mut self.y2,
        }
    }

    /// Advance all active oscillators one sample and return their sum.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let n = self.active;
        step_free(
            &self.two_r_cos[..n],
            &self.r_square[..n],
            &mut self.y1[..n],
            &mut self.y2[..n],
        )
    }

    /// Render the free recursion, adding into `out`.
    pub fn synthesize_add(&mut self, out: &mut [f32]) {
        if self.active == 0 {
            return;
        }
        for sample in out.iter_mut() {
            *sample += self.tick();
        }
    }

    /// Render the free recursion, overwriting `out`.
    pub fn synthesize_write(&mut self, out: &mut [f32]) {
        if self.active == 0 {
            out.fill(0.0);
            return;
        }
        for sample in out.iter_mut() {
            *sample = self.tick();
        }
    }

    /// Render the free recursion scaled per sample by `envelope`, adding into `out`.
    ///
    /// Only `min(out.len(), envelope.len())` samples are rendered.
    pub fn synthesize_enveloped_add(&mut self, out: &mut [f32], envelope: &[f32]) {
        if self.active == 0 {
            return;
        }
        for (sample, &env) in out.iter_mut().zip(envelope) {
            *sample += env * self.tick();
        }
    }

    /// Render the forced recursion, adding into `out`.
    ///
    /// Each oscillator `j` receives `gains[j]·force[n]` on top of its free
    /// recursion. `gains` must cover the active range; only
    /// `min(out.len(), force.len())` samples are rendered.
    pub fn synthesize_forced_add(&mut self, out: &mut [f32], force: &[f32], gains: &[f32]) {
        let n = self.active;
        if n == 0 {
            return;
        }
        let gains = &gains[..n];
        for (sample, &x) in out.iter_mut().zip(force) {
            *sample += step_forced(
                &self.two_r_cos[..n],
                &self.r_square[..n],
                &mut self.y1[..n],
                &mut self.y2[..n],
                gains,
                x,
            );
        }
    }

    /// Drop silent oscillators from the top of the active range.
    ///
    /// Returns the new active count. Trimmed slots are zeroed.
    pub fn compact(&mut self, strength_min: f32) -> usize {
        let n = count_active_from_top(self.active, &self.y1, &self.y2, strength_min);
        zero_range(n, self.active, &mut self.y1, &mut self.y2);
        self.active = n;
        n
    }

    /// Forward scan that zeroes unstable lanes and stops at the first quiet group.
    ///
    /// Returns the new active count. Slots above it keep their state but are
    /// no longer rendered.
    pub fn validate(&mut self, strength_min: f32) -> usize {
        self.active = validate_active(self.active, &mut self.y1, &mut self.y2, strength_min);
        self.active
    }

    /// Summed `|y1| + |y2|` over the active range.
    pub fn energy(&self) -> f32 {
        let n = self.active;
        self.y1[..n]
            .iter()
            .zip(&self.y2[..n])
            .map(|(a, b)| a.abs() + b.abs())
            .sum()
    }

    /// Multiply the state of every active oscillator by `k`.
    pub fn scale_state(&mut self, k: f32) {
        let n = self.active;
        for y in self.y1[..n].iter_mut().chain(self.y2[..n].iter_mut()) {
            *y *= k;
        }
    }

    /// Multiply the coefficients of every active oscillator.
    ///
    /// Scaling `two_r_cos` by `k` and `r_square` by `k²` multiplies the
    /// per-sample decay factor by `k` without changing the frequency.
    pub fn scale_decay(&mut self, k: f32) {
        let n = self.active;
        let k2 = k * k;
        for (c, r2) in self.two_r_cos[..n].iter_mut().zip(&mut self.r_square[..n]) {
            *c *= k;
            *r2 *= k2;
        }
    }

    /// Zero all state and deactivate every oscillator. Keeps allocations.
    pub fn reset(&mut self) {
        self.two_r_cos.fill(0.0);
        self.r_square.fill(0.0);
        self.y1.fill(0.0);
        self.y2.fill(0.0);
        self.active = 0;
    }
}

/// One free step over lane groups, returning the summed output.
#[inline]
fn step_free(c: &[f32], r2: &[f32], y1: &mut [f32], y2: &mut [f32]) -> f32 {
    let mut acc = [0.0f32; LANES];
    for (((c, r2), y1), y2) in c
        .chunks_exact(LANES)
        .zip(r2.chunks_exact(LANES))
        .zip(y1.chunks_exact_mut(LANES))
        .zip(y2.chunks_exact_mut(LANES))
    {
        for l in 0..LANES {
            let y0 = c[l] * y1[l] - r2[l] * y2[l];
            y2[l] = y1[l];
            y1[l] = y0;
            acc[l] += y0;
        }
    }
    acc.iter().sum()
}

/// One forced step over lane groups, returning the summed output.
#[inline]
fn step_forced(
    c: &[f32],
    r2: &[f32],
    y1: &mut [f32],
    y2: &mut [f32],
    gains: &[f32],
    force: f32,
) -> f32 {
    let mut acc = [0.0f32; LANES];
    for ((((c, r2), y1), y2), g) in c
        .chunks_exact(LANES)
        .zip(r2.chunks_exact(LANES))
        .zip(y1.chunks_exact_mut(LANES))
        .zip(y2.chunks_exact_mut(LANES))
        .zip(gains.chunks_exact(LANES))
    {
        for l in 0..LANES {
            let y0 = c[l] * y1[l] - r2[l] * y2[l] + g[l] * force;
            y2[l] = y1[l];
            y1[l] = y0;
            acc[l] += y0;
        }
    }
    acc.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    #[test]
    fn single_modal_matches_damped_sine() {
        let (amp, decay, freq) = (0.8, 10.0, 440.0);
        let mut bank = ModalBank::from_modals(&[(amp, decay, freq)], SR);
        let mut out = vec![0.0; 480];
        bank.synthesize_write(&mut out);

        // y1/y2 seed samples 1 and 0, so the first rendered sample is sample 2
        for (n, &y) in out.iter().enumerate() {
            let t = (n + 2) as f32 / SR;
            let expected = amp * libm::expf(-decay * t) * libm::sinf(2.0 * PI * freq * t);
            assert!(
                (y - expected).abs() < 1e-3,
                "sample {n}: got {y}, expected {expected}"
            );
        }
    }

    #[test]
    fn invalid_modals_are_skipped() {
        let bank = ModalBank::from_modals(
            &[(1.0, 1.0, 30000.0), (1.0, -1.0, 100.0), (0.0, 1.0, 100.0), (1.0, 1.0, 0.0)],
            SR,
        );
        assert_eq!(bank.active(), 0);
        assert!(bank.is_silent());
    }

    #[test]
    fn active_count_is_lane_multiple() {
        let modals: Vec<_> = (1..=5).map(|i| (0.1, 1.0, 100.0 * i as f32)).collect();
        let bank = ModalBank::from_modals(&modals, SR);
        assert_eq!(bank.active(), 8);
        assert_eq!(bank.capacity(), 8);
        // Padding lanes are silent
        assert_eq!(&bank.y1()[5..8], &[0.0; 3]);
    }

    #[test]
    fn compact_trims_silent_top() {
        let mut bank = ModalBank::from_modals(&[(0.5, 1.0, 200.0)], SR);
        bank.ensure_capacity(12);
        bank.set_active(12);
        let mut out = vec![0.0; 64];
        bank.synthesize_add(&mut out);
        assert_eq!(bank.compact(1e-4), 4);
        assert_eq!(bank.active(), 4);
    }

    #[test]
    fn fast_decay_compacts_to_zero() {
        let mut bank = ModalBank::from_modals(&[(0.5, 2000.0, 300.0)], SR);
        let mut out = vec![0.0; 4800];
        bank.synthesize_add(&mut out);
        assert_eq!(bank.compact(1e-6), 0);
        assert!(bank.y1().iter().all(|&y| y == 0.0));
    }

    #[test]
    fn forced_recursion_responds_to_force() {
        let mut bank = ModalBank::with_capacity(4);
        bank.set(0, ModalCoeffs::new(5.0, 500.0, SR), 0.0, 0.0);
        bank.set_active(1);
        let gains = [1.0, 0.0, 0.0, 0.0];
        let mut force = vec![0.0; 64];
        force[0] = 1.0;
        let mut out = vec![0.0; 64];
        bank.synthesize_forced_add(&mut out, &force, &gains);
        assert_eq!(out[0], 1.0, "impulse passes straight through first step");
        assert!(out[1..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn scale_decay_preserves_frequency() {
        let c = ModalCoeffs::new(1.0, 1000.0, SR);
        let mut bank = ModalBank::with_capacity(4);
        bank.set(0, c, c.initial_y1(1.0), 0.0);
        bank.set_active(1);
        bank.scale_decay(0.99);
        let ratio = bank.two_r_cos()[0] / (2.0 * libm::sqrtf(bank.r_square()[0]));
        assert!((ratio - libm::cosf(c.theta)).abs() < 1e-5);
    }

    #[test]
    fn energy_and_scale_state() {
        let mut bank = ModalBank::with_capacity(4);
        bank.set(0, ModalCoeffs::new(0.0, 100.0, SR), 0.25, -0.25);
        bank.set_active(1);
        assert!((bank.energy() - 0.5).abs() < 1e-6);
        bank.scale_state(0.5);
        assert!((bank.energy() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn reset_silences_bank() {
        let mut bank = ModalBank::from_modals(&[(1.0, 1.0, 100.0)], SR);
        bank.reset();
        let mut out = vec![1.0; 16];
        bank.synthesize_write(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
