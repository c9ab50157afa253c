//! Soundboard resonator.
//!
//! The soundboard is a bank of modals driven by the mixed string output.
//! Each modal sees the current and previous input sample:
//!
//! ```text
//! y[n] = 2R·cos(θ)·y[n-1] − R²·y[n-2] + gain_f·x[n-1] + gain_c·x[n]
//! gain_f = amp·R·sin(θ − φ)
//! gain_c = amp·sin(φ)
//! ```
//!
//! Frequencies are scattered by a small random factor every block, which
//! keeps the response from sounding static.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use core::f32::consts::PI;
use libm::{cosf, expf, sinf};
use modalis_core::{LANES, ModalBank, Rng, fit_to_lanes};

use crate::model::SoundboardData;

/// Relative frequency scatter applied every block.
pub const SOUNDBOARD_FREQ_SCATTER: f32 = 0.022;

/// Compaction threshold of soundboard modals.
pub const SOUNDBOARD_STRENGTH_MIN: f32 = 1e-6;

/// Largest supported quality reduction.
pub const MAX_QUALITY_DOWN: usize = 4;

/// Soundboard resonator driven by the string output.
#[derive(Debug, Clone)]
pub struct SoundboardSynth {
    sample_rate: f32,
    freq_scatter: f32,
    quality_down: usize,
    bank: ModalBank,
    gain_prev: Vec<f32>,
    gain_cur: Vec<f32>,
    last_input: f32,
    initialized: bool,
    rng: Rng,
}

impl SoundboardSynth {
    /// Create a soundboard using every `quality_down`-th modal of `data`.
    ///
    /// `quality_down` is clamped to 1..=4. The resonator stays silent until
    /// the first note-on even when `gain` is positive.
    pub fn new(sample_rate: f32, data: &SoundboardData, gain: f32, quality_down: usize, seed: i32) -> Self {
        let quality_down = quality_down.clamp(1, MAX_QUALITY_DOWN);
        let mut synth = Self {
            sample_rate,
            freq_scatter: SOUNDBOARD_FREQ_SCATTER,
            quality_down,
            bank: ModalBank::new(),
            gain_prev: Vec::new(),
            gain_cur: Vec::new(),
            last_input: 0.0,
            initialized: false,
            rng: Rng::from_seed(seed),
        };
        if gain > 0.0 {
            synth.init_buffers(data);
            synth.bank.set_active(0);
        }
        synth
    }

    /// Quality reduction in use.
    #[inline]
    pub fn quality_down(&self) -> usize {
        self.quality_down
    }

    /// Number of modals being rendered.
    #[inline]
    pub fn active(&self) -> usize {
        self.bank.active()
    }

    /// True while any modal is rendered.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.bank.active() > 0
    }

    /// Silence the resonator. Buffers stay allocated.
    pub fn reset(&mut self) {
        self.bank.reset();
        self.last_input = 0.0;
    }

    fn init_buffers(&mut self, data: &SoundboardData) {
        let n = fit_to_lanes(data.modals.len().div_ceil(self.quality_down));
        self.bank = ModalBank::with_capacity(n);
        self.bank.set_active(n);
        self.gain_prev = vec![0.0; self.bank.capacity()];
        self.gain_cur = vec![0.0; self.bank.capacity()];
        self.initialized = true;
    }

    fn setup_params(&mut self, data: &SoundboardData, gain: f32) {
        let parts = self.bank.parts_mut();
        let modals = data.modals.iter().step_by(self.quality_down);
        for (j, modal) in modals.enumerate().take(parts.two_r_cos.len()) {
            let amp = modal.amp * gain;
            let freq = modal.freq * (1.0 + self.rng.centered() * self.freq_scatter);
            let theta = 2.0 * PI * freq / self.sample_rate;
            let r = expf(-modal.decay / self.sample_rate);
            parts.two_r_cos[j] = 2.0 * r * cosf(theta);
            parts.r_square[j] = r * r;
            self.gain_prev[j] = amp * r * sinf(theta - modal.phase);
            self.gain_cur[j] = amp * sinf(modal.phase);
        }
    }

    /// Add the soundboard response to `out`, using `out` as its input.
    ///
    /// `new_note` re-activates every modal. A `gain` of zero releases the
    /// resonator until the next call with a positive gain.
    pub fn synthesize(&mut self, out: &mut [f32], data: &SoundboardData, new_note: bool, gain: f32) {
        if out.is_empty() || (gain == 0.0 && !self.initialized) {
            return;
        }

        if gain == 0.0 {
            self.initialized = false;
            self.last_input = 0.0;
            self.bank.set_active(0);
            return;
        }

        if !self.initialized {
            self.init_buffers(data);
        } else if new_note {
            self.bank.set_active(self.bank.capacity());
        } else if self.bank.compact(SOUNDBOARD_STRENGTH_MIN) == 0 {
            self.last_input = 0.0;
            return;
        }

        self.setup_params(data, gain);
        self.process(out);
    }

    fn process(&mut self, out: &mut [f32]) {
        let n = self.bank.active();
        let gain_prev = &self.gain_prev[..n];
        let gain_cur = &self.gain_cur[..n];
        let parts = self.bank.parts_mut();
        let (c, r2) = (&parts.two_r_cos[..n], &parts.r_square[..n]);
        let (y1, y2) = (&mut parts.y1[..n], &mut parts.y2[..n]);

        let mut prev = self.last_input;
        for sample in out.iter_mut() {
            let x = *sample;
            let mut acc = [0.0f32; LANES];
            for (((((c, r2), y1), y2), gp), gc) in c
                .chunks_exact(LANES)
                .zip(r2.chunks_exact(LANES))
                .zip(y1.chunks_exact_mut(LANES))
                .zip(y2.chunks_exact_mut(LANES))
                .zip(gain_prev.chunks_exact(LANES))
                .zip(gain_cur.chunks_exact(LANES))
            {
                for l in 0..LANES {
                    let y0 = c[l] * y1[l] - r2[l] * y2[l] + gp[l] * prev + gc[l] * x;
                    y2[l] = y1[l];
                    y1[l] = y0;
                    acc[l] += y0;
                }
            }
            *sample += acc.iter().sum::<f32>();
            prev = x;
        }
        self.last_input = prev;
    }
}
