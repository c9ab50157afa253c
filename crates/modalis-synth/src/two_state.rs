//! Two-state cyclic force generator.
//!
//! Produces a periodic excitation signal for modal resonators, such as the
//! firing and exhaust phases of an engine cylinder. Each cycle is split into
//! two states; each state reads its own shape curve cyclically and can mix in
//! uniform noise:
//!
//! ```text
//! cycle = round(sr / freq)
//! n1    = round(duty · cycle)          first state
//! n2    = cycle − n1                   second state
//!
//! |<------ n1 ------>|<---- n2 ---->|
//! |  first curve     | second curve |  (repeat)
//! ```
//!
//! Shape curves must cover the domain `[0, 1]` and have at least two
//! samples. The last sample is treated as a repeat of the first so the shape
//! loops seamlessly when a state's frequency scale is above one.
//!
//! When frequency or duty cycle change between blocks the position in the
//! cycle is remapped proportionally into the new state lengths, so the
//! waveform continues from the same relative phase.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use libm::roundf;
use modalis_core::{Curve, Rng};

/// How noise is merged into a state's curve output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoiseMode {
    /// No noise
    #[default]
    None,
    /// Noise added to the curve
    Add,
    /// Curve multiplied by noise
    Multiply,
}

/// Shape of one state of the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StateShape {
    /// Curve over `[0, 1]` read cyclically during the state.
    pub curve: Option<Arc<Curve>>,
    /// Number of curve periods per state (negative values act as zero).
    pub freq_scale: f32,
    /// How noise is merged.
    pub noise_mode: NoiseMode,
    /// Peak-to-peak noise amplitude.
    pub noise_amp: f32,
}

impl Default for StateShape {
    fn default() -> Self {
        Self {
            curve: None,
            freq_scale: 1.0,
            noise_mode: NoiseMode::None,
            noise_amp: 0.5,
        }
    }
}

impl StateShape {
    /// A state reading `curve` once per state, without noise.
    pub fn with_curve(curve: Arc<Curve>) -> Self {
        Self {
            curve: Some(curve),
            ..Self::default()
        }
    }
}

/// Parameters for [`TwoStateForceGen::generate`].
///
/// ## Parameters
/// - `amp`: Output gain (default 1.0)
/// - `freq`: Cycle frequency in Hz (1e-3 to sample rate, default 100.0)
/// - `duty_cycle`: Fraction of the cycle spent in the first state (0.0 to 1.0, default 0.5)
/// - `first` / `second`: Per-state shape
#[derive(Debug, Clone, PartialEq)]
pub struct TwoStateParams {
    /// Output gain.
    pub amp: f32,
    /// Cycle frequency in Hz.
    pub freq: f32,
    /// Fraction of the cycle spent in the first state.
    pub duty_cycle: f32,
    /// First state.
    pub first: StateShape,
    /// Second state.
    pub second: StateShape,
}

impl Default for TwoStateParams {
    fn default() -> Self {
        Self {
            amp: 1.0,
            freq: 100.0,
            duty_cycle: 0.5,
            first: StateShape::default(),
            second: StateShape::default(),
        }
    }
}

/// Cycle length and state lengths in samples for `freq` and `duty_cycle`.
///
/// Always satisfies `n1 + n2 == cycle`.
///
/// ```rust
/// use modalis_synth::state_split;
///
/// assert_eq!(state_split(48000.0, 100.0, 0.5), (480, 240, 240));
/// ```
pub fn state_split(sample_rate: f32, freq: f32, duty_cycle: f32) -> (usize, usize, usize) {
    let cycle = roundf(sample_rate / freq).max(1.0) as usize;
    let n1 = (roundf(duty_cycle.clamp(0.0, 1.0) * cycle as f32) as usize).min(cycle);
    (cycle, n1, cycle - n1)
}

/// Cyclic two-state force generator.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use modalis_core::Curve;
/// use modalis_synth::{StateShape, TwoStateForceGen, TwoStateParams};
///
/// let pulse = Arc::new(Curve::from_samples(vec![0.0, 1.0, 0.0], 0.0, 1.0));
/// let rest = Arc::new(Curve::from_samples(vec![0.0, 0.0], 0.0, 1.0));
/// let params = TwoStateParams {
///     first: StateShape::with_curve(pulse),
///     second: StateShape::with_curve(rest),
///     ..TwoStateParams::default()
/// };
///
/// let mut force = TwoStateForceGen::new(48000.0, 512, 1);
/// let mut block = vec![0.0f32; 512];
/// force.generate(&mut block, &params);
/// ```
#[derive(Debug, Clone)]
pub struct TwoStateForceGen {
    sample_rate: f32,
    seed: i32,
    rng: Rng,
    noise: Vec<f32>,
    cycle_index: usize,
    last_split: Option<(usize, usize)>,
}

impl TwoStateForceGen {
    /// Create a generator for blocks of at most `max_block_size` frames.
    pub fn new(sample_rate: f32, max_block_size: usize, seed: i32) -> Self {
        let mut noise = Vec::new();
        noise.resize(max_block_size, 0.0);
        Self {
            sample_rate,
            seed,
            rng: Rng::from_seed(seed),
            noise,
            cycle_index: 0,
            last_split: None,
        }
    }

    /// Jump back to the start of the first state.
    pub fn reset_cycle(&mut self) {
        self.cycle_index = 0;
    }

    /// Return to the freshly constructed state, reseeding the noise.
    pub fn restart(&mut self) {
        self.rng = Rng::from_seed(self.seed);
        self.cycle_index = 0;
        self.last_split = None;
    }

    /// Position within the current cycle in samples.
    #[inline]
    pub fn cycle_index(&self) -> usize {
        self.cycle_index
    }

    /// Largest block `generate` accepts.
    #[inline]
    pub fn max_block_size(&self) -> usize {
        self.noise.len()
    }

    /// Render the force signal, overwriting `out`.
    ///
    /// Leaves `out` untouched when the parameters cannot produce a signal.
    pub fn generate(&mut self, out: &mut [f32], params: &TwoStateParams) {
        let frames = out.len();
        if frames == 0 || params.amp == 0.0 || params.freq >= self.sample_rate || params.freq < 1e-3 {
            return;
        }
        if frames > self.noise.len() {
            tracing::warn!(
                frames,
                max = self.noise.len(),
                "two-state force: block larger than the size given at construction"
            );
            return;
        }
        let (Some(first_curve), Some(second_curve)) = (&params.first.curve, &params.second.curve) else {
            tracing::warn!("two-state force: missing state curve");
            return;
        };
        if first_curve.len() <= 1 || second_curve.len() <= 1 {
            tracing::warn!("two-state force: state curves need at least two samples");
            return;
        }
        if !first_curve.is_x_range_match(0.0, 1.0) || !second_curve.is_x_range_match(0.0, 1.0) {
            tracing::warn!("two-state force: state curves must span [0, 1]");
            return;
        }

        let duty = params.duty_cycle.clamp(0.0, 1.0);
        let cycle_fraction = params.freq / self.sample_rate;
        let (cycle, n1, n2) = state_split(self.sample_rate, params.freq, duty);
        self.remap_cycle_index(cycle, n1, n2);

        let first_scale = params.first.freq_scale.max(0.0);
        let second_scale = params.second.freq_scale.max(0.0);
        let first_step = cycle_fraction / duty * first_scale;
        let second_step = cycle_fraction / (1.0 - duty) * second_scale;

        let mut pos = 0;
        while pos < frames {
            let todo = frames - pos;
            let idx = self.cycle_index;
            let taken = if n1 > 0 && idx < n1 {
                let taken = todo.min(n1 - idx);
                let view = &mut out[pos..pos + taken];
                let start = idx as f32 * params.first.freq_scale / n1 as f32;
                first_curve.fill_cyclic_interp(start, first_step, view, 1);
                self.merge_noise(params.first.noise_mode, params.first.noise_amp, view);
                taken
            } else if n2 > 0 {
                let taken = todo.min(cycle - idx);
                let view = &mut out[pos..pos + taken];
                let start = (idx - n1) as f32 * params.second.freq_scale / n2 as f32;
                second_curve.fill_cyclic_interp(start, second_step, view, 1);
                self.merge_noise(params.second.noise_mode, params.second.noise_amp, view);
                taken
            } else {
                break;
            };
            self.cycle_index = (idx + taken) % cycle;
            pos += taken;
        }

        if (params.amp - 1.0).abs() > 1e-5 {
            for s in out.iter_mut() {
                *s *= params.amp;
            }
        }
    }

    fn remap_cycle_index(&mut self, cycle: usize, n1: usize, n2: usize) {
        match self.last_split {
            Some(last) if last == (n1, n2) => return,
            Some((last_n1, last_n2)) => {
                let idx = self.cycle_index;
                self.cycle_index = if idx < last_n1 {
                    roundf(idx as f32 * n1 as f32 / last_n1 as f32) as usize
                } else if last_n2 > 0 {
                    n1 + roundf((idx - last_n1) as f32 * n2 as f32 / last_n2 as f32) as usize
                } else {
                    n1
                };
            }
            None => {}
        }
        self.last_split = Some((n1, n2));
        self.cycle_index %= cycle;
    }

    fn merge_noise(&mut self, mode: NoiseMode, amp: f32, out: &mut [f32]) {
        if mode == NoiseMode::None {
            return;
        }
        let noise = &mut self.noise[..out.len()];
        for n in noise.iter_mut() {
            *n = self.rng.centered() * amp;
        }
        match mode {
            NoiseMode::Add => out.iter_mut().zip(noise.iter()).for_each(|(s, n)| *s += n),
            NoiseMode::Multiply => out.iter_mut().zip(noise.iter()).for_each(|(s, n)| *s *= n),
            NoiseMode::None => {}
        }
    }
}
