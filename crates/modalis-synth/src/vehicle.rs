//! Vehicle engine harmonic synthesizer.
//!
//! An engine is modelled as a stack of undamped modal oscillators, one per
//! harmonic of the cylinder firing frequency:
//!
//! ```text
//! f_base = rpm / 60 · pulses_per_cycle · freq_scale
//! rate   = max((rpm − rpm_baseline) / rpm_baseline, −0.8)
//! f_j    = f_model_j · freq_scale · (1 + rate) + jitter
//! ```
//!
//! where `rpm_baseline` is the RPM at which the first pulse harmonic sits at
//! 100 Hz, matching the reference frequency the harmonic table was measured
//! at. Each harmonic carries a random-walk amplitude envelope that moves
//! toward a target at its own speed; only harmonics whose envelope is still
//! moving are tracked. A low-pass roll-off above a cutoff tames the top
//! harmonics.
//!
//! Two engine modes change the harmonic count. Under throttle every harmonic
//! plays; on deceleration only the lowest few do. Harmonics entering or
//! leaving fade instead of switching abruptly.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::f32::consts::PI;
use libm::{cosf, sinf, sqrtf};
use modalis_core::{LANES, ModalBank, Rng, fit_to_lanes, low_pass_db_to_linear};

/// Harmonic table reference frequency for the first pulse harmonic.
const FREQ_BASE: f32 = 100.0;

/// Harmonics with a roll-off gain at or below this are silenced.
const AMP_THRESH: f32 = 1e-5;

/// Envelopes above this count as sounding.
const ENV_AUDIBLE: f32 = 1.5e-5;

/// Envelope convergence tolerance.
const ENV_TOLERANCE: f32 = 1e-5;

/// Fade-in speed of harmonics added by a mode change (1/s).
const FADE_IN_SPEED: f32 = 2.0;

/// Fade-out speed of harmonics removed by a mode change (1/s).
const FADE_OUT_SPEED: f32 = 10.0;

/// Fixed description of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSetup {
    /// Firing pulses per crankshaft revolution.
    pub pulses_per_cycle: u32,
    /// `(amplitude, decay, frequency)` per harmonic, measured at 100 Hz base.
    /// Decay is ignored; engine harmonics are sustained.
    pub harmonics: Vec<(f32, f32, f32)>,
    /// Harmonics to use (0 = all).
    pub max_harmonics: usize,
}

impl EngineSetup {
    /// Harmonics actually used, honouring `max_harmonics`.
    pub fn harmonic_count(&self) -> usize {
        if self.max_harmonics > 0 {
            self.harmonics.len().min(self.max_harmonics)
        } else {
            self.harmonics.len()
        }
    }
}

/// Per-block control of a [`VehicleEngineSynth`].
///
/// ## Parameters
/// - `rpm`: Engine speed (≥ 0, default 1000.0)
/// - `throttle_input`: Throttle position, |x| ≤ 0.1 counts as released (default 1.0)
/// - `freq_scale`: Global frequency multiplier (default 1.0)
/// - `rpm_noise_factor`: How strongly RPM changes drive randomization (0.0 to 1.0, default 0.1)
/// - `rand_period`: Seconds between envelope re-targets at steady RPM (default 0.05)
/// - `amp_rand_min` / `amp_rand_max`: Range of envelope randomization (default 0.1 / 0.5)
/// - `harmonic_fluctuation`: Frequency jitter proportional to harmonic frequency (default 0.05)
/// - `f0_fluctuation`: Constant frequency jitter in Hz (default 0.5)
/// - `harmonic_gain`: Envelope level of every harmonic (default 1.0)
/// - `cutoff_freq`: Roll-off start in Hz (default 5000.0)
/// - `falloff_db`: Roll-off slope, negative attenuates (default -24.0)
/// - `num_harmonics_deceleration`: Harmonics kept while decelerating (0 = all, default 0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    /// Engine speed in revolutions per minute.
    pub rpm: f32,
    /// Throttle position.
    pub throttle_input: f32,
    /// Frequency multiplier.
    pub freq_scale: f32,
    /// RPM-change randomization factor.
    pub rpm_noise_factor: f32,
    /// Envelope re-target period in seconds.
    pub rand_period: f32,
    /// Lower envelope randomization bound.
    pub amp_rand_min: f32,
    /// Upper envelope randomization bound.
    pub amp_rand_max: f32,
    /// Proportional frequency jitter.
    pub harmonic_fluctuation: f32,
    /// Constant frequency jitter in Hz.
    pub f0_fluctuation: f32,
    /// Envelope level.
    pub harmonic_gain: f32,
    /// Roll-off cutoff in Hz.
    pub cutoff_freq: f32,
    /// Roll-off slope in dB.
    pub falloff_db: f32,
    /// Harmonics kept while decelerating.
    pub num_harmonics_deceleration: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            rpm: 1000.0,
            throttle_input: 1.0,
            freq_scale: 1.0,
            rpm_noise_factor: 0.1,
            rand_period: 0.05,
            amp_rand_min: 0.1,
            amp_rand_max: 0.5,
            harmonic_fluctuation: 0.05,
            f0_fluctuation: 0.5,
            harmonic_gain: 1.0,
            cutoff_freq: 5000.0,
            falloff_db: -24.0,
            num_harmonics_deceleration: 0,
        }
    }
}

/// Fixed-capacity sparse set of harmonic indices with an interpolation speed.
#[derive(Debug, Clone)]
struct InterpSet {
    slots: Vec<usize>,
    dense: Vec<(usize, f32)>,
}

impl InterpSet {
    const EMPTY: usize = usize::MAX;

    fn with_capacity(n: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize(n, Self::EMPTY);
        Self {
            slots,
            dense: Vec::with_capacity(n),
        }
    }

    fn contains(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|&s| s != Self::EMPTY)
    }

    fn insert(&mut self, index: usize, speed: f32) {
        let Some(&slot) = self.slots.get(index) else {
            return;
        };
        if slot == Self::EMPTY {
            self.slots[index] = self.dense.len();
            self.dense.push((index, speed));
        } else {
            self.dense[slot].1 = speed;
        }
    }

    fn swap_remove(&mut self, pos: usize) {
        let (index, _) = self.dense.swap_remove(pos);
        self.slots[index] = Self::EMPTY;
        if let Some(&(moved, _)) = self.dense.get(pos) {
            self.slots[moved] = pos;
        }
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn grow(&mut self, n: usize) {
        if n > self.slots.len() {
            self.slots.resize(n, Self::EMPTY);
            self.dense.reserve(n - self.dense.len());
        }
    }

    /// Drop every index at or above `n`.
    fn truncate(&mut self, n: usize) {
        let mut pos = 0;
        while pos < self.dense.len() {
            if self.dense[pos].0 >= n {
                self.swap_remove(pos);
            } else {
                pos += 1;
            }
        }
    }
}

/// RPM-locked harmonic engine synthesizer.
///
/// # Example
///
/// ```rust
/// use modalis_synth::{EngineParams, EngineSetup, VehicleEngineSynth};
///
/// let setup = EngineSetup {
///     pulses_per_cycle: 4,
///     harmonics: (1..=8).map(|h| (1.0 / h as f32, 0.0, 100.0 * h as f32)).collect(),
///     max_harmonics: 0,
/// };
/// let params = EngineParams::default();
/// let mut engine = VehicleEngineSynth::new(48000.0, &setup, &params, 1);
///
/// let mut block = vec![0.0f32; 256];
/// engine.generate(&mut block, &params);
/// assert!(engine.base_freq() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct VehicleEngineSynth {
    time_step: f32,
    frame_time: f32,
    pulses_per_cycle: f32,
    rpm_baseline: f32,
    last_freq: f32,
    base_freq: f32,
    rng: Rng,
    model_freqs: Vec<f32>,
    num_harmonics: usize,
    bank: ModalBank,
    target_env: Vec<f32>,
    current_env: Vec<f32>,
    current_freq: Vec<f32>,
    final_amp: Vec<f32>,
    interp: InterpSet,
    mode_count: usize,
    num_synth: usize,
    prev_rpm: f32,
    decel_timer: f32,
    decelerating: bool,
    rpm_curve: f32,
    since_rand: f32,
}

impl VehicleEngineSynth {
    /// Create an engine from its harmonic table.
    ///
    /// The engine starts in deceleration mode with its timer primed, so the
    /// first throttled block switches straight to throttle mode.
    pub fn new(sample_rate: f32, setup: &EngineSetup, initial: &EngineParams, seed: i32) -> Self {
        let time_step = 1.0 / sample_rate;
        let pulses = setup.pulses_per_cycle.max(1) as f32;
        let num_harmonics = setup.harmonic_count();
        if num_harmonics == 0 {
            tracing::warn!("vehicle engine: no harmonics, output will be silent");
        }
        let capacity = fit_to_lanes(num_harmonics);

        let zeros = || {
            let mut v = Vec::new();
            v.resize(capacity, 0.0f32);
            v
        };
        let mut synth = Self {
            time_step,
            frame_time: 0.0,
            pulses_per_cycle: pulses,
            rpm_baseline: FREQ_BASE / pulses * 60.0,
            last_freq: 0.0,
            base_freq: 0.0,
            rng: Rng::from_seed(seed),
            model_freqs: setup.harmonics[..num_harmonics].iter().map(|h| h.2).collect(),
            num_harmonics,
            bank: ModalBank::with_capacity(capacity),
            target_env: zeros(),
            current_env: zeros(),
            current_freq: zeros(),
            final_amp: zeros(),
            interp: InterpSet::with_capacity(capacity),
            mode_count: num_harmonics,
            num_synth: capacity,
            prev_rpm: -1.0,
            decel_timer: 0.0,
            decelerating: false,
            rpm_curve: 0.0,
            since_rand: 0.0,
        };

        {
            let parts = synth.bank.parts_mut();
            for (j, &(amp, _, freq)) in setup.harmonics[..num_harmonics].iter().enumerate() {
                let angle = 2.0 * PI * freq * time_step;
                parts.two_r_cos[j] = 2.0 * cosf(angle);
                parts.r_square[j] = 1.0;
                parts.y1[j] = amp * sinf(angle);
                synth.current_freq[j] = freq;
                synth.final_amp[j] = 1.0;
            }
        }
        synth.bank.set_active(capacity);

        synth.set_deceleration_mode(initial.num_harmonics_deceleration);
        for j in 0..synth.mode_count {
            synth.target_env[j] = initial.harmonic_gain;
            synth.current_env[j] = initial.harmonic_gain;
        }
        synth.decel_timer = 1.0;
        synth
    }

    /// Swap in a new harmonic table, keeping the running engine.
    ///
    /// Harmonics present in both tables keep their phase and envelope; added
    /// ones fade in from silence and dropped ones are cut. The next block
    /// re-randomizes every envelope. Allocates when the table grows.
    pub fn set_setup(&mut self, setup: &EngineSetup, params: &EngineParams) {
        let old = self.num_harmonics;
        let old_mode = self.mode_count;
        let num_harmonics = setup.harmonic_count();
        let capacity = fit_to_lanes(num_harmonics);
        if capacity > self.bank.capacity() {
            self.bank.ensure_capacity(capacity);
            for buf in [
                &mut self.target_env,
                &mut self.current_env,
                &mut self.current_freq,
                &mut self.final_amp,
            ] {
                buf.resize(capacity, 0.0);
            }
            self.interp.grow(capacity);
        }
        self.interp.truncate(num_harmonics);

        let pulses = setup.pulses_per_cycle.max(1) as f32;
        self.pulses_per_cycle = pulses;
        self.rpm_baseline = FREQ_BASE / pulses * 60.0;
        self.model_freqs.clear();
        self.model_freqs
            .extend(setup.harmonics[..num_harmonics].iter().map(|h| h.2));

        let parts = self.bank.parts_mut();
        for (j, &(amp, _, freq)) in setup.harmonics[..num_harmonics].iter().enumerate().skip(old) {
            let angle = 2.0 * PI * freq * self.time_step;
            parts.two_r_cos[j] = 2.0 * cosf(angle);
            parts.r_square[j] = 1.0;
            parts.y1[j] = amp * sinf(angle);
            parts.y2[j] = 0.0;
            self.current_freq[j] = freq;
            self.current_env[j] = 0.0;
            self.target_env[j] = 0.0;
            self.final_amp[j] = 0.0;
        }
        for j in num_harmonics..old {
            parts.y1[j] = 0.0;
            parts.y2[j] = 0.0;
            self.current_env[j] = 0.0;
            self.target_env[j] = 0.0;
            self.final_amp[j] = 0.0;
        }
        self.bank.set_active(capacity);

        self.num_harmonics = num_harmonics;
        self.num_synth = num_harmonics;
        self.mode_count = if self.decelerating && params.num_harmonics_deceleration > 0 {
            num_harmonics.min(params.num_harmonics_deceleration)
        } else {
            num_harmonics
        };
        for j in old_mode.min(self.mode_count)..self.mode_count {
            self.retarget(j, params.harmonic_gain, FADE_IN_SPEED);
        }
        for j in self.mode_count..old_mode.min(num_harmonics) {
            self.retarget(j, 0.0, FADE_OUT_SPEED);
        }

        self.since_rand = f32::INFINITY;
        if num_harmonics == 0 {
            tracing::warn!("vehicle engine: no harmonics, output will be silent");
        }
    }

    /// Base firing frequency of the last block, in Hz.
    #[inline]
    pub fn base_freq(&self) -> f32 {
        self.base_freq
    }

    /// True while in deceleration mode.
    #[inline]
    pub fn is_decelerating(&self) -> bool {
        self.decelerating
    }

    /// RPM change intensity of the last block, in `[0, 1]`.
    #[inline]
    pub fn rpm_curve(&self) -> f32 {
        self.rpm_curve
    }

    /// Number of harmonics in the current engine mode.
    #[inline]
    pub fn mode_harmonics(&self) -> usize {
        self.mode_count
    }

    /// Current frequency of every harmonic.
    pub fn harmonic_freqs(&self) -> &[f32] {
        &self.current_freq[..self.num_harmonics]
    }

    /// Current envelope of every harmonic.
    pub fn harmonic_envelopes(&self) -> &[f32] {
        &self.current_env[..self.num_harmonics]
    }

    /// Render one block, overwriting `out`.
    ///
    /// Leaves `out` untouched when `rpm` is (near) zero.
    pub fn generate(&mut self, out: &mut [f32], params: &EngineParams) {
        let frames = out.len();
        if frames == 0 || params.rpm < 1e-5 || self.num_harmonics == 0 {
            return;
        }
        self.frame_time = self.time_step * frames as f32;

        let freq_rpm = params.rpm / 60.0 * self.pulses_per_cycle;
        self.base_freq = (freq_rpm * params.freq_scale).clamp(20.0, 20000.0);
        let delta_rpm = params.rpm - self.last_freq / self.pulses_per_cycle * 60.0;
        self.last_freq = freq_rpm;

        let rpm_rate = ((params.rpm - self.rpm_baseline) / self.rpm_baseline).max(-0.8);
        self.rpm_curve = (sqrtf(delta_rpm.abs() * 10.0) * params.rpm_noise_factor).min(1.0);
        let change = params.rpm_noise_factor.max(self.rpm_curve);
        let rand_interval = params.rand_period / (change * 2.0).max(1.0);
        let max_amp_rand = params.amp_rand_min * 2.0;
        let amp_rand_range = (params.amp_rand_max - params.amp_rand_min)
            * self.rng.fraction()
            * sign(delta_rpm)
            * self.rpm_curve;
        let freq_var = params.harmonic_fluctuation * change / 5.0;

        self.update_mode(params);

        let rand_chance = (self.rpm_curve * 2.0).clamp(0.5, 1.0);
        if self.since_rand > rand_interval {
            self.since_rand = 0.0;
            for j in 0..self.mode_count.min(self.num_harmonics) {
                if !self.interp.contains(j) && self.rng.fraction() > rand_chance {
                    let walk = (self.rng.centered() * max_amp_rand + amp_rand_range * self.rng.fraction())
                        .clamp(-1.0, 0.25);
                    let speed = self.rng.fraction() + 1.0;
                    self.retarget(j, (1.0 + walk) * params.harmonic_gain, speed);
                }
            }
        } else {
            self.since_rand += self.frame_time;
        }

        self.update_frequencies(params, rpm_rate, freq_var);
        self.num_synth = self.count_sounding();
        self.render(out);
        self.step_envelopes();
    }

    fn update_mode(&mut self, params: &EngineParams) {
        let old = self.mode_count;
        let delta_rpm = if self.prev_rpm > 0.0 { params.rpm - self.prev_rpm } else { 0.0 };
        self.prev_rpm = params.rpm;

        if params.throttle_input.abs() <= 0.1 {
            self.set_deceleration_mode(params.num_harmonics_deceleration);
        } else {
            self.decel_timer += self.frame_time;
            if delta_rpm < -25.0 {
                self.set_deceleration_mode(params.num_harmonics_deceleration);
            } else if delta_rpm > -5.0 && self.decel_timer > 0.1 {
                self.set_throttle_mode();
            }
        }

        let capacity = self.bank.capacity();
        if old < self.mode_count {
            for j in old..self.mode_count.min(capacity) {
                self.retarget(j, params.harmonic_gain, FADE_IN_SPEED);
            }
        } else if old > self.mode_count {
            for j in self.mode_count..old.min(capacity) {
                self.retarget(j, 0.0, FADE_OUT_SPEED);
            }
        }
    }

    fn set_deceleration_mode(&mut self, num_harmonics: usize) {
        self.decelerating = true;
        self.decel_timer = 0.0;
        self.mode_count = if num_harmonics > 0 {
            self.num_harmonics.min(num_harmonics)
        } else {
            self.num_harmonics
        };
    }

    fn set_throttle_mode(&mut self) {
        self.decelerating = false;
        self.mode_count = self.num_harmonics;
    }

    fn retarget(&mut self, index: usize, target: f32, speed: f32) {
        self.target_env[index] = target;
        self.interp.insert(index, speed);
    }

    fn jittered_freq(&mut self, params: &EngineParams, rpm_rate: f32, freq_var: f32, freq: f32) -> f32 {
        let mut f = freq * (1.0 + rpm_rate);
        let harmonic_scale = sqrtf(f / self.base_freq) * freq_var;
        f += self.rng.centered() * (f * harmonic_scale + params.f0_fluctuation);
        f.clamp(20.0, 20000.0)
    }

    fn update_frequencies(&mut self, params: &EngineParams, rpm_rate: f32, freq_var: f32) {
        let n = self.num_harmonics.min(self.num_synth);
        for j in 0..n {
            let f = self.jittered_freq(params, rpm_rate, freq_var, self.model_freqs[j] * params.freq_scale);
            let angle = 2.0 * PI * f * self.time_step;
            let parts = self.bank.parts_mut();
            parts.two_r_cos[j] = 2.0 * cosf(angle);
            // Scale the last step so the phase carries over at the new rate
            let y1 = parts.y1[j];
            parts.y2[j] = y1 - (y1 - parts.y2[j]) * f / self.current_freq[j];
            self.current_freq[j] = f;

            let roll_off = low_pass_db_to_linear(f, params.cutoff_freq, params.falloff_db);
            if roll_off <= AMP_THRESH {
                self.current_env[j] = 0.0;
                self.target_env[j] = 0.0;
            }
            self.final_amp[j] = self.current_env[j] * roll_off;
        }
    }

    fn count_sounding(&self) -> usize {
        let n = self.num_harmonics.min(self.num_synth.max(self.mode_count));
        let mut count = n.saturating_sub(1);
        while count > 0 && self.current_env[count] <= ENV_AUDIBLE && self.target_env[count] <= ENV_AUDIBLE {
            count -= 1;
        }
        count + 1
    }

    fn render(&mut self, out: &mut [f32]) {
        let n = if self.num_synth <= 1 { 1 } else { fit_to_lanes(self.num_synth) };
        let parts = self.bank.parts_mut();
        let c = &parts.two_r_cos[..n];
        let r2 = &parts.r_square[..n];
        let y1 = &mut parts.y1[..n];
        let y2 = &mut parts.y2[..n];
        let amp = &self.final_amp[..n];

        for sample in out.iter_mut() {
            let mut acc = [0.0f32; LANES];
            for j in 0..n {
                let y0 = c[j] * y1[j] - r2[j] * y2[j];
                y2[j] = y1[j];
                y1[j] = y0;
                acc[j % LANES] += amp[j] * y0;
            }
            *sample = acc.iter().sum();
        }
    }

    fn step_envelopes(&mut self) {
        let mut pos = 0;
        while pos < self.interp.len() {
            let (index, speed) = self.interp.dense[pos];
            let target = self.target_env[index];
            let current = self.current_env[index];
            let step = speed * self.frame_time;
            let next = if current > target {
                target.max(current - step)
            } else {
                target.min(current + step)
            };
            self.current_env[index] = next;
            if (next - target).abs() <= ENV_TOLERANCE {
                self.interp.swap_remove(pos);
            } else {
                pos += 1;
            }
        }
    }
}

#[inline]
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
