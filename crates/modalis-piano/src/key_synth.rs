//! Single piano voice.
//!
//! A [`PianoKeySynth`] renders one struck key with two modal banks:
//!
//! - **strings** (stage 1): one oscillator per string modal
//! - **beats** (stage 2): a slightly detuned partner for modals with a beat
//!   delta, also driven by sympathetic resonance from other voices
//!
//! A voice starts after a short initial delay and fades in over the attack
//! envelope. Decay rates change when the second decay stage begins, when
//! the key is released on a damped string, and when the sustain pedal
//! moves. Restriking a sounding key crossfades the old vibration through a
//! side bank that decays slightly faster than the strings.
//!
//! ## Parameters
//! - `velocity`: MIDI-scale strike velocity (0 to 127)
//! - `key_gain`: Linear gain on every modal amplitude (0.0 to 1.0)
//! - `sustain`: Sustain pedal state at strike time
//! - `sym_scale`: Sympathetic resonance coupling into the beating modes

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use libm::{expf, powf, sinf, sqrtf};
use modalis_core::{ModalBank, ModalCoeffs, zero_range};
use tracing::warn;

use crate::model::PianoKeyData;

/// Delay between a strike and the start of string output, in seconds.
pub const KEY_INIT_DELAY: f32 = 0.005;

/// Compaction threshold of string and beating modals.
pub const STRING_STRENGTH_MIN: f32 = 5e-7;

/// Per-sample decay factor applied to the restrike fade bank.
pub const RESTRIKE_DECAY: f32 = 0.99;

/// Modals with `R²` below this are not carried into a restrike fade.
pub const RESTRIKE_MIN_R_SQUARE: f32 = 1e-2;

/// Minimum prior energy, per unit of new velocity, for a restrike fade.
pub const RESTRIKE_ENERGY_MIN: f32 = 1e-4;

/// Largest restrike velocity increase relative to the decayed old velocity.
const RESTRIKE_VELOCITY_GROWTH_MAX: f32 = 1.5;

/// Modals decaying slower than this count toward the energy estimate.
const ENERGY_DECAY_LIMIT: f32 = 20.0;

/// Frequency divisor of the velocity curve.
const FREQ_DIV: f32 = 1000.0;

const FREQ_VEL_SCALE_MIN: f32 = 1e-20;
const FREQ_VEL_SCALE_MAX: f32 = 1.45;

/// Shared, per-piano settings for building voices.
#[derive(Debug, Clone)]
pub struct KeySetup {
    /// Render sample rate in Hz.
    pub sample_rate: f32,
    /// Attack envelope at the render rate.
    pub attack: Arc<[f32]>,
    /// Velocity rendered without scaling.
    pub velocity_standard: f32,
    /// Decay added to damped strings after release (1/s).
    pub note_off_decay_delta: f32,
    /// Initial delay in seconds.
    pub init_delay: f32,
}

/// Per-strike controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyStrike {
    /// Strike velocity on the MIDI scale.
    pub velocity: f32,
    /// Gain on every modal amplitude.
    pub key_gain: f32,
    /// Sustain pedal state at strike time.
    pub sustain: bool,
    /// Sympathetic resonance coupling.
    pub sym_scale: f32,
}

/// One sounding piano key.
#[derive(Debug, Clone)]
pub struct PianoKeySynth {
    key: Arc<PianoKeyData>,
    attack: Arc<[f32]>,
    sample_rate: f32,
    time_step: f32,
    velocity_standard: f32,
    note_off_decay_delta: f32,
    init_delay: usize,

    velocity: f32,
    key_gain: f32,
    sym_scale: f32,
    sustain: bool,
    init_sustain: bool,
    note_on: bool,
    second_decay_active: bool,
    sample_index: usize,
    block_start: usize,
    hammer_vel_scale: f32,

    strings: ModalBank,
    beats: ModalBank,
    sym_amp: Vec<f32>,
    beat_gains: Vec<f32>,

    fade: ModalBank,
    fading: bool,
    old_velocity: f32,
    restrike_at: f32,
    restrike_scale: f32,

    amp_sum: f32,
    avg_decay: f32,
}

impl PianoKeySynth {
    /// Strike `key` and prepare its banks.
    pub fn new(key: Arc<PianoKeyData>, setup: &KeySetup, strike: KeyStrike) -> Self {
        let strings = ModalBank::with_capacity(key.num_modals());
        let beats = ModalBank::with_capacity(key.num_beats());
        let sym_amp = vec![0.0; strings.capacity()];
        let beat_gains = vec![0.0; beats.capacity()];
        let init_delay = libm::ceilf(setup.sample_rate * setup.init_delay).max(0.0) as usize;

        let mut synth = Self {
            key,
            attack: Arc::clone(&setup.attack),
            sample_rate: setup.sample_rate,
            time_step: 1.0 / setup.sample_rate,
            velocity_standard: setup.velocity_standard.max(1.0),
            note_off_decay_delta: setup.note_off_decay_delta,
            init_delay,
            velocity: strike.velocity,
            key_gain: strike.key_gain,
            sym_scale: strike.sym_scale,
            sustain: strike.sustain,
            init_sustain: strike.sustain,
            note_on: true,
            second_decay_active: false,
            sample_index: 0,
            block_start: 0,
            hammer_vel_scale: 1.0,
            strings,
            beats,
            sym_amp,
            beat_gains,
            fade: ModalBank::new(),
            fading: false,
            old_velocity: 0.0,
            restrike_at: 0.0,
            restrike_scale: 1.0,
            amp_sum: 0.0,
            avg_decay: 0.0,
        };
        synth.reset_state();
        synth.init_buffers();
        synth
    }

    /// MIDI note of the key.
    #[inline]
    pub fn midi_note(&self) -> u8 {
        self.key.midi_note
    }

    /// Velocity of the last strike.
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Samples rendered since the last strike.
    #[inline]
    pub fn sample_index(&self) -> usize {
        self.sample_index
    }

    /// Samples of silence after a strike.
    #[inline]
    pub fn init_delay(&self) -> usize {
        self.init_delay
    }

    /// Whether releasing the key damps it.
    #[inline]
    pub fn has_damper(&self) -> bool {
        self.key.has_damper
    }

    /// Sympathetic resonance coupling.
    #[inline]
    pub fn sym_scale(&self) -> f32 {
        self.sym_scale
    }

    /// Velocity scale to apply to the hammer noise of this strike.
    #[inline]
    pub fn hammer_vel_scale(&self) -> f32 {
        self.hammer_vel_scale
    }

    /// True while the string bank has active modals.
    #[inline]
    pub fn is_first_stage_running(&self) -> bool {
        self.strings.active() > 0
    }

    /// True while a restrike crossfade is playing.
    #[inline]
    pub fn is_fading(&self) -> bool {
        self.fading
    }

    /// Rough energy of the voice: summed amplitudes under the average decay.
    pub fn estimate_energy(&self) -> f32 {
        self.amp_sum * expf(-self.avg_decay * self.sample_index as f32 * self.time_step)
    }

    /// Scale the vibration of both banks and the energy estimate.
    pub fn adjust_energy(&mut self, factor: f32) {
        self.strings.scale_state(factor);
        self.beats.scale_state(factor);
        self.amp_sum *= factor;
    }

    /// Strike the key again while it may still be sounding.
    pub fn restrike(&mut self, strike: KeyStrike) {
        self.sustain = strike.sustain;
        self.init_sustain = strike.sustain;
        self.key_gain = strike.key_gain;
        self.sym_scale = strike.sym_scale;

        self.start_restrike_fade(strike.velocity);
        self.velocity = strike.velocity;
        self.reset_state();
        self.init_buffers();
    }

    fn reset_state(&mut self) {
        self.sample_index = 0;
        self.second_decay_active = false;
        self.note_on = true;
        self.strings.set_active(self.strings.capacity());
        self.beats.set_active(self.beats.capacity());
    }

    fn init_buffers(&mut self) {
        let key = Arc::clone(&self.key);
        let modals = key.modals(self.init_sustain);
        let beating_scale = positive_or_one(key.beating_scale(self.init_sustain));

        let v = self.velocity;
        let base_freq_scale = key.base_freq / FREQ_DIV;
        let vel_delta = (key.velocity_curve(base_freq_scale, v)
            - key.velocity_curve(base_freq_scale, self.velocity_standard))
            / 20.0;
        let vel_scale = v / self.velocity_standard;
        let base_vel_scale = (v / 500.0)
            .max(vel_scale * powf(10.0, base_freq_scale * vel_delta))
            .clamp(FREQ_VEL_SCALE_MIN, FREQ_VEL_SCALE_MAX);

        self.restrike_scale = 1.0;
        if self.fading && self.old_velocity > 0.0 && v > 0.0 {
            let first_decay = modals.first().map_or(0.0, |m| m.decay);
            let decayed = expf(-first_decay * self.restrike_at * self.time_step) * self.old_velocity;
            let max = decayed.max(v);
            let growth = RESTRIKE_VELOCITY_GROWTH_MAX.min((decayed + v) / max);
            self.restrike_scale = (growth * max - decayed) / v;
            self.old_velocity = max;
        } else {
            self.old_velocity = v;
        }

        self.hammer_vel_scale = if v < self.velocity_standard {
            (base_vel_scale * self.restrike_scale).max(0.2)
        } else {
            1.0
        };

        let mut amp_sum = 0.0;
        let mut avg_decay = 0.0;
        let mut k = 0;
        for (j, modal) in modals.iter().enumerate().take(self.strings.capacity()) {
            let mut amp = self.key_gain * modal.amp;
            self.sym_amp[j] = amp;
            amp *= if modal.freq > key.base_freq + 1.0 {
                (vel_scale * powf(10.0, modal.freq / FREQ_DIV * vel_delta))
                    .clamp(FREQ_VEL_SCALE_MIN, FREQ_VEL_SCALE_MAX)
            } else {
                base_vel_scale
            };

            let decay = (modal.decay + key.second_decay).max(0.0);
            if modal.decay < ENERGY_DECAY_LIMIT {
                amp_sum += amp.abs();
                avg_decay += amp.abs() * decay;
            }

            if ModalCoeffs::is_valid(decay, modal.freq, self.sample_rate) {
                let coeffs = ModalCoeffs::new(decay, modal.freq, self.sample_rate);
                let force = amp * coeffs.r * sinf(coeffs.theta) * self.restrike_scale;
                strike_state(&mut self.strings, j, coeffs, force);
            }

            if modal.has_beat() {
                if k < self.beats.capacity() {
                    let beat_freq = modal.freq + modal.beat_delta;
                    let beat_decay = decay / beating_scale;
                    if ModalCoeffs::is_valid(beat_decay, beat_freq, self.sample_rate) {
                        let coeffs = ModalCoeffs::new(beat_decay, beat_freq, self.sample_rate);
                        let decay_sin = coeffs.r * sinf(coeffs.theta);
                        self.beat_gains[k] = self.sym_amp[j] * decay_sin * self.sym_scale;
                        let force = amp * decay_sin / beating_scale * self.restrike_scale;
                        strike_state(&mut self.beats, k, coeffs, force);
                    }
                }
                k += 1;
            }
        }

        self.amp_sum = amp_sum;
        self.avg_decay = if amp_sum > 0.0 { avg_decay / amp_sum } else { 0.0 };
    }

    fn start_restrike_fade(&mut self, velocity: f32) {
        self.fading = false;
        self.restrike_at = self.sample_index as f32 - self.init_delay as f32;

        if self.velocity == 0.0 || velocity == 0.0 {
            warn!(note = self.key.midi_note, "restrike with zero velocity");
            return;
        }

        let energy = self.strings.energy() + self.beats.energy();
        if energy < RESTRIKE_ENERGY_MIN * velocity {
            return;
        }

        self.fading = true;
        self.fade.ensure_capacity(self.strings.active() + self.beats.active());
        self.fade.reset();
        let copied = copy_into_fade(&self.strings, &mut self.fade, 0);
        let copied = copy_into_fade(&self.beats, &mut self.fade, copied);
        self.fade.set_active(copied);
    }

    /// Render one block, adding into `out`.
    ///
    /// - `note_on`: key is held
    /// - `sustain`: sustain pedal is down
    /// - `full`: render the beating modes freely as well; otherwise only the
    ///   strings are rendered and the beating modes wait for
    ///   [`synthesize_second_stage_with_resonance`](Self::synthesize_second_stage_with_resonance)
    pub fn synthesize(&mut self, out: &mut [f32], note_on: bool, sustain: bool, full: bool) {
        if out.is_empty() {
            warn!(velocity = self.velocity, "key synth asked to render an empty block");
            return;
        }
        self.render(out, note_on, sustain, full);
        self.sample_index += out.len();
    }

    fn render(&mut self, out: &mut [f32], note_on: bool, sustain: bool, full: bool) {
        let len = out.len();
        self.block_start = 0;

        if self.fading {
            self.render_fade(out);
        } else if self.sample_index < self.init_delay {
            let delay = self.init_delay - self.sample_index;
            if delay >= len {
                self.block_start = len;
                return;
            }
            self.block_start = delay;
        }

        if self.strings.compact(STRING_STRENGTH_MIN) == 0 {
            return;
        }

        self.change_params_if_needed(note_on, sustain);

        if full {
            validate_and_clear(&mut self.beats);
            self.render_all_stages(out);
        } else {
            self.strings.synthesize_add(&mut out[self.block_start..]);
        }
    }

    fn render_fade(&mut self, out: &mut [f32]) {
        let remaining = self.attack.len().saturating_sub(self.sample_index);
        if remaining == 0 || self.fade.active() == 0 {
            self.fading = false;
            self.fade.set_active(0);
            return;
        }
        self.fade.synthesize_add(out);
    }

    fn render_all_stages(&mut self, out: &mut [f32]) {
        let mut start = self.block_start;

        if self.sample_index < self.attack.len() {
            let attack_index = if !self.fading && self.sample_index < self.init_delay {
                self.init_delay
            } else {
                self.sample_index
            };
            let envelope = self.attack.get(attack_index..).unwrap_or(&[]);
            let n = (out.len() - start).min(envelope.len());
            for (sample, &env) in out[start..start + n].iter_mut().zip(envelope) {
                *sample += (self.strings.tick() + self.beats.tick()) * env;
            }
            start += n;
            self.block_start = start;
        }

        for sample in &mut out[start..] {
            *sample += self.strings.tick() + self.beats.tick();
        }
    }

    fn change_params_if_needed(&mut self, note_on: bool, sustain: bool) {
        let mut decay_change = false;
        let elapsed = (self.sample_index as f32 - self.init_delay as f32) * self.time_step;
        if !self.second_decay_active && elapsed > self.key.second_decay_time {
            self.second_decay_active = true;
            decay_change = true;
        }

        let note_change = !sustain && self.key.has_damper && self.note_on != note_on;
        if !decay_change && sustain == self.sustain && !note_change {
            return;
        }

        self.sustain = sustain;
        self.note_on = note_on;
        // Pedal-on data can only be dropped mid-note, never picked up.
        self.init_sustain = self.init_sustain && sustain;

        let key = Arc::clone(&self.key);
        let modals = key.modals(self.init_sustain);
        let mut beating_scale = key.beating_scale(self.init_sustain);
        let mut delta = key.second_decay;
        if self.second_decay_active {
            delta = -key.second_decay;
            beating_scale = if key.has_damper { 1.0 } else { beating_scale + 0.25 };
        }
        if key.has_damper && !self.note_on && !self.sustain {
            delta = self.note_off_decay_delta - key.second_decay;
        }
        let beating_scale = positive_or_one(beating_scale);

        let strings = self.strings.parts_mut();
        let mut k = 0;
        for (j, modal) in modals.iter().enumerate().take(strings.r_square.len()) {
            let decay = (modal.decay + delta).max(0.0);
            let r = expf(-decay * self.time_step);
            let old_r = sqrtf(strings.r_square[j]);
            if old_r > 0.0 {
                strings.two_r_cos[j] *= r / old_r;
                strings.r_square[j] = r * r;
            }

            if modal.has_beat() {
                if k < self.beat_gains.len() {
                    let beat_freq = modal.freq + modal.beat_delta;
                    let beat_decay = decay / beating_scale;
                    if ModalCoeffs::is_valid(beat_decay, beat_freq, self.sample_rate) {
                        let coeffs = ModalCoeffs::new(beat_decay, beat_freq, self.sample_rate);
                        self.beats.set_coefficients(k, coeffs.two_r_cos, coeffs.r_square);
                        self.beat_gains[k] = self.sym_amp[j] * coeffs.r * sinf(coeffs.theta) * self.sym_scale;
                    }
                }
                k += 1;
            }
        }
    }

    /// Render the beating modes driven by `resonance`, adding into `out`.
    ///
    /// Call after a `full = false` [`synthesize`](Self::synthesize) of the
    /// same block. `resonance` is the output of everything except this
    /// voice's strings. `new_trigger` re-activates every beating mode.
    pub fn synthesize_second_stage_with_resonance(
        &mut self,
        out: &mut [f32],
        resonance: &[f32],
        new_trigger: bool,
    ) {
        if resonance.len() != out.len() {
            warn!(
                resonance = resonance.len(),
                output = out.len(),
                "resonance and output block lengths differ"
            );
        }

        if new_trigger {
            self.beats.set_active(self.beats.capacity());
        } else if validate_and_clear(&mut self.beats) == 0 {
            return;
        }

        let end = out.len().min(resonance.len());
        let start = self.block_start.min(end);
        self.beats
            .synthesize_forced_add(&mut out[start..end], &resonance[start..end], &self.beat_gains);
    }
}

fn positive_or_one(x: f32) -> f32 {
    if x > 0.0 { x } else { 1.0 }
}

/// Advance oscillator `i` one step under new coefficients, adding `force`.
fn strike_state(bank: &mut ModalBank, i: usize, coeffs: ModalCoeffs, force: f32) {
    let parts = bank.parts_mut();
    parts.two_r_cos[i] = coeffs.two_r_cos;
    parts.r_square[i] = coeffs.r_square;
    let y1 = parts.y1[i];
    parts.y1[i] = y1 * coeffs.two_r_cos - coeffs.r_square * parts.y2[i] + force;
    parts.y2[i] = y1;
}

/// Validate the active range and zero the state of everything above it.
fn validate_and_clear(bank: &mut ModalBank) -> usize {
    let before = bank.active();
    let after = bank.validate(STRING_STRENGTH_MIN);
    let parts = bank.parts_mut();
    zero_range(after, before, parts.y1, parts.y2);
    after
}

/// Copy the slow-decaying active modals of `src` into `fade` from slot `at`.
fn copy_into_fade(src: &ModalBank, fade: &mut ModalBank, mut at: usize) -> usize {
    let n = src.active();
    let parts = fade.parts_mut();
    let modals = src.two_r_cos()[..n]
        .iter()
        .zip(&src.r_square()[..n])
        .zip(&src.y1()[..n])
        .zip(&src.y2()[..n]);
    for (((&c, &r2), &y1), &y2) in modals {
        if r2 < RESTRIKE_MIN_R_SQUARE || at >= parts.y1.len() {
            break;
        }
        parts.two_r_cos[at] = c * RESTRIKE_DECAY;
        parts.r_square[at] = r2 * RESTRIKE_DECAY * RESTRIKE_DECAY;
        parts.y1[at] = y1;
        parts.y2[at] = y2;
        at += 1;
    }
    at
}
