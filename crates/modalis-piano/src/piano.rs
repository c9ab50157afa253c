//! Polyphonic piano.
//!
//! [`PianoSynth`] owns one [`PianoKeySynth`] per sounding note occurrence and
//! mixes them with the hammer noise and the soundboard. Each render call
//! takes the note events of the block, applies the pedals, updates the
//! voice maps and renders.
//!
//! Held voices on undamped strings, in their attack window, or alone render
//! both stages directly. Other held voices render their strings into a
//! scratch buffer first; the mix of everything else then drives their
//! beating modes as sympathetic resonance.
//!
//! ```rust
//! use std::sync::Arc;
//! use modalis_piano::{NoteAction, NoteEvents, PianoConfig, PianoModel, PianoParams, PianoSynth, VoiceId};
//!
//! let model = Arc::new(PianoModel::procedural(21, 88));
//! let mut piano = PianoSynth::new(model, &PianoConfig::default());
//!
//! let mut notes = NoteEvents::default();
//! notes.on.push(NoteAction { voice: VoiceId::new(0, 60), note: 60, velocity: 100 });
//!
//! let mut block = vec![0.0f32; 512];
//! piano.synthesize(&mut block, &mut notes, &PianoParams::default());
//! assert_eq!(piano.num_on(), 1);
//! ```

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::{collections::BTreeMap, sync::Arc};

use modalis_core::{Curve, RANDOM_SEED};
use tracing::{debug, warn};

use crate::attack::attack_curve;
use crate::hammer::{HAMMER_DURATION, HAMMER_RESCALE, HAMMER_VELOCITY_MAX, Hammer};
use crate::key_synth::{KEY_INIT_DELAY, KeySetup, KeyStrike, PianoKeySynth};
use crate::midi::{NoteAction, NoteEvents, VoiceId};
use crate::model::PianoModel;
use crate::soundboard::SoundboardSynth;
use crate::sostenuto::{PedalState, Sostenuto};

/// Below this sympathetic scale a voice renders without the resonance path.
const SYM_SCALE_MIN: f32 = 1e-5;

/// Highest MIDI velocity after scaling.
const VELOCITY_MAX: f32 = 127.0;

/// Construction-time piano settings.
///
/// ## Parameters
/// - `sample_rate`: Render rate in Hz (default 48000)
/// - `soundboard_gain`: Soundboard level at construction; 0 leaves it unallocated (default 1.0)
/// - `soundboard_quality_down`: Use every n-th soundboard modal (1 to 4, default 2)
/// - `key_init_delay`: Silence after each strike in seconds (default 0.005)
/// - `hammer_duration`: Length of the hammer response in seconds (default 0.25)
/// - `seed`: Soundboard scatter seed, [`RANDOM_SEED`] for a random stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PianoConfig {
    /// Render rate in Hz.
    pub sample_rate: f32,
    /// Soundboard level at construction.
    pub soundboard_gain: f32,
    /// Soundboard modal decimation.
    pub soundboard_quality_down: usize,
    /// Strike delay in seconds.
    pub key_init_delay: f32,
    /// Hammer response length in seconds.
    pub hammer_duration: f32,
    /// Soundboard scatter seed.
    pub seed: i32,
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            soundboard_gain: 1.0,
            soundboard_quality_down: 2,
            key_init_delay: KEY_INIT_DELAY,
            hammer_duration: HAMMER_DURATION,
            seed: RANDOM_SEED,
        }
    }
}

/// Per-block piano controls.
///
/// ## Parameters
/// - `system_gain`: Overall gain, including MIDI volume and expression (default 1.0)
/// - `velocity_scale`: Multiplier on note velocities (default 1.0)
/// - `key_gain`: Gain on string modals (0.0 to 1.0, default 1.0)
/// - `hammer_gain`: Hammer noise level (0.0 to 2.0, default 1.0)
/// - `dynamic_adjust`: Compression amount for dense chords; 0 disables (0.0 to 2.0, default 1.0)
/// - `soundboard_gain`: Soundboard level; 0 releases it (0.0 to 5.0, default 1.0)
/// - `sym_reson_scale`: Sympathetic resonance amount (0.0 to 5.0, default 1.0)
/// - `sustain`: Sustain pedal down
/// - `sostenuto`: Sostenuto pedal edge of this block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PianoParams {
    /// Overall gain.
    pub system_gain: f32,
    /// Velocity multiplier.
    pub velocity_scale: f32,
    /// String gain.
    pub key_gain: f32,
    /// Hammer gain.
    pub hammer_gain: f32,
    /// Dynamic range compression amount.
    pub dynamic_adjust: f32,
    /// Soundboard gain.
    pub soundboard_gain: f32,
    /// Sympathetic resonance scale.
    pub sym_reson_scale: f32,
    /// Sustain pedal.
    pub sustain: bool,
    /// Sostenuto pedal edge.
    pub sostenuto: PedalState,
}

impl Default for PianoParams {
    fn default() -> Self {
        Self {
            system_gain: 1.0,
            velocity_scale: 1.0,
            key_gain: 1.0,
            hammer_gain: 1.0,
            dynamic_adjust: 1.0,
            soundboard_gain: 1.0,
            sym_reson_scale: 1.0,
            sustain: false,
            sostenuto: PedalState::NoChange,
        }
    }
}

/// Polyphonic piano voice manager.
#[derive(Debug, Clone)]
pub struct PianoSynth {
    model: Arc<PianoModel>,
    key_setup: KeySetup,
    velocity_remap: Option<Arc<Curve>>,
    note_gain: Option<Arc<Curve>>,
    hammer_gain: Option<Arc<Curve>>,

    on: BTreeMap<VoiceId, PianoKeySynth>,
    off: BTreeMap<VoiceId, PianoKeySynth>,
    sostenuto: Sostenuto,
    hammer: Hammer,
    soundboard: SoundboardSynth,

    scratch: Vec<Vec<f32>>,
    split: Vec<VoiceId>,
    last_compression: Option<f32>,
    frames: u64,
}

impl PianoSynth {
    /// Piano playing `model`.
    pub fn new(model: Arc<PianoModel>, config: &PianoConfig) -> Self {
        let sample_rate = config.sample_rate;
        let attack: Arc<[f32]> = attack_curve(sample_rate).into();
        let hammer = Hammer::new(&model.hammer, sample_rate, config.hammer_duration, &attack);
        let soundboard = SoundboardSynth::new(
            sample_rate,
            &model.soundboard,
            config.soundboard_gain,
            config.soundboard_quality_down,
            config.seed,
        );
        let key_setup = KeySetup {
            sample_rate,
            attack,
            velocity_standard: model.velocity_standard,
            note_off_decay_delta: model.note_off_decay_delta,
            init_delay: config.key_init_delay,
        };

        Self {
            velocity_remap: model.velocity_remap.clone(),
            note_gain: model.note_gain.clone(),
            hammer_gain: model.hammer_gain.clone(),
            model,
            key_setup,
            on: BTreeMap::new(),
            off: BTreeMap::new(),
            sostenuto: Sostenuto::new(),
            hammer,
            soundboard,
            scratch: Vec::new(),
            split: Vec::new(),
            last_compression: None,
            frames: 0,
        }
    }

    /// Piano model being played.
    pub fn model(&self) -> &Arc<PianoModel> {
        &self.model
    }

    /// Replace the velocity remap curve (indexed by MIDI velocity).
    pub fn set_velocity_remap(&mut self, curve: Option<Arc<Curve>>) {
        self.velocity_remap = curve;
    }

    /// Replace the per-note gain curve (indexed by MIDI note).
    pub fn set_note_gain(&mut self, curve: Option<Arc<Curve>>) {
        self.note_gain = curve;
    }

    /// Replace the per-note hammer gain curve (indexed by MIDI note).
    pub fn set_hammer_gain(&mut self, curve: Option<Arc<Curve>>) {
        self.hammer_gain = curve;
    }

    /// Number of held voices.
    pub fn num_on(&self) -> usize {
        self.on.len()
    }

    /// Number of released voices still ringing.
    pub fn num_off(&self) -> usize {
        self.off.len()
    }

    /// True when `voice` is held.
    pub fn is_on(&self, voice: VoiceId) -> bool {
        self.on.contains_key(&voice)
    }

    /// True when `voice` is released but ringing.
    pub fn is_off(&self, voice: VoiceId) -> bool {
        self.off.contains_key(&voice)
    }

    /// Voice for `voice`, held or released.
    pub fn voice(&self, voice: VoiceId) -> Option<&PianoKeySynth> {
        self.on.get(&voice).or_else(|| self.off.get(&voice))
    }

    /// Sostenuto snapshot.
    pub fn sostenuto(&self) -> &Sostenuto {
        &self.sostenuto
    }

    /// Compression factor applied in the last render call, if any.
    pub fn last_compression(&self) -> Option<f32> {
        self.last_compression
    }

    /// Soundboard resonator.
    pub fn soundboard(&self) -> &SoundboardSynth {
        &self.soundboard
    }

    /// True while anything can still produce output.
    pub fn is_running(&self) -> bool {
        !self.hammer.is_idle() || self.soundboard.is_running() || !self.on.is_empty() || !self.off.is_empty()
    }

    /// Release every held voice and clear the sostenuto snapshot.
    pub fn off_all_notes(&mut self) {
        let on = core::mem::take(&mut self.on);
        self.off.extend(on);
        self.sostenuto.clear();
    }

    /// Silence everything immediately.
    pub fn kill_all(&mut self) {
        self.on.clear();
        self.off.clear();
        self.sostenuto.clear();
        self.hammer.clear();
        self.soundboard.reset();
    }

    /// Apply `notes` and render one block, adding into `out`.
    ///
    /// `notes` may be modified by the sostenuto pedal. The result is clamped
    /// to [-1, 1].
    pub fn synthesize(&mut self, out: &mut [f32], notes: &mut NoteEvents, params: &PianoParams) {
        self.last_compression = None;
        let start_frame = self.frames;
        self.frames += out.len() as u64;
        if notes.is_empty() && !self.is_running() {
            return;
        }

        self.update_voices(notes, params, start_frame);
        self.hammer.render_add(out);
        self.render_released(out, params.sustain);

        let new_note = !notes.on.is_empty();
        if params.sustain {
            for voice in self.on.values_mut() {
                voice.synthesize(out, true, true, true);
            }
        } else {
            self.render_held(out, new_note);
        }

        self.soundboard
            .synthesize(out, &self.model.soundboard, new_note, params.soundboard_gain);

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    fn update_voices(&mut self, notes: &mut NoteEvents, params: &PianoParams, frame: u64) {
        self.sostenuto
            .apply(params.sostenuto, self.on.keys().copied(), notes);

        let time = frame as f32 / self.key_setup.sample_rate;
        for &voice in &notes.off {
            match self.on.remove(&voice) {
                Some(synth) => {
                    self.off.insert(voice, synth);
                }
                None => warn!(
                    note = voice.note(),
                    channel = voice.channel(),
                    time,
                    "note-off without a preceding note-on"
                ),
            }
        }

        let mut hammer_velocity = 0.0;
        for action in &notes.on {
            hammer_velocity += self.strike(action, params, time);
        }

        let strength = hammer_velocity.min(HAMMER_VELOCITY_MAX) * params.hammer_gain * params.system_gain * HAMMER_RESCALE;
        self.hammer.strike(strength);

        self.adjust_dynamic_range(params);
    }

    /// Start or restrike the voice of `action`. Returns its hammer velocity.
    fn strike(&mut self, action: &NoteAction, params: &PianoParams, time: f32) -> f32 {
        let Some(key) = self.model.key(action.note).cloned() else {
            warn!(note = action.note, "note not covered by the piano model");
            return 0.0;
        };

        let mut velocity = f32::from(action.velocity);
        if let Some(curve) = &self.velocity_remap {
            velocity = curve.value_interp(velocity).clamp(0.0, VELOCITY_MAX).trunc();
        }
        let note_gain = self.note_gain_value(action.note);
        let strike = KeyStrike {
            velocity: (params.velocity_scale * velocity).clamp(0.0, VELOCITY_MAX),
            key_gain: params.key_gain * params.system_gain * note_gain,
            sustain: params.sustain,
            sym_scale: params.sym_reson_scale * self.model.sym_reson_rescale,
        };

        let voice = action.voice;
        let synth = if let Some(mut released) = self.off.remove(&voice) {
            // The released voice may belong to another note after a transpose.
            if released.midi_note() == action.note {
                released.restrike(strike);
                released
            } else {
                PianoKeySynth::new(key, &self.key_setup, strike)
            }
        } else if let Some(mut held) = self.on.remove(&voice) {
            if !self.sostenuto.is_engaged() {
                warn!(note = action.note, time, "note-on for a note that is already on");
            }
            held.restrike(strike);
            held
        } else {
            debug!(note = action.note, velocity = strike.velocity, "voice created");
            PianoKeySynth::new(key, &self.key_setup, strike)
        };

        let mut hammer_velocity = synth.velocity() * synth.hammer_vel_scale() * note_gain;
        if let Some(curve) = &self.hammer_gain {
            hammer_velocity *= curve.value_interp(f32::from(action.note)).clamp(0.0, 2.0);
        }
        self.on.insert(voice, synth);
        hammer_velocity
    }

    fn note_gain_value(&self, note: u8) -> f32 {
        self.note_gain
            .as_ref()
            .map_or(1.0, |curve| curve.value_interp(f32::from(note)).clamp(0.0, 1.0))
    }

    fn adjust_dynamic_range(&mut self, params: &PianoParams) {
        if params.dynamic_adjust <= 0.0 {
            return;
        }

        let mut energy: f32 = self.on.values().map(PianoKeySynth::estimate_energy).sum();
        if params.sustain {
            energy += self.off.values().map(PianoKeySynth::estimate_energy).sum::<f32>();
        }

        let threshold = self.model.dyn_adjust_threshold * params.dynamic_adjust;
        if energy <= threshold {
            return;
        }

        let min = self.model.dyn_adjust_factor_min * params.dynamic_adjust.min(1.0)
            / (params.system_gain * params.key_gain).max(1.0);
        let factor = (threshold / energy).max(min).min(1.0);
        for voice in self.on.values_mut().filter(|v| v.sample_index() == 0) {
            voice.adjust_energy(factor);
        }
        self.hammer.scale_pending(factor);
        self.last_compression = Some(factor);
    }

    fn render_released(&mut self, out: &mut [f32], sustain: bool) {
        self.off.retain(|_, voice| {
            voice.synthesize(out, false, sustain, true);
            voice.is_first_stage_running()
        });
    }

    fn render_held(&mut self, out: &mut [f32], new_note: bool) {
        let attack_len = self.key_setup.attack.len();
        let num_on = self.on.len();
        self.split.clear();

        for (&id, voice) in &mut self.on {
            let direct = !voice.has_damper()
                || voice.sample_index() < attack_len
                || num_on == 1
                || voice.sym_scale() < SYM_SCALE_MIN;
            if direct {
                voice.synthesize(out, true, false, true);
                continue;
            }

            let k = self.split.len();
            if self.scratch.len() <= k {
                self.scratch.push(Vec::new());
            }
            let strings = &mut self.scratch[k];
            strings.clear();
            strings.resize(out.len(), 0.0);
            voice.synthesize(strings, true, false, false);
            for (o, &s) in out.iter_mut().zip(strings.iter()) {
                *o += s;
            }
            self.split.push(id);
        }

        // Each split voice is driven by the mix minus its own strings.
        for strings in &mut self.scratch[..self.split.len()] {
            for (s, &o) in strings.iter_mut().zip(out.iter()) {
                *s = o - *s;
            }
        }

        for (id, resonance) in self.split.iter().zip(&self.scratch) {
            if let Some(voice) = self.on.get_mut(id) {
                voice.synthesize_second_stage_with_resonance(out, resonance, new_note);
            }
        }
    }
}
