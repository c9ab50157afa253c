//! Per-generator preset sections.
//!
//! Each section mirrors the runtime parameters of one generator and adds
//! what is needed to build it (pool size, harmonic table, piano model).
//! Missing fields take the generator defaults, so a section may be as short
//! as its table header.
//!
//! Numeric fields can be listed and set by name, which is how presets are
//! validated and how command-line overrides are applied.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use modalis_core::Curve;
use modalis_piano::{
    DEFAULT_MAX_NOTE_DURATION, HAMMER_DURATION, KEY_INIT_DELAY, PianoConfig, PianoControls,
    PianoModel,
};
use modalis_synth::{
    BurbleParams, DEFAULT_MAX_BURBLES, EngineParams, EngineSetup, NoiseMode, StateShape,
    TwoStateParams,
};

use crate::curve::CurveConfig;
use crate::error::ConfigError;
use crate::factory_presets::factory_piano_model;
use crate::model_file::PianoModelFile;
use crate::validation::ValidationResult;

/// Numeric field readable and writable as `f32`.
trait ParamValue: Copy {
    fn to_param(self) -> f32;
    fn from_param(value: f32) -> Self;
}

impl ParamValue for f32 {
    fn to_param(self) -> f32 {
        self
    }
    fn from_param(value: f32) -> Self {
        value
    }
}

impl ParamValue for i32 {
    fn to_param(self) -> f32 {
        self as f32
    }
    fn from_param(value: f32) -> Self {
        value.round() as i32
    }
}

impl ParamValue for u32 {
    fn to_param(self) -> f32 {
        self as f32
    }
    fn from_param(value: f32) -> Self {
        value.round().max(0.0) as u32
    }
}

impl ParamValue for usize {
    fn to_param(self) -> f32 {
        self as f32
    }
    fn from_param(value: f32) -> Self {
        value.round().max(0.0) as usize
    }
}

impl ParamValue for u8 {
    fn to_param(self) -> f32 {
        f32::from(self)
    }
    fn from_param(value: f32) -> Self {
        value.round().clamp(0.0, 255.0) as u8
    }
}

/// Implement `values` and `set` over the listed numeric fields.
macro_rules! numeric_params {
    ($section:ty { $($field:ident),* $(,)? }) => {
        impl $section {
            /// Numeric parameters as `(name, value)` pairs.
            pub fn values(&self) -> Vec<(&'static str, f32)> {
                vec![$((stringify!($field), ParamValue::to_param(self.$field))),*]
            }

            /// Set a numeric parameter by name; `false` if there is none.
            pub fn set(&mut self, name: &str, value: f32) -> bool {
                match name {
                    $(stringify!($field) => {
                        self.$field = ParamValue::from_param(value);
                        true
                    })*
                    _ => false,
                }
            }
        }
    };
}

fn bake(curve: Option<&CurveConfig>, param: &str) -> ValidationResult<Option<Arc<Curve>>> {
    curve.map(|c| c.to_curve(param).map(Arc::new)).transpose()
}

// ---------------------------------------------------------------------------
// Burble
// ---------------------------------------------------------------------------

/// Burble generator section.
///
/// ```toml
/// [burble]
/// spawn_rate = 4000.0
/// radius_min_mm = 0.5
/// radius_max_mm = 4.0
/// max_burbles = 256
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BurblePreset {
    /// Spawn attempts per second.
    pub spawn_rate: f32,
    /// Spawn probability per attempt.
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
    /// Per-burble amplitude ceiling.
    pub gain_max: f32,
    /// Chirp rate relative to decay rate.
    pub decay_to_chirp_ratio: f32,
    /// Scale on small decays.
    pub decay_scale: f32,
    /// Decays under this are scaled.
    pub decay_thresh: f32,
    /// Pool limit; negative for unlimited.
    pub max_burbles: i32,
    /// Gain over burble frequency in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq_gain: Option<CurveConfig>,
}

numeric_params!(BurblePreset {
    spawn_rate,
    spawn_chance,
    radius_dist,
    radius_min_mm,
    radius_max_mm,
    radius_offset_mm,
    pitch_shift,
    amp_dist,
    radius_amp_factor,
    amp_offset,
    gain,
    gain_max,
    decay_to_chirp_ratio,
    decay_scale,
    decay_thresh,
    max_burbles,
});

impl Default for BurblePreset {
    fn default() -> Self {
        Self::from_params(&BurbleParams::default())
    }
}

impl BurblePreset {
    /// Section holding `params` and the default pool limit.
    pub fn from_params(params: &BurbleParams) -> Self {
        Self {
            spawn_rate: params.spawn_rate,
            spawn_chance: params.spawn_chance,
            radius_dist: params.radius_dist,
            radius_min_mm: params.radius_min_mm,
            radius_max_mm: params.radius_max_mm,
            radius_offset_mm: params.radius_offset_mm,
            pitch_shift: params.pitch_shift,
            amp_dist: params.amp_dist,
            radius_amp_factor: params.radius_amp_factor,
            amp_offset: params.amp_offset,
            gain: params.gain,
            gain_max: params.gain_max,
            decay_to_chirp_ratio: params.decay_to_chirp_ratio,
            decay_scale: params.decay_scale,
            decay_thresh: params.decay_thresh,
            max_burbles: DEFAULT_MAX_BURBLES,
            freq_gain: None,
        }
    }

    /// Runtime parameters.
    pub fn params(&self) -> BurbleParams {
        BurbleParams {
            spawn_rate: self.spawn_rate,
            spawn_chance: self.spawn_chance,
            radius_dist: self.radius_dist,
            radius_min_mm: self.radius_min_mm,
            radius_max_mm: self.radius_max_mm,
            radius_offset_mm: self.radius_offset_mm,
            pitch_shift: self.pitch_shift,
            amp_dist: self.amp_dist,
            radius_amp_factor: self.radius_amp_factor,
            amp_offset: self.amp_offset,
            gain: self.gain,
            gain_max: self.gain_max,
            decay_to_chirp_ratio: self.decay_to_chirp_ratio,
            decay_scale: self.decay_scale,
            decay_thresh: self.decay_thresh,
        }
    }

    /// Baked frequency gain curve.
    pub fn freq_gain_curve(&self) -> ValidationResult<Option<Arc<Curve>>> {
        bake(self.freq_gain.as_ref(), "burble.freq_gain")
    }
}

// ---------------------------------------------------------------------------
// Two-state force
// ---------------------------------------------------------------------------

/// How noise enters a state, as written in preset files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// No noise.
    #[default]
    None,
    /// Added to the curve.
    Add,
    /// Multiplies the curve.
    Multiply,
}

impl From<NoiseKind> for NoiseMode {
    fn from(kind: NoiseKind) -> Self {
        match kind {
            NoiseKind::None => NoiseMode::None,
            NoiseKind::Add => NoiseMode::Add,
            NoiseKind::Multiply => NoiseMode::Multiply,
        }
    }
}

/// One state of a two-state force.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatePreset {
    /// Shape over `[0, 1]`; silent when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<CurveConfig>,
    /// Curve periods per state.
    pub freq_scale: f32,
    /// Noise merge mode.
    pub noise: NoiseKind,
    /// Peak-to-peak noise amplitude.
    pub noise_amp: f32,
}

impl Default for StatePreset {
    fn default() -> Self {
        let shape = StateShape::default();
        Self {
            curve: None,
            freq_scale: shape.freq_scale,
            noise: NoiseKind::None,
            noise_amp: shape.noise_amp,
        }
    }
}

impl StatePreset {
    fn shape(&self, param: &str) -> ValidationResult<StateShape> {
        let curve = bake(self.curve.as_ref(), param)?
            .unwrap_or_else(|| Arc::new(Curve::from_samples(vec![0.0, 0.0], 0.0, 1.0)));
        Ok(StateShape {
            curve: Some(curve),
            freq_scale: self.freq_scale,
            noise_mode: self.noise.into(),
            noise_amp: self.noise_amp,
        })
    }
}

/// Two-state cyclic force section.
///
/// ```toml
/// [force]
/// freq = 12.0
/// duty_cycle = 0.3
///
/// [force.first]
/// noise = "add"
/// [force.first.curve]
/// kind = "keys"
/// keys = [[0.0, 0.0], [0.5, 1.0], [1.0, 0.0]]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TwoStatePreset {
    /// Output gain.
    pub amp: f32,
    /// Cycle frequency in Hz.
    pub freq: f32,
    /// Fraction of the cycle in the first state.
    pub duty_cycle: f32,
    /// First state.
    pub first: StatePreset,
    /// Second state.
    pub second: StatePreset,
}

impl Default for TwoStatePreset {
    fn default() -> Self {
        let params = TwoStateParams::default();
        Self {
            amp: params.amp,
            freq: params.freq,
            duty_cycle: params.duty_cycle,
            first: StatePreset::default(),
            second: StatePreset::default(),
        }
    }
}

impl TwoStatePreset {
    /// Numeric parameters as `(name, value)` pairs.
    pub fn values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("amp", self.amp),
            ("freq", self.freq),
            ("duty_cycle", self.duty_cycle),
            ("first.freq_scale", self.first.freq_scale),
            ("first.noise_amp", self.first.noise_amp),
            ("second.freq_scale", self.second.freq_scale),
            ("second.noise_amp", self.second.noise_amp),
        ]
    }

    /// Set a numeric parameter by name; `false` if there is none.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        let slot = match name {
            "amp" => &mut self.amp,
            "freq" => &mut self.freq,
            "duty_cycle" => &mut self.duty_cycle,
            "first.freq_scale" => &mut self.first.freq_scale,
            "first.noise_amp" => &mut self.first.noise_amp,
            "second.freq_scale" => &mut self.second.freq_scale,
            "second.noise_amp" => &mut self.second.noise_amp,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Runtime parameters with baked curves.
    pub fn params(&self) -> ValidationResult<TwoStateParams> {
        Ok(TwoStateParams {
            amp: self.amp,
            freq: self.freq,
            duty_cycle: self.duty_cycle,
            first: self.first.shape("force.first.curve")?,
            second: self.second.shape("force.second.curve")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Vehicle engine section.
///
/// `harmonics` lists `[amp, decay, freq]` measured with the first pulse
/// harmonic at 100 Hz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnginePreset {
    /// Firing pulses per revolution.
    pub pulses_per_cycle: u32,
    /// Harmonics to use (0 = all).
    pub max_harmonics: usize,
    /// Engine speed.
    pub rpm: f32,
    /// Throttle position.
    pub throttle_input: f32,
    /// Frequency multiplier.
    pub freq_scale: f32,
    /// RPM-change randomization.
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
    /// Harmonic table.
    pub harmonics: Vec<[f32; 3]>,
}

numeric_params!(EnginePreset {
    pulses_per_cycle,
    max_harmonics,
    rpm,
    throttle_input,
    freq_scale,
    rpm_noise_factor,
    rand_period,
    amp_rand_min,
    amp_rand_max,
    harmonic_fluctuation,
    f0_fluctuation,
    harmonic_gain,
    cutoff_freq,
    falloff_db,
    num_harmonics_deceleration,
});

/// Harmonic table used when a preset gives none.
pub fn default_engine_harmonics() -> Vec<[f32; 3]> {
    (1..=16)
        .map(|h| {
            let h = h as f32;
            [0.5 / h, 0.0, 100.0 * h]
        })
        .collect()
}

impl Default for EnginePreset {
    fn default() -> Self {
        let params = EngineParams::default();
        Self {
            pulses_per_cycle: 4,
            max_harmonics: 0,
            rpm: params.rpm,
            throttle_input: params.throttle_input,
            freq_scale: params.freq_scale,
            rpm_noise_factor: params.rpm_noise_factor,
            rand_period: params.rand_period,
            amp_rand_min: params.amp_rand_min,
            amp_rand_max: params.amp_rand_max,
            harmonic_fluctuation: params.harmonic_fluctuation,
            f0_fluctuation: params.f0_fluctuation,
            harmonic_gain: params.harmonic_gain,
            cutoff_freq: params.cutoff_freq,
            falloff_db: params.falloff_db,
            num_harmonics_deceleration: params.num_harmonics_deceleration,
            harmonics: default_engine_harmonics(),
        }
    }
}

impl EnginePreset {
    /// Fixed engine description.
    pub fn setup(&self) -> EngineSetup {
        EngineSetup {
            pulses_per_cycle: self.pulses_per_cycle,
            harmonics: self.harmonics.iter().map(|&[a, d, f]| (a, d, f)).collect(),
            max_harmonics: self.max_harmonics,
        }
    }

    /// Initial runtime parameters.
    pub fn params(&self) -> EngineParams {
        EngineParams {
            rpm: self.rpm,
            throttle_input: self.throttle_input,
            freq_scale: self.freq_scale,
            rpm_noise_factor: self.rpm_noise_factor,
            rand_period: self.rand_period,
            amp_rand_min: self.amp_rand_min,
            amp_rand_max: self.amp_rand_max,
            harmonic_fluctuation: self.harmonic_fluctuation,
            f0_fluctuation: self.f0_fluctuation,
            harmonic_gain: self.harmonic_gain,
            cutoff_freq: self.cutoff_freq,
            falloff_db: self.falloff_db,
            num_harmonics_deceleration: self.num_harmonics_deceleration,
        }
    }
}

// ---------------------------------------------------------------------------
// Piano
// ---------------------------------------------------------------------------

/// Piano section.
///
/// Without `model` the factory piano over `start_note..start_note+num_keys`
/// is played. A relative `model` path is resolved against the preset's
/// directory.
///
/// ```toml
/// [piano]
/// model = "grand.json"
/// velocity_scale = 0.9
/// sym_reson_gain = 1.5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PianoPreset {
    /// Model file, TOML or JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    /// First note of the procedural piano.
    pub start_note: u8,
    /// Key count of the procedural piano.
    pub num_keys: usize,
    /// Soundboard level at construction; 0 leaves it out.
    pub soundboard_level: f32,
    /// Use every n-th soundboard modal.
    pub soundboard_quality_down: usize,
    /// Silence after each strike in seconds.
    pub key_init_delay: f32,
    /// Hammer response length in seconds.
    pub hammer_duration: f32,
    /// Notes held longer than this are released; 0 never releases.
    pub max_note_duration: f32,
    /// System gain.
    pub gain: f32,
    /// Velocity multiplier.
    pub velocity_scale: f32,
    /// String gain.
    pub key_gain: f32,
    /// Hammer gain.
    pub hammer_gain: f32,
    /// Chord compression amount.
    pub dynamic_adjust: f32,
    /// Soundboard gain.
    pub soundboard_gain: f32,
    /// Sympathetic resonance gain.
    pub sym_reson_gain: f32,
    /// Replaces the model's velocity remap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_remap: Option<CurveConfig>,
    /// Replaces the model's per-note gain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_gain_curve: Option<CurveConfig>,
    /// Replaces the model's per-note hammer gain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hammer_gain_curve: Option<CurveConfig>,
}

numeric_params!(PianoPreset {
    start_note,
    num_keys,
    soundboard_level,
    soundboard_quality_down,
    key_init_delay,
    hammer_duration,
    max_note_duration,
    gain,
    velocity_scale,
    key_gain,
    hammer_gain,
    dynamic_adjust,
    soundboard_gain,
    sym_reson_gain,
});

impl Default for PianoPreset {
    fn default() -> Self {
        let config = PianoConfig::default();
        let controls = PianoControls::default();
        Self {
            model: None,
            start_note: 21,
            num_keys: 88,
            soundboard_level: config.soundboard_gain,
            soundboard_quality_down: config.soundboard_quality_down,
            key_init_delay: KEY_INIT_DELAY,
            hammer_duration: HAMMER_DURATION,
            max_note_duration: DEFAULT_MAX_NOTE_DURATION,
            gain: controls.gain,
            velocity_scale: controls.velocity_scale,
            key_gain: controls.key_gain,
            hammer_gain: controls.hammer_gain,
            dynamic_adjust: controls.dynamic_adjust,
            soundboard_gain: controls.soundboard_gain,
            sym_reson_gain: controls.sym_reson_gain,
            velocity_remap: None,
            note_gain_curve: None,
            hammer_gain_curve: None,
        }
    }
}

impl PianoPreset {
    /// Construction settings at `sample_rate`.
    pub fn config(&self, sample_rate: f32, seed: i32) -> PianoConfig {
        PianoConfig {
            sample_rate,
            soundboard_gain: self.soundboard_level,
            soundboard_quality_down: self.soundboard_quality_down,
            key_init_delay: self.key_init_delay,
            hammer_duration: self.hammer_duration,
            seed,
        }
    }

    /// Per-block controls.
    pub fn controls(&self) -> PianoControls {
        PianoControls {
            gain: self.gain,
            velocity_scale: self.velocity_scale,
            key_gain: self.key_gain,
            hammer_gain: self.hammer_gain,
            dynamic_adjust: self.dynamic_adjust,
            soundboard_gain: self.soundboard_gain,
            sym_reson_gain: self.sym_reson_gain,
        }
    }

    /// Stuck-note limit, `None` when disabled.
    pub fn max_note_duration(&self) -> Option<f32> {
        (self.max_note_duration > 0.0).then_some(self.max_note_duration)
    }

    /// Model file path resolved against `base_dir`.
    pub fn model_path(&self, base_dir: Option<&Path>) -> Option<PathBuf> {
        let model = self.model.as_ref()?;
        Some(match base_dir {
            Some(dir) if model.is_relative() => dir.join(model),
            _ => model.clone(),
        })
    }

    /// Load the model (or build the factory one) and apply curve overrides.
    pub fn load_model(&self, base_dir: Option<&Path>) -> Result<PianoModel, ConfigError> {
        let mut model = match self.model_path(base_dir) {
            Some(path) => PianoModelFile::load_model(path)?,
            None => factory_piano_model(self.start_note, self.num_keys),
        };
        if let Some(curve) = bake(self.velocity_remap.as_ref(), "piano.velocity_remap")? {
            model.velocity_remap = Some(curve);
        }
        if let Some(curve) = bake(self.note_gain_curve.as_ref(), "piano.note_gain_curve")? {
            model.note_gain = Some(curve);
        }
        if let Some(curve) = bake(self.hammer_gain_curve.as_ref(), "piano.hammer_gain_curve")? {
            model.hammer_gain = Some(curve);
        }
        Ok(model)
    }
}
