//! Piano model asset files.
//!
//! A [`PianoModelFile`] is the on-disk form of a [`PianoModel`]. Small
//! models are convenient as TOML; measured models with dozens of modals per
//! key are usually JSON. The format is picked from the file extension.
//!
//! Modal tuples are stored as fixed-size arrays to keep files compact:
//!
//! | Field | Layout |
//! |-------|--------|
//! | `keys[].pedal_off`, `keys[].pedal_on` | `[amp, decay, freq, beat_delta]` |
//! | `soundboard` | `[amp, decay, freq, phase]` |
//! | `hammer` | `[amp, decay, freq]` |
//!
//! Loading checks the model the same way the synthesizer expects it: every
//! note from `start_note` on has exactly one key, both pedal sets have the
//! same number of modals, and all values are finite and usable.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use modalis_piano::{
    HammerData, KeyModal, PianoKeyData, PianoModel, SoundboardData, SoundboardModal,
};

use crate::curve::CurveConfig;
use crate::error::{ConfigError, ModelError};

/// Current model file version.
pub const MODEL_FILE_VERSION: u32 = 1;

/// Highest MIDI note number plus one.
const MIDI_NOTE_COUNT: usize = 128;

fn default_version() -> u32 {
    MODEL_FILE_VERSION
}

fn default_velocity_standard() -> f32 {
    100.0
}

fn default_one() -> f32 {
    1.0
}

fn default_note_off_decay_delta() -> f32 {
    12.0
}

fn default_dyn_adjust_factor_min() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

/// One key as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyFile {
    /// MIDI note of the key.
    pub midi_note: u8,
    /// Fundamental in Hz.
    pub base_freq: f32,
    /// Extra first-stage decay (1/s).
    #[serde(default)]
    pub second_decay: f32,
    /// Start of the second decay stage (s).
    #[serde(default)]
    pub second_decay_time: f32,
    /// Beating decay divisor with the pedal up.
    #[serde(default = "default_one")]
    pub beating_scale_pedal_off: f32,
    /// Beating decay divisor with the pedal down.
    #[serde(default = "default_one")]
    pub beating_scale_pedal_on: f32,
    /// Whether the key has a damper.
    #[serde(default = "default_true")]
    pub has_damper: bool,
    /// Velocity curve coefficients `[A, B, C]`.
    pub velocity_params: [f32; 3],
    /// Pedal-up modals `[amp, decay, freq, beat_delta]`.
    pub pedal_off: Vec<[f32; 4]>,
    /// Pedal-down modals `[amp, decay, freq, beat_delta]`.
    pub pedal_on: Vec<[f32; 4]>,
}

/// A piano model as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PianoModelFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// First MIDI note.
    pub start_note: u8,
    /// Number of consecutive keys.
    pub num_keys: usize,
    /// Velocity rendered unscaled.
    #[serde(default = "default_velocity_standard")]
    pub velocity_standard: f32,
    /// Global sympathetic resonance factor.
    #[serde(default = "default_one")]
    pub sym_reson_rescale: f32,
    /// Decay added to damped strings on note-off (1/s).
    #[serde(default = "default_note_off_decay_delta")]
    pub note_off_decay_delta: f32,
    /// Energy above which strikes are compressed.
    #[serde(default = "default_one")]
    pub dyn_adjust_threshold: f32,
    /// Lowest compression factor.
    #[serde(default = "default_dyn_adjust_factor_min")]
    pub dyn_adjust_factor_min: f32,
    /// Velocity remap curve over MIDI velocity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_remap: Option<CurveConfig>,
    /// Per-note gain curve over MIDI note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_gain: Option<CurveConfig>,
    /// Per-note hammer gain curve over MIDI note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hammer_gain: Option<CurveConfig>,
    /// Soundboard modals `[amp, decay, freq, phase]`.
    #[serde(default)]
    pub soundboard: Vec<[f32; 4]>,
    /// Hammer modals `[amp, decay, freq]`.
    #[serde(default)]
    pub hammer: Vec<[f32; 3]>,
    /// Keys in any order.
    pub keys: Vec<KeyFile>,
}

/// File formats a model can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }
}

impl PianoModelFile {
    /// Load a model file, TOML or JSON by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let file = match format {
            Format::Toml => Self::from_toml(&content)?,
            Format::Json => Self::from_json(&content)?,
        };
        debug!(path = %path.display(), keys = file.keys.len(), "loaded piano model file");
        Ok(file)
    }

    /// Parse a TOML model.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Parse a JSON model.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Save the model, TOML or JSON by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match Format::from_path(path)? {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Describe an in-memory model.
    pub fn from_model(model: &PianoModel) -> Self {
        let modal = |m: &KeyModal| [m.amp, m.decay, m.freq, m.beat_delta];
        Self {
            version: MODEL_FILE_VERSION,
            start_note: model.start_note,
            num_keys: model.num_keys(),
            velocity_standard: model.velocity_standard,
            sym_reson_rescale: model.sym_reson_rescale,
            note_off_decay_delta: model.note_off_decay_delta,
            dyn_adjust_threshold: model.dyn_adjust_threshold,
            dyn_adjust_factor_min: model.dyn_adjust_factor_min,
            velocity_remap: model.velocity_remap.as_deref().map(CurveConfig::from_curve),
            note_gain: model.note_gain.as_deref().map(CurveConfig::from_curve),
            hammer_gain: model.hammer_gain.as_deref().map(CurveConfig::from_curve),
            soundboard: model
                .soundboard
                .modals
                .iter()
                .map(|m| [m.amp, m.decay, m.freq, m.phase])
                .collect(),
            hammer: model.hammer.modals.iter().map(|&(a, d, f)| [a, d, f]).collect(),
            keys: model
                .keys
                .iter()
                .map(|key| KeyFile {
                    midi_note: key.midi_note,
                    base_freq: key.base_freq,
                    second_decay: key.second_decay,
                    second_decay_time: key.second_decay_time,
                    beating_scale_pedal_off: key.beating_scale_pedal_off,
                    beating_scale_pedal_on: key.beating_scale_pedal_on,
                    has_damper: key.has_damper,
                    velocity_params: key.velocity_params,
                    pedal_off: key.pedal_off.iter().map(modal).collect(),
                    pedal_on: key.pedal_on.iter().map(modal).collect(),
                })
                .collect(),
        }
    }

    /// Check the file and build the model.
    pub fn to_model(&self) -> Result<PianoModel, ConfigError> {
        if self.num_keys == 0 || self.keys.is_empty() {
            return Err(ModelError::NoKeys.into());
        }
        if self.start_note as usize + self.num_keys > MIDI_NOTE_COUNT {
            return Err(ModelError::NoteRange {
                start_note: self.start_note,
                num_keys: self.num_keys,
            }
            .into());
        }
        self.check_globals()?;

        let end_note = (self.start_note as usize + self.num_keys - 1) as u8;
        let mut by_note = BTreeMap::new();
        for key in &self.keys {
            if key.midi_note < self.start_note || key.midi_note > end_note {
                return Err(ModelError::KeyOutOfRange {
                    note: key.midi_note,
                    start_note: self.start_note,
                    end_note,
                }
                .into());
            }
            let data = key_data(key)?;
            if by_note.insert(key.midi_note, Arc::new(data)).is_some() {
                return Err(ModelError::DuplicateKey(key.midi_note).into());
            }
        }
        if let Some(missing) = (self.start_note..=end_note).find(|n| !by_note.contains_key(n)) {
            return Err(ModelError::MissingKey(missing).into());
        }

        let curve = |config: &Option<CurveConfig>, name: &str| -> Result<_, ConfigError> {
            config
                .as_ref()
                .map(|c| c.to_curve(name).map(Arc::new))
                .transpose()
                .map_err(ConfigError::from)
        };

        Ok(PianoModel {
            start_note: self.start_note,
            keys: by_note.into_values().collect(),
            velocity_standard: self.velocity_standard,
            sym_reson_rescale: self.sym_reson_rescale,
            note_off_decay_delta: self.note_off_decay_delta,
            dyn_adjust_threshold: self.dyn_adjust_threshold,
            dyn_adjust_factor_min: self.dyn_adjust_factor_min,
            velocity_remap: curve(&self.velocity_remap, "velocity_remap")?,
            note_gain: curve(&self.note_gain, "note_gain")?,
            hammer_gain: curve(&self.hammer_gain, "hammer_gain")?,
            soundboard: SoundboardData {
                modals: self
                    .soundboard
                    .iter()
                    .enumerate()
                    .map(|(i, &[amp, decay, freq, phase])| {
                        check_modal(&format!("soundboard[{i}]"), amp, decay, freq)?;
                        Ok(SoundboardModal {
                            amp,
                            decay,
                            freq,
                            phase,
                        })
                    })
                    .collect::<Result<_, ModelError>>()?,
            },
            hammer: HammerData {
                modals: self
                    .hammer
                    .iter()
                    .enumerate()
                    .map(|(i, &[amp, decay, freq])| {
                        check_modal(&format!("hammer[{i}]"), amp, decay, freq)?;
                        Ok((amp, decay, freq))
                    })
                    .collect::<Result<_, ModelError>>()?,
            },
        })
    }

    fn check_globals(&self) -> Result<(), ModelError> {
        let positive = [
            ("velocity_standard", self.velocity_standard),
            ("dyn_adjust_threshold", self.dyn_adjust_threshold),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::invalid(name, format!("{value} must be positive")));
            }
        }
        let non_negative = [
            ("sym_reson_rescale", self.sym_reson_rescale),
            ("note_off_decay_delta", self.note_off_decay_delta),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ModelError::invalid(name, format!("{value} must not be negative")));
            }
        }
        if !(0.0..=1.0).contains(&self.dyn_adjust_factor_min) {
            return Err(ModelError::invalid(
                "dyn_adjust_factor_min",
                format!("{} must be within [0, 1]", self.dyn_adjust_factor_min),
            ));
        }
        Ok(())
    }

    /// Load a model file and build the model.
    pub fn load_model(path: impl AsRef<Path>) -> Result<PianoModel, ConfigError> {
        Self::load(path)?.to_model()
    }
}

fn check_modal(context: &str, amp: f32, decay: f32, freq: f32) -> Result<(), ModelError> {
    if !amp.is_finite() {
        return Err(ModelError::invalid(context, "amplitude must be finite"));
    }
    if !(decay.is_finite() && decay >= 0.0) {
        return Err(ModelError::invalid(context, format!("decay {decay} must not be negative")));
    }
    if !(freq.is_finite() && freq > 0.0) {
        return Err(ModelError::invalid(context, format!("frequency {freq} must be positive")));
    }
    Ok(())
}

fn key_data(key: &KeyFile) -> Result<PianoKeyData, ModelError> {
    let note = key.midi_note;
    if key.pedal_off.len() != key.pedal_on.len() {
        return Err(ModelError::ModalCountMismatch {
            note,
            pedal_off: key.pedal_off.len(),
            pedal_on: key.pedal_on.len(),
        });
    }
    if !(key.base_freq.is_finite() && key.base_freq > 0.0) {
        return Err(ModelError::invalid(
            format!("note {note}"),
            format!("base frequency {} must be positive", key.base_freq),
        ));
    }

    let modals = |list: &[[f32; 4]], pedal: &str| {
        list.iter()
            .enumerate()
            .map(|(i, &[amp, decay, freq, beat_delta])| {
                check_modal(&format!("note {note} {pedal}[{i}]"), amp, decay, freq)?;
                Ok(KeyModal {
                    amp,
                    decay,
                    freq,
                    beat_delta,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()
    };

    Ok(PianoKeyData {
        midi_note: note,
        base_freq: key.base_freq,
        second_decay: key.second_decay,
        second_decay_time: key.second_decay_time,
        beating_scale_pedal_off: key.beating_scale_pedal_off,
        beating_scale_pedal_on: key.beating_scale_pedal_on,
        has_damper: key.has_damper,
        velocity_params: key.velocity_params,
        pedal_off: modals(&key.pedal_off, "pedal_off")?,
        pedal_on: modals(&key.pedal_on, "pedal_on")?,
    })
}
