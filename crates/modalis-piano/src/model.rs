//! Immutable piano model data.
//!
//! A [`PianoModel`] holds one [`PianoKeyData`] per key plus the shared
//! hammer and soundboard modals. Models are built once (usually by
//! `modalis-config`) and shared between voices through [`Arc`].

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use libm::{expf, fmodf, powf, sqrtf};
use modalis_core::Curve;

/// One string modal of a key.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyModal {
    /// Initial amplitude.
    pub amp: f32,
    /// Decay rate in 1/s.
    pub decay: f32,
    /// Frequency in Hz.
    pub freq: f32,
    /// Detuning of the beating partner in Hz; 0 means no beating mode.
    pub beat_delta: f32,
}

impl KeyModal {
    /// Whether this modal drives a beating mode.
    #[inline]
    pub fn has_beat(&self) -> bool {
        self.beat_delta != 0.0
    }
}

/// Per-key synthesis data.
///
/// `pedal_off` and `pedal_on` describe the same strings with the sustain
/// pedal up or down. Both lists are expected to have the same length and
/// the same beating pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PianoKeyData {
    /// MIDI note of this key.
    pub midi_note: u8,
    /// Fundamental in Hz, used for velocity scaling.
    pub base_freq: f32,
    /// Extra decay added while in the first decay stage (1/s).
    pub second_decay: f32,
    /// Time after the strike at which the second decay stage starts (s).
    pub second_decay_time: f32,
    /// Decay divisor of beating modes with the pedal up.
    pub beating_scale_pedal_off: f32,
    /// Decay divisor of beating modes with the pedal down.
    pub beating_scale_pedal_on: f32,
    /// Whether releasing the key damps the strings.
    pub has_damper: bool,
    /// Velocity curve coefficients `[A, B, C]`.
    pub velocity_params: [f32; 3],
    /// Modals with the sustain pedal up.
    pub pedal_off: Vec<KeyModal>,
    /// Modals with the sustain pedal down.
    pub pedal_on: Vec<KeyModal>,
}

impl PianoKeyData {
    /// Number of string modals.
    #[inline]
    pub fn num_modals(&self) -> usize {
        self.pedal_off.len().min(self.pedal_on.len())
    }

    /// Number of beating modes, the larger count of the two pedal sets.
    pub fn num_beats(&self) -> usize {
        let count = |modals: &[KeyModal]| modals.iter().filter(|m| m.has_beat()).count();
        count(&self.pedal_off).max(count(&self.pedal_on))
    }

    /// Modal list for the given pedal state.
    #[inline]
    pub fn modals(&self, sustain: bool) -> &[KeyModal] {
        if sustain { &self.pedal_on } else { &self.pedal_off }
    }

    /// Beating scale for the given pedal state.
    #[inline]
    pub fn beating_scale(&self, sustain: bool) -> f32 {
        if sustain {
            self.beating_scale_pedal_on
        } else {
            self.beating_scale_pedal_off
        }
    }

    /// Velocity curve `(f/1000)·v·A + B·v + C·v²`.
    pub fn velocity_curve(&self, base_freq_scale: f32, velocity: f32) -> f32 {
        let [a, b, c] = self.velocity_params;
        base_freq_scale * velocity * a + b * velocity + c * velocity * velocity
    }
}

/// One soundboard modal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoundboardModal {
    /// Coupling amplitude.
    pub amp: f32,
    /// Decay rate in 1/s.
    pub decay: f32,
    /// Frequency in Hz.
    pub freq: f32,
    /// Coupling phase in radians.
    pub phase: f32,
}

/// Soundboard modals, driven by the string output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SoundboardData {
    /// Modals in model order.
    pub modals: Vec<SoundboardModal>,
}

/// Hammer impact modals as `(amplitude, decay, frequency)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HammerData {
    /// Modals in model order.
    pub modals: Vec<(f32, f32, f32)>,
}

/// A complete piano.
#[derive(Debug, Clone, Default)]
pub struct PianoModel {
    /// MIDI note of the first key.
    pub start_note: u8,
    /// Key data, one entry per consecutive note from `start_note`.
    pub keys: Vec<Arc<PianoKeyData>>,
    /// Velocity at which strikes are rendered unscaled.
    pub velocity_standard: f32,
    /// Global factor on the sympathetic resonance scale.
    pub sym_reson_rescale: f32,
    /// Decay added to damped strings after note-off (1/s).
    pub note_off_decay_delta: f32,
    /// Energy above which new strikes are compressed.
    pub dyn_adjust_threshold: f32,
    /// Lower bound of the compression factor.
    pub dyn_adjust_factor_min: f32,
    /// Velocity remap, indexed by MIDI velocity.
    pub velocity_remap: Option<Arc<Curve>>,
    /// Per-note gain, indexed by MIDI note.
    pub note_gain: Option<Arc<Curve>>,
    /// Per-note hammer gain, indexed by MIDI note.
    pub hammer_gain: Option<Arc<Curve>>,
    /// Soundboard modals.
    pub soundboard: SoundboardData,
    /// Hammer modals.
    pub hammer: HammerData,
}

impl PianoModel {
    /// Number of keys.
    #[inline]
    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Highest MIDI note covered by the model.
    pub fn end_note(&self) -> u8 {
        let last = self.start_note as usize + self.keys.len().saturating_sub(1);
        last.min(127) as u8
    }

    /// Key data for a MIDI note, if the model covers it.
    pub fn key(&self, midi_note: u8) -> Option<&Arc<PianoKeyData>> {
        let index = (midi_note as usize).checked_sub(self.start_note as usize)?;
        self.keys.get(index)
    }

    /// Build a synthetic piano from simple string physics.
    ///
    /// Partials follow a stiff-string inharmonicity law, the first few
    /// partials get a beating partner, and the top keys have no dampers.
    /// Useful as a factory default and in tests.
    pub fn procedural(start_note: u8, num_keys: usize) -> Self {
        let num_keys = num_keys.min(128usize.saturating_sub(start_note as usize));
        let keys = (0..num_keys)
            .map(|i| Arc::new(procedural_key(start_note + i as u8)))
            .collect();

        let soundboard = SoundboardData {
            modals: (0..48)
                .map(|i| {
                    let t = i as f32 / 47.0;
                    SoundboardModal {
                        amp: 0.004 * (1.0 - 0.5 * t),
                        decay: 25.0 + 40.0 * t,
                        freq: 80.0 * powf(50.0, t),
                        phase: fmodf(i as f32 * 0.7, core::f32::consts::PI),
                    }
                })
                .collect(),
        };

        let hammer = HammerData {
            modals: vec![
                (0.5, 400.0, 1200.0),
                (0.3, 600.0, 2500.0),
                (0.2, 900.0, 4100.0),
            ],
        };

        Self {
            start_note,
            keys,
            velocity_standard: 100.0,
            sym_reson_rescale: 1.0,
            note_off_decay_delta: 12.0,
            dyn_adjust_threshold: 1.0,
            dyn_adjust_factor_min: 0.3,
            velocity_remap: None,
            note_gain: None,
            hammer_gain: None,
            soundboard,
            hammer,
        }
    }
}

/// First MIDI note without a damper in [`PianoModel::procedural`].
pub const PROCEDURAL_NO_DAMPER_NOTE: u8 = 89;

fn procedural_key(midi_note: u8) -> PianoKeyData {
    let f0 = 440.0 * powf(2.0, (f32::from(midi_note) - 69.0) / 12.0);
    let inharmonicity = 1e-4 * expf((f32::from(midi_note) - 21.0) / 30.0);
    let num_partials = ((8000.0 / f0) as usize).clamp(1, 16);

    let pedal_off: Vec<KeyModal> = (1..=num_partials)
        .map(|h| {
            let h = h as f32;
            KeyModal {
                amp: 0.1 / powf(h, 1.2),
                decay: 1.2 + 0.8 * h + 0.002 * f0,
                freq: h * f0 * sqrtf(1.0 + inharmonicity * h * h),
                beat_delta: if h <= 6.0 { 0.3 + 0.1 * h } else { 0.0 },
            }
        })
        .filter(|m| m.freq < 20000.0)
        .collect();
    let pedal_on = pedal_off
        .iter()
        .map(|m| KeyModal {
            decay: m.decay * 0.9,
            ..*m
        })
        .collect();

    PianoKeyData {
        midi_note,
        base_freq: f0,
        second_decay: 0.8,
        second_decay_time: 0.5,
        beating_scale_pedal_off: 1.5,
        beating_scale_pedal_on: 1.8,
        has_damper: midi_note < PROCEDURAL_NO_DAMPER_NOTE,
        velocity_params: [0.6, 0.05, 0.0],
        pedal_off,
        pedal_on,
    }
}
