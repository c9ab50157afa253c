//! Modalis Piano - modal piano synthesis
//!
//! A physically inspired piano built on the modal bank in `modalis-core`.
//! Every key is a set of damped string modes plus detuned beating partners
//! that pick up sympathetic resonance from the other strings. A hammer noise
//! and a soundboard resonator complete the instrument.
//!
//! # Core Components
//!
//! ## Model
//!
//! - [`PianoModel`] - Immutable per-key modal data, curves, hammer and soundboard
//! - [`PianoKeyData`] / [`KeyModal`] - One key's strings for both pedal states
//! - [`PianoModel::procedural`] - Synthetic model for defaults and tests
//!
//! ## Synthesis
//!
//! - [`PianoKeySynth`] - One struck key with restrike crossfade
//! - [`Hammer`] - Pre-rendered impact noise and its playback queue
//! - [`SoundboardSynth`] - Resonator driven by the string mix
//! - [`PianoSynth`] - Voice maps, pedals, dynamic range adjustment, mixing
//!
//! ## MIDI
//!
//! - [`MidiEventParser`] - Note actions and controller state between blocks
//! - [`Sostenuto`] - Pedal snapshot of held notes
//! - [`PianoNode`] - Sample-accurate MIDI rendering with a stuck-note guard
//!
//! ```rust
//! use std::sync::Arc;
//! use modalis_piano::{MidiMessage, PianoConfig, PianoControls, PianoModel, PianoNode};
//!
//! let model = Arc::new(PianoModel::procedural(21, 88));
//! let mut node = PianoNode::new(model, PianoConfig::default());
//! node.push(0, MidiMessage::NoteOn { channel: 0, note: 60, velocity: 90 });
//!
//! let mut block = vec![0.0f32; 512];
//! node.process(&mut block, &PianoControls::default());
//! assert!(block.iter().all(|s| s.abs() <= 1.0));
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! modalis-piano = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod attack;
pub mod hammer;
pub mod key_synth;
pub mod midi;
pub mod model;
pub mod node;
pub mod piano;
pub mod soundboard;
pub mod sostenuto;

// Re-export main types at crate root
pub use attack::{ATTACK_TABLE, ATTACK_TABLE_RATE, attack_curve};
pub use hammer::{HAMMER_DURATION, HAMMER_RESCALE, HAMMER_VELOCITY_MAX, Hammer, HammerStrike};
pub use key_synth::{
    KEY_INIT_DELAY, KeySetup, KeyStrike, PianoKeySynth, RESTRIKE_DECAY, RESTRIKE_ENERGY_MIN,
    RESTRIKE_MIN_R_SQUARE, STRING_STRENGTH_MIN,
};
pub use midi::{
    MidiEventParser, MidiMessage, NoteAction, NoteEvents, StuckNoteGuard, VoiceId, controller,
    msb_lsb,
};
pub use model::{
    HammerData, KeyModal, PROCEDURAL_NO_DAMPER_NOTE, PianoKeyData, PianoModel, SoundboardData,
    SoundboardModal,
};
pub use node::{DEFAULT_MAX_NOTE_DURATION, MidiEvent, PianoControls, PianoNode};
pub use piano::{PianoConfig, PianoParams, PianoSynth};
pub use soundboard::{MAX_QUALITY_DOWN, SOUNDBOARD_FREQ_SCATTER, SOUNDBOARD_STRENGTH_MIN, SoundboardSynth};
pub use sostenuto::{PedalState, Sostenuto};
