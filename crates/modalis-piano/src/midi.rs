//! MIDI input for the piano.
//!
//! [`MidiEventParser`] collects note and controller messages between render
//! calls and hands them to the piano as a [`NoteEvents`] batch. Controllers
//! are tracked per channel with 14-bit MSB/LSB pairing.
//!
//! ```rust
//! use modalis_piano::{MidiEventParser, NoteEvents, VoiceId};
//!
//! let mut parser = MidiEventParser::new(21, 88);
//! let voice = VoiceId::new(0, 60);
//! parser.note_on(voice, 60, 100);
//! parser.note_off(voice, 60);
//!
//! let mut notes = NoteEvents::default();
//! parser.take_note_actions(&mut notes);
//! assert!(notes.on.is_empty());
//! assert_eq!(notes.off, vec![voice]);
//! ```

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use tracing::warn;

use crate::sostenuto::PedalState;

/// Velocity that turns a note-on into a note-off.
pub const VELOCITY_NOTE_OFF: u8 = 0;

/// Velocities at or above this are ignored.
pub const VELOCITY_IGNORE: u8 = 128;

/// Number of MIDI channels.
pub const NUM_CHANNELS: usize = 16;

/// Number of controller ids per channel.
pub const NUM_CONTROLLERS: usize = 128;

const MAX_7BIT: f32 = 127.0;
const MAX_14BIT: f32 = 16383.0;

/// Controller numbers understood by the parser.
pub mod controller {
    /// Channel volume (MSB).
    pub const VOLUME: u8 = 7;
    /// Expression (MSB).
    pub const EXPRESSION: u8 = 11;
    /// Sustain pedal.
    pub const HOLD: u8 = 64;
    /// Sostenuto pedal.
    pub const SOSTENUTO: u8 = 66;
    /// Soft pedal.
    pub const SOFT_PEDAL: u8 = 67;
    /// All sound off, handled as an immediate kill.
    pub const ALL_SOUND_OFF: u8 = 120;
    /// All notes off, handled as a release of every note.
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Identity of a sounding note occurrence.
///
/// Notes on different channels are different voices even when they share a
/// pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VoiceId(u32);

impl VoiceId {
    /// Voice of `note` on `channel`.
    #[inline]
    pub const fn new(channel: u8, note: u8) -> Self {
        Self(((channel as u32) << 8) | note as u32)
    }

    /// Channel component.
    #[inline]
    pub const fn channel(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Note component.
    #[inline]
    pub const fn note(self) -> u8 {
        self.0 as u8
    }
}

/// A pending note-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteAction {
    /// Voice to strike.
    pub voice: VoiceId,
    /// MIDI note.
    pub note: u8,
    /// MIDI velocity (1 to 127).
    pub velocity: u8,
}

/// Note events for one render call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteEvents {
    /// Note-ons, at most one per voice.
    pub on: Vec<NoteAction>,
    /// Note-offs, each voice at most once.
    pub off: Vec<VoiceId>,
}

impl NoteEvents {
    /// True when there is nothing to do.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.on.is_empty() && self.off.is_empty()
    }

    /// Remove every event.
    pub fn clear(&mut self) {
        self.on.clear();
        self.off.clear();
    }
}

/// Decoded channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note-on (velocity 0 is a note-off).
    NoteOn {
        /// Channel 0-15.
        channel: u8,
        /// MIDI note.
        note: u8,
        /// MIDI velocity.
        velocity: u8,
    },
    /// Note-off.
    NoteOff {
        /// Channel 0-15.
        channel: u8,
        /// MIDI note.
        note: u8,
    },
    /// Control change.
    ControlChange {
        /// Channel 0-15.
        channel: u8,
        /// Controller id.
        controller: u8,
        /// 7-bit value.
        value: u8,
    },
    /// Release every note.
    AllNotesOff,
    /// Silence every note immediately.
    AllNotesKill,
    /// Recognized but not handled (pressure, pitch bend, program, system).
    Unsupported {
        /// Status nibble.
        status: u8,
    },
}

impl MidiMessage {
    /// Decode a three-byte channel message.
    pub fn from_bytes(status: u8, data1: u8, data2: u8) -> Self {
        let channel = status & 0x0F;
        let (data1, data2) = (data1 & 0x7F, data2 & 0x7F);
        match status & 0xF0 {
            0x80 => Self::NoteOff { channel, note: data1 },
            0x90 => Self::NoteOn {
                channel,
                note: data1,
                velocity: data2,
            },
            0xB0 if data1 == controller::ALL_NOTES_OFF => Self::AllNotesOff,
            0xB0 if data1 == controller::ALL_SOUND_OFF => Self::AllNotesKill,
            0xB0 => Self::ControlChange {
                channel,
                controller: data1,
                value: data2,
            },
            other => Self::Unsupported { status: other },
        }
    }
}

/// MSB and LSB controller ids of a 14-bit pair, if `id` belongs to one.
pub fn msb_lsb(id: u8) -> Option<(u8, u8)> {
    match id {
        0..=31 => Some((id, id + 32)),
        32..=63 => Some((id - 32, id)),
        98 | 100 => Some((id + 1, id)),
        99 | 101 => Some((id, id - 1)),
        _ => None,
    }
}

/// Collects MIDI input between render calls.
#[derive(Debug, Clone)]
pub struct MidiEventParser {
    min_note: u8,
    max_note: u8,
    pending: Vec<NoteAction>,
    last_cc: [[i8; NUM_CONTROLLERS]; NUM_CHANNELS],
    volume: f32,
    expression: f32,
    sustain: bool,
    soft_pedal: bool,
    sostenuto: PedalState,
}

impl MidiEventParser {
    /// Parser accepting notes `start_note ..= start_note + num_keys - 1`.
    pub fn new(start_note: u8, num_keys: usize) -> Self {
        let min_note = start_note.min(127);
        let max_note = (start_note as usize + num_keys.max(1) - 1).min(127) as u8;
        Self {
            min_note,
            max_note,
            pending: Vec::with_capacity(16),
            last_cc: [[-1; NUM_CONTROLLERS]; NUM_CHANNELS],
            volume: 1.0,
            expression: 1.0,
            sustain: false,
            soft_pedal: false,
            sostenuto: PedalState::NoChange,
        }
    }

    /// Forget pending notes and controller state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.last_cc = [[-1; NUM_CONTROLLERS]; NUM_CHANNELS];
        self.volume = 1.0;
        self.expression = 1.0;
        self.sustain = false;
        self.soft_pedal = false;
        self.sostenuto = PedalState::NoChange;
    }

    /// Accepted note range.
    pub fn note_range(&self) -> (u8, u8) {
        (self.min_note, self.max_note)
    }

    /// Number of pending note actions.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a note-on. Velocity 0 queues a note-off.
    ///
    /// Notes outside the range and velocities of 128 or more are ignored. A
    /// second note-on for a pending voice is only kept when it is louder.
    pub fn note_on(&mut self, voice: VoiceId, note: u8, velocity: u8) {
        if note < self.min_note || note > self.max_note || velocity >= VELOCITY_IGNORE {
            return;
        }
        let pending_velocity = self
            .pending
            .iter()
            .find(|a| a.voice == voice)
            .map_or(0, |a| a.velocity);
        if velocity > pending_velocity || velocity == VELOCITY_NOTE_OFF {
            self.pending.push(NoteAction { voice, note, velocity });
        }
    }

    /// Queue a note-off.
    pub fn note_off(&mut self, voice: VoiceId, note: u8) {
        self.note_on(voice, note, VELOCITY_NOTE_OFF);
    }

    /// Move pending actions into `notes`, replacing its contents.
    ///
    /// A note-on followed by a note-off of the same voice is dropped. Later
    /// note-ons of a voice replace earlier ones.
    pub fn take_note_actions(&mut self, notes: &mut NoteEvents) {
        notes.clear();
        for (i, action) in self.pending.iter().enumerate() {
            if action.velocity > VELOCITY_NOTE_OFF {
                let cancelled = self.pending[i + 1..]
                    .iter()
                    .any(|a| a.voice == action.voice && a.velocity == VELOCITY_NOTE_OFF);
                if cancelled {
                    continue;
                }
                match notes.on.iter_mut().find(|a| a.voice == action.voice) {
                    Some(existing) => *existing = *action,
                    None => notes.on.push(*action),
                }
            } else if !notes.off.contains(&action.voice) {
                notes.off.push(action.voice);
            }
        }
        self.pending.clear();
    }

    /// Handle a control change on `channel`.
    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        let (ch, id) = (channel as usize, controller as usize);
        if ch >= NUM_CHANNELS || id >= NUM_CONTROLLERS {
            warn!(channel, controller, "control change out of range");
            return;
        }
        let value = value.min(127) as i8;
        self.last_cc[ch][id] = value;

        match msb_lsb(controller) {
            Some((msb, lsb)) => {
                let (msb_value, lsb_value) = (self.last_cc[ch][msb as usize], self.last_cc[ch][lsb as usize]);
                if lsb_value == -1 {
                    self.set_7bit(controller, value);
                } else if msb_value != -1 {
                    let combined = (i32::from(msb_value) << 7) | i32::from(lsb_value);
                    self.set_14bit(msb, combined);
                }
            }
            None => self.set_7bit(controller, value),
        }
    }

    fn set_7bit(&mut self, controller: u8, value: i8) {
        let value = f32::from(value);
        match controller {
            controller::VOLUME | controller::EXPRESSION => self.set_controller(controller, value / MAX_7BIT),
            controller::HOLD | controller::SOSTENUTO | controller::SOFT_PEDAL => {
                self.set_controller(controller, value);
            }
            _ => {}
        }
    }

    fn set_14bit(&mut self, controller: u8, value: i32) {
        match controller {
            controller::VOLUME | controller::EXPRESSION => {
                self.set_controller(controller, value as f32 / MAX_14BIT);
            }
            _ => {}
        }
    }

    fn set_controller(&mut self, controller: u8, value: f32) {
        match controller {
            controller::VOLUME => self.volume = value,
            controller::EXPRESSION => self.expression = value,
            controller::HOLD => self.sustain = value > 63.0,
            controller::SOFT_PEDAL => self.soft_pedal = value > 63.0,
            controller::SOSTENUTO => {
                self.sostenuto = if value > 63.0 {
                    PedalState::TriggerOn
                } else {
                    PedalState::TriggerOff
                };
            }
            _ => {}
        }
    }

    /// Channel volume times expression.
    #[inline]
    pub fn volume_with_expression(&self) -> f32 {
        self.volume * self.expression
    }

    /// Sustain pedal state.
    #[inline]
    pub fn is_sustain_on(&self) -> bool {
        self.sustain
    }

    /// Soft pedal state.
    #[inline]
    pub fn is_soft_pedal_on(&self) -> bool {
        self.soft_pedal
    }

    /// Take the latest sostenuto edge, leaving [`PedalState::NoChange`].
    pub fn take_sostenuto(&mut self) -> PedalState {
        core::mem::take(&mut self.sostenuto)
    }

    /// Last raw value of a controller, `None` if never received.
    pub fn last_controller_value(&self, channel: u8, controller: u8) -> Option<u8> {
        let value = *self.last_cc.get(channel as usize)?.get(controller as usize)?;
        u8::try_from(value).ok()
    }
}

/// Releases notes that have been held longer than a limit.
///
/// Guards against note-offs lost to stream jumps or disconnected input.
#[derive(Debug, Clone, Default)]
pub struct StuckNoteGuard {
    max_frames: Option<usize>,
    held: BTreeMap<VoiceId, (u8, usize)>,
}

impl StuckNoteGuard {
    /// Guard releasing notes after `max_frames`; `None` disables it.
    pub fn new(max_frames: Option<usize>) -> Self {
        Self {
            max_frames,
            held: BTreeMap::new(),
        }
    }

    /// Hold limit in frames.
    pub fn max_frames(&self) -> Option<usize> {
        self.max_frames
    }

    /// Number of tracked notes.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// True when no note is tracked.
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Start (or restart) tracking `voice`.
    pub fn note_on(&mut self, voice: VoiceId, note: u8) {
        if self.max_frames.is_some() {
            self.held.insert(voice, (note, 0));
        }
    }

    /// Stop tracking `voice`.
    pub fn note_off(&mut self, voice: VoiceId) {
        self.held.remove(&voice);
    }

    /// Forget every note.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Age every note by `frames` and release those past the limit.
    pub fn advance(&mut self, frames: usize, mut release: impl FnMut(VoiceId, u8)) {
        let Some(max) = self.max_frames else {
            return;
        };
        self.held.retain(|&voice, (note, age)| {
            *age += frames;
            if *age > max {
                release(voice, *note);
                false
            } else {
                true
            }
        });
    }
}
