//! Sostenuto pedal.
//!
//! Pressing the pedal snapshots the notes sounding at that moment. While it
//! is held, releasing a snapshotted key does not release its note; the
//! release is remembered and applied when the pedal comes up. Notes struck
//! after the press are not affected.

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::midi::{NoteEvents, VoiceId};

/// Pedal edge reported for one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PedalState {
    /// Pedal went down.
    TriggerOn,
    /// Pedal came up.
    TriggerOff,
    /// No edge since the last call.
    #[default]
    NoChange,
}

/// Snapshot of notes held by the sostenuto pedal.
///
/// The flag of each entry is `true` while its key is still down.
#[derive(Debug, Clone, Default)]
pub struct Sostenuto {
    snapshot: BTreeMap<VoiceId, bool>,
}

impl Sostenuto {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while any note is held by the pedal.
    #[inline]
    pub fn is_engaged(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// `Some(key_down)` when `voice` is in the snapshot.
    pub fn is_held(&self, voice: VoiceId) -> Option<bool> {
        self.snapshot.get(&voice).copied()
    }

    /// Forget the snapshot.
    pub fn clear(&mut self) {
        self.snapshot.clear();
    }

    /// Apply a pedal edge to this block's note events.
    ///
    /// `sounding` lists the voices currently held by a key. Note-offs of
    /// snapshotted voices are absorbed while the pedal is down and replayed
    /// on release.
    pub fn apply(&mut self, pedal: PedalState, sounding: impl IntoIterator<Item = VoiceId>, notes: &mut NoteEvents) {
        match pedal {
            PedalState::TriggerOn => {
                for voice in sounding {
                    self.snapshot.insert(voice, true);
                }
                for voice in &notes.off {
                    if let Some(down) = self.snapshot.get_mut(voice) {
                        *down = false;
                    }
                }
                notes.off.clear();
                for action in &notes.on {
                    self.snapshot.insert(action.voice, true);
                }
            }
            PedalState::TriggerOff => {
                for (&voice, &down) in &self.snapshot {
                    if !down && !notes.off.contains(&voice) {
                        notes.off.push(voice);
                    }
                }
                self.snapshot.clear();
            }
            PedalState::NoChange if self.is_engaged() => {
                let snapshot = &mut self.snapshot;
                notes.off.retain(|voice| match snapshot.get_mut(voice) {
                    Some(down) => {
                        *down = false;
                        false
                    }
                    None => true,
                });
                // A held note can be released and struck again under the pedal.
                for action in &notes.on {
                    if let Some(down) = snapshot.get_mut(&action.voice) {
                        *down = true;
                    }
                }
            }
            PedalState::NoChange => {}
        }
    }
}
