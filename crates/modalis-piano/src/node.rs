//! MIDI-driven piano node.
//!
//! [`PianoNode`] wraps a [`PianoSynth`] with a [`MidiEventParser`] and
//! renders blocks sample-accurately: MIDI events are queued with their frame
//! offset, and the block is split so each event takes effect at its frame.
//! Events sharing a frame are parsed together, so a note-on cancelled by a
//! note-off at the same frame never sounds.
//!
//! ```rust
//! use std::sync::Arc;
//! use modalis_piano::{MidiMessage, PianoConfig, PianoControls, PianoModel, PianoNode};
//!
//! let model = Arc::new(PianoModel::procedural(21, 88));
//! let mut node = PianoNode::new(model, PianoConfig::default());
//! node.push(128, MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 });
//!
//! let mut block = vec![0.0f32; 512];
//! node.process(&mut block, &PianoControls::default());
//! assert!(block[..128].iter().all(|&s| s == 0.0));
//! ```

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use modalis_core::TriggerEvents;
use tracing::warn;

use crate::midi::{MidiEventParser, MidiMessage, NoteEvents, StuckNoteGuard, VELOCITY_IGNORE, VoiceId};
use crate::model::PianoModel;
use crate::piano::{PianoConfig, PianoParams, PianoSynth};

/// Longest a note may be held before it is released, in seconds.
pub const DEFAULT_MAX_NOTE_DURATION: f32 = 60.0;

/// Smallest velocity scale passed to the piano.
const VELOCITY_SCALE_MIN: f32 = 0.001;

/// Host-facing piano controls, clamped before each render.
///
/// ## Parameters
/// - `gain`: System gain, multiplied by MIDI volume and expression (default 1.0)
/// - `velocity_scale`: Velocity multiplier (min 0.001, default 1.0)
/// - `key_gain`: String gain (default 1.0)
/// - `hammer_gain`: Hammer noise level (0.0 to 2.0, default 1.0)
/// - `dynamic_adjust`: Chord compression amount (0.0 to 2.0, default 1.0)
/// - `soundboard_gain`: Soundboard level (0.0 to 5.0, default 1.0)
/// - `sym_reson_gain`: Sympathetic resonance amount (0.0 to 5.0, default 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PianoControls {
    /// System gain.
    pub gain: f32,
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
    /// Sympathetic resonance gain.
    pub sym_reson_gain: f32,
}

impl Default for PianoControls {
    fn default() -> Self {
        Self {
            gain: 1.0,
            velocity_scale: 1.0,
            key_gain: 1.0,
            hammer_gain: 1.0,
            dynamic_adjust: 1.0,
            soundboard_gain: 1.0,
            sym_reson_gain: 1.0,
        }
    }
}

/// A MIDI message tagged with its source track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Source track.
    pub track: u16,
    /// Decoded message.
    pub message: MidiMessage,
}

/// Piano with MIDI input and sample-accurate event handling.
#[derive(Debug, Clone)]
pub struct PianoNode {
    config: PianoConfig,
    synth: PianoSynth,
    parser: MidiEventParser,
    guard: StuckNoteGuard,
    events: TriggerEvents<MidiEvent>,
    notes: NoteEvents,
    track: Option<u16>,
}

impl PianoNode {
    /// Node playing `model`, accepting every track.
    pub fn new(model: Arc<PianoModel>, config: PianoConfig) -> Self {
        let parser = MidiEventParser::new(model.start_note, model.num_keys());
        let max_frames = (DEFAULT_MAX_NOTE_DURATION * config.sample_rate) as usize;
        Self {
            synth: PianoSynth::new(model, &config),
            config,
            parser,
            guard: StuckNoteGuard::new(Some(max_frames)),
            events: TriggerEvents::new(),
            notes: NoteEvents::default(),
            track: None,
        }
    }

    /// Release notes held longer than `seconds`; `None` never releases.
    pub fn set_max_note_duration(&mut self, seconds: Option<f32>) {
        let max_frames = seconds.map(|s| (s.max(0.0) * self.config.sample_rate) as usize);
        self.guard = StuckNoteGuard::new(max_frames);
    }

    /// Only accept note and controller messages from `track`.
    ///
    /// Changing the filter releases every note and resets controllers.
    pub fn set_track(&mut self, track: Option<u16>) {
        if track != self.track {
            self.parser.reset();
            self.synth.off_all_notes();
            self.guard.clear();
            self.track = track;
        }
    }

    /// Switch to another piano model, silencing the current one.
    pub fn set_model(&mut self, model: Arc<PianoModel>) {
        self.parser = MidiEventParser::new(model.start_note, model.num_keys());
        self.synth = PianoSynth::new(model, &self.config);
        self.guard.clear();
        self.events.clear();
    }

    /// Wrapped piano.
    pub fn synth(&self) -> &PianoSynth {
        &self.synth
    }

    /// Wrapped piano, for curve overrides.
    pub fn synth_mut(&mut self) -> &mut PianoSynth {
        &mut self.synth
    }

    /// MIDI state.
    pub fn parser(&self) -> &MidiEventParser {
        &self.parser
    }

    /// Queue `message` from track 0 at `frame` of the next block.
    pub fn push(&mut self, frame: usize, message: MidiMessage) {
        self.push_on_track(frame, 0, message);
    }

    /// Queue `message` from `track` at `frame` of the next block.
    ///
    /// Frames past the end of the block take effect before its last frame.
    pub fn push_on_track(&mut self, frame: usize, track: u16, message: MidiMessage) {
        self.events.push(frame, MidiEvent { track, message });
    }

    /// Queue raw MIDI bytes at `frame` of the next block.
    pub fn push_bytes(&mut self, frame: usize, status: u8, data1: u8, data2: u8) {
        self.push(frame, MidiMessage::from_bytes(status, data1, data2));
    }

    /// Silence everything and forget pending events and MIDI state.
    pub fn reset(&mut self) {
        self.synth.kill_all();
        self.parser.reset();
        self.guard.clear();
        self.events.clear();
        self.notes.clear();
    }

    /// Render one block into `out` (overwritten).
    pub fn process(&mut self, out: &mut [f32], controls: &PianoControls) {
        out.fill(0.0);
        if out.is_empty() {
            self.events.clear();
            return;
        }

        let parser = &mut self.parser;
        self.guard.advance(out.len(), |voice, note| {
            warn!(note, channel = voice.channel(), "releasing stuck note");
            parser.note_off(voice, note);
        });

        let mut events = core::mem::take(&mut self.events);
        for segment in events.split(out.len()) {
            if let Some(event) = segment.event {
                self.handle(event);
            }
            if !segment.is_empty() {
                self.render(&mut out[segment.start..segment.end], controls);
            }
        }
        events.clear();
        self.events = events;
    }

    fn accepts(&self, track: u16) -> bool {
        self.track.is_none_or(|t| t == track)
    }

    fn handle(&mut self, event: MidiEvent) {
        match event.message {
            MidiMessage::AllNotesOff => {
                self.synth.off_all_notes();
                self.parser.reset();
                self.guard.clear();
            }
            MidiMessage::AllNotesKill => {
                self.synth.kill_all();
                self.parser.reset();
                self.guard.clear();
            }
            _ if !self.accepts(event.track) => {}
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                let voice = VoiceId::new(channel, note);
                self.parser.note_on(voice, note, velocity);
                let (min, max) = self.parser.note_range();
                if velocity == 0 {
                    self.guard.note_off(voice);
                } else if velocity < VELOCITY_IGNORE && (min..=max).contains(&note) {
                    self.guard.note_on(voice, note);
                }
            }
            MidiMessage::NoteOff { channel, note } => {
                let voice = VoiceId::new(channel, note);
                self.parser.note_off(voice, note);
                self.guard.note_off(voice);
            }
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => self.parser.control_change(channel, controller, value),
            MidiMessage::Unsupported { status } => {
                warn!(status, "unsupported MIDI message");
            }
        }
    }

    fn render(&mut self, out: &mut [f32], controls: &PianoControls) {
        self.parser.take_note_actions(&mut self.notes);
        let params = PianoParams {
            system_gain: controls.gain * self.parser.volume_with_expression(),
            velocity_scale: controls.velocity_scale.max(VELOCITY_SCALE_MIN),
            key_gain: controls.key_gain,
            hammer_gain: controls.hammer_gain.clamp(0.0, 2.0),
            dynamic_adjust: controls.dynamic_adjust.clamp(0.0, 2.0),
            soundboard_gain: controls.soundboard_gain.clamp(0.0, 5.0),
            sym_reson_scale: controls.sym_reson_gain.clamp(0.0, 5.0),
            sustain: self.parser.is_sustain_on(),
            sostenuto: self.parser.take_sostenuto(),
        };
        self.synth.synthesize(out, &mut self.notes, &params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::controller;

    const SR: f32 = 48000.0;

    fn node() -> PianoNode {
        let config = PianoConfig {
            sample_rate: SR,
            seed: 5,
            ..PianoConfig::default()
        };
        PianoNode::new(Arc::new(PianoModel::procedural(21, 88)), config)
    }

    fn note_on(note: u8, velocity: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity,
        }
    }

    #[test]
    fn note_starts_at_its_frame() {
        let mut n = node();
        n.push(100, note_on(60, 100));
        let mut out = vec![0.0f32; 1024];
        n.process(&mut out, &PianoControls::default());
        assert!(out[..100].iter().all(|&s| s == 0.0));
        assert!(out[100..].iter().any(|&s| s != 0.0));
        assert_eq!(n.synth().num_on(), 1);
    }

    #[test]
    fn on_and_off_at_same_frame_cancel() {
        let mut n = node();
        n.push(10, note_on(60, 100));
        n.push(10, MidiMessage::NoteOff { channel: 0, note: 60 });
        let mut out = vec![0.0f32; 512];
        n.process(&mut out, &PianoControls::default());
        assert_eq!(n.synth().num_on(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sustain_pedal_reaches_the_piano() {
        let mut n = node();
        n.push(0, MidiMessage::ControlChange { channel: 0, controller: controller::HOLD, value: 127 });
        n.push(0, note_on(60, 100));
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());
        assert!(n.parser().is_sustain_on());
    }

    #[test]
    fn all_notes_off_releases_everything() {
        let mut n = node();
        n.push(0, note_on(60, 100));
        n.push(0, note_on(64, 100));
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());

        n.push(0, MidiMessage::AllNotesOff);
        n.process(&mut out, &PianoControls::default());
        assert_eq!(n.synth().num_on(), 0);
        assert_eq!(n.synth().num_off(), 2);
    }

    #[test]
    fn all_notes_kill_silences() {
        let mut n = node();
        n.push(0, note_on(60, 100));
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());

        n.push(0, MidiMessage::AllNotesKill);
        n.process(&mut out, &PianoControls::default());
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(!n.synth().is_running());
    }

    #[test]
    fn track_filter_drops_other_tracks() {
        let mut n = node();
        n.set_track(Some(1));
        n.push_on_track(0, 2, note_on(60, 100));
        n.push_on_track(0, 1, note_on(64, 100));
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());
        assert_eq!(n.synth().num_on(), 1);
        assert!(n.synth().is_on(VoiceId::new(0, 64)));
    }

    #[test]
    fn stuck_note_is_released() {
        let mut n = node();
        n.set_max_note_duration(Some(0.01));
        n.push(0, note_on(60, 100));
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());
        assert_eq!(n.synth().num_on(), 1);

        for _ in 0..4 {
            n.process(&mut out, &PianoControls::default());
        }
        assert_eq!(n.synth().num_on(), 0);
    }

    #[test]
    fn raw_bytes_are_decoded() {
        let mut n = node();
        n.push_bytes(0, 0x90, 60, 100);
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());
        assert_eq!(n.synth().num_on(), 1);
    }

    #[test]
    fn reset_forgets_pending_events() {
        let mut n = node();
        n.push(0, note_on(60, 100));
        n.reset();
        let mut out = vec![0.0f32; 256];
        n.process(&mut out, &PianoControls::default());
        assert_eq!(n.synth().num_on(), 0);
    }
}
