//! Property-based tests for modalis-piano.
//!
//! Checks compression bounds, voice map consistency, parser output and
//! output sanity over randomized note streams using proptest.

use std::sync::Arc;

use modalis_piano::{
    MidiEventParser, NoteAction, NoteEvents, PianoConfig, PianoModel, PianoParams, PianoSynth,
    VoiceId,
};
use proptest::prelude::*;

const SR: f32 = 48000.0;

fn piano(seed: i32) -> PianoSynth {
    let config = PianoConfig {
        sample_rate: SR,
        soundboard_gain: 0.0,
        seed,
        ..PianoConfig::default()
    };
    PianoSynth::new(Arc::new(PianoModel::procedural(21, 88)), &config)
}

fn action(note: u8, velocity: u8) -> NoteAction {
    NoteAction {
        voice: VoiceId::new(0, note),
        note,
        velocity,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The chord compressor never boosts and never drops below its floor.
    #[test]
    fn compression_factor_within_bounds(
        notes in prop::collection::btree_set(21u8..=108, 1..24),
        velocity in 1u8..128,
        dynamic_adjust in 0.01f32..2.0,
        system_gain in 0.1f32..4.0,
    ) {
        let mut p = piano(1);
        let params = PianoParams {
            dynamic_adjust,
            system_gain,
            soundboard_gain: 0.0,
            ..PianoParams::default()
        };
        let mut events = NoteEvents::default();
        events.on.extend(notes.iter().map(|&n| action(n, velocity)));
        let mut out = vec![0.0f32; 256];
        p.synthesize(&mut out, &mut events, &params);

        if let Some(factor) = p.last_compression() {
            let min = p.model().dyn_adjust_factor_min * dynamic_adjust.min(1.0) / system_gain.max(1.0);
            prop_assert!(factor <= 1.0);
            prop_assert!(factor >= min * (1.0 - 1e-5));
        }
    }

    /// A voice is never both held and released, and output stays in range.
    #[test]
    fn voice_maps_stay_disjoint(
        script in prop::collection::vec((21u8..40, any::<bool>(), 1u8..128), 1..40),
        sustain in any::<bool>(),
    ) {
        let mut p = piano(2);
        let params = PianoParams { sustain, ..PianoParams::default() };
        let mut events = NoteEvents::default();
        let mut out = vec![0.0f32; 128];

        for (note, press, velocity) in script {
            let voice = VoiceId::new(0, note);
            if press {
                events.on.push(action(note, velocity));
            } else {
                events.off.push(voice);
            }
            out.fill(0.0);
            p.synthesize(&mut out, &mut events, &params);
            events.clear();

            prop_assert!(!(p.is_on(voice) && p.is_off(voice)));
            prop_assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        }
    }

    /// Parsed note actions contain each voice at most once per list.
    #[test]
    fn parser_output_is_unique(
        stream in prop::collection::vec((0u8..2, 50u8..56, 0u8..130), 0..64),
    ) {
        let mut parser = MidiEventParser::new(21, 88);
        for &(channel, note, velocity) in &stream {
            parser.note_on(VoiceId::new(channel, note), note, velocity);
        }
        let mut notes = NoteEvents::default();
        parser.take_note_actions(&mut notes);

        for (i, a) in notes.on.iter().enumerate() {
            prop_assert!(a.velocity > 0 && a.velocity < 128);
            prop_assert!(notes.on[i + 1..].iter().all(|b| b.voice != a.voice));
        }
        for (i, v) in notes.off.iter().enumerate() {
            prop_assert!(!notes.off[i + 1..].contains(v));
        }
        prop_assert_eq!(parser.pending_len(), 0);
    }
}
