//! Integration tests for modalis-piano.
//!
//! Plays the procedural piano through `PianoSynth` and `PianoNode` the way
//! a host would: note events per block, pedals, MIDI controllers.

use std::sync::Arc;

use modalis_piano::{
    MidiMessage, NoteAction, NoteEvents, PedalState, PianoConfig, PianoControls, PianoKeySynth,
    PianoModel, PianoNode, PianoParams, PianoSynth, VoiceId, controller,
};

const SR: f32 = 48000.0;

fn model() -> Arc<PianoModel> {
    Arc::new(PianoModel::procedural(21, 88))
}

fn config(soundboard_gain: f32) -> PianoConfig {
    PianoConfig {
        sample_rate: SR,
        soundboard_gain,
        seed: 11,
        ..PianoConfig::default()
    }
}

/// Only the strings: no hammer, soundboard or compression.
fn strings_only() -> PianoParams {
    PianoParams {
        hammer_gain: 0.0,
        soundboard_gain: 0.0,
        dynamic_adjust: 0.0,
        ..PianoParams::default()
    }
}

fn strike(note: u8, velocity: u8) -> NoteAction {
    NoteAction {
        voice: VoiceId::new(0, note),
        note,
        velocity,
    }
}

fn render(piano: &mut PianoSynth, notes: &mut NoteEvents, params: &PianoParams, len: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; len];
    piano.synthesize(&mut out, notes, params);
    notes.clear();
    out
}

fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

fn energy(block: &[f32]) -> f32 {
    block.iter().map(|s| s * s).sum()
}

// ---------------------------------------------------------------------------
// 1. Voice lifetime
// ---------------------------------------------------------------------------

/// A short strike released after one sample rings out over several blocks,
/// then decays to exact silence.
#[test]
fn released_note_reaches_exact_silence() {
    let mut piano = PianoSynth::new(model(), &config(0.0));
    let params = strings_only();
    let voice = VoiceId::new(0, 60);
    let mut notes = NoteEvents::default();

    notes.on.push(strike(60, 64));
    render(&mut piano, &mut notes, &params, 1);
    notes.off.push(voice);

    // Peak of every sounding block after the release
    let mut tail = Vec::new();
    let mut leading_silence = 0;
    let mut stopped = false;
    for _ in 0..4000 {
        let out = render(&mut piano, &mut notes, &params, 256);
        let level = peak(&out);
        if level > 0.0 {
            tail.push(level);
        } else if tail.is_empty() {
            leading_silence += 1;
        }
        if !piano.voice(voice).is_some_and(PianoKeySynth::is_first_stage_running) {
            stopped = true;
            break;
        }
        assert!(level > 0.0 || tail.is_empty(), "silent block inside the release tail");
    }

    assert!(stopped, "the note never stopped");
    assert!(leading_silence <= 1, "{leading_silence} silent blocks before the attack");
    assert!(tail.len() >= 3, "release tail lasted {} blocks", tail.len());
    let loudest = tail[..2].iter().copied().fold(0.0f32, f32::max);
    let last = tail[tail.len() - 1];
    assert!(last < loudest, "tail did not decay: {last} vs {loudest}");

    let after = render(&mut piano, &mut notes, &params, 256);
    assert!(after.iter().all(|&s| s == 0.0), "output after the voice stopped");
    assert!(!piano.is_running());
}

/// The sustain pedal keeps a released note ringing.
#[test]
fn sustain_pedal_prolongs_release() {
    let tail = |sustain: bool| {
        let mut piano = PianoSynth::new(model(), &config(0.0));
        let params = PianoParams {
            sustain,
            ..strings_only()
        };
        let mut notes = NoteEvents::default();
        notes.on.push(strike(48, 100));
        render(&mut piano, &mut notes, &params, 4800);
        notes.off.push(VoiceId::new(0, 48));
        for _ in 0..40 {
            render(&mut piano, &mut notes, &params, 480);
        }
        energy(&render(&mut piano, &mut notes, &params, 480))
    };

    assert!(tail(true) > 10.0 * tail(false));
}

/// Restriking a ringing note does not click.
#[test]
fn restrike_is_continuous() {
    let mut piano = PianoSynth::new(model(), &config(0.0));
    let params = strings_only();
    let mut notes = NoteEvents::default();

    notes.on.push(strike(60, 90));
    let before = render(&mut piano, &mut notes, &params, 4800);
    let steady = before[4000..]
        .windows(2)
        .fold(0.0f32, |m, w| m.max((w[1] - w[0]).abs()));

    notes.on.push(strike(60, 90));
    let after = render(&mut piano, &mut notes, &params, 480);
    assert_eq!(piano.num_on(), 1);

    let jump = (after[0] - before[4799]).abs();
    assert!(jump <= 2.0 * steady + 1e-3, "jump {jump} vs steady {steady}");
    assert!(after.iter().all(|s| s.is_finite()));
}

// ---------------------------------------------------------------------------
// 2. Chords and resonance
// ---------------------------------------------------------------------------

/// Chords take the resonance path once past the attack and stay bounded.
#[test]
fn chord_with_sympathetic_resonance_stays_bounded() {
    let mut piano = PianoSynth::new(model(), &config(1.0));
    let params = PianoParams::default();
    let mut notes = NoteEvents::default();
    notes.on.extend([strike(48, 100), strike(55, 100), strike(64, 100)]);

    let mut peak = 0.0f32;
    for _ in 0..50 {
        let out = render(&mut piano, &mut notes, &params, 512);
        assert!(out.iter().all(|s| s.is_finite()));
        peak = out.iter().fold(peak, |m, s| m.max(s.abs()));
    }
    assert!(peak > 0.0);
    assert!(peak <= 1.0);
    assert_eq!(piano.num_on(), 3);
}

/// Zero sympathetic scale makes the split path equivalent to direct rendering.
#[test]
fn resonance_changes_the_mix() {
    let tail = |sym_reson_scale: f32| {
        let mut piano = PianoSynth::new(model(), &config(0.0));
        let params = PianoParams {
            sym_reson_scale,
            ..strings_only()
        };
        let mut notes = NoteEvents::default();
        notes.on.extend([strike(48, 100), strike(60, 100)]);
        for _ in 0..10 {
            render(&mut piano, &mut notes, &params, 512);
        }
        render(&mut piano, &mut notes, &params, 512)
    };

    let dry = tail(0.0);
    let wet = tail(2.0);
    assert!(dry.iter().zip(&wet).any(|(a, b)| a != b));
}

/// The soundboard keeps sounding after a short note is gone.
#[test]
fn soundboard_rings_after_strike() {
    let mut piano = PianoSynth::new(model(), &config(1.0));
    let params = PianoParams {
        soundboard_gain: 1.0,
        ..strings_only()
    };
    let mut notes = NoteEvents::default();
    notes.on.push(strike(72, 110));
    render(&mut piano, &mut notes, &params, 2048);
    assert!(piano.soundboard().is_running());
}

// ---------------------------------------------------------------------------
// 3. Pedals
// ---------------------------------------------------------------------------

/// Sostenuto holds the notes down at press time, not later ones.
#[test]
fn sostenuto_holds_only_snapshot() {
    let mut piano = PianoSynth::new(model(), &config(0.0));
    let mut params = strings_only();
    let mut notes = NoteEvents::default();
    let (held, later) = (VoiceId::new(0, 48), VoiceId::new(0, 60));

    notes.on.push(strike(48, 100));
    render(&mut piano, &mut notes, &params, 256);

    params.sostenuto = PedalState::TriggerOn;
    render(&mut piano, &mut notes, &params, 256);
    params.sostenuto = PedalState::NoChange;

    notes.on.push(strike(60, 100));
    render(&mut piano, &mut notes, &params, 256);

    notes.off.extend([held, later]);
    render(&mut piano, &mut notes, &params, 256);
    assert!(piano.is_on(held));
    assert!(piano.is_off(later));

    params.sostenuto = PedalState::TriggerOff;
    render(&mut piano, &mut notes, &params, 256);
    assert!(piano.is_off(held));
}

// ---------------------------------------------------------------------------
// 4. MIDI node
// ---------------------------------------------------------------------------

/// A MIDI phrase with pedals and volume renders sample-accurately.
#[test]
fn node_plays_midi_phrase() {
    let mut node = PianoNode::new(model(), config(1.0));
    let controls = PianoControls::default();
    let mut block = vec![0.0f32; 512];

    node.push(0, MidiMessage::ControlChange { channel: 0, controller: controller::VOLUME, value: 100 });
    node.push(64, MidiMessage::NoteOn { channel: 0, note: 60, velocity: 90 });
    node.push(64, MidiMessage::NoteOn { channel: 0, note: 64, velocity: 80 });
    node.process(&mut block, &controls);
    assert!(block[..64].iter().all(|&s| s == 0.0));
    assert_eq!(node.synth().num_on(), 2);

    node.push(0, MidiMessage::ControlChange { channel: 0, controller: controller::SOSTENUTO, value: 127 });
    node.push(10, MidiMessage::NoteOff { channel: 0, note: 60 });
    node.push(20, MidiMessage::NoteOn { channel: 0, note: 64, velocity: 0 });
    node.process(&mut block, &controls);
    assert!(node.synth().is_on(VoiceId::new(0, 60)));
    assert!(node.synth().is_on(VoiceId::new(0, 64)));

    node.push(0, MidiMessage::ControlChange { channel: 0, controller: controller::SOSTENUTO, value: 0 });
    node.process(&mut block, &controls);
    assert_eq!(node.synth().num_on(), 0);
    assert!(block.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
}

/// Channel volume scales the whole output.
#[test]
fn node_volume_scales_output() {
    let peak = |volume: u8| {
        let mut node = PianoNode::new(model(), config(0.0));
        let controls = PianoControls {
            hammer_gain: 0.0,
            soundboard_gain: 0.0,
            dynamic_adjust: 0.0,
            ..PianoControls::default()
        };
        node.push(0, MidiMessage::ControlChange { channel: 0, controller: controller::VOLUME, value: volume });
        node.push(0, MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 });
        let mut block = vec![0.0f32; 4800];
        node.process(&mut block, &controls);
        block.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    };

    let loud = peak(127);
    let quiet = peak(32);
    assert!(loud > 0.0);
    assert!(quiet < loud);
}
