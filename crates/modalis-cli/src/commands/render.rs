//! Offline rendering of every generator to WAV.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use modalis_config::sections::{BurblePreset, EnginePreset, PianoPreset, TwoStatePreset};
use modalis_config::{GeneratorKind, Preset, find_model};
use modalis_core::RANDOM_SEED;
use modalis_piano::{MidiMessage, PianoNode, controller};
use modalis_synth::{BurbleGenerator, TwoStateForceGen, VehicleEngineSynth};
use tracing::{debug, info};

use super::common::{
    LoadedPreset, apply_overrides, load_preset, parse_key_val, peak, to_db, write_wav,
};

#[derive(Args)]
pub struct RenderArgs {
    #[command(subcommand)]
    generator: RenderCommand,
}

/// Options shared by every generator.
#[derive(Args, Debug, Clone)]
pub struct RenderOptions {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Preset name or path (defaults to the generator's built-in settings)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Duration in seconds
    #[arg(short, long, default_value = "5.0")]
    pub duration: f32,

    /// Sample rate (defaults to the preset's)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Random seed (defaults to the preset's, else random)
    #[arg(long, allow_hyphen_values = true)]
    pub seed: Option<i32>,

    /// Override a parameter, e.g. `--set spawn_rate=2kHz` (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_key_val)]
    pub overrides: Vec<(String, String)>,

    /// Frames per render call
    #[arg(long, default_value = "512")]
    pub block_size: usize,

    /// Output bit depth (16, 24 or 32-bit float)
    #[arg(long, default_value = "32")]
    pub bits: u16,

    /// Output gain in dB
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub gain_db: f32,
}

#[derive(Subcommand)]
enum RenderCommand {
    /// Render bubbles, rain and other burble textures
    Burble {
        #[command(flatten)]
        opts: RenderOptions,
    },

    /// Render a two-state cyclic force
    Force {
        #[command(flatten)]
        opts: RenderOptions,
    },

    /// Render a vehicle engine
    Engine {
        #[command(flatten)]
        opts: RenderOptions,

        /// RPM reached at the end of the render (linear ramp)
        #[arg(long)]
        rpm_end: Option<f32>,

        /// Throttle reached at the end of the render (linear ramp)
        #[arg(long, allow_hyphen_values = true)]
        throttle_end: Option<f32>,
    },

    /// Render piano notes
    Piano {
        #[command(flatten)]
        opts: RenderOptions,

        /// Notes as MIDI numbers or names (e.g., "60,64,67" or "C4,E4,G4")
        #[arg(long, default_value = "60")]
        notes: String,

        /// Note-on velocity (1-127)
        #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(1..=127))]
        velocity: u8,

        /// How long each note is held, in seconds
        #[arg(long, default_value = "1.0")]
        hold: f32,

        /// Delay between successive note starts, in seconds (0 plays a chord)
        #[arg(long, default_value = "0.0")]
        spacing: f32,

        /// Hold the sustain pedal down for the whole render
        #[arg(long)]
        sustain: bool,

        /// Piano model file or name in the user models directory
        #[arg(long)]
        model: Option<String>,
    },
}

/// Engine parameter ramp over the render.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineRamp {
    /// Final RPM.
    pub rpm_end: Option<f32>,
    /// Final throttle.
    pub throttle_end: Option<f32>,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    match args.generator {
        RenderCommand::Burble { opts } => {
            let job = RenderJob::prepare(GeneratorKind::Burble, &opts)?;
            let section = job.section(|p| p.burble.as_ref())?;
            let out = render_burble(
                section,
                job.sample_rate as f32,
                job.seed,
                job.frames,
                opts.block_size,
                &job.progress,
            )?;
            job.finish(&opts, out)
        }
        RenderCommand::Force { opts } => {
            let job = RenderJob::prepare(GeneratorKind::Force, &opts)?;
            let section = job.section(|p| p.force.as_ref())?;
            let out = render_force(
                section,
                job.sample_rate as f32,
                job.seed,
                job.frames,
                opts.block_size,
                &job.progress,
            )?;
            job.finish(&opts, out)
        }
        RenderCommand::Engine {
            opts,
            rpm_end,
            throttle_end,
        } => {
            let job = RenderJob::prepare(GeneratorKind::Engine, &opts)?;
            let section = job.section(|p| p.engine.as_ref())?;
            let ramp = EngineRamp {
                rpm_end,
                throttle_end,
            };
            let out = render_engine(
                section,
                ramp,
                job.sample_rate as f32,
                job.seed,
                job.frames,
                opts.block_size,
                &job.progress,
            );
            job.finish(&opts, out)
        }
        RenderCommand::Piano {
            opts,
            notes,
            velocity,
            hold,
            spacing,
            sustain,
            model,
        } => {
            let mut job = RenderJob::prepare(GeneratorKind::Piano, &opts)?;
            if let Some(name) = model {
                let path = find_model(&name)
                    .ok_or_else(|| anyhow::anyhow!("Piano model '{}' not found.", name))?;
                let path = std::fs::canonicalize(&path)
                    .with_context(|| format!("resolving {}", path.display()))?;
                if let Some(section) = job.loaded.preset.piano.as_mut() {
                    section.model = Some(path);
                }
            }

            let notes = parse_notes(&notes)?;
            let phrase = Phrase {
                notes,
                velocity,
                hold,
                spacing,
                sustain,
            };
            let events = phrase.events(job.sample_rate as f32);
            let section = job.section(|p| p.piano.as_ref())?;
            let out = render_piano(
                section,
                job.loaded.base_dir(),
                &events,
                job.sample_rate as f32,
                job.seed,
                job.frames,
                opts.block_size,
                &job.progress,
            )?;
            job.finish(&opts, out)
        }
    }
}

/// A loaded, overridden and validated preset ready to render.
struct RenderJob {
    loaded: LoadedPreset,
    sample_rate: u32,
    seed: i32,
    frames: usize,
    progress: ProgressBar,
}

impl RenderJob {
    fn prepare(kind: GeneratorKind, opts: &RenderOptions) -> anyhow::Result<Self> {
        if opts.block_size == 0 {
            anyhow::bail!("--block-size must be at least 1");
        }
        if !(opts.duration.is_finite() && opts.duration > 0.0) {
            anyhow::bail!("--duration must be positive");
        }

        let mut loaded = match &opts.preset {
            Some(name) => load_preset(name)?,
            None => LoadedPreset {
                preset: default_preset(kind),
                path: None,
            },
        };
        if loaded.preset.kind() != Some(kind) {
            let found = loaded
                .preset
                .kind()
                .map_or_else(|| "empty".to_string(), |k| k.to_string());
            anyhow::bail!(
                "Preset '{}' is a {} preset, not {}.",
                loaded.preset.name,
                found,
                kind
            );
        }

        if let Some(sample_rate) = opts.sample_rate {
            loaded.preset.sample_rate = sample_rate;
        }
        apply_overrides(&mut loaded.preset, &opts.overrides)?;

        let sample_rate = loaded.preset.sample_rate;
        let seed = opts.seed.unwrap_or_else(|| loaded.preset.seed_or_random());
        let frames = (opts.duration * sample_rate as f32).round() as usize;

        info!(
            preset = %loaded.preset.name,
            generator = %kind,
            sample_rate,
            frames,
            "rendering"
        );
        if seed == RANDOM_SEED {
            debug!("unseeded render");
        } else {
            debug!(seed, "seeded render");
        }

        Ok(Self {
            loaded,
            sample_rate,
            seed,
            frames,
            progress: progress_bar(frames as u64)?,
        })
    }

    fn section<T>(&self, get: impl FnOnce(&Preset) -> Option<&T>) -> anyhow::Result<&T> {
        get(&self.loaded.preset)
            .ok_or_else(|| {
                anyhow::anyhow!("Preset '{}' has no such section", self.loaded.preset.name)
            })
    }

    fn finish(self, opts: &RenderOptions, mut out: Vec<f32>) -> anyhow::Result<()> {
        self.progress.finish_and_clear();

        if opts.gain_db != 0.0 {
            let gain = 10.0f32.powf(opts.gain_db / 20.0);
            out.iter_mut().for_each(|s| *s *= gain);
        }

        write_wav(&opts.output, &out, self.sample_rate, opts.bits)?;
        println!(
            "Wrote {} samples ({:.2}s) to {}",
            out.len(),
            out.len() as f32 / self.sample_rate as f32,
            opts.output.display()
        );
        println!("  Peak: {:.1} dBFS", to_db(peak(&out)));
        Ok(())
    }
}

fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// The built-in preset used when no `--preset` is given.
pub fn default_preset(kind: GeneratorKind) -> Preset {
    let preset = Preset::new(kind.name());
    match kind {
        GeneratorKind::Burble => preset.with_burble(BurblePreset::default()),
        GeneratorKind::Force => preset.with_force(TwoStatePreset::default()),
        GeneratorKind::Engine => preset.with_engine(EnginePreset::default()),
        GeneratorKind::Piano => preset.with_piano(PianoPreset::default()),
    }
}

/// Run `render` over consecutive blocks of a zeroed buffer.
///
/// `render` gets the block's first frame and the block itself.
fn render_blocks(
    frames: usize,
    block_size: usize,
    progress: &ProgressBar,
    mut render: impl FnMut(usize, &mut [f32]),
) -> Vec<f32> {
    let block_size = block_size.max(1);
    let mut out = vec![0.0f32; frames];
    for (i, block) in out.chunks_mut(block_size).enumerate() {
        render(i * block_size, block);
        progress.inc(block.len() as u64);
    }
    out
}

/// Render a burble texture.
pub fn render_burble(
    section: &BurblePreset,
    sample_rate: f32,
    seed: i32,
    frames: usize,
    block_size: usize,
    progress: &ProgressBar,
) -> anyhow::Result<Vec<f32>> {
    let mut generator = BurbleGenerator::new(sample_rate, seed, section.max_burbles);
    generator.set_freq_gain_curve(section.freq_gain_curve()?);
    let params = section.params();

    let out = render_blocks(frames, block_size, progress, |_, block| {
        generator.generate(block, &params);
    });
    debug!(active = generator.num_burbles(), "burble render done");
    Ok(out)
}

/// Render a two-state force.
pub fn render_force(
    section: &TwoStatePreset,
    sample_rate: f32,
    seed: i32,
    frames: usize,
    block_size: usize,
    progress: &ProgressBar,
) -> anyhow::Result<Vec<f32>> {
    let params = section.params()?;
    let mut generator = TwoStateForceGen::new(sample_rate, block_size, seed);
    Ok(render_blocks(frames, block_size, progress, |_, block| {
        generator.generate(block, &params);
    }))
}

/// Render an engine, ramping RPM and throttle linearly per block.
pub fn render_engine(
    section: &EnginePreset,
    ramp: EngineRamp,
    sample_rate: f32,
    seed: i32,
    frames: usize,
    block_size: usize,
    progress: &ProgressBar,
) -> Vec<f32> {
    let start = section.params();
    let mut engine = VehicleEngineSynth::new(sample_rate, &section.setup(), &start, seed);
    let mut params = start;
    let span = frames.max(1) as f32;

    render_blocks(frames, block_size, progress, |first, block| {
        let t = first as f32 / span;
        if let Some(end) = ramp.rpm_end {
            params.rpm = start.rpm + (end - start.rpm) * t;
        }
        if let Some(end) = ramp.throttle_end {
            params.throttle_input =
                (start.throttle_input + (end - start.throttle_input) * t).clamp(-1.0, 1.0);
        }
        engine.generate(block, &params);
    })
}

/// Render a piano playing `events`, given as absolute frames.
#[allow(clippy::too_many_arguments)]
pub fn render_piano(
    section: &PianoPreset,
    base_dir: Option<&Path>,
    events: &[(usize, MidiMessage)],
    sample_rate: f32,
    seed: i32,
    frames: usize,
    block_size: usize,
    progress: &ProgressBar,
) -> anyhow::Result<Vec<f32>> {
    let model = section
        .load_model(base_dir)
        .context("loading piano model")?;
    info!(
        start_note = model.start_note,
        keys = model.num_keys(),
        "piano model ready"
    );

    let mut node = PianoNode::new(Arc::new(model), section.config(sample_rate, seed));
    node.set_max_note_duration(section.max_note_duration());
    let controls = section.controls();

    let mut pending = events.iter().peekable();
    Ok(render_blocks(frames, block_size, progress, |first, block| {
        let end = first + block.len();
        while let Some(&&(frame, message)) = pending.peek() {
            if frame >= end {
                break;
            }
            node.push(frame.saturating_sub(first), message);
            pending.next();
        }
        node.process(block, &controls);
    }))
}

/// A simple note phrase: each note struck in turn and held for `hold` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Phrase {
    /// MIDI notes in playing order.
    pub notes: Vec<u8>,
    /// Velocity for every note.
    pub velocity: u8,
    /// Hold time per note in seconds.
    pub hold: f32,
    /// Onset spacing in seconds.
    pub spacing: f32,
    /// Sustain pedal down from the start.
    pub sustain: bool,
}

impl Phrase {
    /// MIDI events at absolute frames, sorted by frame.
    pub fn events(&self, sample_rate: f32) -> Vec<(usize, MidiMessage)> {
        let to_frames = |seconds: f32| (seconds.max(0.0) * sample_rate).round() as usize;
        let mut events = Vec::with_capacity(self.notes.len() * 2 + 1);

        if self.sustain {
            events.push((
                0,
                MidiMessage::ControlChange {
                    channel: 0,
                    controller: controller::HOLD,
                    value: 127,
                },
            ));
        }
        for (i, &note) in self.notes.iter().enumerate() {
            let on = to_frames(self.spacing * i as f32);
            events.push((
                on,
                MidiMessage::NoteOn {
                    channel: 0,
                    note,
                    velocity: self.velocity,
                },
            ));
            events.push((
                on + to_frames(self.hold).max(1),
                MidiMessage::NoteOff { channel: 0, note },
            ));
        }
        events.sort_by_key(|&(frame, _)| frame);
        events
    }
}

/// Parse a comma-separated list of MIDI notes or note names.
pub fn parse_notes(s: &str) -> anyhow::Result<Vec<u8>> {
    let notes = s
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(parse_note)
        .collect::<anyhow::Result<Vec<_>>>()?;
    if notes.is_empty() {
        anyhow::bail!("No notes provided. Use format: --notes \"60,64,67\" or \"C4,E4,G4\"");
    }
    Ok(notes)
}

/// Parse a MIDI number or a name like `C4`, `F#3` or `Bb2` (C4 = 60).
fn parse_note(s: &str) -> anyhow::Result<u8> {
    if let Ok(n) = s.parse::<u8>() {
        if n < 128 {
            return Ok(n);
        }
        anyhow::bail!("MIDI note {n} out of range (0-127)");
    }

    let mut chars = s.chars();
    let pitch = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => anyhow::bail!("Invalid note '{}'", s),
    };
    let rest = chars.as_str();
    let (accidental, octave) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid octave in note '{}'", s))?;

    let midi = (octave + 1) * 12 + pitch + accidental;
    u8::try_from(midi)
        .ok()
        .filter(|&n| n < 128)
        .ok_or_else(|| anyhow::anyhow!("Note '{}' out of MIDI range", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modalis_config::get_factory_preset;

    const SR: f32 = 48000.0;

    #[test]
    fn test_parse_notes() {
        assert_eq!(parse_notes("60, 64,67").unwrap(), vec![60, 64, 67]);
        assert_eq!(parse_notes("C4,E4,G4").unwrap(), vec![60, 64, 67]);
        assert_eq!(parse_notes("A0,c8").unwrap(), vec![21, 108]);
        assert_eq!(parse_notes("F#3,Bb2").unwrap(), vec![54, 46]);
        assert_eq!(parse_notes("C-1").unwrap(), vec![0]);
        assert!(parse_notes("").is_err());
        assert!(parse_notes("H4").is_err());
        assert!(parse_notes("200").is_err());
        assert!(parse_notes("G9").is_err());
    }

    #[test]
    fn test_phrase_events_are_sorted() {
        let phrase = Phrase {
            notes: vec![60, 64],
            velocity: 90,
            hold: 0.5,
            spacing: 0.25,
            sustain: true,
        };
        let events = phrase.events(SR);
        assert_eq!(events.len(), 5);
        assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(matches!(
            events[0].1,
            MidiMessage::ControlChange {
                controller: controller::HOLD,
                value: 127,
                ..
            }
        ));
        assert_eq!(
            events[2],
            (12000, MidiMessage::NoteOn { channel: 0, note: 64, velocity: 90 })
        );
        assert_eq!(events[4], (36000, MidiMessage::NoteOff { channel: 0, note: 64 }));
    }

    #[test]
    fn test_zero_hold_still_releases_after_strike() {
        let phrase = Phrase {
            notes: vec![60],
            velocity: 64,
            hold: 0.0,
            spacing: 0.0,
            sustain: false,
        };
        let events = phrase.events(SR);
        assert_eq!(events[0].0, 0);
        assert_eq!(events[1].0, 1);
    }

    #[test]
    fn test_default_presets_match_kind() {
        for kind in GeneratorKind::ALL {
            assert_eq!(default_preset(kind).kind(), Some(kind));
        }
    }

    #[test]
    fn test_render_burble_silent_without_spawns() {
        let section = BurblePreset {
            spawn_rate: 0.0,
            ..BurblePreset::default()
        };
        let out = render_burble(&section, SR, 1, 4800, 256, &ProgressBar::hidden()).unwrap();
        assert_eq!(out.len(), 4800);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_force_from_factory() {
        let preset = get_factory_preset("pulse").unwrap();
        let out = render_force(
            preset.force.as_ref().unwrap(),
            SR,
            3,
            9600,
            500,
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert!(peak(&out) > 0.1);
    }

    #[test]
    fn test_render_engine_ramp_changes_output() {
        let section = get_factory_preset("idle").unwrap().engine.unwrap();
        let hidden = ProgressBar::hidden();
        let still = render_engine(&section, EngineRamp::default(), SR, 9, 24000, 512, &hidden);
        let ramp = EngineRamp {
            rpm_end: Some(4000.0),
            throttle_end: Some(1.0),
        };
        let revved = render_engine(&section, ramp, SR, 9, 24000, 512, &hidden);
        assert!(still.iter().chain(&revved).all(|s| s.is_finite()));
        assert!(peak(&still) > 0.0);
        assert_ne!(still, revved);
    }

    #[test]
    fn test_render_piano_events_across_blocks() {
        let section = PianoPreset {
            start_note: 48,
            num_keys: 25,
            ..PianoPreset::default()
        };
        let phrase = Phrase {
            notes: vec![60],
            velocity: 100,
            hold: 0.05,
            spacing: 0.0,
            sustain: false,
        };
        // Note-on lands mid-way through the third block.
        let events: Vec<_> = phrase
            .events(SR)
            .into_iter()
            .map(|(frame, msg)| (frame + 1300, msg))
            .collect();
        let hidden = ProgressBar::hidden();
        let out = render_piano(&section, None, &events, SR, 5, 9600, 512, &hidden).unwrap();

        assert!(out[..1300].iter().all(|&s| s == 0.0));
        assert!(peak(&out[1300..]) > 0.0);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
