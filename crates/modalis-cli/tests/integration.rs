//! Integration tests for modalis-cli.
//!
//! Tests run the `modalis` binary and check the WAV files it writes.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Helper to get the path to the `modalis` binary built by cargo.
fn modalis_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_modalis"))
}

fn run(args: &[&str]) -> Output {
    modalis_bin()
        .args(args)
        .output()
        .expect("failed to run modalis")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "modalis failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Samples and spec of a WAV file.
fn read_wav(path: &Path) -> (Vec<f32>, hound::WavSpec) {
    let mut reader = hound::WavReader::open(path).expect("output should be a WAV file");
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(Result::unwrap).collect(),
        hound::SampleFormat::Int => {
            let scale = (1i32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.unwrap() as f32 / scale)
                .collect()
        }
    };
    (samples, spec)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

// ---------------------------------------------------------------------------
// `modalis --help`
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = run(&["--help"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Modalis modal synthesis CLI"));
    assert!(stdout.contains("render"));
    assert!(stdout.contains("presets"));
    assert!(stdout.contains("model"));
}

#[test]
fn cli_version_works() {
    let output = run(&["--version"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("modalis"));
}

#[test]
fn cli_render_help_lists_generators() {
    let output = run(&["render", "--help"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    for generator in ["burble", "force", "engine", "piano"] {
        assert!(stdout.contains(generator), "render help should list '{generator}'");
    }
}

// ---------------------------------------------------------------------------
// `modalis presets`
// ---------------------------------------------------------------------------

#[test]
fn cli_presets_list_factory() {
    let output = run(&["presets", "list", "--factory"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["Rain", "Brook", "Pulse", "Idle", "Grand"] {
        assert!(stdout.contains(name), "factory list should contain '{name}'");
    }
}

#[test]
fn cli_presets_list_by_generator() {
    let output = run(&["presets", "list", "--factory", "--generator", "engine"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Idle"));
    assert!(stdout.contains("Rev"));
    assert!(!stdout.contains("Rain"));
}

#[test]
fn cli_presets_show_parameters() {
    let output = run(&["presets", "show", "idle"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generator:   engine"));
    assert!(stdout.contains("rpm"));
    assert!(stdout.contains("pulses_per_cycle"));
    assert!(stdout.contains("Harmonics: 16"));
}

#[test]
fn cli_presets_show_toml() {
    let output = run(&["presets", "show", "pulse", "--toml"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[force]"));
    assert!(stdout.contains("duty_cycle"));
}

#[test]
fn cli_presets_show_unknown_fails() {
    let output = run(&["presets", "show", "nonexistent_preset_xyz"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

// ---------------------------------------------------------------------------
// `modalis render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_burble_factory_preset() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("rain.wav");
    let output = run(&[
        "render", "burble", out.to_str().unwrap(),
        "--preset", "rain", "--duration", "0.5", "--seed", "3",
    ]);
    assert_success(&output);

    let (samples, spec) = read_wav(&out);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(samples.len(), 24000);
    assert!(peak(&samples) > 0.0);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Wrote 24000 samples"));
}

#[test]
fn cli_render_is_deterministic_with_seed() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.wav");
    let b = dir.path().join("b.wav");
    for path in [&a, &b] {
        let output = run(&[
            "render", "burble", path.to_str().unwrap(),
            "--preset", "brook", "--duration", "0.25", "--seed", "42",
        ]);
        assert_success(&output);
    }
    assert_eq!(read_wav(&a).0, read_wav(&b).0);
}

#[test]
fn cli_render_override_silences_burbles() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("silent.wav");
    let output = run(&[
        "render", "burble", out.to_str().unwrap(),
        "--duration", "0.2", "--seed", "1", "--set", "spawn_rate=0",
    ]);
    assert_success(&output);
    assert_eq!(peak(&read_wav(&out).0), 0.0);
}

#[test]
fn cli_render_force_16_bit() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("pulse.wav");
    let output = run(&[
        "render", "force", out.to_str().unwrap(),
        "--preset", "pulse", "--duration", "0.5", "--sample-rate", "44100",
        "--bits", "16", "--seed", "8",
    ]);
    assert_success(&output);

    let (samples, spec) = read_wav(&out);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(samples.len(), 22050);
    assert!(peak(&samples) > 0.1);
}

#[test]
fn cli_render_engine_with_ramp() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("rev.wav");
    let output = run(&[
        "render", "engine", out.to_str().unwrap(),
        "--preset", "idle", "--duration", "1.0", "--seed", "5",
        "--rpm-end", "3000", "--throttle-end", "1",
    ]);
    assert_success(&output);

    let (samples, _) = read_wav(&out);
    assert!(samples.iter().all(|s| s.is_finite()));
    assert!(peak(&samples) > 0.0);
}

#[test]
fn cli_render_piano_chord() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("chord.wav");
    let output = run(&[
        "render", "piano", out.to_str().unwrap(),
        "--duration", "1.0", "--seed", "2",
        "--notes", "C4,E4,G4", "--hold", "0.5", "--velocity", "90",
    ]);
    assert_success(&output);

    let (samples, _) = read_wav(&out);
    assert_eq!(samples.len(), 48000);
    assert!(peak(&samples) > 0.0);
}

#[test]
fn cli_render_piano_with_exported_model() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("small.json");
    assert_success(&run(&[
        "model", "export", model.to_str().unwrap(),
        "--start-note", "48", "--num-keys", "25",
    ]));

    let out = dir.path().join("small.wav");
    let output = run(&[
        "render", "piano", out.to_str().unwrap(),
        "--model", model.to_str().unwrap(),
        "--duration", "0.5", "--seed", "4", "--notes", "60",
    ]);
    assert_success(&output);
    assert!(peak(&read_wav(&out).0) > 0.0);
}

#[test]
fn cli_render_preset_from_file() {
    let dir = TempDir::new().unwrap();
    let preset = dir.path().join("drip.toml");
    std::fs::write(
        &preset,
        "name = \"Drip\"\nsample_rate = 22050\nseed = 11\n\n[burble]\nspawn_rate = 300.0\nradius_min_mm = 1.0\nradius_max_mm = 4.0\n",
    )
    .unwrap();

    let out = dir.path().join("drip.wav");
    let output = run(&[
        "render", "burble", out.to_str().unwrap(),
        "--preset", preset.to_str().unwrap(), "--duration", "1.0",
    ]);
    assert_success(&output);

    let (samples, spec) = read_wav(&out);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(samples.len(), 22050);
}

#[test]
fn cli_render_wrong_generator_fails() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("x.wav");
    let output = run(&["render", "engine", out.to_str().unwrap(), "--preset", "rain"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("burble preset"));
    assert!(!out.exists());
}

#[test]
fn cli_render_unknown_parameter_fails() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("x.wav");
    let output = run(&[
        "render", "burble", out.to_str().unwrap(), "--set", "rpm=900",
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("rpm"));
    assert!(!out.exists());
}

#[test]
fn cli_render_out_of_range_fails() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("x.wav");
    let output = run(&[
        "render", "force", out.to_str().unwrap(), "--set", "duty_cycle=150%",
    ]);
    assert!(!output.status.success());
    assert!(!out.exists());
}

// ---------------------------------------------------------------------------
// `modalis info` and `modalis model`
// ---------------------------------------------------------------------------

#[test]
fn cli_info_reports_rendered_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tone.wav");
    assert_success(&run(&[
        "render", "force", out.to_str().unwrap(), "--duration", "0.25", "--seed", "1",
    ]));

    let output = run(&["info", out.to_str().unwrap()]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("IEEE Float 32-bit"));
    assert!(stdout.contains("Sample Rate: 48000 Hz"));
    assert!(stdout.contains("12000 frames"));
}

#[test]
fn cli_model_show_exported_file() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("grand.toml");
    assert_success(&run(&["model", "export", model.to_str().unwrap()]));

    let output = run(&["model", "show", model.to_str().unwrap()]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("88 (notes 21-108)"));
}
