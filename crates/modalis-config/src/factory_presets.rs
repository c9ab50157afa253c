//! Factory presets bundled with the modalis library.
//!
//! This module provides built-in presets that are always available without
//! requiring external files, one or more per generator, plus the factory
//! piano model used when a piano preset names no model file.

use std::sync::Arc;

use modalis_core::Curve;
use modalis_piano::PianoModel;

use crate::Preset;

/// Array of factory preset names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "rain",
    "brook",
    "boiling",
    "pulse",
    "rattle",
    "idle",
    "rev",
    "grand",
    "soft_grand",
];

/// TOML content for factory presets.
///
/// These are embedded at compile time and always available.
static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("rain", RAIN_PRESET),
    ("brook", BROOK_PRESET),
    ("boiling", BOILING_PRESET),
    ("pulse", PULSE_PRESET),
    ("rattle", RATTLE_PRESET),
    ("idle", IDLE_PRESET),
    ("rev", REV_PRESET),
    ("grand", GRAND_PRESET),
    ("soft_grand", SOFT_GRAND_PRESET),
];

/// Rain on a hard surface - dense tiny drops.
const RAIN_PRESET: &str = r#"
name = "Rain"
description = "Dense tiny drops on a hard surface"
sample_rate = 48000

[burble]
spawn_rate = 6000.0
spawn_chance = 0.6
radius_dist = 1.4
radius_min_mm = 0.15
radius_max_mm = 2.0
gain = 6.0
gain_max = 0.15
decay_to_chirp_ratio = 0.05
"#;

/// Brook - medium bubbles with a rising chirp.
const BROOK_PRESET: &str = r#"
name = "Brook"
description = "Running water with medium bubbles"
sample_rate = 48000

[burble]
spawn_rate = 1500.0
spawn_chance = 0.8
radius_dist = 1.0
radius_min_mm = 0.5
radius_max_mm = 8.0
amp_dist = 0.8
gain = 10.0
gain_max = 0.2
decay_to_chirp_ratio = 0.1
max_burbles = 256
"#;

/// Boiling pot - sparse large bubbles.
const BOILING_PRESET: &str = r#"
name = "Boiling"
description = "Sparse large bubbles in a pot"
sample_rate = 48000

[burble]
spawn_rate = 120.0
spawn_chance = 0.9
radius_dist = 0.6
radius_min_mm = 3.0
radius_max_mm = 25.0
pitch_shift = -3.0
gain = 14.0
gain_max = 0.3
decay_to_chirp_ratio = 0.2
decay_scale = 2.0
"#;

/// Pulse - smooth periodic push and release.
const PULSE_PRESET: &str = r#"
name = "Pulse"
description = "Smooth periodic push and release"
sample_rate = 48000

[force]
amp = 0.8
freq = 8.0
duty_cycle = 0.4

[force.first.curve]
kind = "keys"
keys = [[0.0, 0.0], [0.5, 1.0], [1.0, 0.0]]

[force.second.curve]
kind = "keys"
keys = [[0.0, 0.0], [0.5, -0.3], [1.0, 0.0]]
"#;

/// Rattle - noisy contact against a loose panel.
const RATTLE_PRESET: &str = r#"
name = "Rattle"
description = "Noisy contact bursts against a loose panel"
sample_rate = 48000

[force]
amp = 0.6
freq = 23.0
duty_cycle = 0.2

[force.first]
freq_scale = 3.0
noise = "multiply"
noise_amp = 0.8

[force.first.curve]
kind = "keys"
keys = [[0.0, 0.0], [0.1, 1.0], [1.0, 0.0]]

[force.second]
noise = "add"
noise_amp = 0.05
"#;

/// Idling four-cylinder engine.
const IDLE_PRESET: &str = r#"
name = "Idle"
description = "Four-cylinder engine at idle"
sample_rate = 48000

[engine]
pulses_per_cycle = 4
rpm = 850.0
throttle_input = 0.0
rpm_noise_factor = 0.05
amp_rand_min = 0.2
amp_rand_max = 0.4
harmonic_fluctuation = 0.02
cutoff_freq = 2000.0
falloff_db = -18.0
num_harmonics_deceleration = 6
"#;

/// Revving engine under throttle.
const REV_PRESET: &str = r#"
name = "Rev"
description = "Engine under throttle at high RPM"
sample_rate = 48000

[engine]
pulses_per_cycle = 4
rpm = 4500.0
throttle_input = 1.0
rpm_noise_factor = 0.2
rand_period = 0.03
harmonic_fluctuation = 0.05
cutoff_freq = 6000.0
falloff_db = -24.0
"#;

/// Grand piano - full procedural keyboard.
const GRAND_PRESET: &str = r#"
name = "Grand"
description = "Procedural 88-key grand piano"
sample_rate = 48000

[piano]
start_note = 21
num_keys = 88
"#;

/// Soft grand - dark and quiet, no hammer noise.
const SOFT_GRAND_PRESET: &str = r#"
name = "Soft Grand"
description = "Quiet procedural grand without hammer noise"
sample_rate = 48000

[piano]
velocity_scale = 0.7
hammer_gain = 0.0
soundboard_gain = 1.5
sym_reson_gain = 2.0
dynamic_adjust = 1.5
"#;

/// Get all factory presets.
///
/// Returns a vector of all built-in presets that ship with the library.
///
/// # Example
///
/// ```rust
/// use modalis_config::factory_presets;
///
/// let presets = factory_presets();
/// println!("Available factory presets:");
/// for preset in &presets {
///     println!("  - {}: {}", preset.name, preset.description.as_deref().unwrap_or(""));
/// }
/// ```
pub fn factory_presets() -> Vec<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| Preset::from_toml(toml).ok())
        .collect()
}

/// Get a factory preset by name.
///
/// Matches the internal identifier or the display name, case-insensitively.
///
/// # Example
///
/// ```rust
/// use modalis_config::get_factory_preset;
///
/// if let Some(preset) = get_factory_preset("rain") {
///     println!("Found preset: {}", preset.name);
/// }
/// ```
pub fn get_factory_preset(name: &str) -> Option<Preset> {
    let name_lower = name.to_lowercase();

    if let Some((_, toml)) = FACTORY_PRESETS_TOML
        .iter()
        .find(|(id, _)| id.to_lowercase() == name_lower)
    {
        return Preset::from_toml(toml).ok();
    }

    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| Preset::from_toml(toml).ok())
        .find(|preset| preset.name.to_lowercase() == name_lower)
}

/// Get the names of all factory presets.
///
/// # Example
///
/// ```rust
/// use modalis_config::factory_presets::factory_preset_names;
///
/// let names = factory_preset_names();
/// assert!(names.contains(&"rain"));
/// ```
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_TOML.iter().map(|(name, _)| *name).collect()
}

/// Check if a preset name is a factory preset.
///
/// ```rust
/// use modalis_config::is_factory_preset;
///
/// assert!(is_factory_preset("grand"));
/// assert!(is_factory_preset("Soft Grand"));
/// assert!(!is_factory_preset("my_custom_preset"));
/// ```
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}

/// The factory piano: the procedural model with a softened velocity response
/// and a slight treble roll-off.
pub fn factory_piano_model(start_note: u8, num_keys: usize) -> PianoModel {
    let mut model = PianoModel::procedural(start_note, num_keys);
    let first = f32::from(model.start_note);
    let last = f32::from(model.end_note());

    model.velocity_remap = Some(Arc::new(Curve::from_keys(
        &[(0.0, 0.0), (64.0, 58.0), (127.0, 127.0)],
        128,
        0.0,
    )));
    model.note_gain = Some(Arc::new(Curve::from_keys(
        &[(first, 1.0), (last, 0.8)],
        model.num_keys().max(2),
        1.0,
    )));
    model
}
