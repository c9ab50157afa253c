//! Preset file format and operations.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use modalis_core::RANDOM_SEED;

use crate::error::ConfigError;
use crate::sections::{BurblePreset, EnginePreset, PianoPreset, TwoStatePreset};
use crate::validation::{ValidationError, ValidationResult};

/// The generators a preset can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeneratorKind {
    /// Stochastic bubble generator.
    Burble,
    /// Two-state cyclic force.
    Force,
    /// Vehicle engine harmonics.
    Engine,
    /// Modal piano.
    Piano,
}

impl GeneratorKind {
    /// Every generator, in section order.
    pub const ALL: [GeneratorKind; 4] = [
        GeneratorKind::Burble,
        GeneratorKind::Force,
        GeneratorKind::Engine,
        GeneratorKind::Piano,
    ];

    /// Section name in preset files.
    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::Burble => "burble",
            GeneratorKind::Force => "force",
            GeneratorKind::Engine => "engine",
            GeneratorKind::Piano => "piano",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeneratorKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        GeneratorKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or(ValidationError::UnknownGenerator(s))
    }
}

/// Preset file for one generator.
///
/// A preset carries shared metadata plus exactly one generator section.
/// Presets are stored as TOML files and can be loaded from files, created
/// programmatically, and saved to disk.
///
/// # TOML Format
///
/// ```toml
/// name = "Light Rain"
/// description = "Sparse small drops"
/// sample_rate = 48000
/// seed = 7
///
/// [burble]
/// spawn_rate = 800.0
/// radius_min_mm = 0.3
/// radius_max_mm = 3.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Render sample rate (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// RNG seed; absent for a fresh random stream on every render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i32>,

    /// Burble generator section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burble: Option<BurblePreset>,

    /// Two-state force section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<TwoStatePreset>,

    /// Vehicle engine section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EnginePreset>,

    /// Piano section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piano: Option<PianoPreset>,
}

fn default_sample_rate() -> u32 {
    48000
}

impl Preset {
    /// Create a new preset without a generator section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: 48000,
            seed: None,
            burble: None,
            force: None,
            engine: None,
            piano: None,
        }
    }

    /// Create a preset with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Fix the RNG seed.
    pub fn with_seed(mut self, seed: i32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the burble section.
    pub fn with_burble(mut self, burble: BurblePreset) -> Self {
        self.burble = Some(burble);
        self
    }

    /// Set the two-state force section.
    pub fn with_force(mut self, force: TwoStatePreset) -> Self {
        self.force = Some(force);
        self
    }

    /// Set the engine section.
    pub fn with_engine(mut self, engine: EnginePreset) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the piano section.
    pub fn with_piano(mut self, piano: PianoPreset) -> Self {
        self.piano = Some(piano);
        self
    }

    /// Generator sections present, in section order.
    pub fn kinds(&self) -> Vec<GeneratorKind> {
        let present = [
            self.burble.is_some(),
            self.force.is_some(),
            self.engine.is_some(),
            self.piano.is_some(),
        ];
        GeneratorKind::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(kind, present)| present.then_some(kind))
            .collect()
    }

    /// The first generator section present.
    pub fn kind(&self) -> Option<GeneratorKind> {
        self.kinds().first().copied()
    }

    /// Seed for generators; [`RANDOM_SEED`] when none is set.
    pub fn seed_or_random(&self) -> i32 {
        self.seed.unwrap_or(RANDOM_SEED)
    }

    /// Numeric parameters of the active section.
    pub fn param_values(&self) -> Vec<(&'static str, f32)> {
        match self.kind() {
            Some(GeneratorKind::Burble) => self.burble.as_ref().map(BurblePreset::values),
            Some(GeneratorKind::Force) => self.force.as_ref().map(TwoStatePreset::values),
            Some(GeneratorKind::Engine) => self.engine.as_ref().map(EnginePreset::values),
            Some(GeneratorKind::Piano) => self.piano.as_ref().map(PianoPreset::values),
            None => None,
        }
        .unwrap_or_default()
    }

    /// Set a numeric parameter of the active section by name.
    pub fn set_param(&mut self, name: &str, value: f32) -> ValidationResult<()> {
        let Some(kind) = self.kind() else {
            return Err(ValidationError::NoGenerator(self.name.clone()));
        };
        let name = name.trim().to_lowercase().replace([' ', '-'], "_");
        let found = match kind {
            GeneratorKind::Burble => self.burble.as_mut().is_some_and(|s| s.set(&name, value)),
            GeneratorKind::Force => self.force.as_mut().is_some_and(|s| s.set(&name, value)),
            GeneratorKind::Engine => self.engine.as_mut().is_some_and(|s| s.set(&name, value)),
            GeneratorKind::Piano => self.piano.as_mut().is_some_and(|s| s.set(&name, value)),
        };
        if found {
            Ok(())
        } else {
            Err(ValidationError::UnknownParameter {
                generator: kind.to_string(),
                param: name,
            })
        }
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let preset: Preset = toml::from_str(&content)?;
        Ok(preset)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_new() {
        let preset = Preset::new("Test Preset");
        assert_eq!(preset.name, "Test Preset");
        assert!(preset.description.is_none());
        assert_eq!(preset.sample_rate, 48000);
        assert!(preset.kinds().is_empty());
        assert_eq!(preset.seed_or_random(), RANDOM_SEED);
    }

    #[test]
    fn test_preset_builder() {
        let preset = Preset::new("My Preset")
            .with_description("A test preset")
            .with_sample_rate(44100)
            .with_seed(9)
            .with_engine(EnginePreset::default());

        assert_eq!(preset.description, Some("A test preset".to_string()));
        assert_eq!(preset.sample_rate, 44100);
        assert_eq!(preset.seed_or_random(), 9);
        assert_eq!(preset.kind(), Some(GeneratorKind::Engine));
    }

    #[test]
    fn test_preset_from_toml() {
        let toml = r#"
name = "Test"
description = "A test preset"
sample_rate = 44100
seed = 3

[burble]
spawn_rate = 250.0
max_burbles = 128
"#;

        let preset = Preset::from_toml(toml).unwrap();
        assert_eq!(preset.name, "Test");
        assert_eq!(preset.sample_rate, 44100);
        assert_eq!(preset.seed, Some(3));
        assert_eq!(preset.kind(), Some(GeneratorKind::Burble));

        let burble = preset.burble.unwrap();
        assert_eq!(burble.spawn_rate, 250.0);
        assert_eq!(burble.max_burbles, 128);
        assert_eq!(burble.spawn_chance, BurblePreset::default().spawn_chance);
    }

    #[test]
    fn test_preset_to_toml() {
        let preset = Preset::new("Test")
            .with_description("Test description")
            .with_force(TwoStatePreset::default());

        let toml = preset.to_toml().unwrap();
        assert!(toml.contains("name = \"Test\""));
        assert!(toml.contains("[force]"));
        assert!(toml.contains("duty_cycle = 0.5"));
        assert!(!toml.contains("[burble]"));
    }

    #[test]
    fn test_preset_roundtrip() {
        let original = Preset::new("Roundtrip Test")
            .with_sample_rate(96000)
            .with_seed(-4)
            .with_piano(PianoPreset {
                velocity_scale: 0.8,
                ..PianoPreset::default()
            });

        let parsed = Preset::from_toml(&original.to_toml().unwrap()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_set_param() {
        let mut preset = Preset::new("e").with_engine(EnginePreset::default());
        preset.set_param("RPM", 4200.0).unwrap();
        preset.set_param("cutoff-freq", 3000.0).unwrap();
        assert_eq!(preset.engine.as_ref().unwrap().rpm, 4200.0);
        assert_eq!(preset.engine.as_ref().unwrap().cutoff_freq, 3000.0);
        assert!(matches!(
            preset.set_param("spawn_rate", 1.0),
            Err(ValidationError::UnknownParameter { .. })
        ));
        assert!(Preset::new("none").set_param("rpm", 1.0).is_err());
    }

    #[test]
    fn test_generator_kind_parse() {
        assert_eq!("Piano".parse::<GeneratorKind>().unwrap(), GeneratorKind::Piano);
        assert!("organ".parse::<GeneratorKind>().is_err());
        assert_eq!(GeneratorKind::Force.to_string(), "force");
    }

    #[test]
    fn test_minimal_toml() {
        let preset = Preset::from_toml("name = \"Minimal\"\n[engine]\n").unwrap();
        assert_eq!(preset.name, "Minimal");
        assert_eq!(preset.sample_rate, 48000);
        assert_eq!(preset.engine, Some(EnginePreset::default()));
    }
}
