//! Shared CLI helpers used across multiple commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use hound::{SampleFormat, WavSpec, WavWriter};
use modalis_config::{
    Preset, find_preset as config_find_preset, get_factory_preset, parse_param_value,
    validate_preset,
};
use tracing::{debug, warn};

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!(
            "Invalid parameter format: '{}' (expected key=value)",
            s
        )),
    }
}

/// A preset plus the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedPreset {
    /// The parsed preset.
    pub preset: Preset,
    /// Source file; `None` for factory presets.
    pub path: Option<PathBuf>,
}

impl LoadedPreset {
    /// Directory that relative model paths are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }
}

/// Load a preset by name or path.
///
/// Searches in this order:
/// 1. Factory presets (by name)
/// 2. User and system presets (by name)
/// 3. File path
pub fn load_preset(name: &str) -> anyhow::Result<LoadedPreset> {
    if let Some(preset) = get_factory_preset(name) {
        debug!(name, "using factory preset");
        return Ok(LoadedPreset { preset, path: None });
    }

    let path = config_find_preset(name)
        .or_else(|| Some(PathBuf::from(name)).filter(|p| p.exists()));
    let Some(path) = path else {
        anyhow::bail!(
            "Preset '{}' not found. Use 'modalis presets list' to see available presets.",
            name
        );
    };

    let preset =
        Preset::load(&path).with_context(|| format!("loading preset {}", path.display()))?;
    debug!(path = %path.display(), "loaded preset file");
    Ok(LoadedPreset {
        preset,
        path: Some(path),
    })
}

/// Apply `--set name=value` overrides, then validate the result.
///
/// Values accept the units understood by [`parse_param_value`].
pub fn apply_overrides(preset: &mut Preset, overrides: &[(String, String)]) -> anyhow::Result<()> {
    for (name, raw) in overrides {
        let value = parse_param_value(name, raw)?;
        preset
            .set_param(name, value)
            .with_context(|| format!("setting '{name}'"))?;
        debug!(name, value, "parameter override");
    }
    validate_preset(preset).with_context(|| format!("preset '{}' is invalid", preset.name))?;
    Ok(())
}

/// Write mono samples to a WAV file.
///
/// 32 bits writes IEEE float; 16 and 24 bits write clipped integer PCM.
pub fn write_wav(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    bits_per_sample: u16,
) -> anyhow::Result<()> {
    let float = match bits_per_sample {
        32 => true,
        16 | 24 => false,
        other => anyhow::bail!("Unsupported bit depth {other} (expected 16, 24 or 32)"),
    };
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample,
        sample_format: if float {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;

    if float {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        let mut clipped = 0usize;
        for &sample in samples {
            if sample.abs() > 1.0 {
                clipped += 1;
            }
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
        if clipped > 0 {
            warn!(clipped, "samples clipped; lower the gain or use 32-bit output");
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Peak absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Linear amplitude in dBFS, floored at -120.
pub fn to_db(level: f32) -> f32 {
    if level <= 1e-6 {
        -120.0
    } else {
        20.0 * level.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modalis_config::sections::BurblePreset;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("rpm=900").unwrap(),
            ("rpm".to_string(), "900".to_string())
        );
        assert_eq!(
            parse_key_val(" gain = 3 dB ").unwrap(),
            ("gain".to_string(), "3 dB".to_string())
        );
        assert!(parse_key_val("rpm").is_err());
        assert!(parse_key_val("=4").is_err());
    }

    #[test]
    fn test_load_factory_preset() {
        let loaded = load_preset("rain").unwrap();
        assert_eq!(loaded.preset.name, "Rain");
        assert!(loaded.path.is_none());
        assert!(loaded.base_dir().is_none());
    }

    #[test]
    fn test_load_missing_preset() {
        let err = load_preset("no_such_preset_4711").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_apply_overrides_with_units() {
        let mut preset = Preset::new("Test").with_burble(BurblePreset::default());
        let overrides = vec![
            ("spawn_rate".to_string(), "2 kHz".to_string()),
            ("radius-max-mm".to_string(), "12".to_string()),
        ];
        apply_overrides(&mut preset, &overrides).unwrap();

        let burble = preset.burble.as_ref().unwrap();
        assert!((burble.spawn_rate - 2000.0).abs() < 1e-3);
        assert!((burble.radius_max_mm - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_apply_overrides_rejects_unknown_and_out_of_range() {
        let mut preset = Preset::new("Test").with_burble(BurblePreset::default());
        let unknown = vec![("rpm".to_string(), "900".to_string())];
        assert!(apply_overrides(&mut preset, &unknown).is_err());

        let mut preset = Preset::new("Test").with_burble(BurblePreset::default());
        let negative = vec![("spawn_rate".to_string(), "-5".to_string())];
        assert!(apply_overrides(&mut preset, &negative).is_err());
    }

    #[test]
    fn test_to_db() {
        assert!((to_db(1.0)).abs() < 1e-6);
        assert!((to_db(0.5) + 6.0206).abs() < 1e-3);
        assert_eq!(to_db(0.0), -120.0);
    }
}
