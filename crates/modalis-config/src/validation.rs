//! Preset validation.
//!
//! Every numeric preset parameter has a range in a static table per
//! generator. Generators clamp their inputs at render time anyway; the
//! tables catch typos and nonsense values before a render starts.
//!
//! # Example
//!
//! ```rust
//! use modalis_config::{GeneratorKind, validate_param};
//!
//! assert!(validate_param(GeneratorKind::Burble, "spawn_chance", 0.5).is_ok());
//! assert!(validate_param(GeneratorKind::Burble, "spawn_chance", 2.0).is_err());
//! ```

use thiserror::Error;

use crate::preset::{GeneratorKind, Preset};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Unknown generator name.
    #[error("unknown generator: {0}")]
    UnknownGenerator(String),

    /// Unknown parameter name.
    #[error("unknown parameter '{param}' for generator '{generator}'")]
    UnknownParameter {
        /// Generator name.
        generator: String,
        /// Name of the unrecognized parameter.
        param: String,
    },

    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: String,
        /// The value that was out of range.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },

    /// Invalid parameter format.
    #[error("invalid format for parameter '{param}': {reason}")]
    InvalidFormat {
        /// Name of the parameter.
        param: String,
        /// Description of the format error.
        reason: String,
    },

    /// The preset has no generator section.
    #[error("preset '{0}' has no generator section")]
    NoGenerator(String),

    /// The preset has more than one generator section.
    #[error("preset '{name}' has several generator sections: {kinds}")]
    SeveralGenerators {
        /// Preset name.
        name: String,
        /// Comma-separated section names.
        kinds: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Range and default of one preset parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamValidationInfo {
    /// Parameter name as written in presets.
    pub name: &'static str,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Default value.
    pub default: f32,
}

const fn p(name: &'static str, min: f32, max: f32, default: f32) -> ParamValidationInfo {
    ParamValidationInfo {
        name,
        min,
        max,
        default,
    }
}

static BURBLE_PARAMS: &[ParamValidationInfo] = &[
    p("spawn_rate", 0.0, 200_000.0, 1000.0),
    p("spawn_chance", 0.0, 1.0, 0.9),
    p("radius_dist", 0.3, 2.0, 1.0),
    p("radius_min_mm", 0.15, 150.0, 0.15),
    p("radius_max_mm", 0.15, 150.0, 150.0),
    p("radius_offset_mm", 0.0, 100.0, 0.0),
    p("pitch_shift", -48.0, 48.0, 0.0),
    p("amp_dist", 0.1, 1.5, 0.7634),
    p("radius_amp_factor", 0.0, 1.0, 1.0),
    p("amp_offset", 0.0, 1.0, 0.0),
    p("gain", -1000.0, 1000.0, 10.0),
    p("gain_max", 0.0, 1.0, 0.2),
    p("decay_to_chirp_ratio", -1.0, 1.0, 0.1),
    p("decay_scale", 0.1, 100.0, 1.0),
    p("decay_thresh", 1.0, 100_000.0, 1000.0),
    p("max_burbles", -1.0, 65_536.0, 512.0),
];

static FORCE_PARAMS: &[ParamValidationInfo] = &[
    p("amp", -100.0, 100.0, 1.0),
    p("freq", 0.001, 20_000.0, 100.0),
    p("duty_cycle", 0.0, 1.0, 0.5),
    p("first.freq_scale", 0.0, 1000.0, 1.0),
    p("first.noise_amp", 0.0, 10.0, 0.5),
    p("second.freq_scale", 0.0, 1000.0, 1.0),
    p("second.noise_amp", 0.0, 10.0, 0.5),
];

static ENGINE_PARAMS: &[ParamValidationInfo] = &[
    p("pulses_per_cycle", 1.0, 64.0, 4.0),
    p("max_harmonics", 0.0, 1024.0, 0.0),
    p("rpm", 0.0, 30_000.0, 1000.0),
    p("throttle_input", -1.0, 1.0, 1.0),
    p("freq_scale", 0.01, 100.0, 1.0),
    p("rpm_noise_factor", 0.0, 1.0, 0.1),
    p("rand_period", 0.001, 10.0, 0.05),
    p("amp_rand_min", 0.0, 1.0, 0.1),
    p("amp_rand_max", 0.0, 1.0, 0.5),
    p("harmonic_fluctuation", 0.0, 1.0, 0.05),
    p("f0_fluctuation", 0.0, 100.0, 0.5),
    p("harmonic_gain", 0.0, 10.0, 1.0),
    p("cutoff_freq", 1.0, 100_000.0, 5000.0),
    p("falloff_db", -120.0, 0.0, -24.0),
    p("num_harmonics_deceleration", 0.0, 1024.0, 0.0),
];

static PIANO_PARAMS: &[ParamValidationInfo] = &[
    p("start_note", 0.0, 127.0, 21.0),
    p("num_keys", 1.0, 128.0, 88.0),
    p("soundboard_level", 0.0, 5.0, 1.0),
    p("soundboard_quality_down", 1.0, 4.0, 2.0),
    p("key_init_delay", 0.0, 0.1, 0.005),
    p("hammer_duration", 0.0, 2.0, 0.25),
    p("max_note_duration", 0.0, 3600.0, 60.0),
    p("gain", 0.0, 10.0, 1.0),
    p("velocity_scale", 0.001, 10.0, 1.0),
    p("key_gain", 0.0, 1.0, 1.0),
    p("hammer_gain", 0.0, 2.0, 1.0),
    p("dynamic_adjust", 0.0, 2.0, 1.0),
    p("soundboard_gain", 0.0, 5.0, 1.0),
    p("sym_reson_gain", 0.0, 5.0, 1.0),
];

/// Parameter table of a generator.
pub fn generator_params(kind: GeneratorKind) -> &'static [ParamValidationInfo] {
    match kind {
        GeneratorKind::Burble => BURBLE_PARAMS,
        GeneratorKind::Force => FORCE_PARAMS,
        GeneratorKind::Engine => ENGINE_PARAMS,
        GeneratorKind::Piano => PIANO_PARAMS,
    }
}

/// Normalize a parameter name for consistent lookup.
fn normalize_param_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Range info for a parameter, by name.
pub fn param_info(kind: GeneratorKind, name: &str) -> Option<&'static ParamValidationInfo> {
    let name = normalize_param_name(name);
    generator_params(kind).iter().find(|info| info.name == name)
}

/// Check one parameter value against its range.
pub fn validate_param(kind: GeneratorKind, name: &str, value: f32) -> ValidationResult<()> {
    let info = param_info(kind, name).ok_or_else(|| ValidationError::UnknownParameter {
        generator: kind.to_string(),
        param: name.to_string(),
    })?;
    if value.is_finite() && value >= info.min && value <= info.max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            param: format!("{kind}.{}", info.name),
            value,
            min: info.min,
            max: info.max,
        })
    }
}

/// Parse a parameter value from a string.
///
/// Plain numbers and numbers with a unit suffix are accepted: `"20dB"`,
/// `"500Hz"`, `"2.5kHz"`, `"100ms"`, `"3s"`, `"50%"`, `"3000rpm"`,
/// `"4mm"`. Milliseconds become seconds, kHz becomes Hz and percentages
/// become fractions.
pub fn parse_param_value(param_name: &str, value_str: &str) -> ValidationResult<f32> {
    const UNITS: &[(&str, f32)] = &[
        ("khz", 1000.0),
        ("hz", 1.0),
        ("db", 1.0),
        ("ms", 0.001),
        ("mm", 1.0),
        ("rpm", 1.0),
        ("s", 1.0),
        ("%", 0.01),
    ];

    let s = value_str.trim();
    let lower = s.to_ascii_lowercase();
    let (number, scale) = UNITS
        .iter()
        .find_map(|&(unit, scale)| lower.strip_suffix(unit).map(|n| (n, scale)))
        .unwrap_or((lower.as_str(), 1.0));

    number
        .trim()
        .parse::<f32>()
        .map(|v| v * scale)
        .map_err(|_| ValidationError::InvalidFormat {
            param: param_name.to_string(),
            reason: format!("cannot parse '{}' as number", s),
        })
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Validate a preset's generator section.
///
/// Checks that exactly one generator section is present, every numeric
/// parameter is in range, curves are well formed and the section is
/// consistent with itself (radius order, harmonic table, note range).
///
/// # Example
///
/// ```rust
/// use modalis_config::{Preset, validate_preset};
/// use modalis_config::sections::BurblePreset;
///
/// let preset = Preset::new("rain").with_burble(BurblePreset::default());
/// assert!(validate_preset(&preset).is_ok());
/// ```
pub fn validate_preset(preset: &Preset) -> ValidationResult<()> {
    let kinds = preset.kinds();
    let kind = match kinds.as_slice() {
        [] => return Err(ValidationError::NoGenerator(preset.name.clone())),
        [kind] => *kind,
        _ => {
            return Err(ValidationError::SeveralGenerators {
                name: preset.name.clone(),
                kinds: kinds
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    };

    let mut errors: Vec<ValidationError> = preset
        .param_values()
        .into_iter()
        .filter_map(|(name, value)| validate_param(kind, name, value).err())
        .collect();

    if preset.sample_rate < 8000 || preset.sample_rate > 384_000 {
        errors.push(ValidationError::OutOfRange {
            param: "sample_rate".to_string(),
            value: preset.sample_rate as f32,
            min: 8000.0,
            max: 384_000.0,
        });
    }

    let format_error = |param: &str, reason: &str| ValidationError::InvalidFormat {
        param: param.to_string(),
        reason: reason.to_string(),
    };

    if let Some(burble) = &preset.burble {
        if burble.radius_min_mm > burble.radius_max_mm {
            errors.push(format_error(
                "burble.radius_min_mm",
                "must not exceed radius_max_mm",
            ));
        }
        if let Some(curve) = &burble.freq_gain
            && let Err(e) = curve.validate("burble.freq_gain")
        {
            errors.push(e);
        }
    }

    if let Some(force) = &preset.force {
        for (state, param) in [
            (&force.first, "force.first.curve"),
            (&force.second, "force.second.curve"),
        ] {
            if let Some(curve) = &state.curve
                && let Err(e) = curve.validate(param)
            {
                errors.push(e);
            }
        }
    }

    if let Some(engine) = &preset.engine {
        if engine.harmonics.is_empty() {
            errors.push(format_error("engine.harmonics", "harmonic table is empty"));
        }
        if engine
            .harmonics
            .iter()
            .any(|h| h.iter().any(|v| !v.is_finite()) || h[2] <= 0.0)
        {
            errors.push(format_error(
                "engine.harmonics",
                "harmonics need finite values and a positive frequency",
            ));
        }
        if engine.amp_rand_min > engine.amp_rand_max {
            errors.push(format_error(
                "engine.amp_rand_min",
                "must not exceed amp_rand_max",
            ));
        }
    }

    if let Some(piano) = &preset.piano {
        if piano.model.is_none() && piano.start_note as usize + piano.num_keys > 128 {
            errors.push(format_error(
                "piano.num_keys",
                "procedural key range runs past MIDI note 127",
            ));
        }
        for (curve, param) in [
            (&piano.velocity_remap, "piano.velocity_remap"),
            (&piano.note_gain_curve, "piano.note_gain_curve"),
            (&piano.hammer_gain_curve, "piano.hammer_gain_curve"),
        ] {
            if let Some(curve) = curve
                && let Err(e) = curve.validate(param)
            {
                errors.push(e);
            }
        }
    }

    collect(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveConfig;
    use crate::sections::{BurblePreset, EnginePreset, PianoPreset, TwoStatePreset};

    #[test]
    fn test_validate_param_value_in_range() {
        assert!(validate_param(GeneratorKind::Engine, "rpm", 3000.0).is_ok());
        assert!(validate_param(GeneratorKind::Engine, "RPM", 3000.0).is_ok());
        assert!(matches!(
            validate_param(GeneratorKind::Engine, "rpm", -1.0),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_param(GeneratorKind::Piano, "gain", f32::NAN).is_err());
    }

    #[test]
    fn test_unknown_param() {
        let err = validate_param(GeneratorKind::Force, "drive", 1.0).unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter 'drive' for generator 'force'");
    }

    #[test]
    fn test_parse_param_value_plain_numbers() {
        assert_eq!(parse_param_value("x", "0.5").unwrap(), 0.5);
        assert_eq!(parse_param_value("x", " -6 ").unwrap(), -6.0);
    }

    #[test]
    fn test_parse_param_value_with_units() {
        assert_eq!(parse_param_value("x", "-24dB").unwrap(), -24.0);
        assert_eq!(parse_param_value("x", "500Hz").unwrap(), 500.0);
        assert_eq!(parse_param_value("x", "2.5kHz").unwrap(), 2500.0);
        assert!((parse_param_value("x", "50ms").unwrap() - 0.05).abs() < 1e-6);
        assert_eq!(parse_param_value("x", "3000rpm").unwrap(), 3000.0);
        assert!((parse_param_value("x", "50%").unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(parse_param_value("x", "4mm").unwrap(), 4.0);
    }

    #[test]
    fn test_parse_param_value_invalid() {
        assert!(matches!(
            parse_param_value("rpm", "fast"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(parse_param_value("rpm", "Hz").is_err());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::OutOfRange {
            param: "burble.gain_max".to_string(),
            value: 2.0,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "parameter 'burble.gain_max' value 2 out of range [0, 1]"
        );
        assert_eq!(
            ValidationError::NoGenerator("x".to_string()).to_string(),
            "preset 'x' has no generator section"
        );
    }

    #[test]
    fn test_multiple_validation_errors() {
        let preset = Preset::new("bad").with_burble(BurblePreset {
            spawn_chance: 3.0,
            gain_max: 5.0,
            ..BurblePreset::default()
        });
        let err = validate_preset(&preset).unwrap_err();
        let ValidationError::Multiple(errors) = &err else {
            panic!("expected several errors, got {err}");
        };
        assert_eq!(errors.len(), 2);
        assert!(err.to_string().contains("burble.spawn_chance"));
    }

    #[test]
    fn test_section_count() {
        assert!(matches!(
            validate_preset(&Preset::new("empty")),
            Err(ValidationError::NoGenerator(_))
        ));
        let both = Preset::new("both")
            .with_burble(BurblePreset::default())
            .with_engine(EnginePreset::default());
        let err = validate_preset(&both).unwrap_err();
        assert!(err.to_string().contains("burble, engine"), "got {err}");
    }

    #[test]
    fn test_structural_checks() {
        let inverted = Preset::new("r").with_burble(BurblePreset {
            radius_min_mm: 10.0,
            radius_max_mm: 1.0,
            ..BurblePreset::default()
        });
        assert!(validate_preset(&inverted).is_err());

        let silent = Preset::new("e").with_engine(EnginePreset {
            harmonics: Vec::new(),
            ..EnginePreset::default()
        });
        assert!(validate_preset(&silent).is_err());

        let past_range = Preset::new("p").with_piano(PianoPreset {
            start_note: 100,
            num_keys: 88,
            ..PianoPreset::default()
        });
        assert!(validate_preset(&past_range).is_err());

        let mut force = TwoStatePreset::default();
        force.first.curve = Some(CurveConfig::Keys {
            keys: Vec::new(),
            points: 8,
        });
        assert!(validate_preset(&Preset::new("f").with_force(force)).is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        for preset in [
            Preset::new("a").with_burble(BurblePreset::default()),
            Preset::new("b").with_force(TwoStatePreset::default()),
            Preset::new("c").with_engine(EnginePreset::default()),
            Preset::new("d").with_piano(PianoPreset::default()),
        ] {
            validate_preset(&preset).unwrap();
        }
    }

    #[test]
    fn test_tables_cover_sections() {
        let sections: [(GeneratorKind, Vec<(&str, f32)>); 4] = [
            (GeneratorKind::Burble, BurblePreset::default().values()),
            (GeneratorKind::Force, TwoStatePreset::default().values()),
            (GeneratorKind::Engine, EnginePreset::default().values()),
            (GeneratorKind::Piano, PianoPreset::default().values()),
        ];
        for (kind, values) in sections {
            assert_eq!(values.len(), generator_params(kind).len(), "{kind}");
            for (name, value) in values {
                let info = param_info(kind, name).unwrap();
                assert_eq!(info.default, value, "{kind}.{name} default");
            }
        }
    }

    #[test]
    fn test_param_ranges_are_sensible() {
        for kind in GeneratorKind::ALL {
            for info in generator_params(kind) {
                assert!(info.min <= info.max, "{kind}.{}", info.name);
                assert!(
                    info.default >= info.min && info.default <= info.max,
                    "{kind}.{} default outside range",
                    info.name
                );
            }
        }
    }
}
