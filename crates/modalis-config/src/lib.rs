//! Presets and piano model files for modalis generators.
//!
//! This crate is the off-line side of modalis: it reads and writes the files
//! that describe what to render, checks them, and turns them into the
//! runtime parameter structs of `modalis-synth` and `modalis-piano`.
//!
//! # Features
//!
//! - **Presets**: One TOML file per sound, with a section for the burble,
//!   two-state force, engine or piano generator
//! - **Piano models**: Per-key modal data in TOML or JSON, validated on load
//! - **Curves**: Keyed or sampled curves for shapes and gain tables
//! - **Validation**: Range tables for every numeric parameter
//! - **Paths**: Platform-specific preset and model directories
//! - **Factory Presets**: Built-in presets for every generator
//!
//! # Example
//!
//! ```rust,no_run
//! use modalis_config::{Preset, user_presets_dir, validate_preset};
//! use modalis_config::sections::EnginePreset;
//!
//! // Load a preset from file
//! let preset = Preset::load("my_engine.toml").unwrap();
//!
//! // Create a preset programmatically
//! let preset = Preset::new("Truck")
//!     .with_description("Slow diesel")
//!     .with_engine(EnginePreset {
//!         pulses_per_cycle: 3,
//!         rpm: 700.0,
//!         ..EnginePreset::default()
//!     });
//! validate_preset(&preset).unwrap();
//!
//! // Save to user presets directory
//! preset.save(user_presets_dir().join("truck.toml")).unwrap();
//! ```

mod error;
mod preset;

/// Serializable curve descriptions.
pub mod curve;

/// Factory presets bundled with the library.
pub mod factory_presets;

/// Piano model asset files.
pub mod model_file;

/// Platform-specific paths for presets and models.
pub mod paths;

/// Per-generator preset sections.
pub mod sections;

/// Preset validation.
pub mod validation;

pub use curve::{CurveConfig, DEFAULT_CURVE_POINTS};
pub use error::{ConfigError, ModelError};
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_piano_model, factory_preset_names, factory_presets,
    get_factory_preset, is_factory_preset,
};
pub use model_file::{KeyFile, MODEL_FILE_VERSION, PianoModelFile};
pub use paths::{
    ensure_user_models_dir, ensure_user_presets_dir, find_model, find_preset, list_all_presets,
    list_models, list_system_presets, list_user_presets, preset_name_from_path,
    system_presets_dir, user_config_dir, user_models_dir, user_presets_dir,
};
pub use preset::{GeneratorKind, Preset};
pub use sections::{BurblePreset, EnginePreset, NoiseKind, PianoPreset, StatePreset, TwoStatePreset};
pub use validation::{
    ParamValidationInfo, ValidationError, ValidationResult, generator_params, param_info,
    parse_param_value, validate_param, validate_preset,
};
