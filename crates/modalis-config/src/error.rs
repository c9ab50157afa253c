//! Error types for configuration operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to parse or serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unsupported file extension
    #[error("unsupported file format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),

    /// Preset not found
    #[error("preset not found: {0}")]
    PresetNotFound(String),

    /// Validation errors
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    /// Invalid piano model
    #[error("invalid piano model: {0}")]
    Model(#[from] ModelError),

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

/// Structural problems in a piano model file.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// The model has no keys.
    #[error("model has no keys")]
    NoKeys,

    /// Key range runs past MIDI note 127.
    #[error("{num_keys} keys starting at note {start_note} exceed the MIDI range")]
    NoteRange {
        /// First MIDI note.
        start_note: u8,
        /// Number of keys.
        num_keys: usize,
    },

    /// A key's note lies outside the model range.
    #[error("key for note {note} is outside the model range {start_note}..={end_note}")]
    KeyOutOfRange {
        /// Offending note.
        note: u8,
        /// First note of the model.
        start_note: u8,
        /// Last note of the model.
        end_note: u8,
    },

    /// Two keys share a note.
    #[error("note {0} is defined more than once")]
    DuplicateKey(u8),

    /// A note in the range has no key data.
    #[error("note {0} has no key data")]
    MissingKey(u8),

    /// Pedal-off and pedal-on modal lists disagree.
    #[error("note {note}: pedal-off has {pedal_off} modals, pedal-on has {pedal_on}")]
    ModalCountMismatch {
        /// Offending note.
        note: u8,
        /// Pedal-off modal count.
        pedal_off: usize,
        /// Pedal-on modal count.
        pedal_on: usize,
    },

    /// A modal or scalar has an unusable value.
    #[error("{context}: {reason}")]
    InvalidValue {
        /// Where the value was found.
        context: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ModelError {
    /// Create an invalid value error.
    pub fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::InvalidValue {
            context: context.into(),
            reason: reason.into(),
        }
    }
}
