//! Platform-specific paths for presets and piano models.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/modalis/` (Linux), `~/Library/Application Support/modalis/` (macOS), `%APPDATA%\modalis\` (Windows)
//! - **User presets**: `<user config>/presets/`
//! - **User piano models**: `<user config>/models/`
//! - **System presets**: `/usr/share/modalis/presets/` (Linux), `/Library/Application Support/modalis/presets/` (macOS)
//!
//! # Example
//!
//! ```rust,no_run
//! use modalis_config::paths;
//!
//! // Find a preset by name (searches user then system directories)
//! if let Some(path) = paths::find_preset("my_rain") {
//!     println!("Found preset at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "modalis";

/// Subdirectory name for presets.
const PRESETS_SUBDIR: &str = "presets";

/// Subdirectory name for piano model files.
const MODELS_SUBDIR: &str = "models";

/// Extensions accepted for piano model files.
const MODEL_EXTENSIONS: &[&str] = &["json", "toml"];

/// Returns the user-specific configuration directory.
///
/// Falls back to `./modalis` if the platform config directory is unknown.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific presets directory.
pub fn user_presets_dir() -> PathBuf {
    user_config_dir().join(PRESETS_SUBDIR)
}

/// Returns the user-specific piano model directory.
pub fn user_models_dir() -> PathBuf {
    user_config_dir().join(MODELS_SUBDIR)
}

/// Returns the system-wide presets directory.
///
/// # Platform Paths
///
/// - Linux: `/usr/share/modalis/presets/`
/// - macOS: `/Library/Application Support/modalis/presets/`
/// - Windows and others: `<data dir>\modalis\presets\`
pub fn system_presets_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/usr/share").join(APP_NAME).join(PRESETS_SUBDIR)
    }
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Library/Application Support")
            .join(APP_NAME)
            .join(PRESETS_SUBDIR)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join(PRESETS_SUBDIR)
    }
}

/// Find a preset file by name.
///
/// `name` may be a path to a TOML file or a preset name with or without the
/// `.toml` extension. Names are looked up in the user presets directory,
/// then the system one.
pub fn find_preset(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    [user_presets_dir(), system_presets_dir()]
        .into_iter()
        .map(|dir| dir.join(&filename))
        .find(|candidate| candidate.is_file())
}

/// Find a piano model file by path or by name in the user models directory.
///
/// A bare name is tried with each model extension, JSON first.
pub fn find_model(name: &str) -> Option<PathBuf> {
    find_model_in(&user_models_dir(), name)
}

fn find_model_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    MODEL_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Ensure the user presets directory exists.
pub fn ensure_user_presets_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_presets_dir())
}

/// Ensure the user models directory exists.
pub fn ensure_user_models_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_models_dir())
}

/// List preset files in the user presets directory, sorted by path.
pub fn list_user_presets() -> Vec<PathBuf> {
    list_files(&user_presets_dir(), &["toml"])
}

/// List preset files in the system presets directory, sorted by path.
pub fn list_system_presets() -> Vec<PathBuf> {
    list_files(&system_presets_dir(), &["toml"])
}

/// List all available presets.
///
/// A user preset hides a system preset with the same name.
pub fn list_all_presets() -> Vec<PathBuf> {
    let mut presets = list_user_presets();
    let user_names: Vec<Option<String>> =
        presets.iter().map(|p| preset_name_from_path(p)).collect();
    presets.extend(
        list_system_presets()
            .into_iter()
            .filter(|p| !user_names.contains(&preset_name_from_path(p))),
    );
    presets
}

/// List piano model files in the user models directory.
pub fn list_models() -> Vec<PathBuf> {
    list_files(&user_models_dir(), MODEL_EXTENSIONS)
}

/// Files in `dir` with one of `extensions`; empty if `dir` can't be read.
fn list_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

/// Get the preset name from a file path.
///
/// ```rust
/// use modalis_config::paths::preset_name_from_path;
/// use std::path::Path;
///
/// let name = preset_name_from_path(Path::new("/path/to/light_rain.toml"));
/// assert_eq!(name, Some("light_rain".to_string()));
/// ```
pub fn preset_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(user_config_dir().to_string_lossy().contains("modalis"));
        assert!(user_presets_dir().ends_with("modalis/presets"));
        assert!(user_models_dir().ends_with("modalis/models"));
        assert!(system_presets_dir().to_string_lossy().contains("modalis"));
    }

    #[test]
    fn test_find_preset_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let preset_path = temp_dir.path().join("test.toml");
        fs::write(&preset_path, "name = \"test\"").unwrap();

        assert_eq!(find_preset(preset_path.to_str().unwrap()), Some(preset_path));
    }

    #[test]
    fn test_find_preset_not_found() {
        assert!(find_preset("nonexistent_preset_12345").is_none());
    }

    #[test]
    fn test_find_model_tries_extensions() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("upright.toml"), "").unwrap();
        fs::write(temp_dir.path().join("grand.json"), "").unwrap();
        fs::write(temp_dir.path().join("grand.toml"), "").unwrap();

        assert_eq!(
            find_model_in(temp_dir.path(), "upright"),
            Some(temp_dir.path().join("upright.toml"))
        );
        assert_eq!(
            find_model_in(temp_dir.path(), "grand"),
            Some(temp_dir.path().join("grand.json"))
        );
        assert_eq!(
            find_model_in(temp_dir.path(), "grand.toml"),
            Some(temp_dir.path().join("grand.toml"))
        );
        assert!(find_model_in(temp_dir.path(), "spinet").is_none());
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.toml"), "").unwrap();
        fs::write(temp_dir.path().join("a.toml"), "").unwrap();
        fs::write(temp_dir.path().join("c.json"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let presets = list_files(temp_dir.path(), &["toml"]);
        let names: Vec<_> = presets.iter().filter_map(|p| preset_name_from_path(p)).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(list_files(temp_dir.path(), MODEL_EXTENSIONS).len(), 3);
    }

    #[test]
    fn test_list_files_missing_dir() {
        assert!(list_files(Path::new("/nonexistent/path/12345"), &["toml"]).is_empty());
    }

    #[test]
    fn test_preset_name_from_path() {
        assert_eq!(
            preset_name_from_path(Path::new("simple.toml")),
            Some("simple".to_string())
        );
    }
}
