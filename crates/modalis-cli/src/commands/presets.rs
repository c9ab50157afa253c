//! Preset management commands.
//!
//! Provides commands to list, show, copy and delete generator presets.

use std::path::Path;

use clap::{Args, Subcommand};
use modalis_config::{
    GeneratorKind, Preset, ensure_user_presets_dir, factory_presets, get_factory_preset,
    list_all_presets, param_info, preset_name_from_path, system_presets_dir, user_config_dir,
    user_models_dir, user_presets_dir,
};

use super::common::load_preset;

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: PresetsCommand,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List available presets (factory and user)
    List {
        /// Show only factory presets
        #[arg(long)]
        factory: bool,

        /// Show only user and system presets
        #[arg(long)]
        user: bool,

        /// Show only presets for one generator (burble, force, engine, piano)
        #[arg(long)]
        generator: Option<GeneratorKind>,
    },

    /// Show details of a preset
    Show {
        /// Preset name or path
        name: String,

        /// Print the preset as TOML instead of a table
        #[arg(long)]
        toml: bool,
    },

    /// Copy a preset to the user presets directory for customization
    Copy {
        /// Preset name or path
        source: String,

        /// New preset name (optional, uses source name if not specified)
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite if the preset already exists
        #[arg(long)]
        force: bool,
    },

    /// Delete a user preset
    Delete {
        /// Preset name to delete
        name: String,

        /// Confirm deletion
        #[arg(long)]
        force: bool,
    },

    /// Show preset and model directories
    Paths,
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    match args.command {
        PresetsCommand::List {
            factory,
            user,
            generator,
        } => list_presets(factory, user, generator),
        PresetsCommand::Show { name, toml } => show_preset(&name, toml),
        PresetsCommand::Copy {
            source,
            name,
            force,
        } => copy_preset(&source, name.as_deref(), force),
        PresetsCommand::Delete { name, force } => delete_preset(&name, force),
        PresetsCommand::Paths => show_paths(),
    }
}

fn kind_label(preset: &Preset) -> String {
    preset
        .kind()
        .map_or_else(|| "-".to_string(), |k| k.to_string())
}

fn list_presets(
    factory_only: bool,
    user_only: bool,
    generator: Option<GeneratorKind>,
) -> anyhow::Result<()> {
    let wanted = |preset: &Preset| generator.is_none() || preset.kind() == generator;

    if !user_only {
        println!("Factory Presets:");
        println!("================");
        for preset in factory_presets().iter().filter(|&p| wanted(p)) {
            let desc = preset.description.as_deref().unwrap_or("");
            println!("  {:14} {:8} - {}", preset.name, kind_label(preset), desc);
        }
        println!();
    }

    if !factory_only {
        println!("User Presets:");
        println!("=============");
        let paths = list_all_presets();
        if paths.is_empty() {
            println!("  (none)");
            println!();
            println!("  Copy a factory preset with: modalis presets copy <name>\n");
        }
        for path in paths {
            let name = preset_name_from_path(&path).unwrap_or_else(|| "unknown".to_string());
            match Preset::load(&path) {
                Ok(preset) if wanted(&preset) => {
                    let desc = preset.description.as_deref().unwrap_or("");
                    println!("  {:14} {:8} - {}", name, kind_label(&preset), desc);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable preset");
                    println!("  {:14} {:8} - (error loading)", name, "?");
                }
            }
        }
        println!();
    }

    Ok(())
}

fn show_preset(name: &str, as_toml: bool) -> anyhow::Result<()> {
    let loaded = load_preset(name)?;
    let preset = &loaded.preset;

    if as_toml {
        print!("{}", preset.to_toml()?);
        return Ok(());
    }

    println!("Preset: {}", preset.name);
    println!("{}", "=".repeat(8 + preset.name.len()));
    println!();

    if let Some(desc) = &preset.description {
        println!("Description: {}", desc);
    }
    if let Some(path) = &loaded.path {
        println!("File:        {}", path.display());
    }
    println!("Generator:   {}", kind_label(preset));
    println!("Sample Rate: {} Hz", preset.sample_rate);
    match preset.seed {
        Some(seed) => println!("Seed:        {}", seed),
        None => println!("Seed:        random"),
    }
    println!();

    let Some(kind) = preset.kind() else {
        println!("(no generator section)");
        return Ok(());
    };

    println!("Parameters:");
    println!("  {:28} {:>12}  {:>24}", "name", "value", "range");
    for (param, value) in preset.param_values() {
        let range = param_info(kind, param)
            .map(|info| format!("[{}, {}]", info.min, info.max))
            .unwrap_or_default();
        let marker = param_info(kind, param)
            .filter(|info| info.default != value)
            .map_or("", |_| " *");
        println!("  {:28} {:>12.4}  {:>24}{}", param, value, range, marker);
    }
    println!();
    println!("  * differs from the default");

    let extras = section_extras(preset);
    if !extras.is_empty() {
        println!();
        for line in extras {
            println!("{line}");
        }
    }

    Ok(())
}

/// Non-numeric settings worth showing: curves, harmonic tables, model files.
fn section_extras(preset: &Preset) -> Vec<String> {
    let mut lines = Vec::new();
    if preset.burble.as_ref().is_some_and(|b| b.freq_gain.is_some()) {
        lines.push("Frequency gain curve: yes".to_string());
    }
    if let Some(force) = &preset.force {
        for (label, state) in [("First", &force.first), ("Second", &force.second)] {
            lines.push(format!(
                "{label} state: curve {}, noise {:?}",
                if state.curve.is_some() { "set" } else { "silent" },
                state.noise
            ));
        }
    }
    if let Some(engine) = &preset.engine {
        lines.push(format!("Harmonics: {}", engine.harmonics.len()));
    }
    if let Some(piano) = &preset.piano {
        match &piano.model {
            Some(path) => lines.push(format!("Model: {}", path.display())),
            None => lines.push(format!(
                "Model: factory, notes {}-{}",
                piano.start_note,
                usize::from(piano.start_note) + piano.num_keys.saturating_sub(1)
            )),
        }
    }
    lines
}

fn copy_preset(source: &str, new_name: Option<&str>, force: bool) -> anyhow::Result<()> {
    let loaded = load_preset(source)?;
    let target_name = new_name.map_or_else(
        || preset_name_from_path(Path::new(source)).unwrap_or_else(|| source.to_string()),
        str::to_string,
    );

    ensure_user_presets_dir()?;
    let preset_path = user_presets_dir().join(format!("{}.toml", target_name));

    if preset_path.exists() && !force {
        anyhow::bail!(
            "Preset '{}' already exists in user presets. Choose a different name with --name or use --force.",
            target_name
        );
    }

    let mut preset = loaded.preset.clone();
    preset.name = target_name.clone();
    if let Some(desc) = &loaded.preset.description {
        preset.description = Some(format!("{} (copy)", desc));
    }
    // Relative model paths must keep pointing at the same file.
    if let (Some(piano), Some(base)) = (preset.piano.as_mut(), loaded.base_dir()) {
        piano.model = piano.model_path(Some(base));
    }

    preset.save(&preset_path)?;

    println!("Copied preset '{}' to user preset '{}'", source, target_name);
    println!("Path: {}", preset_path.display());
    Ok(())
}

fn delete_preset(name: &str, force: bool) -> anyhow::Result<()> {
    if get_factory_preset(name).is_some() {
        anyhow::bail!("Cannot delete factory preset '{}'. Factory presets are built-in.", name);
    }

    let preset_path = user_presets_dir().join(format!("{}.toml", name));
    if !preset_path.exists() {
        anyhow::bail!("User preset '{}' not found.", name);
    }
    if !force {
        anyhow::bail!("Use --force to confirm deletion of preset '{}'.", name);
    }

    std::fs::remove_file(&preset_path)?;
    println!("Deleted preset '{}'.", name);
    Ok(())
}

fn show_paths() -> anyhow::Result<()> {
    println!("Directories:");
    println!("============");
    println!();
    println!("Config dir:     {}", user_config_dir().display());
    println!("User presets:   {}", user_presets_dir().display());
    println!("System presets: {}", system_presets_dir().display());
    println!("Piano models:   {}", user_models_dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modalis_config::sections::PianoPreset;

    #[test]
    fn test_kind_label() {
        assert_eq!(kind_label(&get_factory_preset("rain").unwrap()), "burble");
        assert_eq!(kind_label(&Preset::new("empty")), "-");
    }

    #[test]
    fn test_extras_describe_sections() {
        let extras = section_extras(&get_factory_preset("rattle").unwrap());
        assert_eq!(extras.len(), 2);
        assert!(extras[0].contains("curve set"));
        assert!(extras[1].contains("silent"));

        let extras = section_extras(&get_factory_preset("grand").unwrap());
        assert_eq!(extras, vec!["Model: factory, notes 21-108".to_string()]);

        let preset = Preset::new("Upright").with_piano(PianoPreset {
            model: Some("upright.json".into()),
            ..PianoPreset::default()
        });
        assert_eq!(section_extras(&preset), vec!["Model: upright.json".to_string()]);
    }
}
