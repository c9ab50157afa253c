//! Piano model commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use modalis_config::{
    PianoModelFile, ensure_user_models_dir, factory_piano_model, find_model, list_models,
    preset_name_from_path,
};
use modalis_piano::PianoModel;

#[derive(Args)]
pub struct ModelArgs {
    #[command(subcommand)]
    command: ModelCommand,
}

#[derive(Subcommand)]
enum ModelCommand {
    /// List piano models in the user models directory
    List,

    /// Show a summary of a piano model file
    Show {
        /// Model file path or name in the user models directory
        name: String,
    },

    /// Write the factory piano model to a file (.toml or .json)
    Export {
        /// Output file; a bare name is written to the user models directory
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// First MIDI note
        #[arg(long, default_value = "21")]
        start_note: u8,

        /// Number of keys
        #[arg(long, default_value = "88")]
        num_keys: usize,
    },
}

pub fn run(args: ModelArgs) -> anyhow::Result<()> {
    match args.command {
        ModelCommand::List => list(),
        ModelCommand::Show { name } => show(&name),
        ModelCommand::Export {
            output,
            start_note,
            num_keys,
        } => export(output, start_note, num_keys),
    }
}

fn list() -> anyhow::Result<()> {
    println!("Piano Models:");
    println!("=============");
    let models = list_models();
    if models.is_empty() {
        println!("  (none)");
        println!();
        println!("  Export the factory piano with: modalis model export grand.json");
    }
    for path in models {
        let name = preset_name_from_path(&path).unwrap_or_else(|| "unknown".to_string());
        match PianoModelFile::load(&path) {
            Ok(file) => println!(
                "  {:20} {} keys from note {}",
                name, file.num_keys, file.start_note
            ),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable model");
                println!("  {:20} (error loading)", name);
            }
        }
    }
    Ok(())
}

fn show(name: &str) -> anyhow::Result<()> {
    let path =
        find_model(name).ok_or_else(|| anyhow::anyhow!("Piano model '{}' not found.", name))?;
    let model = PianoModelFile::load_model(&path)
        .with_context(|| format!("loading {}", path.display()))?;

    println!("Model: {}", path.display());
    println!();
    for line in summary(&model) {
        println!("{line}");
    }
    Ok(())
}

/// Human-readable model overview.
fn summary(model: &PianoModel) -> Vec<String> {
    let modal_range = |sustain: bool| {
        let counts = model.keys.iter().map(|k| k.modals(sustain).len());
        let min = counts.clone().min().unwrap_or(0);
        let max = counts.max().unwrap_or(0);
        if min == max {
            format!("{min}")
        } else {
            format!("{min}-{max}")
        }
    };
    let undamped = model.keys.iter().filter(|k| !k.has_damper).count();
    let curves: Vec<&str> = [
        ("velocity_remap", model.velocity_remap.is_some()),
        ("note_gain", model.note_gain.is_some()),
        ("hammer_gain", model.hammer_gain.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect();

    vec![
        format!(
            "Keys:        {} (notes {}-{})",
            model.num_keys(),
            model.start_note,
            model.end_note()
        ),
        format!("Undamped:    {}", undamped),
        format!(
            "Modals:      {} pedal up, {} pedal down",
            modal_range(false),
            modal_range(true)
        ),
        format!("Soundboard:  {} modals", model.soundboard.modals.len()),
        format!("Hammer:      {} modals", model.hammer.modals.len()),
        format!(
            "Curves:      {}",
            if curves.is_empty() {
                "none".to_string()
            } else {
                curves.join(", ")
            }
        ),
    ]
}

fn export(output: PathBuf, start_note: u8, num_keys: usize) -> anyhow::Result<()> {
    if num_keys == 0 || usize::from(start_note) + num_keys > 128 {
        anyhow::bail!(
            "{} keys from note {} do not fit in the MIDI range",
            num_keys,
            start_note
        );
    }

    let path = if output.components().count() == 1 {
        ensure_user_models_dir()?.join(output)
    } else {
        output
    };
    let model = factory_piano_model(start_note, num_keys);
    PianoModelFile::from_model(&model).save(&path)?;

    println!("Wrote {} keys to {}", model.num_keys(), path.display());
    Ok(())
}
