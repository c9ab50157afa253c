//! Display WAV file metadata.

use anyhow::Context;
use clap::Args;
use hound::{SampleFormat, WavReader};

use super::common::{peak, to_db};

/// Display WAV file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: std::path::PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let mut reader = WavReader::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format_str = match spec.sample_format {
        SampleFormat::Int => "PCM",
        SampleFormat::Float => "IEEE Float",
    };

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", format_str, spec.bits_per_sample);
    println!("Channels:    {}", spec.channels);
    println!("Sample Rate: {} Hz", spec.sample_rate);
    println!("Duration:    {:.3}s ({} frames)", duration_secs, num_frames);
    println!("Peak:        {:.1} dBFS", to_db(peak(&samples)));

    let file_size = std::fs::metadata(&args.file)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
