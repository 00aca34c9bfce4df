//! Ephys Chunks - List the chunks of contiguous recording in a session
//!
//! Shows how the capture files of one stream split into chunks, with the
//! timestamp, sample count and gap to the previous file of every file. Nothing
//! is written.
//!
//! # Usage
//!
//! ```bash
//! ephys-chunks /data/MLA001/session1
//! ephys-chunks /data/MLA001/session1 --stream eeg --tolerance 1
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ephys_alignment_toolbox::chunks::{ChunkWindow, file_gaps_minutes, segment};
use ephys_alignment_toolbox::config::read_config;
use ephys_alignment_toolbox::session::{StreamKind, file_timestamp, list_stream_files};
use ephys_alignment_toolbox::stream::{RawSample, samples_in_file};

#[derive(Parser)]
#[command(name = "ephys-chunks")]
#[command(about = "List the chunks of contiguous recording in a session")]
#[command(version)]
struct Args {
    /// Session folder holding the eeg/ and ttl/ capture folders
    session_dir: PathBuf,

    /// Folder holding the session config.yaml (defaults to the session folder)
    #[arg(long, short = 'c')]
    config_folder: Option<PathBuf>,

    /// Stream to list
    #[arg(long, default_value = "ttl")]
    #[arg(value_parser = ["ttl", "eeg"])]
    stream: String,

    /// Tolerance in minutes around the timer period (overrides the config)
    #[arg(long)]
    tolerance: Option<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    ephys_alignment_toolbox::display_license_notice("ephys-chunks");

    let config_folder = args.config_folder.clone().unwrap_or_else(|| args.session_dir.clone());
    let config = read_config(&config_folder)
        .with_context(|| format!("Failed to read the configuration in {}", config_folder.display()))?;

    let kind = match args.stream.as_str() {
        "eeg" => StreamKind::Eeg,
        _ => StreamKind::Ttl,
    };
    let expected_delta = config.expected_delta_minutes()?;
    let tolerance = args.tolerance.unwrap_or(config.discontinuity_tolerance_min);
    let window = ChunkWindow::new(expected_delta, tolerance);

    let dir = args.session_dir.join(kind.dir_name());
    let files: Vec<PathBuf> = list_stream_files(&dir, kind)
        .with_context(|| format!("Failed to list {} files in {}", kind, dir.display()))?
        .into_iter()
        .map(|f| f.path)
        .collect();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║              Session Chunks                                    ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!();
    println!("Folder: {}", dir.display());
    println!("Stream: {} ({} files)", kind, files.len());
    println!(
        "Contiguous when gap is within [{:.2}, {:.2}] min",
        window.lower(),
        window.upper()
    );
    println!();

    let chunks = segment(&files, expected_delta, tolerance)?;
    for (idx, chunk) in chunks.iter().enumerate() {
        println!("Chunk {} ({} files):", idx + 1, chunk.len());
        let gaps = file_gaps_minutes(chunk)?;
        for (i, file) in chunk.iter().enumerate() {
            let samples = match kind {
                StreamKind::Eeg => count::<f32>(file, config.eeg_channel_count()),
                StreamKind::Ttl => count::<i8>(file, config.ttl_channel_count()),
            };
            let gap = if i == 0 {
                "-".to_string()
            } else {
                format!("{:.2} min", gaps[i - 1])
            };
            println!(
                "\t{}\t{}\tsamples: {}\tgap: {}",
                file_timestamp(file)?,
                file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
                samples,
                gap
            );
        }
        if chunk.len() < 2 {
            println!("\tWARNING: single file chunk, cannot be aligned");
        }
        println!();
    }

    if chunks.is_empty() {
        println!("WARNING: No {} files found", kind);
    }
    Ok(())
}

fn count<T: RawSample>(file: &std::path::Path, channel_count: usize) -> String {
    match samples_in_file::<T>(file, channel_count) {
        Ok(n) => n.to_string(),
        Err(e) => format!("ERROR ({})", e),
    }
}
