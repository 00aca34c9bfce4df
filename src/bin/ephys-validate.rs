//! Ephys Validate - Inspect the sync pulses of one chunk before aligning it
//!
//! Reads the TTL captures of a chunk, reports the pulse count of every TTL
//! input, the file pair reconciliation and, when a photometry block is given,
//! the clock cross-checks. Nothing is written.
//!
//! # Usage
//!
//! ```bash
//! ephys-validate /data/MLA001/session1
//! ephys-validate /data/MLA001/session1 --chunk 2 --block /photo/block2
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ephys_alignment_toolbox::align::{AlignmentDiagnostics, AlignmentSettings};
use ephys_alignment_toolbox::chunks::segment;
use ephys_alignment_toolbox::config::read_config;
use ephys_alignment_toolbox::photometry::{JsonBlockReader, PhotometryReader};
use ephys_alignment_toolbox::reconcile::reconcile;
use ephys_alignment_toolbox::session::{StreamKind, list_stream_files, matching_eeg_path};
use ephys_alignment_toolbox::stream::{StreamChunk, read_stream, samples_in_file};
use ephys_alignment_toolbox::ttl::{detect_all_edges, normalize};

#[derive(Parser)]
#[command(name = "ephys-validate")]
#[command(about = "Report TTL pulse counts and clock cross-checks of a chunk")]
#[command(version)]
struct Args {
    /// Session folder holding the eeg/ and ttl/ capture folders
    session_dir: PathBuf,

    /// Folder holding the session config.yaml (defaults to the session folder)
    #[arg(long, short = 'c')]
    config_folder: Option<PathBuf>,

    /// Chunk to validate (1-based)
    #[arg(long, default_value = "1")]
    chunk: usize,

    /// Photometry block (pulse export file or block folder) recorded during the chunk
    #[arg(long, short = 'b')]
    block: Option<PathBuf>,

    /// Tolerance in minutes around the timer period (overrides the config)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Minimal output mode
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.quiet {
        tracing_subscriber::fmt::init();
    }
    ephys_alignment_toolbox::display_license_notice("ephys-validate");

    let config_folder = args.config_folder.clone().unwrap_or_else(|| args.session_dir.clone());
    let config = read_config(&config_folder)
        .with_context(|| format!("Failed to read the configuration in {}", config_folder.display()))?;
    let settings = AlignmentSettings::from_config(&config)?;

    let ttl_dir = args.session_dir.join(StreamKind::Ttl.dir_name());
    let ttl_files: Vec<PathBuf> = list_stream_files(&ttl_dir, StreamKind::Ttl)?
        .into_iter()
        .map(|f| f.path)
        .collect();
    let tolerance = args.tolerance.unwrap_or(config.discontinuity_tolerance_min);
    let chunks = segment(&ttl_files, config.expected_delta_minutes()?, tolerance)?;

    let chunk = args
        .chunk
        .checked_sub(1)
        .and_then(|i| chunks.get(i))
        .with_context(|| format!("Chunk {} not found, session has {} chunk(s)", args.chunk, chunks.len()))?;

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║              Sync Pulse Validation                             ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!();
    println!("Chunk {} of {}: {} file(s)", args.chunk, chunks.len(), chunk.len());
    for file in chunk {
        println!("\t{}", file.display());
    }
    println!();

    let ttl: StreamChunk<i8> = read_stream(chunk, settings.ttl_layout.len())?;
    let normalized = normalize(&ttl.data);
    let edges = detect_all_edges(&normalized);

    println!("TTL inputs:");
    for (idx, (channel, channel_edges)) in settings.ttl_layout.channels().iter().zip(&edges).enumerate() {
        let marker = if idx == settings.sync_channel { " (sync)" } else { "" };
        println!(
            "\t{:<16} onsets: {:>6}  offsets: {:>6}{}",
            channel.name,
            channel_edges.onsets.len(),
            channel_edges.offsets.len(),
            marker
        );
    }
    println!();

    let eeg_counts = chunk
        .iter()
        .map(|f| samples_in_file::<f32>(&matching_eeg_path(f), settings.eeg_channel_count))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to size the matching EEG files")?;
    let reconciliation = reconcile(&eeg_counts, &ttl.sample_counts)?;

    println!("File pairs:");
    for (i, kind) in reconciliation.chunk_types.iter().enumerate() {
        println!(
            "\t{}: EEG {:>10}  TTL {:>10}  {}  co-start: {}  co-terminate: {}",
            i + 1,
            eeg_counts[i],
            ttl.sample_counts[i],
            kind,
            reconciliation.co_start[i],
            reconciliation.co_terminate[i]
        );
    }
    println!("Samples before TTL: {}", reconciliation.samples_before_ttl);
    println!("Samples after TTL: {}", reconciliation.samples_after_ttl);
    if !reconciliation.is_alignable() {
        println!("WARNING: single file pair, this chunk cannot be aligned");
    }
    println!();

    let sync_edges = &edges[settings.sync_channel];
    if let Some(&first) = sync_edges.onsets.first() {
        let shifted = first as i64 + reconciliation.samples_before_ttl;
        println!(
            "First sync pulse at TTL sample {}, EEG sample {} ({:.6} s)",
            first,
            shifted,
            shifted as f64 / settings.aq_freq_hz as f64
        );
    } else {
        println!("WARNING: No sync pulses on {}", settings.sync_channel_name());
    }

    if let Some(block) = &args.block {
        let reader = JsonBlockReader::open(block)?;
        let photometry = reader.read_block(&settings.pulse_sync)?;
        let diagnostics = AlignmentDiagnostics::compute(
            sync_edges,
            &photometry,
            settings.aq_freq_hz,
            settings.duration_tolerance_sec,
        );

        println!();
        println!("Clock cross-checks ({}):", reader.source().display());
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);

        let status = if diagnostics.pulse_counts_match && !diagnostics.exceeds_tolerance {
            "✓ PASS"
        } else {
            "✗ CHECK"
        };
        println!("Result: {}", status);
    }

    Ok(())
}
