//! Ephys Align - TTL-pulse alignment of a recording session to photometry blocks
//!
//! Segments the TTL captures of a session into chunks of contiguous recording,
//! reconciles each chunk with its EEG captures and writes the offset between the
//! ephys and photometry clocks.
//!
//! # Usage
//!
//! ```bash
//! # Align every chunk, prompting for the photometry block of each one
//! ephys-align /data/MLA001/session1
//!
//! # Give the blocks up front (one per chunk in chunk order, single-file chunks included)
//! ephys-align /data/MLA001/session1 --block /photo/block1 --block /photo/block2
//!
//! # Collect the outputs in one folder and stop at the first failure
//! ephys-align /data/MLA001/session1 --output-dir aligned --fail-fast
//!
//! # Historical single-file layout
//! ephys-align /data/MLA001 --single-file ttl/sub-MLA001_ses-20230101T120000_ttl_in.bin --block /photo/block1
//! ```
//!
//! # Output
//!
//! For each chunk, next to its first TTL file (or under `--output-dir`):
//! - `<first TTL file>_alignment_params.yaml`: the alignment record
//! - `<first TTL file>_alignment_run.json`: files, reconciliation and clock cross-checks

use anyhow::{Context, Result};
use clap::Parser;

use ephys_alignment_toolbox::align::SkipEegProcessing;
use ephys_alignment_toolbox::batch::{BlockSource, ListedBlocks, align_session, align_single_session_file};
use ephys_alignment_toolbox::cli::Args;
use ephys_alignment_toolbox::config::read_config;
use ephys_alignment_toolbox::prompt::PromptedBlocks;

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.quiet {
        tracing_subscriber::fmt::init();
        ephys_alignment_toolbox::display_license_notice("ephys-align");
    }

    let config = read_config(args.config_folder())
        .with_context(|| format!("Failed to read the configuration in {}", args.config_folder().display()))?;

    if !args.quiet {
        println!("╔════════════════════════════════════════════════════════════════╗");
        println!("║              Ephys / Photometry Alignment                      ║");
        println!("╚════════════════════════════════════════════════════════════════╝");
        println!();
        println!("Session: {}", args.session_dir.display());
        println!("Subject: {}", config.subject_id);
        println!("Sampling rate: {} Hz", config.aq_freq_hz);
        println!("Timer period: {}", config.bonsai_timer_period);
        println!("Sync store: {}", config.pulse_sync);
        println!();
    }

    if args.verbose {
        let started_at = chrono::Utc::now().to_rfc3339();
        println!("Run configuration:");
        println!("{}", args.to_run_config_json(Some(started_at))?);
        println!();
    }

    if let Some(ttl_file) = &args.single_file {
        let block = match args.blocks.as_slice() {
            [block] => block,
            _ => anyhow::bail!("--single-file needs exactly one --block"),
        };
        let report = align_single_session_file(ttl_file, &config, block, args.output_dir.as_deref())
            .with_context(|| format!("Failed to align {}", ttl_file.display()))?;

        println!("eeg_t0_sec: {:.6}", report.eeg_t0_sec);
        println!("Pulses: sent {}, received {}", report.pulses_sent, report.pulses_received);
        println!("Record: {}", report.outputs.record.display());
        return Ok(());
    }

    let mut listed;
    let mut prompted;
    let blocks: &mut dyn BlockSource = if args.blocks.is_empty() {
        prompted = PromptedBlocks::stdin();
        &mut prompted
    } else {
        listed = ListedBlocks::new(args.blocks.clone());
        &mut listed
    };

    let outcomes = align_session(
        &args.session_dir,
        &config,
        blocks,
        &mut SkipEegProcessing,
        &args.batch_options(),
    )
    .with_context(|| format!("Failed to align session {}", args.session_dir.display()))?;

    println!();
    println!("Summary:");
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                let flag = if report.exceeds_tolerance { " (check clocks)" } else { "" };
                println!(
                    "\t✓ Chunk {} ({} files): eeg_t0_sec = {:.6}, samples added = {}, pulses {}/{}{}",
                    outcome.index + 1,
                    outcome.file_count,
                    report.eeg_t0_sec,
                    report.samples_to_add,
                    report.pulses_received,
                    report.pulses_sent,
                    flag
                );
                println!("\t  {}", report.outputs.record.display());
            }
            Err(e) => {
                failed += 1;
                println!(
                    "\t✗ Chunk {} ({} files, {}): {}",
                    outcome.index + 1,
                    outcome.file_count,
                    outcome.first_ttl.display(),
                    e
                );
            }
        }
    }

    if outcomes.is_empty() {
        println!("WARNING: No TTL files found");
    }
    if failed > 0 {
        anyhow::bail!("{} of {} chunk(s) could not be aligned", failed, outcomes.len());
    }
    Ok(())
}
