//! Ephys Dummy Session - Synthetic session generator
//!
//! Writes a session folder with a config.yaml, chunked EEG and TTL captures
//! (the first TTL file of each chunk starts late) and one photometry pulse
//! export per chunk. Useful to try the other tools without a rig.
//!
//! # Usage
//!
//! ```bash
//! ephys-dummy-session --output demo
//! ephys-dummy-session --output demo --chunk-files 4 --chunk-files 2 --ttl-lead 128
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ephys_alignment_toolbox::synthetic::SyntheticSession;

#[derive(Parser)]
#[command(name = "ephys-dummy-session")]
#[command(about = "Generate a synthetic ephys/photometry session")]
#[command(version)]
struct Args {
    /// Output session folder
    #[arg(long, short = 'o', default_value = "dummy-session")]
    output: PathBuf,

    /// Subject identifier
    #[arg(long, default_value = "MLA001")]
    subject: String,

    /// Files per chunk (repeat for several chunks)
    #[arg(long = "chunk-files", default_values_t = vec![3])]
    chunk_files: Vec<usize>,

    /// Samples per EEG file
    #[arg(long, default_value = "2000")]
    samples_per_file: usize,

    /// Sampling rate in Hz
    #[arg(long, default_value = "1000")]
    sample_rate: u32,

    /// EEG samples recorded before the TTL stream starts
    #[arg(long, default_value = "128")]
    ttl_lead: usize,

    /// EEG samples recorded after the TTL stream stops
    #[arg(long, default_value = "0")]
    ttl_tail: usize,

    /// Samples between sync pulse onsets
    #[arg(long, default_value = "500")]
    pulse_period: usize,

    /// Sync pulse width in samples
    #[arg(long, default_value = "50")]
    pulse_width: usize,

    /// Pulses sent by photometry but not received on the TTL input
    #[arg(long, default_value = "0")]
    missed_pulses: usize,

    /// Random seed for the EEG noise
    #[arg(long, default_value = "7")]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    ephys_alignment_toolbox::display_license_notice("ephys-dummy-session");

    let session = SyntheticSession {
        subject_id: args.subject.clone(),
        chunk_files: args.chunk_files.clone(),
        samples_per_file: args.samples_per_file,
        aq_freq_hz: args.sample_rate,
        down_freq_hz: (args.sample_rate / 10).max(1),
        ttl_lead_samples: args.ttl_lead,
        ttl_tail_samples: args.ttl_tail,
        pulse_period_samples: args.pulse_period,
        pulse_width_samples: args.pulse_width,
        missed_pulses: args.missed_pulses,
        seed: args.seed,
        ..SyntheticSession::default()
    };

    println!("Ephys Dummy Session Generator");
    println!("=============================");
    println!("Output:\t\t{}", args.output.display());
    println!("Subject:\t{}", session.subject_id);
    println!("Chunks:\t\t{:?} files", session.chunk_files);
    println!("Samples/file:\t{}", session.samples_per_file);
    println!("Sample rate:\t{} Hz", session.aq_freq_hz);
    println!("TTL lead:\t{} samples", session.ttl_lead_samples);
    println!("Pulses:\tevery {} samples, {} wide", session.pulse_period_samples, session.pulse_width_samples);
    println!();

    let generated = session
        .write(&args.output)
        .with_context(|| format!("Failed to write session to {}", args.output.display()))?;

    for (idx, chunk) in generated.chunks.iter().enumerate() {
        println!("Chunk {}:", idx + 1);
        println!("\tFiles:\t\t{}", chunk.ttl_files.len());
        println!("\tBlock:\t\t{}", chunk.block.display());
        println!("\tPulses:\t\t{} sent, {} received", chunk.pulses_sent, chunk.pulses_received);
        println!("\tExpected eeg_t0_sec: {:.6}", chunk.expected_eeg_t0_sec);
    }
    println!();
    println!("✓ Session written to {}", generated.root.display());
    Ok(())
}
