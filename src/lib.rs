//! Ephys Alignment Toolbox - TTL-pulse alignment of chunked ephys recordings to photometry
//!
//! This crate provides command-line tools and library functions to find the offset between an
//! electrophysiology (EEG/EMG) acquisition box and an independently clocked fiber-photometry
//! system, using the synchronization pulses the photometry system sends to a TTL input of the
//! ephys box.
//!
//! # Overview
//!
//! The ephys box writes one binary capture per timer period (e.g. one hour) for two streams:
//! EEG (float32) and TTL inputs (int8), each channel-interleaved. The TTL stream usually starts
//! after the EEG stream, so the first TTL file of a chunk holds fewer samples than its EEG twin.
//! Aligning a chunk means:
//!
//! - **Segmenting** the capture files into chunks of contiguous recording
//! - **Reading** and stacking the files of a chunk per stream
//! - **Normalizing** the TTL inputs and detecting the sync pulse edges
//! - **Reconciling** the per-file sample counts of both streams
//! - **Aligning** the first received pulse with the photometry block
//!
//! # Command-Line Tools
//!
//! - [`ephys-align`](../ephys_align/index.html) - Align every chunk of a session and write the records
//! - [`ephys-chunks`](../ephys_chunks/index.html) - List the chunks of a session with per-file sample counts
//! - [`ephys-validate`](../ephys_validate/index.html) - Report pulse counts and clock cross-checks without writing
//! - [`ephys-dummy-session`](../ephys_dummy_session/index.html) - Generate a synthetic session
//!
//! # Quick Start
//!
//! ```bash
//! # Generate a synthetic session with two chunks
//! ephys-dummy-session --output demo --chunk-files 3 --chunk-files 2
//!
//! # Inspect its chunks
//! ephys-chunks demo
//!
//! # Align, giving one photometry block per chunk
//! ephys-align demo \
//!   --block demo/photometry/sub-MLA001_ses-20240318T003030_ttl_in_pulses.json \
//!   --block demo/photometry/sub-MLA001_ses-20240318T063030_ttl_in_pulses.json
//! ```
//!
//! # Outputs
//!
//! Every aligned chunk gets an alignment record and a provenance sidecar:
//!
//! ```text
//! <session>/ttl/
//! ├── sub-MLA001_ses-20240318T003030_ttl_in.bin
//! ├── ...
//! ├── sub-MLA001_ses-20240318T003030_ttl_in_alignment_params.yaml
//! └── sub-MLA001_ses-20240318T003030_ttl_in_alignment_run.json
//! ```
//!
//! The record holds `eeg_t0_sec`, `photo_max_t`, `alignment_idx`, `tdt_pulses_sent` and
//! `bonsai_pulses_received`, each as a `{description, value}` mapping.
//!
//! # Library Usage
//!
//! - [`chunks`] - Chunk segmentation by file timestamps
//! - [`stream`] - Binary capture reading
//! - [`ttl`] - TTL normalization and pulse edge detection
//! - [`reconcile`] - Cross-stream sample reconciliation
//! - [`align`] - The alignment engine
//! - [`batch`] - Session-level orchestration
//! - [`record`] - Alignment record and provenance outputs
//!
//! # License
//!
//! This project is licensed under the GNU General Public License v3.0.
//! See LICENSE.md for details.

pub mod align;
pub mod batch;
pub mod channels;
pub mod chunks;
pub mod cli;
pub mod config;
pub mod error;
pub mod photometry;
pub mod prompt;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod stream;
pub mod synthetic;
pub mod ttl;

pub use error::{Error, Result};

use chrono::Datelike;

/// Display GPL license notice for a program
pub fn display_license_notice(program_name: &str) {
    let version = env!("CARGO_PKG_VERSION");
    let current_year = chrono::Utc::now().year();
    let copyright_year = if current_year == 2025 {
        "2025".to_string()
    } else {
        format!("2025-{}", current_year)
    };

    println!("{} {} Copyright (C) {} Raul C. Sîmpetru", program_name, version, copyright_year);
    println!("This program comes with ABSOLUTELY NO WARRANTY.");
    println!("For details see https://www.gnu.org/licenses/gpl-3.0.html#license-text.");
    println!("This is free software, and you are welcome to redistribute it under certain conditions.");
    println!();
}
