//! Cross-stream sample reconciliation.
//!
//! EEG and TTL captures of a chunk are written by the same box but the TTL
//! stream usually starts (and stops) inside a timer period, so its first and
//! last files hold fewer samples than the EEG files with the same timestamp.
//! Comparing the per-file sample counts tells which file pairs cover the full
//! period and how many EEG samples precede the first TTL sample.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Coverage of one EEG/TTL file pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilePairKind {
    /// Both streams recorded the whole file.
    Full,
    /// One stream started or stopped inside the file.
    Partial,
}

impl std::fmt::Display for FilePairKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilePairKind::Full => write!(f, "Full"),
            FilePairKind::Partial => write!(f, "Partial"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub continuous_chunks: usize,
    pub samples_before_ttl: i64,
    pub samples_after_ttl: i64,
    pub chunk_types: Vec<FilePairKind>,
    pub co_start: Vec<bool>,
    pub co_terminate: Vec<bool>,
}

impl Reconciliation {
    /// A chunk needs a second file pair to corroborate that the streams ran
    /// together past the first file.
    pub fn is_alignable(&self) -> bool {
        self.continuous_chunks > 1
    }
}

/// Classify each file pair and derive the TTL-to-EEG sample offset.
///
/// The lists are parallel: entry `i` of both is the same timestamped file.
/// Intermediate files are contiguous by construction of the chunk, so every
/// pair after the first co-starts, and the first pair co-terminates as soon as
/// another pair follows it.
pub fn reconcile(eeg_sample_counts: &[usize], ttl_sample_counts: &[usize]) -> Result<Reconciliation> {
    if eeg_sample_counts.is_empty() || ttl_sample_counts.is_empty() {
        return Err(Error::NoSamples);
    }
    if eeg_sample_counts.len() != ttl_sample_counts.len() {
        return Err(Error::SampleCountMismatch {
            eeg: eeg_sample_counts.len(),
            ttl: ttl_sample_counts.len(),
        });
    }

    let n = eeg_sample_counts.len();
    let chunk_types: Vec<FilePairKind> = eeg_sample_counts
        .iter()
        .zip(ttl_sample_counts)
        .map(|(eeg, ttl)| if eeg == ttl { FilePairKind::Full } else { FilePairKind::Partial })
        .collect();

    let co_start = (0..n)
        .map(|i| i > 0 || chunk_types[0] == FilePairKind::Full)
        .collect();

    let co_terminate = (0..n)
        .map(|i| if i == 0 { n > 1 } else { chunk_types[i] == FilePairKind::Full })
        .collect();

    let samples_before_ttl = eeg_sample_counts[0] as i64 - ttl_sample_counts[0] as i64;
    let samples_after_ttl = eeg_sample_counts[n - 1] as i64 - ttl_sample_counts[n - 1] as i64;

    Ok(Reconciliation {
        continuous_chunks: n,
        samples_before_ttl,
        samples_after_ttl,
        chunk_types,
        co_start,
        co_terminate,
    })
}
