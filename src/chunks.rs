//! Partition a time-ordered file listing into continuous recording chunks.
//!
//! The acquisition software starts a new file every timer period. A gap
//! between two consecutive file timestamps that is not within
//! `expected_delta ± tolerance` minutes marks a discontinuity (crash, manual
//! restart) and starts a new chunk.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::session::file_timestamp;

/// Contiguity window for consecutive file timestamps, in minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkWindow {
    pub expected_delta_min: f64,
    pub tolerance_min: f64,
}

impl ChunkWindow {
    pub fn new(expected_delta_min: f64, tolerance_min: f64) -> Self {
        Self {
            expected_delta_min,
            tolerance_min,
        }
    }

    pub fn lower(&self) -> f64 {
        self.expected_delta_min - self.tolerance_min
    }

    pub fn upper(&self) -> f64 {
        self.expected_delta_min + self.tolerance_min
    }

    /// Whether a gap between two file starts keeps them in the same chunk.
    pub fn is_contiguous(&self, delta_min: f64) -> bool {
        delta_min >= self.lower() && delta_min <= self.upper()
    }
}

/// Minutes between the embedded timestamps of each pair of consecutive files.
pub fn file_gaps_minutes<P: AsRef<Path>>(files: &[P]) -> Result<Vec<f64>> {
    let times = files
        .iter()
        .map(|f| file_timestamp(f.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok(times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds() as f64 / 60.0)
        .collect())
}

/// Split `files` at every discontinuity, keeping the original order.
///
/// An empty listing yields no chunks. A file without a timestamp is an error,
/// never skipped.
pub fn segment<P: AsRef<Path>>(
    files: &[P],
    expected_delta_min: f64,
    tolerance_min: f64,
) -> Result<Vec<Vec<PathBuf>>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let window = ChunkWindow::new(expected_delta_min, tolerance_min);
    let gaps = file_gaps_minutes(files)?;

    let mut chunks = Vec::new();
    let mut current = vec![files[0].as_ref().to_path_buf()];
    for (gap, file) in gaps.iter().zip(files.iter().skip(1)) {
        if !window.is_contiguous(*gap) {
            tracing::debug!(
                "Discontinuity of {:.2} min before {} (window [{:.2}, {:.2}])",
                gap,
                file.as_ref().display(),
                window.lower(),
                window.upper()
            );
            chunks.push(std::mem::take(&mut current));
        }
        current.push(file.as_ref().to_path_buf());
    }
    chunks.push(current);

    Ok(chunks)
}
