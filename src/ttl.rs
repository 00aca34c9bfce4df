//! TTL channel normalization and pulse edge detection.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::stream::RawSample;

/// Rescale every channel so its active level reads 1.
///
/// The I/O board encodes each input with its own level (1, 2, ... 8). Each row
/// is divided by its maximum; rows whose maximum is 0 are divided by 1 and so
/// stay at zero.
pub fn normalize<T: RawSample>(ttl: &Array2<T>) -> Array2<f64> {
    let mut out = ttl.mapv(RawSample::to_f64);
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let divisor = if max == 0.0 || !max.is_finite() { 1.0 } else { max };
        row.mapv_inplace(|v| v / divisor);
    }
    out
}

/// Rising and falling edges of one normalized TTL channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseEdges {
    pub onsets: Vec<usize>,
    pub offsets: Vec<usize>,
}

impl PulseEdges {
    pub fn pulse_count(&self) -> usize {
        self.onsets.len()
    }

    /// Samples between the first onset and the last offset.
    pub fn span_samples(&self) -> Option<usize> {
        match (self.onsets.first(), self.offsets.last()) {
            (Some(&first), Some(&last)) if last >= first => Some(last - first),
            _ => None,
        }
    }
}

/// Onset and offset sample indices of a {0, 1} series.
///
/// The series is differenced against an implicit leading zero, so a channel
/// already high at sample 0 has an onset at 0. Inputs are expected to be
/// normalized; multi-level inputs produce an edge at every level change.
pub fn detect_edges(series: ArrayView1<f64>) -> PulseEdges {
    let mut edges = PulseEdges::default();
    let mut previous = 0.0;
    for (idx, &value) in series.iter().enumerate() {
        let diff = value - previous;
        if diff > 0.0 {
            edges.onsets.push(idx);
        } else if diff < 0.0 {
            edges.offsets.push(idx);
        }
        previous = value;
    }
    edges
}

/// Edges of every channel of a normalized TTL matrix.
pub fn detect_all_edges(normalized: &Array2<f64>) -> Vec<PulseEdges> {
    normalized.axis_iter(Axis(0)).map(detect_edges).collect()
}
