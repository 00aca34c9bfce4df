use ndarray::{Array1, Array2, array};

use ephys_alignment_toolbox::ttl::{detect_all_edges, detect_edges, normalize};

fn pulse(len: usize, onset: usize, width: usize) -> Array1<f64> {
    Array1::from_shape_fn(len, |i| if i >= onset && i < onset + width { 1.0 } else { 0.0 })
}

#[test]
fn test_single_pulse_edges() {
    for (k, w) in [(1, 1), (5, 3), (10, 40)] {
        let edges = detect_edges(pulse(64, k, w).view());
        assert_eq!(edges.onsets, vec![k]);
        assert_eq!(edges.offsets, vec![k + w]);
        assert_eq!(edges.span_samples(), Some(w));
    }
}

#[test]
fn test_channel_high_at_start_has_onset_at_zero() {
    let edges = detect_edges(array![1.0, 1.0, 0.0, 0.0, 1.0].view());
    assert_eq!(edges.onsets, vec![0, 4]);
    assert_eq!(edges.offsets, vec![2]);
    assert_eq!(edges.pulse_count(), 2);
}

#[test]
fn test_flat_channel_has_no_edges() {
    let edges = detect_edges(Array1::<f64>::zeros(16).view());
    assert!(edges.onsets.is_empty());
    assert!(edges.offsets.is_empty());
    assert_eq!(edges.span_samples(), None);
}

#[test]
fn test_normalized_rows_peak_at_one_or_stay_zero() {
    let ttl: Array2<i8> = array![
        [0, 1, 1, 0, 1],
        [0, 2, 0, 2, 0],
        [0, 0, 0, 0, 0],
        [8, 0, 8, 8, 0]
    ];
    let normalized = normalize(&ttl);

    for (row, input) in normalized.rows().into_iter().zip(ttl.rows()) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if input.iter().any(|&v| v != 0) {
            assert_eq!(max, 1.0);
        } else {
            assert!(row.iter().all(|&v| v == 0.0));
        }
    }
    assert_eq!(normalized.row(1).to_vec(), vec![0.0, 1.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_edges_of_every_channel() {
    let ttl: Array2<i8> = array![[0, 2, 2, 0, 0, 2], [0, 0, 0, 0, 0, 0]];
    let edges = detect_all_edges(&normalize(&ttl));

    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].onsets, vec![1, 5]);
    assert_eq!(edges[0].offsets, vec![3]);
    assert_eq!(edges[1].pulse_count(), 0);
}
