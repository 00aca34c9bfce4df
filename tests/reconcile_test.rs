use anyhow::Result;

use ephys_alignment_toolbox::Error;
use ephys_alignment_toolbox::reconcile::{FilePairKind, reconcile};

#[test]
fn test_partial_first_file() -> Result<()> {
    let result = reconcile(&[3600128, 3600128], &[399360, 3600128])?;

    assert_eq!(result.continuous_chunks, 2);
    assert_eq!(result.chunk_types, vec![FilePairKind::Partial, FilePairKind::Full]);
    assert_eq!(result.co_start, vec![false, true]);
    assert_eq!(result.co_terminate, vec![true, true]);
    assert_eq!(result.samples_before_ttl, 3200768);
    assert_eq!(result.samples_after_ttl, 0);
    assert!(result.is_alignable());
    Ok(())
}

#[test]
fn test_identical_counts_are_full() -> Result<()> {
    let counts = [1000, 1000, 1000, 640];
    let result = reconcile(&counts, &counts)?;

    assert!(result.chunk_types.iter().all(|k| *k == FilePairKind::Full));
    assert_eq!(result.samples_before_ttl, 0);
    assert_eq!(result.samples_after_ttl, 0);
    assert!(result.co_start.iter().all(|&s| s));
    assert!(result.co_terminate.iter().all(|&t| t));
    Ok(())
}

#[test]
fn test_partial_last_file() -> Result<()> {
    let result = reconcile(&[1000, 1000, 1000], &[872, 1000, 600])?;

    assert_eq!(
        result.chunk_types,
        vec![FilePairKind::Partial, FilePairKind::Full, FilePairKind::Partial]
    );
    assert_eq!(result.co_start, vec![false, true, true]);
    assert_eq!(result.co_terminate, vec![true, true, false]);
    assert_eq!(result.samples_before_ttl, 128);
    assert_eq!(result.samples_after_ttl, 400);
    Ok(())
}

#[test]
fn test_single_pair_cannot_align() -> Result<()> {
    for (eeg, ttl) in [(1000, 1000), (1000, 10), (5, 7)] {
        let result = reconcile(&[eeg], &[ttl])?;
        assert_eq!(result.continuous_chunks, 1);
        assert_eq!(result.co_terminate, vec![false]);
        assert!(!result.is_alignable());
    }
    Ok(())
}

#[test]
fn test_invalid_inputs_are_fatal() {
    assert!(matches!(
        reconcile(&[1, 2], &[1]),
        Err(Error::SampleCountMismatch { eeg: 2, ttl: 1 })
    ));
    assert!(matches!(reconcile(&[], &[]), Err(Error::NoSamples)));
}
