use anyhow::Result;
use ndarray::{Array2, array};
use std::path::PathBuf;

use ephys_alignment_toolbox::Error;
use ephys_alignment_toolbox::stream::{StreamChunk, read_file, read_stream, samples_in_file, write_file};

#[test]
fn test_interleaved_samples_become_channel_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sub-A_ses-20240318T003030_eeg.bin");

    // s0c0 s0c1 s0c2 s1c0 s1c1 s1c2
    let values: [f32; 6] = [1.0, 10.0, 100.0, 2.0, 20.0, 200.0];
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&path, bytes)?;

    let matrix: Array2<f32> = read_file(&path, 3)?;
    assert_eq!(matrix, array![[1.0, 2.0], [10.0, 20.0], [100.0, 200.0]]);
    assert_eq!(samples_in_file::<f32>(&path, 3)?, 2);
    Ok(())
}

#[test]
fn test_files_stack_in_listing_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = dir.path().join("a_ttl_in.bin");
    let second = dir.path().join("b_ttl_in.bin");
    write_file(&first, &array![[1i8, 0, 1], [0, 2, 0]])?;
    write_file(&second, &array![[0i8, 0, 0, 1, 1], [2, 2, 0, 0, 0]])?;

    let chunk: StreamChunk<i8> = read_stream(&[&first, &second], 2)?;
    assert_eq!(chunk.sample_counts, vec![3, 5]);
    assert_eq!(chunk.n_channels(), 2);
    assert_eq!(chunk.n_samples(), 8);
    assert_eq!(chunk.data.row(0).to_vec(), vec![1, 0, 1, 0, 0, 0, 1, 1]);
    assert_eq!(chunk.data.row(1).to_vec(), vec![0, 2, 0, 2, 2, 0, 0, 0]);
    assert_eq!(chunk.files, vec![first.clone(), second.clone()]);

    let reversed: StreamChunk<i8> = read_stream(&[&second, &first], 2)?;
    assert_eq!(reversed.sample_counts, vec![5, 3]);
    assert_eq!(reversed.data.row(0).to_vec(), vec![0, 0, 0, 1, 1, 1, 0, 1]);
    Ok(())
}

#[test]
fn test_int16_captures() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("c.bin");
    let original = array![[-300i16, 300], [7, -7]];
    write_file(&path, &original)?;

    let matrix: Array2<i16> = read_file(&path, 2)?;
    assert_eq!(matrix, original);
    Ok(())
}

#[test]
fn test_truncated_capture_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("truncated_eeg.bin");
    // 5 float32 values cannot hold whole samples of 2 channels
    std::fs::write(&path, vec![0u8; 5 * 4])?;

    let result: Result<StreamChunk<f32>, Error> = read_stream(&[&path], 2);
    assert!(matches!(result, Err(Error::TruncatedFile { values: 5, channel_count: 2, .. })));

    std::fs::write(&path, vec![0u8; 6])?;
    let result = read_file::<f32>(&path, 1);
    assert!(matches!(result, Err(Error::MisalignedBytes { bytes: 6, element_size: 4, .. })));
    Ok(())
}

#[test]
fn test_preconditions() {
    let none: Vec<PathBuf> = Vec::new();
    assert!(matches!(read_stream::<i8, _>(&none, 2), Err(Error::EmptyFileList)));
    assert!(matches!(
        read_stream::<i8, _>(&[PathBuf::from("missing.bin")], 0),
        Err(Error::NoChannels)
    ));
    assert!(matches!(
        read_stream::<i8, _>(&[PathBuf::from("/does/not/exist.bin")], 2),
        Err(Error::Io { .. })
    ));
}
