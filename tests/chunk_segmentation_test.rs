use anyhow::Result;
use std::path::PathBuf;

use ephys_alignment_toolbox::Error;
use ephys_alignment_toolbox::chunks::{ChunkWindow, file_gaps_minutes, segment};

fn files(times: &[&str]) -> Vec<PathBuf> {
    times
        .iter()
        .map(|t| PathBuf::from(format!("ttl/sub-MLA001_ses-20230101T{}_ttl_in.bin", t)))
        .collect()
}

fn times_of(chunks: &[Vec<PathBuf>]) -> Vec<Vec<String>> {
    chunks
        .iter()
        .map(|chunk| {
            chunk
                .iter()
                .map(|p| {
                    let name = p.file_name().unwrap().to_string_lossy().to_string();
                    name[24..30].to_string()
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_hourly_files_form_one_chunk() -> Result<()> {
    let chunks = segment(&files(&["120000", "130000", "140000"]), 60.0, 5.0)?;
    assert_eq!(times_of(&chunks), vec![vec!["120000", "130000", "140000"]]);
    Ok(())
}

#[test]
fn test_late_file_starts_a_new_chunk() -> Result<()> {
    let chunks = segment(&files(&["120000", "130000", "141000"]), 60.0, 5.0)?;
    assert_eq!(
        times_of(&chunks),
        vec![vec!["120000", "130000"], vec!["141000"]]
    );
    Ok(())
}

#[test]
fn test_short_and_long_gaps_give_singletons() -> Result<()> {
    let chunks = segment(&files(&["120000", "125000", "140000"]), 60.0, 5.0)?;
    assert_eq!(
        times_of(&chunks),
        vec![vec!["120000"], vec!["125000"], vec!["140000"]]
    );
    Ok(())
}

#[test]
fn test_window_bounds_are_inclusive() -> Result<()> {
    let window = ChunkWindow::new(60.0, 5.0);
    assert!(window.is_contiguous(55.0));
    assert!(window.is_contiguous(65.0));
    assert!(!window.is_contiguous(65.5));

    let chunks = segment(&files(&["120000", "125500", "140100"]), 60.0, 5.0)?;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 2);
    Ok(())
}

#[test]
fn test_empty_and_single_inputs() -> Result<()> {
    let empty: Vec<PathBuf> = Vec::new();
    assert!(segment(&empty, 60.0, 5.0)?.is_empty());

    let single = files(&["120000"]);
    assert_eq!(segment(&single, 60.0, 5.0)?, vec![single.clone()]);
    Ok(())
}

#[test]
fn test_file_without_timestamp_is_fatal() {
    let mut listing = files(&["120000", "130000"]);
    listing.push(PathBuf::from("ttl/notes.bin"));

    let result = segment(&listing, 60.0, 5.0);
    assert!(matches!(result, Err(Error::MissingTimestamp { .. })));
}

#[test]
fn test_directory_timestamps_are_ignored() -> Result<()> {
    // Only the file name carries the acquisition timestamp
    let listing = vec![
        PathBuf::from("/data/20990101T000000/file_20230101T120000.bin"),
        PathBuf::from("/data/20990101T000000/file_20230101T130000.bin"),
    ];
    assert_eq!(file_gaps_minutes(&listing)?, vec![60.0]);
    Ok(())
}

#[test]
fn test_resegmenting_is_idempotent() -> Result<()> {
    let listing = files(&[
        "000000", "010000", "020500", "030000", "050000", "060000", "065800", "090000",
    ]);
    let chunks = segment(&listing, 60.0, 5.0)?;

    let flattened: Vec<PathBuf> = chunks.iter().flatten().cloned().collect();
    assert_eq!(flattened, listing);
    assert_eq!(segment(&flattened, 60.0, 5.0)?, chunks);
    Ok(())
}

#[test]
fn test_gaps_inside_chunks_and_at_boundaries() -> Result<()> {
    let listing = files(&[
        "000000", "010000", "020500", "030000", "050000", "060000", "065800", "090000",
    ]);
    let window = ChunkWindow::new(60.0, 5.0);
    let chunks = segment(&listing, 60.0, 5.0)?;

    for chunk in &chunks {
        for gap in file_gaps_minutes(chunk)? {
            assert!(window.is_contiguous(gap), "gap {} inside a chunk", gap);
        }
    }
    for pair in chunks.windows(2) {
        let boundary = vec![pair[0].last().unwrap().clone(), pair[1][0].clone()];
        let gap = file_gaps_minutes(&boundary)?[0];
        assert!(!window.is_contiguous(gap), "gap {} at a chunk boundary", gap);
    }
    Ok(())
}
