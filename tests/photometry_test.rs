use anyhow::Result;
use std::collections::BTreeMap;

use ephys_alignment_toolbox::Error;
use ephys_alignment_toolbox::photometry::{EpocExport, JsonBlockReader, PhotometryReader, PulseExport, write_pulse_export};

fn export(key: &str) -> PulseExport {
    let mut epocs = BTreeMap::new();
    epocs.insert(
        key.to_string(),
        EpocExport {
            onset: vec![10.0, 10.5, 11.0, 11.5],
            offset: vec![10.05, 10.55, 11.05],
        },
    );
    PulseExport {
        duration_sec: 1.6,
        max_t_sec: 20.0,
        epocs,
    }
}

#[test]
fn test_block_folder_with_one_export() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_pulse_export(&dir.path().join("block-1_pulses.json"), &export("PC0_"))?;
    std::fs::write(dir.path().join("notes.txt"), "not an export")?;

    let reader = JsonBlockReader::open(dir.path())?;
    let block = reader.read_block("PC0")?;

    assert_eq!(block.pulses_sent(), 4);
    assert_eq!(block.max_t_sec, 20.0);
    assert!((block.epoc_span_sec().unwrap() - 1.5).abs() < 1e-12);
    assert!(reader.source().ends_with("block-1_pulses.json"));
    Ok(())
}

#[test]
fn test_missing_store_is_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("block_pulses.json");
    write_pulse_export(&path, &export("Sync"))?;

    let reader = JsonBlockReader::open(&path)?;
    assert!(reader.read_block("Sync").is_ok());
    assert!(matches!(reader.read_block("PC1"), Err(Error::MissingPulseStore { .. })));
    Ok(())
}

#[test]
fn test_ambiguous_block_folder() -> Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(JsonBlockReader::open(dir.path()).is_err());

    write_pulse_export(&dir.path().join("a_pulses.json"), &export("PC0_"))?;
    write_pulse_export(&dir.path().join("b_pulses.json"), &export("PC0_"))?;
    assert!(JsonBlockReader::open(dir.path()).is_err());
    Ok(())
}
