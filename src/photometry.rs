//! Access to the independently clocked photometry recording.
//!
//! The vendor block format itself is not decoded here. Blocks are read through
//! [`PhotometryReader`]; the toolbox ships a reader for the JSON pulse export
//! produced next to each block.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Suffix of pulse export files looked up inside a block directory.
pub const PULSE_EXPORT_SUFFIX: &str = "_pulses.json";

/// What the alignment needs from a photometry block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometryBlock {
    /// Onset of every synchronization pulse sent, in seconds on the photometry clock.
    pub pulse_onsets_sec: Vec<f64>,
    /// Duration reported in the block header, in seconds.
    pub duration_sec: f64,
    /// Last sample time of the photometry streams, in seconds.
    pub max_t_sec: f64,
}

impl PhotometryBlock {
    pub fn pulses_sent(&self) -> usize {
        self.pulse_onsets_sec.len()
    }

    /// Seconds between the first and last pulse onsets.
    ///
    /// The last offset is not usable (the block closes while the final pulse
    /// is still high), but onset-to-onset differs by less than a pulse width.
    pub fn epoc_span_sec(&self) -> Option<f64> {
        match (self.pulse_onsets_sec.first(), self.pulse_onsets_sec.last()) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        }
    }
}

pub trait PhotometryReader {
    /// Read the pulse onsets of `sync_store` and the block durations.
    fn read_block(&self, sync_store: &str) -> Result<PhotometryBlock>;

    /// Where the block lives, for reports.
    fn source(&self) -> &Path;
}

/// Key under which an epoc store is exposed.
///
/// Store names shorter than four characters are padded by the acquisition
/// software (`PC0` is stored as `PC0/` and read back as `PC0_`).
pub fn epoc_store_key(name: &str, separator: char) -> String {
    if name.chars().count() < 4 {
        format!("{}{}", name, separator)
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpocExport {
    pub onset: Vec<f64>,
    #[serde(default)]
    pub offset: Vec<f64>,
}

/// On-disk pulse export of one block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseExport {
    pub duration_sec: f64,
    pub max_t_sec: f64,
    pub epocs: BTreeMap<String, EpocExport>,
}

/// Reads a [`PulseExport`] JSON file.
#[derive(Debug, Clone)]
pub struct JsonBlockReader {
    path: PathBuf,
}

impl JsonBlockReader {
    /// `path` is either the export file or a block directory holding exactly
    /// one `*_pulses.json`.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_file() {
            return Ok(Self {
                path: path.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(path).map_err(|e| Error::io(path, e))?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(path, e))?;
            if entry.file_name().to_string_lossy().ends_with(PULSE_EXPORT_SUFFIX) {
                candidates.push(entry.path());
            }
        }

        match candidates.len() {
            1 => Ok(Self {
                path: candidates.remove(0),
            }),
            0 => Err(Error::InvalidConfig(format!(
                "no *{} found in {}",
                PULSE_EXPORT_SUFFIX,
                path.display()
            ))),
            _ => Err(Error::InvalidConfig(format!(
                "more than one *{} in {}: {:?}",
                PULSE_EXPORT_SUFFIX,
                path.display(),
                candidates
            ))),
        }
    }

    pub fn load(&self) -> Result<PulseExport> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl PhotometryReader for JsonBlockReader {
    fn read_block(&self, sync_store: &str) -> Result<PhotometryBlock> {
        let export = self.load()?;
        let key = epoc_store_key(sync_store, '_');

        let epoc = export
            .epocs
            .get(&key)
            .or_else(|| export.epocs.get(sync_store))
            .ok_or_else(|| Error::MissingPulseStore {
                store: key.clone(),
                path: self.path.clone(),
            })?;

        tracing::info!(
            "Read {} pulse onsets from store {} in {}",
            epoc.onset.len(),
            key,
            self.path.display()
        );

        Ok(PhotometryBlock {
            pulse_onsets_sec: epoc.onset.clone(),
            duration_sec: export.duration_sec,
            max_t_sec: export.max_t_sec,
        })
    }

    fn source(&self) -> &Path {
        &self.path
    }
}

/// Write a pulse export, used by the synthetic session generator.
pub fn write_pulse_export(path: &Path, export: &PulseExport) -> Result<()> {
    let contents = serde_json::to_string_pretty(export)?;
    std::fs::write(path, contents).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_store_names_are_padded() {
        assert_eq!(epoc_store_key("PC0", '_'), "PC0_");
        assert_eq!(epoc_store_key("PC0", '/'), "PC0/");
        assert_eq!(epoc_store_key("Sync", '_'), "Sync");
    }
}
