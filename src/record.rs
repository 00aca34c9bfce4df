//! Alignment outputs: the parameter record and its provenance sidecar.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::align::AlignmentDiagnostics;
use crate::error::{Error, Result};
use crate::reconcile::Reconciliation;

/// File name of the record when a batch run writes to an output directory.
pub const BATCH_RECORD_NAME: &str = "alignment_params.yaml";
/// File name of the provenance sidecar in batch output directories.
pub const BATCH_PROVENANCE_NAME: &str = "alignment_run.json";

/// Result of aligning one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub eeg_t0_sec: f64,
    pub photo_max_t: f64,
    pub alignment_idx: usize,
    pub tdt_pulses_sent: usize,
    pub bonsai_pulses_received: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Described<T> {
    pub description: String,
    pub value: T,
}

impl<T> Described<T> {
    fn new(description: &str, value: T) -> Self {
        Self {
            description: description.to_string(),
            value,
        }
    }
}

/// Layout of the YAML sidecar; field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParamsFile {
    pub eeg_t0_sec: Described<f64>,
    pub photo_max_t: Described<f64>,
    pub alignment_idx: Described<usize>,
    pub tdt_pulses_sent: Described<usize>,
    pub bonsai_pulses_received: Described<usize>,
}

impl From<&AlignmentRecord> for AlignmentParamsFile {
    fn from(record: &AlignmentRecord) -> Self {
        Self {
            eeg_t0_sec: Described::new(
                "the time in seconds to subtract from the time vector on the ephys recording",
                record.eeg_t0_sec,
            ),
            photo_max_t: Described::new(
                "the maximum time in photometry recording in seconds",
                record.photo_max_t,
            ),
            alignment_idx: Described::new(
                "The index on bonsai_pulse_onset used for alignment. pulse_onset[alignment_idx] should be eeg_t0_sec. This index is zero (the first pulse) for chunked recordings",
                record.alignment_idx,
            ),
            tdt_pulses_sent: Described::new("the number of pulses sent by TDT", record.tdt_pulses_sent),
            bonsai_pulses_received: Described::new(
                "the number of pulses received by bonsai",
                record.bonsai_pulses_received,
            ),
        }
    }
}

impl From<AlignmentParamsFile> for AlignmentRecord {
    fn from(file: AlignmentParamsFile) -> Self {
        Self {
            eeg_t0_sec: file.eeg_t0_sec.value,
            photo_max_t: file.photo_max_t.value,
            alignment_idx: file.alignment_idx.value,
            tdt_pulses_sent: file.tdt_pulses_sent.value,
            bonsai_pulses_received: file.bonsai_pulses_received.value,
        }
    }
}

impl AlignmentRecord {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&AlignmentParamsFile::from(self))?)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let file: AlignmentParamsFile = serde_yaml::from_str(contents)?;
        Ok(file.into())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&contents)
    }

    /// Write the record, replacing any previous one in a single rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomically(path, self.to_yaml()?.as_bytes())
    }
}

/// Audit trail written next to each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProvenance {
    pub run_id: String,
    pub created_at: String,
    pub hostname: String,
    pub tool_version: String,
    pub subject_id: String,
    pub session_id: String,
    pub mode: String,
    pub ttl_files: Vec<PathBuf>,
    pub eeg_files: Vec<PathBuf>,
    pub eeg_sample_counts: Vec<usize>,
    pub ttl_sample_counts: Vec<usize>,
    pub photometry_source: PathBuf,
    pub samples_to_add: i64,
    pub reconciliation: Option<Reconciliation>,
    pub diagnostics: AlignmentDiagnostics,
    pub record: AlignmentRecord,
}

impl RunProvenance {
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomically(path, contents.as_bytes())
    }
}

/// Identity of the machine and run, filled into [`RunProvenance`].
#[derive(Debug, Clone)]
pub struct RunStamp {
    pub run_id: String,
    pub created_at: String,
    pub hostname: String,
}

pub fn run_stamp() -> RunStamp {
    RunStamp {
        run_id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        hostname: hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
    }
}

/// Where the outputs of a chunk go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub record: PathBuf,
    pub provenance: PathBuf,
}

impl OutputPaths {
    /// `<ttl_dir>/<stem>_alignment_params.yaml`, next to the first TTL file.
    pub fn beside_ttl(first_ttl: &Path) -> Self {
        let dir = first_ttl.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let stem = first_ttl
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            record: dir.join(format!("{}_alignment_params.yaml", stem)),
            provenance: dir.join(format!("{}_alignment_run.json", stem)),
        }
    }

    /// `<output_dir>/<stem>/alignment_params.yaml` for batch runs.
    pub fn in_output_dir(output_dir: &Path, first_ttl: &Path) -> Self {
        let stem = first_ttl
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = output_dir.join(stem);
        Self {
            record: dir.join(BATCH_RECORD_NAME),
            provenance: dir.join(BATCH_PROVENANCE_NAME),
        }
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
    tmp.write_all(contents).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_keeps_field_order_and_shape() {
        let record = AlignmentRecord {
            eeg_t0_sec: 3201.5,
            photo_max_t: 5400.25,
            alignment_idx: 0,
            tdt_pulses_sent: 90,
            bonsai_pulses_received: 90,
        };
        let yaml = record.to_yaml().unwrap();

        let keys: Vec<&str> = yaml
            .lines()
            .filter(|l| !l.starts_with(' '))
            .map(|l| l.trim_end_matches(':'))
            .collect();
        assert_eq!(
            keys,
            vec!["eeg_t0_sec", "photo_max_t", "alignment_idx", "tdt_pulses_sent", "bonsai_pulses_received"]
        );
        assert!(yaml.contains("  value: 3201.5"));
        assert_eq!(AlignmentRecord::from_yaml(&yaml).unwrap(), record);
    }

    #[test]
    fn output_paths_follow_first_ttl_file() {
        let ttl = Path::new("/s/ttl/sub-A_ses-20240318T003030_ttl_in.bin");
        let beside = OutputPaths::beside_ttl(ttl);
        assert_eq!(
            beside.record,
            PathBuf::from("/s/ttl/sub-A_ses-20240318T003030_ttl_in_alignment_params.yaml")
        );

        let batch = OutputPaths::in_output_dir(Path::new("/out"), ttl);
        assert_eq!(
            batch.record,
            PathBuf::from("/out/sub-A_ses-20240318T003030_ttl_in/alignment_params.yaml")
        );
    }
}
