//! Acquisition file naming: timestamps, stream kinds and TTL/EEG matching.
//!
//! Files written by the acquisition box follow
//! `sub-<id>_ses-<YYYYMMDDTHHMMSS>_<kind>.bin`, with EEG files under
//! `<session>/eeg/` and TTL files under `<session>/ttl/`.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{Error, Result};

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}T\d{6}").expect("static timestamp pattern"));

pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

pub const EEG_DIR: &str = "eeg";
pub const TTL_DIR: &str = "ttl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Eeg,
    Ttl,
}

impl StreamKind {
    /// Classify a file name by its stream suffix.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".bin")?;
        if stem.ends_with("_ttl_in") {
            Some(StreamKind::Ttl)
        } else if stem.ends_with("_eeg") {
            Some(StreamKind::Eeg)
        } else {
            None
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            StreamKind::Eeg => "_eeg.bin",
            StreamKind::Ttl => "_ttl_in.bin",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            StreamKind::Eeg => EEG_DIR,
            StreamKind::Ttl => TTL_DIR,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Eeg => write!(f, "EEG"),
            StreamKind::Ttl => write!(f, "TTL"),
        }
    }
}

/// The raw `YYYYMMDDTHHMMSS` token embedded in `name`.
pub fn timestamp_token(name: &str) -> Result<&str> {
    TIMESTAMP_RE
        .find(name)
        .map(|m| m.as_str())
        .ok_or_else(|| Error::MissingTimestamp {
            name: name.to_string(),
        })
}

/// Parse the creation timestamp embedded in a file name or path.
pub fn parse_timestamp(name: &str) -> Result<NaiveDateTime> {
    let token = timestamp_token(name)?;
    NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT).map_err(|source| Error::InvalidTimestamp {
        value: token.to_string(),
        source,
    })
}

/// Parse the creation timestamp embedded in the file name of `path`.
pub fn file_timestamp(path: &Path) -> Result<NaiveDateTime> {
    parse_timestamp(&file_name_of(path))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// A single binary capture file of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionFile {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
    pub kind: StreamKind,
}

impl AcquisitionFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = file_name_of(&path);
        let kind = StreamKind::from_file_name(&name).ok_or_else(|| {
            Error::InvalidConfig(format!("{} is neither an EEG nor a TTL capture file", name))
        })?;
        let timestamp = parse_timestamp(&name)?;
        Ok(Self { path, timestamp, kind })
    }
}

/// List the capture files of `kind` in `dir`, ordered by embedded timestamp.
pub fn list_stream_files(dir: &Path, kind: StreamKind) -> Result<Vec<AcquisitionFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = file_name_of(&path);
        if StreamKind::from_file_name(&name) != Some(kind) {
            continue;
        }
        files.push(AcquisitionFile::from_path(path)?);
    }

    files.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

/// Path of the EEG capture recorded alongside `ttl_path`.
///
/// The EEG file shares the timestamp; it lives in the sibling `eeg/` folder
/// when the TTL file sits in a `ttl/` folder, and `ttl_in` becomes `eeg` in
/// the file name.
pub fn matching_eeg_path(ttl_path: &Path) -> PathBuf {
    let name = file_name_of(ttl_path).replace("ttl_in", "eeg");
    let parent = ttl_path.parent().unwrap_or_else(|| Path::new(""));

    let is_ttl_dir = parent.file_name().map(|n| n == TTL_DIR).unwrap_or(false);
    let dir = if is_ttl_dir {
        parent
            .parent()
            .map(|p| p.join(EEG_DIR))
            .unwrap_or_else(|| PathBuf::from(EEG_DIR))
    } else {
        parent.to_path_buf()
    };

    dir.join(name)
}

/// Session identifier of a chunk: the timestamp token of its first file.
pub fn session_id<P: AsRef<Path>>(files: &[P]) -> Result<String> {
    let first = files.first().ok_or(Error::EmptyFileList)?;
    let name = file_name_of(first.as_ref());
    Ok(timestamp_token(&name)?.to_string())
}

/// File stem used to name the sidecar outputs of a chunk.
pub fn first_stem<P: AsRef<Path>>(files: &[P]) -> Result<String> {
    let first = files.first().ok_or(Error::EmptyFileList)?;
    Ok(first
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default())
}

/// BIDS-like file name for a session product.
pub fn bids_name(subject_id: &str, session_id: &str, suffix: &str) -> String {
    format!("sub-{}_ses-{}_{}", subject_id, session_id.replace('-', ""), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_stream_kind_once() {
        assert_eq!(
            StreamKind::from_file_name("sub-A1_ses-20240318T003030_ttl_in.bin"),
            Some(StreamKind::Ttl)
        );
        assert_eq!(
            StreamKind::from_file_name("sub-A1_ses-20240318T003030_eeg.bin"),
            Some(StreamKind::Eeg)
        );
        assert_eq!(StreamKind::from_file_name("sub-A1_ses-20240318T003030_video.avi"), None);
    }

    #[test]
    fn eeg_path_swaps_directory_and_suffix() {
        let ttl = Path::new("/data/MLA148/2024-03-18/ttl/sub-MLA148_ses-20240318T003030_ttl_in.bin");
        assert_eq!(
            matching_eeg_path(ttl),
            PathBuf::from("/data/MLA148/2024-03-18/eeg/sub-MLA148_ses-20240318T003030_eeg.bin")
        );

        let flat = Path::new("/data/sub-MLA148_ses-20240318T003030_ttl_in.bin");
        assert_eq!(
            matching_eeg_path(flat),
            PathBuf::from("/data/sub-MLA148_ses-20240318T003030_eeg.bin")
        );
    }

    #[test]
    fn bids_name_strips_dashes() {
        assert_eq!(
            bids_name("MLA148", "2024-03-18", "eeg.csv.gz"),
            "sub-MLA148_ses-20240318_eeg.csv.gz"
        );
    }
}
