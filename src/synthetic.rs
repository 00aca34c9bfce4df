//! Synthetic sessions for demos and tests.
//!
//! A session is laid out like a real acquisition folder:
//!
//! ```text
//! <root>/
//! ├── config.yaml
//! ├── eeg/sub-<id>_ses-<ts>_eeg.bin       float32, interleaved
//! ├── ttl/sub-<id>_ses-<ts>_ttl_in.bin    int8, interleaved
//! └── photometry/<chunk>_pulses.json      one pulse export per chunk
//! ```
//!
//! The TTL stream of every chunk starts `ttl_lead_samples` after the EEG
//! stream and may stop `ttl_tail_samples` early, so the first (and last) file
//! pairs are partial, as on the real rig.

use chrono::{Duration, NaiveDateTime};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE_NAME, SessionConfig, parse_timer_period_minutes};
use crate::error::{Error, Result};
use crate::photometry::{EpocExport, PULSE_EXPORT_SUFFIX, PulseExport, epoc_store_key, write_pulse_export};
use crate::session::{EEG_DIR, StreamKind, TIMESTAMP_FORMAT, TTL_DIR, bids_name};
use crate::stream::write_file;

pub const PHOTOMETRY_DIR: &str = "photometry";

/// Shape of the generated session.
#[derive(Debug, Clone)]
pub struct SyntheticSession {
    pub subject_id: String,
    pub start: NaiveDateTime,
    /// Files per chunk; chunks are separated by a gap of three timer periods.
    pub chunk_files: Vec<usize>,
    pub samples_per_file: usize,
    pub aq_freq_hz: u32,
    pub down_freq_hz: u32,
    pub eeg_channel_names: Vec<String>,
    pub ttl_names: Vec<String>,
    pub pulse_sync: String,
    pub bonsai_timer_period: String,
    /// EEG samples recorded before the TTL stream starts.
    pub ttl_lead_samples: usize,
    /// EEG samples recorded after the TTL stream stops.
    pub ttl_tail_samples: usize,
    /// First pulse onset, in TTL samples.
    pub first_pulse_sample: usize,
    pub pulse_period_samples: usize,
    pub pulse_width_samples: usize,
    /// Pulses sent by the photometry system that never reached the TTL input.
    pub missed_pulses: usize,
    /// Photometry time of the first pulse, in seconds.
    pub photometry_first_pulse_sec: f64,
    pub seed: u64,
}

impl Default for SyntheticSession {
    fn default() -> Self {
        Self {
            subject_id: "MLA001".to_string(),
            start: NaiveDateTime::parse_from_str("20240318T003030", TIMESTAMP_FORMAT).unwrap_or_default(),
            chunk_files: vec![3],
            samples_per_file: 2000,
            aq_freq_hz: 1000,
            down_freq_hz: 100,
            eeg_channel_names: vec!["EEG1".into(), "EEG2".into(), "EMG1".into()],
            ttl_names: vec!["opto".into(), "photometry".into(), "camera".into()],
            pulse_sync: "PC0".to_string(),
            bonsai_timer_period: "01:00:00".to_string(),
            ttl_lead_samples: 128,
            ttl_tail_samples: 0,
            first_pulse_sample: 250,
            pulse_period_samples: 500,
            pulse_width_samples: 50,
            missed_pulses: 0,
            photometry_first_pulse_sec: 12.5,
            seed: 7,
        }
    }
}

/// Files and expected results of one generated chunk.
#[derive(Debug, Clone)]
pub struct GeneratedChunk {
    pub ttl_files: Vec<PathBuf>,
    pub eeg_files: Vec<PathBuf>,
    pub block: PathBuf,
    pub pulses_received: usize,
    pub pulses_sent: usize,
    /// EEG time of the first received pulse.
    pub expected_eeg_t0_sec: f64,
}

#[derive(Debug, Clone)]
pub struct GeneratedSession {
    pub root: PathBuf,
    pub config: SessionConfig,
    pub chunks: Vec<GeneratedChunk>,
}

impl SyntheticSession {
    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            subject_id: self.subject_id.clone(),
            aq_freq_hz: self.aq_freq_hz,
            down_freq_hz: Some(self.down_freq_hz),
            selected_channels: (1..=self.eeg_channel_names.len() as u64)
                .map(|n| serde_yaml::Value::Number(n.into()))
                .collect(),
            channel_names: self.eeg_channel_names.clone(),
            ttl_names: self.ttl_names.clone(),
            pulse_sync: self.pulse_sync.clone(),
            bonsai_timer_period: self.bonsai_timer_period.clone(),
            discontinuity_tolerance_min: crate::config::DEFAULT_DISCONTINUITY_TOLERANCE_MIN,
            duration_tolerance_sec: crate::config::DEFAULT_DURATION_TOLERANCE_SEC,
        }
    }

    /// Write the session under `root`.
    pub fn write(&self, root: &Path) -> Result<GeneratedSession> {
        let config = self.config();
        config.validate()?;
        if self.ttl_lead_samples + self.ttl_tail_samples >= self.samples_per_file {
            return Err(Error::InvalidConfig(
                "TTL lead and tail must leave samples in the first and last file".to_string(),
            ));
        }
        if self.pulse_width_samples == 0 || self.pulse_width_samples >= self.pulse_period_samples {
            return Err(Error::InvalidConfig(
                "pulse width must be positive and shorter than the pulse period".to_string(),
            ));
        }

        for dir in [EEG_DIR, TTL_DIR, PHOTOMETRY_DIR] {
            let path = root.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        }
        let config_path = root.join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, serde_yaml::to_string(&config)?).map_err(|e| Error::io(&config_path, e))?;

        let period_min = parse_timer_period_minutes(&self.bonsai_timer_period)?;
        let period = Duration::seconds((period_min * 60.0).round() as i64);
        let mut rng = fastrand::Rng::with_seed(self.seed);

        let mut chunks = Vec::with_capacity(self.chunk_files.len());
        let mut file_start = self.start;
        for &n_files in &self.chunk_files {
            chunks.push(self.write_chunk(root, n_files, file_start, period, &mut rng)?);
            file_start += period * (n_files as i32 + 3);
        }

        Ok(GeneratedSession {
            root: root.to_path_buf(),
            config,
            chunks,
        })
    }

    fn write_chunk(
        &self,
        root: &Path,
        n_files: usize,
        start: NaiveDateTime,
        period: Duration,
        rng: &mut fastrand::Rng,
    ) -> Result<GeneratedChunk> {
        let ttl_counts: Vec<usize> = (0..n_files)
            .map(|i| {
                let mut count = self.samples_per_file;
                if i == 0 {
                    count -= self.ttl_lead_samples;
                }
                if i + 1 == n_files {
                    count -= self.ttl_tail_samples;
                }
                count
            })
            .collect();
        let ttl_total: usize = ttl_counts.iter().sum();

        // Pulses fully contained in the TTL stream
        let onsets: Vec<usize> = (0..)
            .map(|k| self.first_pulse_sample + k * self.pulse_period_samples)
            .take_while(|onset| onset + self.pulse_width_samples < ttl_total)
            .collect();
        let sync_row = self.ttl_names.iter().position(|n| n.contains("photometry")).unwrap_or(0);
        let level = (sync_row + 1) as i8;

        let mut ttl_stream = vec![0i8; ttl_total];
        for &onset in &onsets {
            for sample in &mut ttl_stream[onset..onset + self.pulse_width_samples] {
                *sample = level;
            }
        }

        let mut ttl_files = Vec::with_capacity(n_files);
        let mut eeg_files = Vec::with_capacity(n_files);
        let mut offset = 0;
        for (i, &ttl_count) in ttl_counts.iter().enumerate() {
            let ts = (start + period * i as i32).format(TIMESTAMP_FORMAT).to_string();

            let ttl_path = root
                .join(TTL_DIR)
                .join(bids_name(&self.subject_id, &ts, StreamKind::Ttl.suffix().trim_start_matches('_')));
            let ttl = Array2::from_shape_fn((self.ttl_names.len(), ttl_count), |(row, col)| {
                if row == sync_row { ttl_stream[offset + col] } else { 0 }
            });
            write_file(&ttl_path, &ttl)?;
            offset += ttl_count;

            let eeg_path = root
                .join(EEG_DIR)
                .join(bids_name(&self.subject_id, &ts, StreamKind::Eeg.suffix().trim_start_matches('_')));
            let eeg = Array2::from_shape_simple_fn((self.eeg_channel_names.len(), self.samples_per_file), || {
                rng.f32() * 200.0 - 100.0
            });
            write_file(&eeg_path, &eeg)?;

            ttl_files.push(ttl_path);
            eeg_files.push(eeg_path);
        }

        let aq = self.aq_freq_hz as f64;
        let sent = onsets.len() + self.missed_pulses;
        let onset_sec: Vec<f64> = (0..sent)
            .map(|k| self.photometry_first_pulse_sec + (k * self.pulse_period_samples) as f64 / aq)
            .collect();
        let offset_sec: Vec<f64> = onset_sec
            .iter()
            .map(|t| t + self.pulse_width_samples as f64 / aq)
            .collect();
        let duration_sec = match (onsets.first(), onsets.last()) {
            (Some(first), Some(last)) => (last + self.pulse_width_samples - first) as f64 / aq,
            _ => 0.0,
        };

        let mut epocs = BTreeMap::new();
        epocs.insert(
            epoc_store_key(&self.pulse_sync, '_'),
            EpocExport {
                onset: onset_sec,
                offset: offset_sec,
            },
        );
        let export = PulseExport {
            duration_sec,
            max_t_sec: self.photometry_first_pulse_sec + duration_sec + 1.0,
            epocs,
        };
        let stem = ttl_files[0]
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let block = root.join(PHOTOMETRY_DIR).join(format!("{}{}", stem, PULSE_EXPORT_SUFFIX));
        write_pulse_export(&block, &export)?;

        Ok(GeneratedChunk {
            ttl_files,
            eeg_files,
            block,
            pulses_received: onsets.len(),
            pulses_sent: sent,
            expected_eeg_t0_sec: onsets
                .first()
                .map(|&first| (first + self.ttl_lead_samples) as f64 / aq)
                .unwrap_or(0.0),
        })
    }
}
