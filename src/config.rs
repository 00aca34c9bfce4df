use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the session configuration file looked up in a config folder.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default tolerance (minutes) around the timer period before two consecutive
/// files are considered discontinuous.
pub const DEFAULT_DISCONTINUITY_TOLERANCE_MIN: f64 = 5.0;

/// Default margin (seconds) for the clock cross-check before a warning is raised.
pub const DEFAULT_DURATION_TOLERANCE_SEC: f64 = 1.0;

fn default_discontinuity_tolerance_min() -> f64 {
    DEFAULT_DISCONTINUITY_TOLERANCE_MIN
}

fn default_duration_tolerance_sec() -> f64 {
    DEFAULT_DURATION_TOLERANCE_SEC
}

/// Per-animal acquisition configuration, read from `config.yaml`.
///
/// Keys used by other tools of the lab (bandpass settings, buffers, ...) are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub subject_id: String,
    pub aq_freq_hz: u32,
    #[serde(default)]
    pub down_freq_hz: Option<u32>,
    pub selected_channels: Vec<serde_yaml::Value>,
    pub channel_names: Vec<String>,
    pub ttl_names: Vec<String>,
    pub pulse_sync: String,
    pub bonsai_timer_period: String,
    #[serde(default = "default_discontinuity_tolerance_min")]
    pub discontinuity_tolerance_min: f64,
    #[serde(default = "default_duration_tolerance_sec")]
    pub duration_tolerance_sec: f64,
}

impl SessionConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml_str(&contents)
    }

    /// Check the alignment preconditions that do not need any data file.
    pub fn validate(&self) -> Result<()> {
        if self.aq_freq_hz == 0 {
            return Err(Error::InvalidConfig("aq_freq_hz must be greater than 0".to_string()));
        }

        match self.down_freq_hz {
            None => {
                return Err(Error::InvalidConfig("down_freq_hz is not configured".to_string()));
            }
            Some(down) if down >= self.aq_freq_hz => {
                return Err(Error::InvalidConfig(format!(
                    "aq_freq_hz ({}) must be greater than down_freq_hz ({})",
                    self.aq_freq_hz, down
                )));
            }
            Some(_) => {}
        }

        if self.selected_channels.is_empty() {
            return Err(Error::InvalidConfig("selected_channels is empty".to_string()));
        }
        if self.ttl_names.is_empty() {
            return Err(Error::InvalidConfig("ttl_names is empty".to_string()));
        }
        if !self.ttl_names.iter().any(|name| name.contains("photometry")) {
            return Err(Error::MissingSyncChannel {
                ttl_names: self.ttl_names.clone(),
            });
        }
        if self.discontinuity_tolerance_min < 0.0 {
            return Err(Error::InvalidConfig(
                "discontinuity_tolerance_min must not be negative".to_string(),
            ));
        }

        self.expected_delta_minutes()?;
        Ok(())
    }

    /// Number of channels interleaved in each EEG file.
    pub fn eeg_channel_count(&self) -> usize {
        self.selected_channels.len()
    }

    /// Number of channels interleaved in each TTL file.
    pub fn ttl_channel_count(&self) -> usize {
        self.ttl_names.len()
    }

    /// Recording period of a single acquisition file, in minutes.
    pub fn expected_delta_minutes(&self) -> Result<f64> {
        parse_timer_period_minutes(&self.bonsai_timer_period)
    }

    /// Integer decimation factor between acquisition and downsampled rate.
    pub fn downsample_factor(&self) -> Option<u32> {
        self.down_freq_hz
            .filter(|&down| down > 0)
            .map(|down| self.aq_freq_hz / down)
    }
}

/// Parse an `HH:MM:SS` timer period into minutes.
pub fn parse_timer_period_minutes(period: &str) -> Result<f64> {
    let time = NaiveTime::parse_from_str(period.trim(), "%H:%M:%S").map_err(|e| {
        Error::InvalidConfig(format!("bonsai_timer_period {:?} is not HH:MM:SS: {}", period, e))
    })?;
    let seconds = time.num_seconds_from_midnight();
    if seconds == 0 {
        return Err(Error::InvalidConfig("bonsai_timer_period must not be zero".to_string()));
    }
    Ok(seconds as f64 / 60.0)
}

/// Locate the single `config.yaml` in `config_folder`.
///
/// Files such as `old_config.yaml` also match, so a folder holding more than one
/// candidate is rejected rather than guessed.
pub fn find_config_file(config_folder: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(config_folder).map_err(|e| Error::io(config_folder, e))?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(config_folder, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(CONFIG_FILE_NAME) && entry.path().is_file() {
            matches.push(entry.path());
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(Error::InvalidConfig(format!(
            "{} not found in {}",
            CONFIG_FILE_NAME,
            config_folder.display()
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::InvalidConfig(format!(
            "{} contains more than one {}: {:?}",
            config_folder.display(),
            CONFIG_FILE_NAME,
            matches
        ))),
    }
}

/// Read and validate the session configuration stored in `config_folder`.
pub fn read_config(config_folder: &Path) -> Result<SessionConfig> {
    let path = find_config_file(config_folder)?;
    tracing::info!("Reading configuration from {}", path.display());
    let config = SessionConfig::from_file(&path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_period_in_minutes() {
        assert_eq!(parse_timer_period_minutes("01:00:00").unwrap(), 60.0);
        assert_eq!(parse_timer_period_minutes("00:30:30").unwrap(), 30.5);
        assert!(parse_timer_period_minutes("00:00:00").is_err());
        assert!(parse_timer_period_minutes("1h").is_err());
    }
}
