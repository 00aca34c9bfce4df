use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

/// What a channel carries, derived once from its configured name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Eeg,
    Emg,
    Camera,
    Ttl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,
}

/// Ordered, immutable description of the channels interleaved in a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout {
    channels: Vec<Channel>,
}

impl ChannelLayout {
    /// EEG/EMG layout from `channel_names`.
    pub fn eeg(config: &SessionConfig) -> Self {
        let channels = config
            .channel_names
            .iter()
            .map(|name| Channel {
                name: name.clone(),
                kind: classify_ephys_name(name),
            })
            .collect();
        Self { channels }
    }

    /// TTL layout from `ttl_names`.
    pub fn ttl(config: &SessionConfig) -> Self {
        let channels = config
            .ttl_names
            .iter()
            .map(|name| Channel {
                name: name.clone(),
                kind: ChannelKind::Ttl,
            })
            .collect();
        Self { channels }
    }

    /// Layout covering `n_channels` data rows.
    ///
    /// When the data holds more rows than there are named channels the extra
    /// rows are camera frame counters appended by the acquisition software
    /// (`cam1`, `cam2`, ...).
    pub fn extended_to(&self, n_channels: usize) -> Self {
        let mut channels = self.channels.clone();
        let named = channels.len();
        for i in named..n_channels {
            channels.push(Channel {
                name: format!("cam{}", i - named + 1),
                kind: ChannelKind::Camera,
            });
        }
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Indices of channels whose name contains `pattern`.
    pub fn find(&self, pattern: &str) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name.contains(pattern))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn indices_of(&self, kind: ChannelKind) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Row of the TTL channel carrying the photometry synchronization pulses.
    pub fn photometry_sync_index(&self) -> Result<usize> {
        self.find("photometry")
            .first()
            .copied()
            .ok_or_else(|| Error::MissingSyncChannel {
                ttl_names: self.channels.iter().map(|c| c.name.clone()).collect(),
            })
    }
}

fn classify_ephys_name(name: &str) -> ChannelKind {
    if name.contains("EMG") {
        ChannelKind::Emg
    } else if name.starts_with("cam") {
        ChannelKind::Camera
    } else {
        ChannelKind::Eeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(names: &[&str]) -> ChannelLayout {
        ChannelLayout {
            channels: names
                .iter()
                .map(|n| Channel {
                    name: n.to_string(),
                    kind: classify_ephys_name(n),
                })
                .collect(),
        }
    }

    #[test]
    fn extends_with_camera_channels() {
        let extended = layout(&["EEG1", "EEG2", "EMG1"]).extended_to(5);
        assert_eq!(extended.names(), vec!["EEG1", "EEG2", "EMG1", "cam1", "cam2"]);
        assert_eq!(extended.indices_of(ChannelKind::Emg), vec![2]);
        assert_eq!(extended.indices_of(ChannelKind::Camera), vec![3, 4]);
    }

    #[test]
    fn missing_photometry_channel_is_an_error() {
        let ttl = layout(&["opto", "camera"]);
        assert!(matches!(
            ttl.photometry_sync_index(),
            Err(Error::MissingSyncChannel { .. })
        ));
        assert_eq!(layout(&["opto", "photometry_sync"]).photometry_sync_index().unwrap(), 1);
    }
}
