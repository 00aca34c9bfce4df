use anyhow::Result;

use ephys_alignment_toolbox::Error;
use ephys_alignment_toolbox::align::AlignmentSettings;
use ephys_alignment_toolbox::channels::{ChannelKind, ChannelLayout};
use ephys_alignment_toolbox::config::{SessionConfig, find_config_file, read_config};

const CONFIG: &str = r#"
subject_id: MLA042
aq_freq_hz: 1000
down_freq_hz: 100
bandpass:
  low: 0.5
  high: 40
selected_channels: [1, 2, 3, 4]
channel_names: [EEG1, EEG2, EMG1]
ttl_names: [opto, photometry, camera]
pulse_sync: PC0
bonsai_timer_period: "01:00:00"
"#;

#[test]
fn test_config_parses_and_ignores_unknown_keys() -> Result<()> {
    let config = SessionConfig::from_yaml_str(CONFIG)?;
    config.validate()?;

    assert_eq!(config.subject_id, "MLA042");
    assert_eq!(config.eeg_channel_count(), 4);
    assert_eq!(config.ttl_channel_count(), 3);
    assert_eq!(config.expected_delta_minutes()?, 60.0);
    assert_eq!(config.discontinuity_tolerance_min, 5.0);
    assert_eq!(config.duration_tolerance_sec, 1.0);
    assert_eq!(config.downsample_factor(), Some(10));
    Ok(())
}

#[test]
fn test_settings_resolve_sync_channel_and_camera_rows() -> Result<()> {
    let config = SessionConfig::from_yaml_str(CONFIG)?;
    let settings = AlignmentSettings::from_config(&config)?;

    assert_eq!(settings.sync_channel, 1);
    assert_eq!(settings.sync_channel_name(), "photometry");
    assert_eq!(settings.eeg_layout.len(), 4);
    assert_eq!(settings.eeg_layout.indices_of(ChannelKind::Camera), vec![3]);
    assert_eq!(ChannelLayout::eeg(&config).indices_of(ChannelKind::Emg), vec![2]);
    Ok(())
}

#[test]
fn test_invalid_configs_fail_before_any_io() -> Result<()> {
    let base = SessionConfig::from_yaml_str(CONFIG)?;

    let mut no_down = base.clone();
    no_down.down_freq_hz = None;
    assert!(matches!(no_down.validate(), Err(Error::InvalidConfig(_))));

    let mut too_fast = base.clone();
    too_fast.down_freq_hz = Some(1000);
    assert!(matches!(too_fast.validate(), Err(Error::InvalidConfig(_))));

    let mut no_sync = base.clone();
    no_sync.ttl_names = vec!["opto".to_string(), "camera".to_string()];
    assert!(matches!(
        AlignmentSettings::from_config(&no_sync),
        Err(Error::MissingSyncChannel { .. })
    ));

    let mut bad_timer = base.clone();
    bad_timer.bonsai_timer_period = "sixty minutes".to_string();
    assert!(matches!(bad_timer.validate(), Err(Error::InvalidConfig(_))));
    Ok(())
}

#[test]
fn test_config_folder_must_hold_exactly_one_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(matches!(find_config_file(dir.path()), Err(Error::InvalidConfig(_))));

    std::fs::write(dir.path().join("config.yaml"), CONFIG)?;
    let config = read_config(dir.path())?;
    assert_eq!(config.subject_id, "MLA042");

    std::fs::write(dir.path().join("old_config.yaml"), CONFIG)?;
    assert!(matches!(find_config_file(dir.path()), Err(Error::InvalidConfig(_))));
    Ok(())
}
