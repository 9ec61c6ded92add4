use crate::hardware::ChannelSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Samples per second of the analog channels.
pub const DEFAULT_SAMPLES_PER_SECOND: u32 = 100;
/// Period of the acquisition polling loop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
/// Length of the recent-files list.
pub const MAX_RECENT_FILES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Auto-stop limit in minutes; 0 records until stopped by hand.
    pub duration_minutes: u32,
    /// Delay of the FID channel behind the EAD channel.
    pub gc_delay_ms: u32,
    pub samples_per_second: u32,
    pub poll_interval_ms: u64,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            duration_minutes: 0,
            gc_delay_ms: 0,
            samples_per_second: DEFAULT_SAMPLES_PER_SECOND,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub show_wave_comments: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_wave_comments: true,
        }
    }
}

/// Application settings, handed to the controller at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recent_files: Vec<PathBuf>,
    pub last_dir: Option<PathBuf>,
    pub channels: Vec<ChannelSettings>,
    pub recording: RecordingSettings,
    pub view: ViewSettings,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("serializing configuration")?;
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Channel settings stored for one hardware model.
    pub fn channels_for(&self, hardware: &str) -> Vec<ChannelSettings> {
        self.channels
            .iter()
            .filter(|c| c.hardware == hardware)
            .cloned()
            .collect()
    }

    /// Replace the stored channel settings of one hardware model.
    pub fn store_channels(&mut self, hardware: &str, settings: Vec<ChannelSettings>) {
        self.channels.retain(|c| c.hardware != hardware);
        self.channels.extend(settings);
    }

    /// Move `path` to the front of the recent-files list.
    pub fn add_recent_file(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| p != &path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::Channel;
    use tempfile::tempdir;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = AppConfig::from_toml_str("[recording]\nduration_minutes = 3\n").unwrap();
        assert_eq!(cfg.recording.duration_minutes, 3);
        assert_eq!(cfg.recording.samples_per_second, DEFAULT_SAMPLES_PER_SECOND);
        assert_eq!(cfg.recording.poll_interval_ms, 200);
        assert!(cfg.view.show_wave_comments);
    }

    #[test]
    fn saves_and_loads_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf/gcead.toml");
        let mut cfg = AppConfig::default();
        cfg.store_channels(
            "IDAC4",
            vec![ChannelSettings {
                hardware: "IDAC4".into(),
                channel: Channel::Ead,
                gain: 4,
                offset: -3,
            }],
        );
        cfg.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.channels_for("IDAC4").len(), 1);
        assert!(loaded.channels_for("IDAC2").is_empty());
    }

    #[test]
    fn recent_files_are_bounded_and_deduplicated() {
        let mut cfg = AppConfig::default();
        for name in ["a", "b", "c", "d", "e"] {
            cfg.add_recent_file(PathBuf::from(name));
        }
        cfg.add_recent_file(PathBuf::from("c"));
        let names: Vec<_> = cfg
            .recent_files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c", "e", "d", "b"]);
    }
}
