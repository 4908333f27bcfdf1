//! Runtime configuration, loaded from an optional JSON file.

use crate::error::{Error, Result};
use crate::led::DEFAULT_LED_ROOT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Buzzer service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit event device node. Skips auto-discovery when set.
    pub device: Option<PathBuf>,
    /// LED class directory to scan for `*buzz<digit>` entries.
    pub led_root: PathBuf,
    /// Watch for hotplug. Without it there is no auto-discovery either.
    pub hotplug: bool,
    /// Start with event translation disabled.
    pub start_disabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            led_root: PathBuf::from(DEFAULT_LED_ROOT),
            hotplug: true,
            start_disabled: false,
        }
    }
}

impl Config {
    /// Read a config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        Self::from_json(&text)
            .map_err(|e| Error::Config(format!("parse {}: {e}", path.display())))
    }

    fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.device, None);
        assert_eq!(config.led_root, PathBuf::from("/sys/class/leds"));
        assert!(config.hotplug);
        assert!(!config.start_disabled);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_json(r#"{ "device": "/dev/input/event12" }"#).unwrap();
        assert_eq!(config.device, Some(PathBuf::from("/dev/input/event12")));
        assert!(config.hotplug);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamebuzz.json");
        std::fs::write(
            &path,
            r#"{ "hotplug": false, "start_disabled": true, "led_root": "/tmp/leds" }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.hotplug);
        assert!(config.start_disabled);
        assert_eq!(config.led_root, PathBuf::from("/tmp/leds"));
    }

    #[test]
    fn load_reports_bad_json_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ hotplug: yes").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
        assert!(matches!(
            Config::load(&dir.path().join("missing.json")),
            Err(Error::Config(_))
        ));
    }
}
