//! Per-player buzzer LEDs under the LED class directory.

use crate::error::{Error, Result};
use crate::safety::{brightness_value, validate_player};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default LED class directory.
pub const DEFAULT_LED_ROOT: &str = "/sys/class/leds";

/// Player number → LED directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedMap {
    leds: BTreeMap<u8, PathBuf>,
}

impl LedMap {
    /// Build a map from explicit entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (u8, PathBuf)>) -> Self {
        Self {
            leds: entries.into_iter().collect(),
        }
    }

    /// Scan `root` for `*buzz<digit>` entries.
    ///
    /// An unreadable root yields an empty map.
    pub fn discover(root: &Path) -> Self {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Cannot scan LED directory");
                return Self::default();
            }
        };

        let mut leds = BTreeMap::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(player) = name.to_str().and_then(buzz_digit) else {
                continue;
            };
            leds.insert(player, entry.path());
        }

        debug!(?leds, "LEDs");
        Self { leds }
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    /// LED directory of a player.
    pub fn path(&self, player: u8) -> Option<&Path> {
        self.leds.get(&player).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Path)> {
        self.leds.iter().map(|(p, path)| (*p, path.as_path()))
    }

    /// Switch a player's LED on or off. One attempt, no retry.
    pub fn set(&self, player: u32, on: bool) -> Result<()> {
        let player = validate_player(player)?;
        let dir = self.path(player).ok_or(Error::LedNotMapped(player))?;
        let path = dir.join("brightness");

        let mut file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| Error::Led {
                path: path.clone(),
                source,
            })?;
        file.write_all(brightness_value(on))
            .map_err(|source| Error::Led { path, source })
    }
}

/// Player digit of a `*buzz<digit>` name.
fn buzz_digit(name: &str) -> Option<u8> {
    let stem = name.strip_suffix(|c: char| c.is_ascii_digit())?;
    if !stem.ends_with("buzz") {
        return None;
    }
    name.chars().last()?.to_digit(10).map(|d| d as u8)
}
