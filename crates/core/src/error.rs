//! Error types for gamebuzz-core.

use std::path::PathBuf;
use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Plain I/O failure on a device node, LED file or config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// udev enumeration or monitor failure.
    #[error("udev error: {0}")]
    Udev(String),

    /// A device session is already open.
    #[error("input device already open: {}", .0.display())]
    AlreadyOpen(PathBuf),

    /// Value out of accepted range.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// No LED control path was discovered for the player.
    #[error("no LED mapped for player {0}")]
    LedNotMapped(u8),

    /// Writing an LED brightness file failed.
    #[error("LED write failed for {}: {source}", path.display())]
    Led {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
