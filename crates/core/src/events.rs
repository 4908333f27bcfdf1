//! Semantic notifications emitted towards the presentation layer.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

/// Answer button colors, top to bottom on the handset.
///
/// Discriminants are stable for consumers that pass colors around as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Blue = 0,
    Orange = 1,
    Green = 2,
    Yellow = 3,
}

impl Color {
    /// All colors, in handset order.
    pub const ALL: &'static [Color] = &[Color::Yellow, Color::Green, Color::Orange, Color::Blue];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Orange => "orange",
            Self::Green => "green",
            Self::Yellow => "yellow",
        }
    }

    /// Parse a color name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "blue" => Some(Self::Blue),
            "orange" => Some(Self::Orange),
            "green" => Some(Self::Green),
            "yellow" => Some(Self::Yellow),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One notification from the buzzer subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A device session was opened (`true`) or closed (`false`).
    HasDeviceChanged { has_device: bool },
    /// A player's big red buzzer was released.
    Buzzer { player: u8 },
    /// A player's color button was released.
    Button { player: u8, color: Color },
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HasDeviceChanged { has_device: true } => write!(f, "device present"),
            Self::HasDeviceChanged { has_device: false } => write!(f, "device absent"),
            Self::Buzzer { player } => write!(f, "player {player}: buzzer"),
            Self::Button { player, color } => write!(f, "player {player}: {color}"),
        }
    }
}

/// Receiver of notifications. One call per semantic event.
pub trait EventSink {
    fn emit(&mut self, notification: Notification);
}

impl EventSink for Vec<Notification> {
    fn emit(&mut self, notification: Notification) {
        self.push(notification);
    }
}

/// Forwards into a channel; a hung-up receiver drops notifications silently.
impl EventSink for Sender<Notification> {
    fn emit(&mut self, notification: Notification) {
        let _ = self.send(notification);
    }
}
