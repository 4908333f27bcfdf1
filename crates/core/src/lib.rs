//! gamebuzz-core: buzzer discovery, hotplug, event translation and LEDs.
//!
//! This crate provides the logic for driving a four-player USB quiz buzzer
//! controller through the Linux input subsystem: finding it among attached
//! event devices, holding an exclusive grab on it, following it across
//! unplug/replug, and turning its button releases into player events.

pub mod buzz;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod hotplug;
pub mod led;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod safety;
pub mod session;
pub mod translate;

pub use buzz::GameBuzz;
pub use events::{Color, EventSink, Notification};

/// Number of players on a buzzer controller.
pub const PLAYER_COUNT: u8 = 4;

/// Buttons per player: one buzzer and four colors.
pub const BUTTONS_PER_PLAYER: u16 = 5;

/// Raw input event types and codes from `linux/input-event-codes.h`.
pub mod codes {
    /// Synchronization marker.
    pub const EV_SYN: u16 = 0x00;
    /// Key and button state change.
    pub const EV_KEY: u16 = 0x01;

    /// First "trigger happy" button (player 1 buzzer).
    pub const BTN_TRIGGER_HAPPY1: u16 = 0x2c0;
    /// Twentieth "trigger happy" button (player 4 blue).
    pub const BTN_TRIGGER_HAPPY20: u16 = 0x2d3;

    /// Key event value for a release.
    pub const KEY_RELEASED: i32 = 0;
}
