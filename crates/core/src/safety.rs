//! Validation of caller-supplied values before they reach the filesystem.
//!
//! # Bounds
//!
//! ## Players
//! - **Range**: 1 – 4, one per handset on the controller
//! - **LED digit**: the trailing digit of a `*buzz<digit>` LED directory
//!   is the player number; digits outside the range are discovered but
//!   never written
//!
//! ## Brightness
//! - **Values**: the single ASCII byte `1` (on) or `0` (off)
//! - Buzzer LEDs are plain on/off; `max_brightness` is never consulted
//!
//! All validation happens before any file is opened.

use crate::error::{Error, Result};
use crate::PLAYER_COUNT;

/// Validate a 1-based player number.
pub fn validate_player(player: u32) -> Result<u8> {
    if player == 0 || player > u32::from(PLAYER_COUNT) {
        return Err(Error::OutOfRange {
            field: "player",
            value: player,
            min: 1,
            max: u32::from(PLAYER_COUNT),
        });
    }
    Ok(player as u8)
}

/// Bytes written to a `brightness` file.
pub fn brightness_value(on: bool) -> &'static [u8] {
    if on {
        b"1"
    } else {
        b"0"
    }
}
