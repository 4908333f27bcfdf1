//! Scancode translation: raw button releases to player events.
//!
//! # Button layout
//!
//! The controller reports twenty consecutive "trigger happy" codes,
//! five per handset, starting at `BTN_TRIGGER_HAPPY1` (0x2c0):
//!
//! | offset in handset | button  |
//! |-------------------|---------|
//! | 0                 | buzzer  |
//! | 1                 | yellow  |
//! | 2                 | green   |
//! | 3                 | orange  |
//! | 4                 | blue    |
//!
//! Only releases are reported. A press followed by a release completes one
//! trigger; presses and autorepeat are dropped.

use crate::codes::{BTN_TRIGGER_HAPPY1, EV_KEY, EV_SYN, KEY_RELEASED};
use crate::device::RawEvent;
use crate::events::{Color, EventSink, Notification};
use crate::session::{DeviceSession, ReadErrorClass};
use tracing::{debug, trace, warn};

/// Semantic meaning of one physical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonRole {
    Buzzer { player: u8 },
    Color { player: u8, color: Color },
}

impl ButtonRole {
    fn notification(self) -> Notification {
        match self {
            Self::Buzzer { player } => Notification::Buzzer { player },
            Self::Color { player, color } => Notification::Button { player, color },
        }
    }
}

const fn buzzer(player: u8) -> ButtonRole {
    ButtonRole::Buzzer { player }
}

const fn color(player: u8, color: Color) -> ButtonRole {
    ButtonRole::Color { player, color }
}

/// Offset from `BTN_TRIGGER_HAPPY1` → button role.
static SCANCODE_MAP: [ButtonRole; 20] = [
    buzzer(1),
    color(1, Color::Yellow),
    color(1, Color::Green),
    color(1, Color::Orange),
    color(1, Color::Blue),
    buzzer(2),
    color(2, Color::Yellow),
    color(2, Color::Green),
    color(2, Color::Orange),
    color(2, Color::Blue),
    buzzer(3),
    color(3, Color::Yellow),
    color(3, Color::Green),
    color(3, Color::Orange),
    color(3, Color::Blue),
    buzzer(4),
    color(4, Color::Yellow),
    color(4, Color::Green),
    color(4, Color::Orange),
    color(4, Color::Blue),
];

/// Look up the role of a key code.
pub fn lookup(code: u16) -> Option<ButtonRole> {
    let offset = code.checked_sub(BTN_TRIGGER_HAPPY1)?;
    SCANCODE_MAP.get(usize::from(offset)).copied()
}

/// Outcome of translating one raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Synchronization marker, disabled translator, press, or non-key event.
    Skipped,
    /// A release of a mapped button.
    Emit(Notification),
    /// A release of a key that is not part of the buzzer layout.
    Unmapped(u16),
}

/// Translate one raw event.
pub fn translate(event: &RawEvent, enabled: bool) -> Translation {
    if event.event_type == EV_SYN || !enabled {
        return Translation::Skipped;
    }
    if event.event_type != EV_KEY || event.value != KEY_RELEASED {
        return Translation::Skipped;
    }
    trace!(code = event.code, "Trigger");
    match lookup(event.code) {
        Some(role) => Translation::Emit(role.notification()),
        None => {
            warn!(code = event.code, "Unhandled scancode");
            Translation::Unmapped(event.code)
        }
    }
}

/// Drain every pending event of the open session into `sink`.
///
/// Stops when the device has nothing more or a read fails. A vanished device
/// closes the session; other failures are logged and the session stays open.
/// Returns the number of notifications emitted.
pub fn drain(session: &mut DeviceSession, enabled: bool, sink: &mut dyn EventSink) -> usize {
    let mut emitted = 0;

    loop {
        let batch = match session.read_events() {
            None => return emitted,
            Some(Ok(batch)) => batch,
            Some(Err(e)) => {
                match ReadErrorClass::classify(&e) {
                    ReadErrorClass::Transient => {}
                    ReadErrorClass::Disconnected => {
                        warn!("Device lost, closing");
                        session.close(sink);
                    }
                    ReadErrorClass::Other => warn!(error = %e, "evdev read failed"),
                }
                return emitted;
            }
        };

        if batch.is_empty() {
            debug!("Empty read, waiting for next readiness");
            return emitted;
        }

        for event in &batch {
            if let Translation::Emit(notification) = translate(event, enabled) {
                sink.emit(notification);
                emitted += 1;
            }
        }
    }
}
