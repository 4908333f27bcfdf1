//! Device model: host abstraction, buzzer classification and discovery.

use crate::codes::{BTN_TRIGGER_HAPPY1, BTN_TRIGGER_HAPPY20};
use crate::error::Result;
use crate::hotplug::HotplugMonitor;
use std::io;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One raw event as delivered by an event device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }
}

/// How a device node is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only, for a short capability query.
    Probe,
    /// Read-only and non-blocking, for a long-lived session.
    Session,
}

/// An opened input event device.
///
/// The file descriptor is exposed so the event loop can wait for readability.
pub trait InputDevice: AsFd {
    /// Whether the device reports support for a key/button code.
    fn supports_key(&self, code: u16) -> bool;

    /// Claim exclusive access to the device's events.
    fn grab(&mut self) -> io::Result<()>;

    /// Release a previous grab.
    fn ungrab(&mut self) -> io::Result<()>;

    /// Read every event that is available right now.
    ///
    /// Returns `ErrorKind::WouldBlock` once the device has nothing pending.
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>>;
}

/// An input-class device as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// sysfs path, used for diagnostics.
    pub syspath: PathBuf,
    /// Device node under /dev/input, if the device has one.
    pub devnode: Option<PathBuf>,
    /// Whether the device sits below a USB device.
    pub usb: bool,
}

/// Everything the core needs from the operating system.
pub trait InputHost {
    /// Open an event device node.
    fn open_device(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn InputDevice>>;

    /// List all currently known input-class devices, in host order.
    fn input_devices(&self) -> Result<Vec<Candidate>>;

    /// Subscribe to add/remove notifications for the input subsystem.
    fn hotplug_monitor(&self) -> Result<Box<dyn HotplugMonitor>>;
}

/// Decide whether an opened device looks like a buzzer controller.
///
/// A buzzer exposes the full run of twenty "trigger happy" buttons; keyboards
/// and mice do not. Only the first and the last code are checked.
pub fn is_buzzer_like(device: &dyn InputDevice) -> bool {
    let buzz =
        device.supports_key(BTN_TRIGGER_HAPPY1) && device.supports_key(BTN_TRIGGER_HAPPY20);
    if buzz {
        debug!("Device is very trigger happy, probably a buzzer");
    }
    buzz
}

/// Open a device node read-only, classify it, and close it again.
///
/// Open failures yield `false`; classification is advisory.
pub fn probe(host: &dyn InputHost, path: &Path) -> bool {
    match host.open_device(path, OpenMode::Probe) {
        Ok(device) => is_buzzer_like(device.as_ref()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open device for probe");
            false
        }
    }
}

/// Find all attached USB input devices that look like buzzers.
///
/// Non-USB devices and devices without a node are skipped before any open.
pub fn find_input_devices(host: &dyn InputHost) -> Result<Vec<PathBuf>> {
    debug!("Starting input device enumeration");
    let mut found = Vec::new();

    for candidate in host.input_devices()? {
        let Some(devnode) = candidate.devnode else {
            continue;
        };
        if !candidate.usb {
            debug!(path = %devnode.display(), "Skipping non-USB device");
            continue;
        }
        if probe(host, &devnode) {
            info!(path = %devnode.display(), "Found buzzer device");
            found.push(devnode);
        }
    }

    debug!(count = found.len(), "Device enumeration complete");
    Ok(found)
}
