//! Linux host: evdev event devices and udev enumeration/monitoring.

use crate::codes::EV_SYN;
use crate::device::{Candidate, InputDevice, InputHost, OpenMode, RawEvent};
use crate::error::{Error, Result};
use crate::hotplug::{HotplugAction, HotplugEvent, HotplugMonitor};
use nix::fcntl::OFlag;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, trace};

/// Subsystem name of input devices.
const INPUT_SUBSYSTEM: &str = "input";

/// The real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxHost;

impl LinuxHost {
    pub fn new() -> Self {
        Self
    }
}

impl InputHost for LinuxHost {
    fn open_device(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn InputDevice>> {
        Ok(Box::new(EvdevDevice::open(path, mode)?))
    }

    fn input_devices(&self) -> Result<Vec<Candidate>> {
        let mut enumerator = udev::Enumerator::new().map_err(|e| Error::Udev(e.to_string()))?;
        enumerator
            .match_subsystem(INPUT_SUBSYSTEM)
            .map_err(|e| Error::Udev(e.to_string()))?;
        let devices = enumerator
            .scan_devices()
            .map_err(|e| Error::Udev(e.to_string()))?;

        let mut candidates = Vec::new();
        for device in devices {
            let usb = matches!(device.parent_with_subsystem("usb"), Ok(Some(_)));
            trace!(
                syspath = %device.syspath().display(),
                usb,
                "Input device listed"
            );
            candidates.push(Candidate {
                syspath: device.syspath().to_path_buf(),
                devnode: device.devnode().map(Path::to_path_buf),
                usb,
            });
        }
        Ok(candidates)
    }

    fn hotplug_monitor(&self) -> Result<Box<dyn HotplugMonitor>> {
        let socket = udev::MonitorBuilder::new()
            .and_then(|b| b.match_subsystem(INPUT_SUBSYSTEM))
            .and_then(|b| b.listen())
            .map_err(|e| Error::Udev(e.to_string()))?;
        debug!("udev monitor listening for input devices");
        Ok(Box::new(UdevMonitor { socket }))
    }
}

/// An evdev event device.
pub struct EvdevDevice {
    inner: evdev::Device,
}

impl EvdevDevice {
    pub fn open(path: &Path, mode: OpenMode) -> io::Result<Self> {
        let file = open_node(path, mode)?;
        Ok(Self {
            inner: evdev::Device::from_fd(OwnedFd::from(file))?,
        })
    }
}

/// Open an event node read-only; sessions also get `O_NONBLOCK`.
fn open_node(path: &Path, mode: OpenMode) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    if mode == OpenMode::Session {
        options.custom_flags(OFlag::O_NONBLOCK.bits());
    }
    options.open(path)
}

impl AsFd for EvdevDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl InputDevice for EvdevDevice {
    fn supports_key(&self, code: u16) -> bool {
        self.inner
            .supported_keys()
            .is_some_and(|keys| keys.contains(evdev::KeyCode::new(code)))
    }

    fn grab(&mut self) -> io::Result<()> {
        self.inner.grab()
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.inner.ungrab()
    }

    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        let events = self
            .inner
            .fetch_events()?
            .map(|ev| RawEvent::new(ev.event_type().0, ev.code(), ev.value()))
            .collect::<Vec<_>>();
        trace!(
            count = events.iter().filter(|e| e.event_type != EV_SYN).count(),
            "evdev batch"
        );
        Ok(events)
    }
}

/// A udev netlink monitor for the input subsystem.
pub struct UdevMonitor {
    socket: udev::MonitorSocket,
}

impl AsFd for UdevMonitor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl HotplugMonitor for UdevMonitor {
    fn receive(&mut self) -> Option<HotplugEvent> {
        let event = self.socket.iter().next()?;
        let action = event
            .action()
            .and_then(|a| a.to_str())
            .map(HotplugAction::from_name)
            .unwrap_or_else(|| HotplugAction::Other(String::new()));
        Some(HotplugEvent::new(
            action,
            event.devnode().map(Path::to_path_buf),
        ))
    }
}
