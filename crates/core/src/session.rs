//! The single open buzzer device: open, grab, read, close.
//!
//! Two states: closed (initial) and open. At most one handle is ever held.
//! Every transition that changes presence emits exactly one
//! [`Notification::HasDeviceChanged`].

use crate::device::{InputDevice, InputHost, OpenMode, RawEvent};
use crate::error::{Error, Result};
use crate::events::{EventSink, Notification};
use nix::errno::Errno;
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Classification of device read errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorClass {
    /// Interrupted or nothing pending; try again on the next readiness.
    Transient,
    /// The device node is gone; the session must close.
    Disconnected,
    /// Anything else. Logged, session stays open.
    Other,
}

impl ReadErrorClass {
    /// Classify a read error.
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Self::Transient,
            _ if err.raw_os_error() == Some(Errno::ENODEV as i32) => Self::Disconnected,
            _ => Self::Other,
        }
    }
}

struct OpenDevice {
    path: PathBuf,
    device: Box<dyn InputDevice>,
    grabbed: bool,
}

/// Owner of the one device handle.
#[derive(Default)]
pub struct DeviceSession {
    open: Option<OpenDevice>,
}

impl DeviceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Device node of the open session.
    pub fn path(&self) -> Option<&Path> {
        self.open.as_ref().map(|o| o.path.as_path())
    }

    /// Whether the exclusive grab was obtained.
    pub fn is_grabbed(&self) -> bool {
        self.open.as_ref().is_some_and(|o| o.grabbed)
    }

    /// Open `path` non-blocking, grab it, and announce the device.
    ///
    /// Fails without side effects if a session is already open or the node
    /// cannot be opened. A refused grab is logged but does not fail the open.
    pub fn open(
        &mut self,
        host: &dyn InputHost,
        path: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        if let Some(current) = &self.open {
            warn!(path = %current.path.display(), "Input device already open");
            return Err(Error::AlreadyOpen(current.path.clone()));
        }

        let mut device = host.open_device(path, OpenMode::Session).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to open input device");
            Error::Io(e)
        })?;
        info!(path = %path.display(), "Input device opened");

        let grabbed = match device.grab() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to grab input device");
                false
            }
        };

        self.open = Some(OpenDevice {
            path: path.to_path_buf(),
            device,
            grabbed,
        });
        sink.emit(Notification::HasDeviceChanged { has_device: true });
        Ok(())
    }

    /// Release the grab and the handle and announce the loss.
    ///
    /// Returns `false` when nothing was open.
    pub fn close(&mut self, sink: &mut dyn EventSink) -> bool {
        // Taking the handle out first means the event loop can no longer see its fd.
        let Some(open) = self.open.take() else {
            debug!("Device not open, doing nothing");
            return false;
        };
        info!(path = %open.path.display(), "Closing input device");
        release(open);
        sink.emit(Notification::HasDeviceChanged { has_device: false });
        true
    }

    /// Descriptor to wait on for readability, while open.
    pub fn readiness_fd(&self) -> Option<BorrowedFd<'_>> {
        self.open.as_ref().map(|o| o.device.as_fd())
    }

    /// Read the next batch of pending events. `None` when closed.
    pub fn read_events(&mut self) -> Option<io::Result<Vec<RawEvent>>> {
        self.open.as_mut().map(|o| o.device.read_events())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Some(open) = self.open.take() {
            release(open);
        }
    }
}

fn release(mut open: OpenDevice) {
    if open.grabbed {
        if let Err(e) = open.device.ungrab() {
            debug!(path = %open.path.display(), error = %e, "Ungrab failed");
        }
    }
    // Dropping the device closes the descriptor.
}
