//! Hotplug monitoring for the input subsystem.

use crate::device::{probe, InputHost};
use std::os::fd::AsFd;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What happened to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugAction {
    Add,
    Remove,
    /// Any other udev action ("change", "bind", ...).
    Other(String),
}

impl HotplugAction {
    pub fn from_name(name: &str) -> Self {
        match name {
            "add" => Self::Add,
            "remove" => Self::Remove,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One add/remove notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugEvent {
    pub action: HotplugAction,
    /// Device node, when the notification carries one.
    pub devnode: Option<PathBuf>,
}

impl HotplugEvent {
    pub fn new(action: HotplugAction, devnode: Option<PathBuf>) -> Self {
        Self { action, devnode }
    }

    /// Shorthand for an "add" of a device node.
    pub fn add(devnode: impl Into<PathBuf>) -> Self {
        Self::new(HotplugAction::Add, Some(devnode.into()))
    }
}

/// A subscription to input-subsystem notifications.
///
/// The descriptor becomes readable when a notification is pending.
pub trait HotplugMonitor: AsFd {
    /// Take one pending notification. `None` when nothing could be decoded.
    fn receive(&mut self) -> Option<HotplugEvent>;
}

/// Decide whether a notification should become the new session.
///
/// Only "add" events with a device node are considered, and only while no
/// session is open. The probe handle is closed before returning.
pub fn evaluate(host: &dyn InputHost, event: &HotplugEvent, session_open: bool) -> Option<PathBuf> {
    if session_open || event.action != HotplugAction::Add {
        return None;
    }
    let devnode = event.devnode.as_ref()?;

    debug!(path = %devnode.display(), "New device, checking");
    if probe(host, devnode) {
        debug!(path = %devnode.display(), "Looks like a buzzer");
        Some(devnode.clone())
    } else {
        None
    }
}

/// Read one notification from `monitor` and evaluate it.
pub fn poll_monitor(
    host: &dyn InputHost,
    monitor: &mut dyn HotplugMonitor,
    session_open: bool,
) -> Option<PathBuf> {
    match monitor.receive() {
        Some(event) => evaluate(host, &event, session_open),
        None => {
            warn!("No device from hotplug monitor, ignoring notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockHost;
    use crate::device::OpenMode;

    #[test]
    fn action_names() {
        assert_eq!(HotplugAction::from_name("add"), HotplugAction::Add);
        assert_eq!(HotplugAction::from_name("remove"), HotplugAction::Remove);
        assert_eq!(
            HotplugAction::from_name("change"),
            HotplugAction::Other("change".to_string())
        );
    }

    #[test]
    fn add_of_buzzer_is_accepted() {
        let mut host = MockHost::new();
        let state = host.add_buzzer("/dev/input/event7");
        let event = HotplugEvent::add("/dev/input/event7");
        assert_eq!(
            evaluate(&host, &event, false),
            Some(PathBuf::from("/dev/input/event7"))
        );
        assert_eq!(state.borrow().handles, 0);
    }

    #[test]
    fn add_is_ignored_while_session_open() {
        let mut host = MockHost::new();
        host.add_buzzer("/dev/input/event7");
        let event = HotplugEvent::add("/dev/input/event7");
        assert_eq!(evaluate(&host, &event, true), None);
        assert_eq!(host.open_count(OpenMode::Probe), 0);
    }

    #[test]
    fn remove_and_nodeless_events_are_ignored() {
        let mut host = MockHost::new();
        host.add_buzzer("/dev/input/event7");
        let remove = HotplugEvent::new(
            HotplugAction::Remove,
            Some(PathBuf::from("/dev/input/event7")),
        );
        let nodeless = HotplugEvent::new(HotplugAction::Add, None);
        assert_eq!(evaluate(&host, &remove, false), None);
        assert_eq!(evaluate(&host, &nodeless, false), None);
        assert!(host.opens.borrow().is_empty());
    }

    #[test]
    fn add_of_keyboard_is_rejected() {
        let mut host = MockHost::new();
        host.add_device("/dev/input/event2", true, Some(vec![30, 31, 32]));
        assert_eq!(
            evaluate(&host, &HotplugEvent::add("/dev/input/event2"), false),
            None
        );
    }

    #[test]
    fn undecodable_notification_is_ignored() {
        let host = MockHost::new();
        host.hotplug.borrow_mut().push_back(None);
        let mut monitor = host.hotplug_monitor().unwrap();
        assert_eq!(poll_monitor(&host, monitor.as_mut(), false), None);
    }
}
