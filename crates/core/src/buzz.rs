//! Control surface: start/stop, enable, LEDs, and the event loop.

use crate::config::Config;
use crate::device::{find_input_devices, InputHost};
use crate::error::{Error, Result};
use crate::events::{EventSink, Notification};
use crate::hotplug::{self, HotplugMonitor};
use crate::led::LedMap;
use crate::session::DeviceSession;
use crate::translate;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The buzzer service.
///
/// Owns the one device session and the hotplug subscription. All methods are
/// meant to be called from the thread that runs [`GameBuzz::run`].
pub struct GameBuzz<H: InputHost, S: EventSink> {
    host: H,
    sink: S,
    session: DeviceSession,
    monitor: Option<Box<dyn HotplugMonitor>>,
    leds: LedMap,
    /// Device node given by configuration, used when `start` gets none.
    configured: Option<PathBuf>,
    /// Device node of the current or most recent session.
    device: Option<PathBuf>,
    enabled: bool,
    hotplug: bool,
}

impl<H: InputHost, S: EventSink> GameBuzz<H, S> {
    pub fn new(host: H, sink: S, leds: LedMap) -> Self {
        Self {
            host,
            sink,
            session: DeviceSession::new(),
            monitor: None,
            leds,
            configured: None,
            device: None,
            enabled: true,
            hotplug: true,
        }
    }

    /// Build from a configuration, discovering LEDs under its root.
    pub fn with_config(host: H, sink: S, config: &Config) -> Self {
        let mut buzz = Self::new(host, sink, LedMap::discover(&config.led_root));
        buzz.configured = config.device.clone();
        buzz.enabled = !config.start_disabled;
        buzz.hotplug = config.hotplug;
        buzz
    }

    /// Subscribe to hotplug and open a device.
    ///
    /// Uses `device`, else the configured node, else the first buzzer found
    /// by enumeration. Enumeration needs a working hotplug backend. Returns
    /// whether a session is open afterwards; with no device at all,
    /// `HasDeviceChanged(false)` is emitted.
    pub fn start(&mut self, device: Option<PathBuf>) -> bool {
        if self.session.is_open() {
            warn!(path = ?self.session.path(), "Device already open");
            return false;
        }
        self.device = device.or_else(|| self.configured.clone());

        if self.hotplug && self.monitor.is_none() {
            match self.host.hotplug_monitor() {
                Ok(monitor) => self.monitor = Some(monitor),
                Err(e) => warn!(
                    error = %e,
                    "Failed to init udev, unable to probe or monitor for buzz device changes"
                ),
            }
        }

        if self.device.is_none() && self.monitor.is_some() {
            match find_input_devices(&self.host) {
                Ok(found) => {
                    if let Some(first) = found.into_iter().next() {
                        debug!(path = %first.display(), "Probed device");
                        self.device = Some(first);
                    }
                }
                Err(e) => warn!(error = %e, "Input device enumeration failed"),
            }
        }

        if self.device.is_some() {
            return self.open_device();
        }

        info!("No buzzer device, waiting for hotplug");
        self.sink
            .emit(Notification::HasDeviceChanged { has_device: false });
        false
    }

    /// Close the session. The hotplug subscription stays active.
    pub fn stop(&mut self) -> bool {
        self.session.close(&mut self.sink);
        true
    }

    /// Gate translation without touching the device.
    pub fn disable_device(&mut self, disable: bool) {
        self.enabled = !disable;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch a player's LED. Failures are logged and reported as `false`.
    pub fn led(&self, player: u32, on: bool) -> bool {
        match self.leds.set(player, on) {
            Ok(()) => true,
            Err(e) => {
                warn!(player, on, error = %e, "LED update failed");
                false
            }
        }
    }

    /// Whether a device session is open.
    pub fn has_device(&self) -> bool {
        self.session.is_open()
    }

    /// Device node of the open session.
    pub fn device_path(&self) -> Option<&Path> {
        self.session.path()
    }

    /// Whether a hotplug subscription is active.
    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    pub fn leds(&self) -> &LedMap {
        &self.leds
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn open_device(&mut self) -> bool {
        let Some(path) = self.device.clone() else {
            return false;
        };
        self.session
            .open(&self.host, &path, &mut self.sink)
            .is_ok()
    }

    /// The device descriptor became readable.
    pub fn handle_device_ready(&mut self) -> usize {
        translate::drain(&mut self.session, self.enabled, &mut self.sink)
    }

    /// The hotplug descriptor became readable.
    pub fn handle_hotplug_ready(&mut self) {
        let Some(monitor) = self.monitor.as_mut() else {
            return;
        };
        if let Some(path) =
            hotplug::poll_monitor(&self.host, monitor.as_mut(), self.session.is_open())
        {
            self.device = Some(path);
            self.open_device();
        }
    }

    /// Wait on the hotplug and device descriptors until `shutdown` is readable.
    ///
    /// Pending device and hotplug work of the final wakeup is still handled.
    pub fn run(&mut self, shutdown: BorrowedFd<'_>) -> Result<()> {
        let wake = PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP;

        loop {
            let (stop, hotplug_ready, device_ready) = {
                let mut fds = vec![PollFd::new(shutdown, PollFlags::POLLIN)];
                let monitor_at = self.monitor.as_ref().map(|m| {
                    fds.push(PollFd::new(m.as_fd(), PollFlags::POLLIN));
                    fds.len() - 1
                });
                let device_at = self.session.readiness_fd().map(|fd| {
                    fds.push(PollFd::new(fd, PollFlags::POLLIN));
                    fds.len() - 1
                });

                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => {}
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(Error::Io(e.into())),
                }

                let ready = |at: Option<usize>| {
                    at.and_then(|i| fds[i].revents())
                        .is_some_and(|r| r.intersects(wake))
                };
                (ready(Some(0)), ready(monitor_at), ready(device_at))
            };

            if device_ready {
                self.handle_device_ready();
            }
            if hotplug_ready {
                self.handle_hotplug_ready();
            }
            if stop {
                debug!("Shutdown requested, leaving event loop");
                return Ok(());
            }
        }
    }
}

impl<H: InputHost, S: EventSink> Drop for GameBuzz<H, S> {
    fn drop(&mut self) {
        self.session.close(&mut self.sink);
        self.monitor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{BTN_TRIGGER_HAPPY1, EV_KEY};
    use crate::device::mock::MockHost;
    use crate::device::{OpenMode, RawEvent};
    use crate::events::Color;

    type TestBuzz = GameBuzz<MockHost, Vec<Notification>>;

    fn buzz(host: MockHost) -> TestBuzz {
        GameBuzz::new(host, Vec::new(), LedMap::default())
    }

    #[test]
    fn start_with_explicit_device() {
        let mut host = MockHost::new();
        let state = host.add_buzzer("/dev/input/event3");
        let mut buzz = buzz(host);

        assert!(buzz.start(Some(PathBuf::from("/dev/input/event3"))));
        assert!(buzz.has_device());
        assert!(buzz.is_monitoring());
        assert_eq!(buzz.device_path(), Some(Path::new("/dev/input/event3")));
        assert!(state.borrow().grabbed);
        // No enumeration when a device is given.
        assert_eq!(buzz.host().open_count(OpenMode::Probe), 0);
        assert_eq!(
            buzz.sink(),
            &vec![Notification::HasDeviceChanged { has_device: true }]
        );
    }

    #[test]
    fn start_discovers_first_buzzer() {
        let mut host = MockHost::new();
        host.add_device("/dev/input/event0", false, Some(vec![30]));
        host.add_buzzer("/dev/input/event8");
        host.add_buzzer("/dev/input/event9");
        let mut buzz = buzz(host);

        assert!(buzz.start(None));
        assert_eq!(buzz.device_path(), Some(Path::new("/dev/input/event8")));
    }

    #[test]
    fn start_without_any_device_reports_absence() {
        let mut host = MockHost::new();
        host.add_device("/dev/input/event0", true, Some(vec![30]));
        let mut buzz = buzz(host);

        assert!(!buzz.start(None));
        assert!(!buzz.has_device());
        assert!(buzz.is_monitoring());
        assert_eq!(
            buzz.sink(),
            &vec![Notification::HasDeviceChanged { has_device: false }]
        );
    }

    #[test]
    fn start_without_hotplug_backend_skips_discovery() {
        let mut host = MockHost::new();
        host.add_buzzer("/dev/input/event8");
        host.monitor_available = false;
        let mut buzz = buzz(host);

        assert!(!buzz.start(None));
        assert!(!buzz.is_monitoring());
        assert!(buzz.host().opens.borrow().is_empty());

        // An explicit device still works.
        assert!(buzz.start(Some(PathBuf::from("/dev/input/event8"))));
    }

    #[test]
    fn start_with_bad_path_fails() {
        let mut buzz = buzz(MockHost::new());
        assert!(!buzz.start(Some(PathBuf::from("/dev/input/event42"))));
        assert!(!buzz.has_device());
        assert!(buzz.sink().is_empty());
    }

    #[test]
    fn start_while_open_fails_without_side_effects() {
        let mut host = MockHost::new();
        host.add_buzzer("/dev/input/event3");
        host.add_buzzer("/dev/input/event4");
        let mut buzz = buzz(host);

        assert!(buzz.start(Some(PathBuf::from("/dev/input/event3"))));
        assert!(!buzz.start(Some(PathBuf::from("/dev/input/event4"))));
        assert_eq!(buzz.device_path(), Some(Path::new("/dev/input/event3")));
        assert_eq!(buzz.sink().len(), 1);
    }

    #[test]
    fn configured_device_is_used() {
        let mut host = MockHost::new();
        host.add_buzzer("/dev/input/event5");
        let config = Config {
            device: Some(PathBuf::from("/dev/input/event5")),
            hotplug: false,
            start_disabled: true,
            led_root: PathBuf::from("/nonexistent"),
        };
        let mut buzz = GameBuzz::with_config(host, Vec::<Notification>::new(), &config);

        assert!(!buzz.is_enabled());
        assert!(buzz.start(None));
        assert!(!buzz.is_monitoring());
        assert_eq!(buzz.device_path(), Some(Path::new("/dev/input/event5")));
    }

    #[test]
    fn stop_closes_and_is_repeatable() {
        let mut host = MockHost::new();
        let state = host.add_buzzer("/dev/input/event3");
        let mut buzz = buzz(host);
        buzz.start(Some(PathBuf::from("/dev/input/event3")));

        assert!(buzz.stop());
        assert!(buzz.stop());
        assert!(!buzz.has_device());
        assert!(buzz.is_monitoring());
        assert_eq!(state.borrow().handles, 0);
        assert_eq!(
            buzz.sink(),
            &vec![
                Notification::HasDeviceChanged { has_device: true },
                Notification::HasDeviceChanged { has_device: false },
            ]
        );
    }

    #[test]
    fn disable_gates_translation_only() {
        let mut host = MockHost::new();
        let state = host.add_buzzer("/dev/input/event3");
        let mut buzz = buzz(host);
        buzz.start(Some(PathBuf::from("/dev/input/event3")));
        buzz.sink_mut().clear();

        buzz.disable_device(true);
        state
            .borrow_mut()
            .reads
            .push_back(Ok(vec![RawEvent::new(EV_KEY, BTN_TRIGGER_HAPPY1 + 3, 0)]));
        assert_eq!(buzz.handle_device_ready(), 0);
        assert!(buzz.has_device());

        buzz.disable_device(false);
        state
            .borrow_mut()
            .reads
            .push_back(Ok(vec![RawEvent::new(EV_KEY, BTN_TRIGGER_HAPPY1 + 3, 0)]));
        assert_eq!(buzz.handle_device_ready(), 1);
        assert_eq!(
            buzz.sink(),
            &vec![Notification::Button {
                player: 1,
                color: Color::Orange
            }]
        );
    }

    #[test]
    fn led_reports_failure_as_false() {
        let buzz = buzz(MockHost::new());
        assert!(!buzz.led(0, true));
        assert!(!buzz.led(5, true));
        assert!(!buzz.led(1, true));
    }

    #[test]
    fn led_writes_through_map() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("sony::buzz4");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("brightness"), b"").unwrap();
        let buzz = GameBuzz::new(
            MockHost::new(),
            Vec::<Notification>::new(),
            LedMap::discover(root.path()),
        );

        assert!(buzz.led(4, true));
        assert_eq!(std::fs::read(dir.join("brightness")).unwrap(), b"1");
    }

    #[test]
    fn drop_releases_device() {
        let mut host = MockHost::new();
        let state = host.add_buzzer("/dev/input/event3");
        {
            let mut buzz = buzz(host);
            buzz.start(Some(PathBuf::from("/dev/input/event3")));
        }
        assert!(!state.borrow().grabbed);
        assert_eq!(state.borrow().handles, 0);
    }

    #[test]
    fn run_returns_when_shutdown_is_readable() {
        let mut host = MockHost::new();
        let state = host.add_buzzer("/dev/input/event3");
        state
            .borrow_mut()
            .reads
            .push_back(Ok(vec![RawEvent::new(EV_KEY, BTN_TRIGGER_HAPPY1, 0)]));
        let mut buzz = buzz(host);
        buzz.start(Some(PathBuf::from("/dev/input/event3")));

        // /dev/null polls readable, for the mock device as well.
        let shutdown = std::fs::File::open("/dev/null").unwrap();
        buzz.run(shutdown.as_fd()).unwrap();

        assert!(buzz
            .sink()
            .contains(&Notification::Buzzer { player: 1 }));
    }
}
