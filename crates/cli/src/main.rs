//! gamebuzz CLI: list, light and listen to USB quiz buzzers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gamebuzz_core::config::Config;
use gamebuzz_core::led::LedMap;
use gamebuzz_core::linux::LinuxHost;
use gamebuzz_core::{EventSink, GameBuzz, Notification};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use std::os::fd::AsFd;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gamebuzz", version, about = "USB quiz buzzer driver")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached buzzer devices.
    ListDevices,
    /// Show discovered player LEDs.
    Leds {
        /// LED class directory.
        #[arg(long)]
        led_root: Option<PathBuf>,
    },
    /// Switch a player LED on or off.
    Led {
        /// Player number (1-4).
        player: u32,
        /// New state.
        state: LedState,
        /// LED class directory.
        #[arg(long)]
        led_root: Option<PathBuf>,
    },
    /// Print buzzer events until interrupted.
    Listen {
        /// Event device node; discovered when omitted.
        #[arg(short, long)]
        device: Option<PathBuf>,
        /// Print one JSON object per event.
        #[arg(long)]
        json: bool,
        /// Start with event translation disabled.
        #[arg(long)]
        disabled: bool,
        /// Do not watch for hotplug (and do not auto-discover).
        #[arg(long)]
        no_hotplug: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LedState {
    On,
    Off,
}

/// Prints notifications to stdout.
struct PrintSink {
    json: bool,
}

impl EventSink for PrintSink {
    fn emit(&mut self, notification: Notification) {
        if self.json {
            match serde_json::to_string(&notification) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Cannot encode notification"),
            }
        } else {
            println!("{notification}");
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

/// Block SIGINT/SIGTERM and deliver them through a descriptor instead.
fn shutdown_signals() -> Result<SignalFd> {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGTERM);
    mask.thread_block().context("block shutdown signals")?;
    SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
        .context("create signalfd")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::ListDevices => {
            let devices = gamebuzz_core::device::find_input_devices(&LinuxHost::new())?;
            if devices.is_empty() {
                println!("No buzzer devices found.");
                println!("Ensure the buzzers are plugged in and /dev/input is readable.");
            } else {
                for dev in &devices {
                    println!("{}", dev.display());
                }
            }
        }
        Commands::Leds { led_root } => {
            let root = led_root.unwrap_or(config.led_root);
            let leds = LedMap::discover(&root);
            if leds.is_empty() {
                println!("No buzzer LEDs under {}.", root.display());
            }
            for (player, path) in leds.iter() {
                println!("Player {player}: {}", path.display());
            }
        }
        Commands::Led {
            player,
            state,
            led_root,
        } => {
            let root = led_root.unwrap_or(config.led_root);
            let on = matches!(state, LedState::On);
            LedMap::discover(&root)
                .set(player, on)
                .with_context(|| format!("set LED for player {player}"))?;
            println!("Player {player} LED {}", if on { "on" } else { "off" });
        }
        Commands::Listen {
            device,
            json,
            disabled,
            no_hotplug,
        } => {
            if device.is_some() {
                config.device = device;
            }
            config.start_disabled |= disabled;
            config.hotplug &= !no_hotplug;

            let signals = shutdown_signals()?;
            let mut buzz = GameBuzz::with_config(LinuxHost::new(), PrintSink { json }, &config);
            if !buzz.start(None) && !buzz.is_monitoring() {
                anyhow::bail!("No buzzer device and no hotplug monitoring; nothing to wait for");
            }
            buzz.run(signals.as_fd())?;
            buzz.stop();
        }
    }

    Ok(())
}
