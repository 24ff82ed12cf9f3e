//! # Pedal Relay
//!
//! Merge a sim-racing wheelbase and pedal set into one calibrated virtual
//! joystick.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse the command line and load configuration
//!    - Set up logging (console, plus daily log files when configured)
//!    - Apply the startup calibration preset
//!    - Open the source devices and create the virtual device
//!
//! 2. **Main Loop**
//!    - The relay task forwards events every millisecond
//!    - Relay statistics are logged every 10 seconds
//!    - Ctrl+C triggers a graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Stop the relay task and destroy the virtual device
//!
//! # Examples
//!
//! ```bash
//! pedal-relay --pedals /dev/input/js1 --wheelbase /dev/input/js0 --calibrate
//! ```
//!
//! Expected output:
//! ```text
//! INFO pedal_relay: Pedal Relay v0.1.0 starting...
//! INFO pedal_relay::device::virtual_device: Created virtual device 'Virtual Racing Device' (ddfd:6011, 4 axes, 16 buttons)
//! INFO pedal_relay::relay: Relay running: pedals=/dev/input/js1 wheelbase=/dev/input/js0 -> 'Virtual Racing Device'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use pedal_relay::calibration::{Calibrator, Preset};
use pedal_relay::config::{Config, LoggingConfig};
use pedal_relay::device::EvdevBackend;
use pedal_relay::relay::{Relay, RelaySettings};

/// Seconds between relay statistics log lines
const STATS_INTERVAL_SECS: u64 = 10;

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "pedal-relay.log";

/// Command line arguments; flags override the configuration file
#[derive(Debug, Parser)]
#[command(name = "pedal-relay", version, about)]
struct Cli {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pedal joystick node, e.g. /dev/input/js1
    #[arg(long)]
    pedals: Option<String>,

    /// Wheelbase joystick node; enables the merged device layout
    #[arg(long)]
    wheelbase: Option<String>,

    /// Calibration preset (JSON) applied at startup
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Enable calibration immediately
    #[arg(long)]
    calibrate: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(pedals) = &self.pedals {
            config.devices.pedals = pedals.clone();
        }
        if let Some(wheelbase) = &self.wheelbase {
            config.devices.wheelbase = Some(wheelbase.clone());
        }
        if let Some(preset) = &self.preset {
            config.calibration.preset = Some(preset.display().to_string());
        }
        if self.calibrate {
            config.calibration.enabled = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the file writer on drop and must outlive the program.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = if logging.directory.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&logging.directory, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn build_calibrator(config: &Config) -> Result<Arc<Calibrator>> {
    let calibrator = Arc::new(Calibrator::new());

    if let Some(path) = &config.calibration.preset {
        let preset = Preset::load(path)
            .with_context(|| format!("Failed to load calibration preset {}", path))?;
        preset
            .apply_to(&calibrator)
            .context("Failed to apply calibration preset")?;
    }

    calibrator.set_enabled(config.calibration.enabled);
    info!(
        "Calibration {}",
        if calibrator.is_enabled() { "enabled" } else { "disabled" }
    );
    Ok(calibrator)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("Pedal Relay v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    let calibrator = build_calibrator(&config)?;
    let relay = Relay::new(
        RelaySettings::from_config(&config),
        calibrator,
        Arc::new(EvdevBackend),
    );

    relay.start().context("Failed to start relay")?;
    info!("Press Ctrl+C to exit");

    let mut stats_interval = interval(Duration::from_secs(STATS_INTERVAL_SECS));
    // First tick completes immediately
    stats_interval.tick().await;

    loop {
        tokio::select! {
            _ = stats_interval.tick() => {
                if !relay.is_running() {
                    warn!("Relay is no longer running, exiting");
                    break;
                }
                let stats = relay.stats();
                info!(
                    "Relayed {} of {} frames ({} dropped, {} write failures)",
                    stats.emitted, stats.frames, stats.dropped, stats.write_failures
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    relay.stop().await;
    Ok(())
}
