//! # Relay Module
//!
//! Drains the physical wheelbase and pedal nodes and re-emits a routed,
//! calibrated event stream on one virtual device.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped --start()--> Starting --ok--> Running --stop()--> Stopping --> Stopped
//!                         |
//!                         +--error--> Failed --start()--> Starting ...
//! ```
//!
//! ## Loop
//!
//! One Tokio task per relay. Each iteration reads at most one frame from the
//! wheelbase, then from the pedals, and sleeps for the poll interval (1 ms by
//! default). Reads never block, so the sleep is the only suspension point and
//! a stop request is observed within one interval.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use pedal_relay::calibration::Calibrator;
//! use pedal_relay::config::Config;
//! use pedal_relay::device::EvdevBackend;
//! use pedal_relay::relay::{Relay, RelaySettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let calibrator = Arc::new(Calibrator::new());
//!     let relay = Relay::new(
//!         RelaySettings::from_config(&config),
//!         Arc::clone(&calibrator),
//!         Arc::new(EvdevBackend),
//!     );
//!
//!     relay.start()?;
//!     calibrator.set_enabled(true);
//!     tokio::signal::ctrl_c().await?;
//!     relay.stop().await;
//!     Ok(())
//! }
//! ```

pub mod router;
pub mod worker;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::calibration::Calibrator;
use crate::config::Config;
use crate::device::{Backend, DeviceSpec};
use crate::error::Result;
use router::SourceRole;
use worker::{RelayStats, SourceSlot, StatsSnapshot, Worker};

/// Default pause between polling iterations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default bound on how long `stop` waits for the loop to exit
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Relay lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// The last start attempt failed; `start` may be called again
    Failed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Stopped => "stopped",
            RelayState::Starting => "starting",
            RelayState::Running => "running",
            RelayState::Stopping => "stopping",
            RelayState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the relay reads from and what it creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub pedals: PathBuf,
    pub wheelbase: Option<PathBuf>,
    pub device: DeviceSpec,
    pub poll_interval: Duration,
    pub stop_timeout: Duration,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pedals: PathBuf::from(&config.devices.pedals),
            wheelbase: config.devices.wheelbase.as_ref().map(PathBuf::from),
            device: config.device_spec(),
            poll_interval: Duration::from_millis(config.relay.poll_interval_ms),
            stop_timeout: Duration::from_millis(config.relay.stop_timeout_ms),
        }
    }
}

/// Reads one or two joystick nodes and re-emits them on a virtual device
///
/// `Relay` is `Send + Sync`; share it as `Arc<Relay>` to call `stop` from a
/// different task or thread than `start`.
pub struct Relay {
    settings: RelaySettings,
    calibrator: Arc<Calibrator>,
    backend: Arc<dyn Backend>,
    state: Arc<Mutex<RelayState>>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<Worker>>>,
    stats: Arc<RelayStats>,
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Relay {
    pub fn new(
        settings: RelaySettings,
        calibrator: Arc<Calibrator>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            settings,
            calibrator,
            backend,
            state: Arc::new(Mutex::new(RelayState::Stopped)),
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            stats: Arc::new(RelayStats::default()),
        }
    }

    pub fn state(&self) -> RelayState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == RelayState::Running
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Counters of the current (or last) run
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start relaying
    ///
    /// Opens the source nodes, creates the virtual device and spawns the
    /// polling task. Must be called from within a Tokio runtime.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the relay started, `Ok(false)` if it was already running
    /// (or mid-transition) and nothing was done.
    ///
    /// # Errors
    ///
    /// - `SourceUnavailable`: a source node could not be opened
    /// - `Creation`: the virtual device could not be created
    ///
    /// On error the relay is left in [`RelayState::Failed`] with nothing
    /// acquired. There is no automatic retry.
    ///
    /// The state lock is held for the whole transition, so a concurrent
    /// `stop` waits for `start` to finish and then tears the relay down.
    pub fn start(&self) -> Result<bool> {
        let mut state = lock(&self.state);
        match *state {
            RelayState::Running | RelayState::Starting | RelayState::Stopping => {
                debug!("Start ignored, relay is {}", *state);
                return Ok(false);
            }
            RelayState::Stopped | RelayState::Failed => *state = RelayState::Starting,
        }

        let worker = match self.acquire() {
            Ok(worker) => worker,
            Err(e) => {
                error!("Relay failed to start: {}", e);
                *state = RelayState::Failed;
                return Err(e);
            }
        };

        self.stats.reset();
        self.running.store(true, Ordering::Release);
        let handle = tokio::spawn(run(
            worker,
            Arc::clone(&self.running),
            Arc::clone(&self.state),
            self.settings.poll_interval,
        ));
        *lock(&self.task) = Some(handle);
        *state = RelayState::Running;
        drop(state);

        info!(
            "Relay running: pedals={} wheelbase={} -> '{}'",
            self.settings.pedals.display(),
            self.settings
                .wheelbase
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
            self.settings.device.name
        );
        Ok(true)
    }

    /// Opens sources first so a missing node never leaves a device behind.
    fn acquire(&self) -> Result<Worker> {
        let mut sources = Vec::with_capacity(2);
        if let Some(path) = &self.settings.wheelbase {
            sources.push(SourceSlot::new(
                self.backend.open_source(path)?,
                SourceRole::Wheelbase,
            ));
        }
        sources.push(SourceSlot::new(
            self.backend.open_source(&self.settings.pedals)?,
            SourceRole::Pedals,
        ));

        let output = self.backend.create_device(&self.settings.device)?;

        Ok(Worker::new(
            sources,
            output,
            Arc::clone(&self.calibrator),
            Arc::clone(&self.stats),
            self.settings.device.buttons,
        ))
    }

    /// Stop relaying
    ///
    /// Signals the loop, waits up to the stop timeout for it to exit, then
    /// closes the virtual device and the source handles. A loop that overruns
    /// the timeout is aborted, which drops (and thereby closes) the device.
    ///
    /// Idempotent: a stopped relay stays stopped, and a concurrent second
    /// call returns immediately while the first one finishes. A call made
    /// while `start` is still acquiring resources waits for it to finish.
    pub async fn stop(&self) {
        {
            let mut state = lock(&self.state);
            match *state {
                RelayState::Stopped | RelayState::Stopping => return,
                // Starting is only left behind by a start that panicked
                RelayState::Failed | RelayState::Starting => {
                    *state = RelayState::Stopped;
                    return;
                }
                RelayState::Running => *state = RelayState::Stopping,
            }
        }

        self.running.store(false, Ordering::Release);
        let handle = lock(&self.task).take();

        if let Some(mut handle) = handle {
            match tokio::time::timeout(self.settings.stop_timeout, &mut handle).await {
                Ok(Ok(mut worker)) => {
                    debug!("{} source(s) connected at stop", worker.connected_sources());
                    worker.close();
                }
                Ok(Err(e)) => warn!("Relay task ended abnormally: {}", e),
                Err(_) => {
                    warn!(
                        "Relay loop did not exit within {:?}, aborting",
                        self.settings.stop_timeout
                    );
                    handle.abort();
                }
            }
        }

        let stats = self.stats.snapshot();
        info!(
            "Relay stopped: {} frames, {} emitted, {} dropped, {} write failures",
            stats.frames, stats.emitted, stats.dropped, stats.write_failures
        );
        *lock(&self.state) = RelayState::Stopped;
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        // The detached task sees this within one interval and drops the device
        self.running.store(false, Ordering::Release);
    }
}

async fn run(
    mut worker: Worker,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<RelayState>>,
    poll_interval: Duration,
) -> Worker {
    debug!("Relay loop started ({:?} poll interval)", poll_interval);

    while running.load(Ordering::Acquire) {
        worker.poll_once();

        if worker.connected_sources() == 0 {
            warn!("No source devices left, stopping relay");
            worker.close();
            running.store(false, Ordering::Release);
            let mut state = lock(&state);
            // A concurrent stop() owns the transition out of Stopping
            if *state == RelayState::Running {
                *state = RelayState::Stopped;
            }
            break;
        }

        tokio::time::sleep(poll_interval).await;
    }

    debug!("Relay loop exited");
    worker
}
