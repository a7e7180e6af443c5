//! Startup and shutdown sequencing.
//!
//! Startup drives every actuator to its initial state, truncates the history
//! and spawns the control loop. Shutdown can be triggered by the API, by a
//! termination signal, or by the binary returning normally; all of them end
//! up in [`Thermostat::shutdown`], which runs the sequence exactly once and
//! hands every caller the same [`ShutdownReport`].

use crate::control::bus::HardwareBus;
use crate::control::config::ControllerConfig;
use crate::control::control_loop::ControlLoop;
use crate::control::run_blocking;
use crate::control::state::{StateStore, SystemState};
use crate::error::{Result, ThermoError};
use crate::hardware::{Actuator, HardwareAdapter};
use crate::history::HistoryStore;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

/// Outcome of the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Actuators whose OFF command failed or timed out
    pub actuator_failures: Vec<Actuator>,
    /// Whether the control loop exited within the timeout
    pub loop_stopped: bool,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.actuator_failures.is_empty() && self.loop_stopped
    }
}

/// A running thermostat.
pub struct Thermostat {
    config: ControllerConfig,
    store: Arc<StateStore>,
    bus: Arc<HardwareBus>,
    history: Arc<HistoryStore>,
    stop_tx: watch::Sender<bool>,
    control_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: OnceCell<ShutdownReport>,
}

impl Thermostat {
    /// Initialize the hardware, reset the history and start the control loop.
    ///
    /// Fails only if the hardware cannot be brought to its initial state, in
    /// which case the loop is never started.
    pub async fn start(
        config: ControllerConfig,
        adapter: impl HardwareAdapter + 'static,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let store = Arc::new(StateStore::new(SystemState::new(
            config.setpoint_celsius,
            config.auto_control,
        )));
        let history = Arc::new(HistoryStore::new(&config.history_path));

        let ports = config.ports;
        let (sensor, outputs) = match run_blocking(move || adapter.initialize(&ports)).await {
            Ok(handles) => handles,
            Err(e) => {
                // Nothing was claimed, so there is nothing to switch off
                error!(error = %e, "hardware initialization failed");
                return Err(ThermoError::lifecycle_error(format!(
                    "hardware initialization failed: {}",
                    e
                )));
            }
        };
        let bus = Arc::new(HardwareBus::new(sensor, outputs, ports));

        let init = {
            let bus = Arc::clone(&bus);
            let store = Arc::clone(&store);
            run_blocking(move || {
                for actuator in Actuator::ALL {
                    bus.command(&store, actuator, actuator.initial_state())?;
                }
                Ok(())
            })
            .await
        };
        if let Err(e) = init {
            error!(error = %e, "could not drive outputs to their initial state");
            let bus = Arc::clone(&bus);
            let store = Arc::clone(&store);
            let _ = run_blocking(move || Ok(bus.de_energize_all(&store))).await;
            return Err(ThermoError::lifecycle_error(format!(
                "hardware initialization failed: {}",
                e
            )));
        }

        if let Err(e) = history.reset().await {
            warn!(error = %e, path = %history.path().display(), "could not reset history");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let control = ControlLoop::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&history),
            config.deadband_celsius,
            config.control_period,
            config.flush_interval,
        );
        let task = tokio::spawn(control.run(stop_rx));

        info!(
            setpoint = config.setpoint_celsius,
            deadband = config.deadband_celsius,
            "thermostat started"
        );

        Ok(Arc::new(Self {
            config,
            store,
            bus,
            history,
            stop_tx,
            control_task: Mutex::new(Some(task)),
            shutdown: OnceCell::new(),
        }))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Consistent snapshot of the shared state.
    pub fn state(&self) -> SystemState {
        self.store.get()
    }

    /// Change the setpoint. Returns the new value.
    pub fn set_setpoint(&self, celsius: f64) -> f64 {
        self.store.update(|s| s.setpoint_celsius = celsius);
        info!(setpoint = celsius, "setpoint changed");
        celsius
    }

    pub fn set_auto_control(&self, enabled: bool) {
        self.store.update(|s| s.auto_control_enabled = enabled);
        info!(enabled, "auto-control changed");
    }

    /// Manually command an actuator. Takes effect before this returns.
    ///
    /// A manual heater command always disables auto-control, even if the
    /// write itself fails.
    pub async fn command(&self, actuator: Actuator, on: bool) -> Result<()> {
        if !self.store.is_running() {
            return Err(ThermoError::lifecycle_error("thermostat is shutting down"));
        }
        if actuator == Actuator::Heater {
            // Cleared before the write so the loop cannot undo the command
            self.store.update(|s| s.auto_control_enabled = false);
        }

        let bus = Arc::clone(&self.bus);
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            bus.command_if(&store, actuator, |s| s.running().then_some(on))
                .and_then(|done| {
                    done.map(|_| ())
                        .ok_or_else(|| ThermoError::lifecycle_error("thermostat is shutting down"))
                })
        })
        .await?;

        info!(%actuator, on, "manual actuator command");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.store.is_running()
    }

    /// Resolves once shutdown has been requested from any trigger.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.stop_tx.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Stop the loop, de-energize every actuator and wait for the loop to exit.
    ///
    /// Safe to call from any number of places; the sequence runs once and
    /// later or concurrent callers receive the same report.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown.get_or_init(|| self.run_shutdown()).await.clone()
    }

    async fn run_shutdown(&self) -> ShutdownReport {
        info!("shutdown started");
        self.store.begin_shutdown();
        self.stop_tx.send_replace(true);

        let timeout = self.config.shutdown_timeout;

        let bus = Arc::clone(&self.bus);
        let store = Arc::clone(&self.store);
        let off = time::timeout(timeout, run_blocking(move || Ok(bus.de_energize_all(&store))));
        let actuator_failures = match off.await {
            Ok(Ok(failed)) => failed,
            Ok(Err(e)) => {
                error!(error = %e, "de-energize task failed");
                Actuator::ALL.to_vec()
            }
            Err(_) => {
                error!(timeout_ms = timeout.as_millis() as u64, "hardware did not respond to OFF commands");
                Actuator::ALL.to_vec()
            }
        };

        let task = self
            .control_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let loop_stopped = match task {
            Some(mut handle) => match time::timeout(timeout, &mut handle).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    error!(error = %e, "control loop ended abnormally");
                    true
                }
                Err(_) => {
                    error!(timeout_ms = timeout.as_millis() as u64, "control loop did not stop, aborting");
                    handle.abort();
                    false
                }
            },
            None => true,
        };

        let report = ShutdownReport {
            actuator_failures,
            loop_stopped,
        };
        if report.is_clean() {
            info!("shutdown complete");
        } else {
            warn!(?report, "shutdown completed with errors");
        }
        report
    }
}

impl Drop for Thermostat {
    fn drop(&mut self) {
        if self.shutdown.initialized() {
            return;
        }
        // Unwinding or dropped without a shutdown: get the outputs safe anyway
        warn!("thermostat dropped without shutdown, de-energizing outputs");
        self.store.begin_shutdown();
        self.stop_tx.send_replace(true);
        if let Some(handle) = self
            .control_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        // Only output writes take the output lock, so a sensor read stuck on
        // the blocking pool cannot hold this up
        self.bus.de_energize_all(&self.store);
    }
}

/// Resolves on SIGINT, SIGTERM, or a shutdown requested through `thermostat`,
/// after the shutdown sequence has run.
pub async fn shutdown_signal(thermostat: Arc<Thermostat>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
        _ = thermostat.shutdown_requested() => info!("shutdown requested over the API"),
    }

    thermostat.shutdown().await;
}
