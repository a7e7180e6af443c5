//! The concurrent thermostat control engine.
//!
//! [`Thermostat`] owns the shared state, the serialized hardware bus, the
//! history store and the background [`ControlLoop`]. It is the only entry
//! point the web layer and the binary need.

pub mod bus;
pub mod config;
pub mod control_loop;
pub mod hysteresis;
pub mod lifecycle;
pub mod state;

// Re-export commonly used items
pub use bus::HardwareBus;
pub use config::ControllerConfig;
pub use control_loop::{ControlLoop, FlushSchedule, TickReport};
pub use hysteresis::decide_heater;
pub use lifecycle::{shutdown_signal, ShutdownReport, Thermostat};
pub use state::{StateStore, SystemState};

use crate::error::{Result, ThermoError};

/// Run a blocking hardware call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ThermoError::hardware_error(format!("hardware call panicked: {}", e)))?
}
