//! # Thermo Pi - Raspberry Pi Thermostat Controller
//!
//! A single-zone thermostat for a Raspberry Pi: reads a DHT22
//! temperature/humidity sensor, cycles a heater relay with hysteresis
//! control, keeps the coolers running, and serves its state over a small
//! JSON API.
//!
//! ## Features
//!
//! - **Hysteresis control**: heater switched around a setpoint with a deadband
//! - **Safe lifecycle**: actuators forced to a known state at startup and
//!   de-energized on every exit path (API, signal, normal exit)
//! - **History**: samples persisted every 30 seconds and plotted at `/history`
//! - **GPIO support**: real hardware behind the `gpio` feature, a simulated
//!   chamber otherwise
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use thermo_pi::{start_web_server, ControllerConfig, DefaultHardware, Thermostat, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hardware = DefaultHardware::new()?;
//!     let thermostat = Thermostat::start(ControllerConfig::default(), hardware).await?;
//!
//!     // Serve on port 5000 until SIGINT/SIGTERM or POST /shutdown
//!     start_web_server(WebConfig::default(), thermostat).await?;
//!     Ok(())
//! }
//! ```

pub mod control;
pub mod error;
pub mod hardware;
pub mod history;
pub mod web;

// Re-export public API
pub use control::{
    decide_heater, ControllerConfig, ShutdownReport, StateStore, SystemState, Thermostat,
};
pub use error::{Result, ThermoError};
pub use hardware::{
    Actuator, DefaultHardware, HardwareAdapter, HardwarePorts, OutputLines, OutputPin,
    SensorLine, SensorReading,
};
pub use history::{HistoryStore, SamplePoint};
pub use web::{create_app, start_web_server, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 5000;

/// The default setpoint in degrees Celsius
pub const DEFAULT_SETPOINT_CELSIUS: f64 = 25.0;

/// The default hysteresis half-width in degrees Celsius
pub const DEFAULT_DEADBAND_CELSIUS: f64 = 0.5;

/// The default control loop period in milliseconds
pub const DEFAULT_CONTROL_PERIOD_MS: u64 = 1000;

/// The default interval between persisted samples in seconds
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;
