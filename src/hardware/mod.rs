//! Hardware access for the thermostat: one temperature/humidity sensor and
//! four digital outputs.
//!
//! Everything above this module talks to the board through the
//! [`HardwareAdapter`] trait so the control engine can run against the real
//! GPIO header, the host simulator, or a test fake. The concrete provider is
//! chosen at compile time by the `gpio` feature, like the rest of the crate's
//! Pi-specific code.

pub mod dht22;
pub mod simulated;

#[cfg(feature = "gpio")]
pub mod gpio;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single temperature/humidity measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl SensorReading {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }
}

/// The digital outputs driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    /// Front-panel "controller alive" LED
    StatusLed,
    /// Heating element relay, cycled by the hysteresis controller
    Heater,
    /// Main cooler relay
    Cooler,
    /// Secondary (top) cooler relay
    CoolerTop,
}

impl Actuator {
    /// Every actuator, in the order they are de-energized on shutdown.
    pub const ALL: [Actuator; 4] = [
        Actuator::StatusLed,
        Actuator::Cooler,
        Actuator::CoolerTop,
        Actuator::Heater,
    ];

    /// Commanded state right after startup. The coolers run continuously
    /// and only the heater is cycled.
    pub fn initial_state(self) -> bool {
        match self {
            Actuator::StatusLed | Actuator::Cooler | Actuator::CoolerTop => true,
            Actuator::Heater => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Actuator::StatusLed => "status_led",
            Actuator::Heater => "heater",
            Actuator::Cooler => "cooler",
            Actuator::CoolerTop => "cooler_top",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wiring of one digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPin {
    /// BCM pin number
    pub port: u8,
    /// Whether the attached relay energizes on a low level
    pub active_low: bool,
}

impl OutputPin {
    pub const fn active_high(port: u8) -> Self {
        Self {
            port,
            active_low: false,
        }
    }

    pub const fn active_low(port: u8) -> Self {
        Self {
            port,
            active_low: true,
        }
    }

    /// Electrical level that puts the actuator in the requested state.
    pub fn level_for(&self, on: bool) -> bool {
        on != self.active_low
    }
}

/// Pin assignment of the whole board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwarePorts {
    /// DHT22 data line
    pub sensor: u8,
    pub status_led: OutputPin,
    pub heater: OutputPin,
    pub cooler: OutputPin,
    pub cooler_top: OutputPin,
}

impl Default for HardwarePorts {
    fn default() -> Self {
        Self {
            sensor: 4,
            status_led: OutputPin::active_high(13),
            heater: OutputPin::active_high(19),
            cooler: OutputPin::active_low(26),
            cooler_top: OutputPin::active_low(5),
        }
    }
}

impl HardwarePorts {
    /// Wiring of the given actuator.
    pub fn pin(&self, actuator: Actuator) -> OutputPin {
        match actuator {
            Actuator::StatusLed => self.status_led,
            Actuator::Heater => self.heater,
            Actuator::Cooler => self.cooler,
            Actuator::CoolerTop => self.cooler_top,
        }
    }

    /// All output ports, used to claim pins during initialization.
    pub fn output_ports(&self) -> [u8; 4] {
        [
            self.status_led.port,
            self.heater.port,
            self.cooler.port,
            self.cooler_top.port,
        ]
    }
}

/// Capability interface over the board.
///
/// Initialization claims the pins and splits the board into a sensor handle
/// and an output handle. The two are driven independently, so a sensor
/// transfer that hangs never holds up an output write.
pub trait HardwareAdapter: Send {
    type Sensor: SensorLine + 'static;
    type Outputs: OutputLines + 'static;

    /// Prepare the hardware for use. A failure here is fatal for the process.
    fn initialize(self, ports: &HardwarePorts) -> Result<(Self::Sensor, Self::Outputs)>;
}

/// The temperature/humidity sensor. Calls are blocking and may take up to a
/// few hundred milliseconds.
pub trait SensorLine: Send {
    /// Take one measurement from the sensor on `port`.
    fn read_sensor(&mut self, port: u8) -> Result<SensorReading>;
}

/// The digital outputs. Write-only, so callers keep their own record of
/// what they commanded.
pub trait OutputLines: Send {
    /// Drive output `port` to the given electrical level.
    fn set_output(&mut self, port: u8, level: bool) -> Result<()>;
}

impl<T: SensorLine + ?Sized> SensorLine for Box<T> {
    fn read_sensor(&mut self, port: u8) -> Result<SensorReading> {
        (**self).read_sensor(port)
    }
}

impl<T: OutputLines + ?Sized> OutputLines for Box<T> {
    fn set_output(&mut self, port: u8, level: bool) -> Result<()> {
        (**self).set_output(port, level)
    }
}

// Re-export the appropriate hardware provider
#[cfg(feature = "gpio")]
pub use gpio::RaspberryPiHardware as DefaultHardware;

#[cfg(not(feature = "gpio"))]
pub use simulated::SimulatedHardware as DefaultHardware;
