//! Simulated board for development hosts without a GPIO header.
//!
//! A first-order thermal model: the chamber relaxes toward ambient, the
//! heater pushes it up and each running cooler pulls it down. Good enough to
//! watch the hysteresis controller cycle from a laptop.

use crate::error::{Result, ThermoError};
use crate::hardware::{
    Actuator, HardwareAdapter, HardwarePorts, OutputLines, SensorLine, SensorReading,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// °C per second added while the heater is energized.
const HEATER_RATE: f64 = 0.08;
/// °C per second removed by each running cooler.
const COOLER_RATE: f64 = 0.02;
/// Fraction of the gap to ambient closed per second.
const AMBIENT_COUPLING: f64 = 0.002;

/// Simulated hardware provider.
pub struct SimulatedHardware {
    chamber: Chamber,
}

/// Sensor half of an initialized [`SimulatedHardware`].
pub struct SimulatedSensor {
    port: u8,
    chamber: SharedChamber,
}

/// Output half of an initialized [`SimulatedHardware`].
pub struct SimulatedOutputs {
    chamber: SharedChamber,
}

type SharedChamber = Arc<Mutex<Chamber>>;

struct Chamber {
    ports: HardwarePorts,
    levels: HashMap<u8, bool>,
    temperature: f64,
    humidity: f64,
    ambient: f64,
    last_step: Instant,
}

impl SimulatedHardware {
    pub fn new() -> Result<Self> {
        Ok(Self::with_ambient(22.0, 55.0))
    }

    /// Start the chamber at the given ambient temperature and humidity.
    pub fn with_ambient(temperature: f64, humidity: f64) -> Self {
        Self {
            chamber: Chamber {
                ports: HardwarePorts::default(),
                levels: HashMap::new(),
                temperature,
                humidity,
                ambient: temperature,
                last_step: Instant::now(),
            },
        }
    }
}

impl Chamber {
    fn is_on(&self, actuator: Actuator) -> bool {
        let pin = self.ports.pin(actuator);
        self.levels
            .get(&pin.port)
            .is_some_and(|level| *level == pin.level_for(true))
    }

    fn step(&mut self) {
        let dt = self.last_step.elapsed().as_secs_f64();
        self.last_step = Instant::now();

        let mut rate = AMBIENT_COUPLING * (self.ambient - self.temperature);
        if self.is_on(Actuator::Heater) {
            rate += HEATER_RATE;
        }
        for cooler in [Actuator::Cooler, Actuator::CoolerTop] {
            if self.is_on(cooler) {
                rate -= COOLER_RATE;
            }
        }
        self.temperature += rate * dt;
        // Warmer air holds more water, so relative humidity falls as it heats
        self.humidity = (self.humidity - rate * dt * 1.5).clamp(5.0, 95.0);
    }
}

fn lock(chamber: &SharedChamber) -> MutexGuard<'_, Chamber> {
    chamber.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HardwareAdapter for SimulatedHardware {
    type Sensor = SimulatedSensor;
    type Outputs = SimulatedOutputs;

    fn initialize(mut self, ports: &HardwarePorts) -> Result<(SimulatedSensor, SimulatedOutputs)> {
        self.chamber.ports = *ports;
        self.chamber.last_step = Instant::now();
        tracing::info!("Using simulated hardware (built without the gpio feature)");

        let chamber = Arc::new(Mutex::new(self.chamber));
        Ok((
            SimulatedSensor {
                port: ports.sensor,
                chamber: Arc::clone(&chamber),
            },
            SimulatedOutputs { chamber },
        ))
    }
}

impl SensorLine for SimulatedSensor {
    fn read_sensor(&mut self, port: u8) -> Result<SensorReading> {
        if port != self.port {
            return Err(ThermoError::sensor_error(format!(
                "no simulated sensor on port {}",
                port
            )));
        }
        let mut chamber = lock(&self.chamber);
        chamber.step();
        Ok(SensorReading::new(chamber.temperature, chamber.humidity))
    }
}

impl SimulatedOutputs {
    /// Last electrical level written to `port`, if any.
    pub fn level(&self, port: u8) -> Option<bool> {
        lock(&self.chamber).levels.get(&port).copied()
    }
}

impl OutputLines for SimulatedOutputs {
    fn set_output(&mut self, port: u8, level: bool) -> Result<()> {
        let mut chamber = lock(&self.chamber);
        chamber.step();
        chamber.levels.insert(port, level);
        Ok(())
    }
}
