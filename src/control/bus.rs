//! Exclusive-access point to the initialized hardware.
//!
//! The control loop and API handlers can both command outputs. Every output
//! write goes through one mutex here, and the in-memory mirror of an output is
//! updated while that mutex is still held, so concurrent writers can neither
//! garble a command nor leave the mirror disagreeing with the pin.
//!
//! The sensor has a lock of its own. A DHT22 read can take seconds, and an
//! OFF command must never queue behind it.
//!
//! Lock order is always output lock, then state store. Nothing takes the
//! output lock while holding the state lock.

use crate::control::state::{StateStore, SystemState};
use crate::error::Result;
use crate::hardware::{Actuator, HardwarePorts, OutputLines, SensorLine, SensorReading};
use std::sync::{Mutex, PoisonError};

/// Serialized access to the sensor and output handles of an initialized
/// [`HardwareAdapter`](crate::hardware::HardwareAdapter).
pub struct HardwareBus {
    sensor: Mutex<Box<dyn SensorLine>>,
    outputs: Mutex<Box<dyn OutputLines>>,
    ports: HardwarePorts,
}

impl HardwareBus {
    pub fn new(
        sensor: impl SensorLine + 'static,
        outputs: impl OutputLines + 'static,
        ports: HardwarePorts,
    ) -> Self {
        Self {
            sensor: Mutex::new(Box::new(sensor)),
            outputs: Mutex::new(Box::new(outputs)),
            ports,
        }
    }

    pub fn ports(&self) -> &HardwarePorts {
        &self.ports
    }

    pub fn read_sensor(&self) -> Result<SensorReading> {
        self.sensor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_sensor(self.ports.sensor)
    }

    /// Drive `actuator` and mirror the new state into `store`.
    pub fn command(&self, store: &StateStore, actuator: Actuator, on: bool) -> Result<()> {
        self.command_if(store, actuator, |_| Some(on)).map(|_| ())
    }

    /// Decide and command under one lock.
    ///
    /// `decide` sees the state as it is while the output lock is held and returns the
    /// state to command, or `None` to leave the output alone. Returns what
    /// was commanded.
    pub fn command_if(
        &self,
        store: &StateStore,
        actuator: Actuator,
        decide: impl FnOnce(&SystemState) -> Option<bool>,
    ) -> Result<Option<bool>> {
        let mut outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(on) = decide(&store.get()) else {
            return Ok(None);
        };

        let pin = self.ports.pin(actuator);
        outputs.set_output(pin.port, pin.level_for(on))?;
        store.update(|s| s.set_actuator(actuator, on));
        tracing::debug!(%actuator, on, port = pin.port, "actuator commanded");
        Ok(Some(on))
    }

    /// Command every actuator off, continuing past failures.
    ///
    /// Returns the actuators that could not be switched off.
    pub fn de_energize_all(&self, store: &StateStore) -> Vec<Actuator> {
        let mut failed = Vec::new();
        for actuator in Actuator::ALL {
            if let Err(e) = self.command(store, actuator, false) {
                tracing::error!(%actuator, error = %e, "failed to switch actuator off");
                failed.push(actuator);
            }
        }
        failed
    }
}
