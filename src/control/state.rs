//! The shared state store.
//!
//! One [`SystemState`] per process, guarded by a single mutex. The control
//! loop and the API handlers only ever see copies ([`StateStore::get`]) or
//! mutate through a closure ([`StateStore::update`]), so a reader never
//! observes a half-applied change.

use crate::hardware::{Actuator, SensorReading};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Everything the controller knows about the zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemState {
    /// Target temperature in °C, changed only over the API
    pub setpoint_celsius: f64,
    /// Whether the control loop may toggle the heater
    pub auto_control_enabled: bool,
    /// Last good temperature reading in °C
    pub current_temperature: f64,
    /// Last good relative humidity reading in %
    pub current_humidity: f64,
    /// When the last good reading was taken; `None` until the first one
    pub last_reading_at: Option<DateTime<Utc>>,
    /// Failed sensor reads since the last good one
    pub consecutive_sensor_failures: u32,
    /// Last commanded actuator states (outputs are write-only)
    pub heater_on: bool,
    pub cooler_on: bool,
    pub cooler_top_on: bool,
    pub status_led_on: bool,
    running: bool,
}

impl SystemState {
    /// Fresh state for a starting process. No actuator has been commanded yet.
    pub fn new(setpoint_celsius: f64, auto_control_enabled: bool) -> Self {
        Self {
            setpoint_celsius,
            auto_control_enabled,
            current_temperature: 0.0,
            current_humidity: 0.0,
            last_reading_at: None,
            consecutive_sensor_failures: 0,
            heater_on: false,
            cooler_on: false,
            cooler_top_on: false,
            status_led_on: false,
            running: true,
        }
    }

    /// False once shutdown has begun. Never becomes true again.
    pub fn running(&self) -> bool {
        self.running
    }

    /// Last commanded state of `actuator`.
    pub fn actuator(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::StatusLed => self.status_led_on,
            Actuator::Heater => self.heater_on,
            Actuator::Cooler => self.cooler_on,
            Actuator::CoolerTop => self.cooler_top_on,
        }
    }

    /// Mirror a command that was just issued to the hardware.
    pub fn set_actuator(&mut self, actuator: Actuator, on: bool) {
        match actuator {
            Actuator::StatusLed => self.status_led_on = on,
            Actuator::Heater => self.heater_on = on,
            Actuator::Cooler => self.cooler_on = on,
            Actuator::CoolerTop => self.cooler_top_on = on,
        }
    }

    pub fn record_reading(&mut self, reading: SensorReading, at: DateTime<Utc>) {
        self.current_temperature = reading.temperature;
        self.current_humidity = reading.humidity;
        self.last_reading_at = Some(at);
        self.consecutive_sensor_failures = 0;
    }

    /// Count a failed read. The previous reading stays in place.
    pub fn record_sensor_failure(&mut self) {
        self.consecutive_sensor_failures = self.consecutive_sensor_failures.saturating_add(1);
    }
}

/// Mutex-guarded owner of the [`SystemState`].
#[derive(Debug)]
pub struct StateStore {
    inner: Mutex<SystemState>,
}

impl StateStore {
    pub fn new(initial: SystemState) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    // The state is plain data, so a panic mid-update cannot leave it
    // structurally broken; keep serving it.
    fn lock(&self) -> MutexGuard<'_, SystemState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of the whole state.
    pub fn get(&self) -> SystemState {
        self.lock().clone()
    }

    /// Atomic read-modify-write. The closure runs with the lock held and
    /// must not block.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut SystemState) -> R) -> R {
        mutate(&mut self.lock())
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Flip `running` to false. Returns `true` only for the call that
    /// performed the transition.
    pub fn begin_shutdown(&self) -> bool {
        let mut state = self.lock();
        let was_running = state.running;
        state.running = false;
        was_running
    }
}
