//! Controller configuration.

use crate::hardware::HardwarePorts;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the control engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Setpoint in effect until changed over the API
    pub setpoint_celsius: f64,
    /// Half-width of the hysteresis band around the setpoint
    pub deadband_celsius: f64,
    /// Whether the heater is under automatic control at startup
    pub auto_control: bool,
    /// Time between control loop ticks
    pub control_period: Duration,
    /// Minimum time between two persisted samples
    pub flush_interval: Duration,
    /// Upper bound on waiting for the control loop to stop
    pub shutdown_timeout: Duration,
    /// JSON file holding the sample history
    pub history_path: PathBuf,
    /// Pin assignment
    pub ports: HardwarePorts,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            setpoint_celsius: crate::DEFAULT_SETPOINT_CELSIUS,
            deadband_celsius: crate::DEFAULT_DEADBAND_CELSIUS,
            auto_control: true,
            control_period: Duration::from_millis(crate::DEFAULT_CONTROL_PERIOD_MS),
            flush_interval: Duration::from_secs(crate::DEFAULT_FLUSH_INTERVAL_SECS),
            shutdown_timeout: Duration::from_millis(crate::DEFAULT_CONTROL_PERIOD_MS * 2),
            history_path: PathBuf::from("history.json"),
            ports: HardwarePorts::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_setpoint(mut self, celsius: f64) -> Self {
        self.setpoint_celsius = celsius;
        self
    }

    pub fn with_deadband(mut self, celsius: f64) -> Self {
        self.deadband_celsius = celsius;
        self
    }

    pub fn with_auto_control(mut self, enabled: bool) -> Self {
        self.auto_control = enabled;
        self
    }

    pub fn with_control_period(mut self, period: Duration) -> Self {
        self.control_period = period;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = path.into();
        self
    }

    pub fn with_ports(mut self, ports: HardwarePorts) -> Self {
        self.ports = ports;
        self
    }

    /// Reject values that would stall or break the control loop.
    ///
    /// The setpoint itself is deliberately left unbounded.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.setpoint_celsius.is_finite() {
            return Err(crate::ThermoError::config_error("setpoint must be a finite number"));
        }
        if !self.deadband_celsius.is_finite() || self.deadband_celsius < 0.0 {
            return Err(crate::ThermoError::config_error(
                "deadband must be a non-negative number",
            ));
        }
        if self.control_period.is_zero() || self.flush_interval.is_zero() {
            return Err(crate::ThermoError::config_error(
                "control period and flush interval must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.setpoint_celsius, 25.0);
        assert_eq!(config.deadband_celsius, 0.5);
        assert_eq!(config.control_period, Duration::from_secs(1));
        assert_eq!(config.flush_interval, Duration::from_secs(30));
        assert!(config.auto_control);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_deadband() {
        let config = ControllerConfig::default().with_deadband(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let config = ControllerConfig::default().with_control_period(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
