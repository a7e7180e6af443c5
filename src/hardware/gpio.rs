//! Raspberry Pi GPIO backend built on `rppal`.
//!
//! Only compiled with the `gpio` feature so the crate still builds on hosts
//! without a GPIO header.

use crate::error::{Result, ThermoError};
use crate::hardware::{
    dht22, HardwareAdapter, HardwarePorts, OutputLines, SensorLine, SensorReading,
};
use rppal::gpio::{Gpio, IoPin, Mode, OutputPin};
use std::collections::HashMap;

/// Raspberry Pi hardware provider using rppal.
pub struct RaspberryPiHardware {
    gpio: Gpio,
}

/// DHT22 on its claimed data pin.
pub struct Dht22Sensor {
    port: u8,
    pin: IoPin,
}

/// Claimed relay and LED pins.
pub struct GpioOutputs {
    // Claimed pins are cached so each call is a register write, not a syscall
    pins: HashMap<u8, OutputPin>,
}

impl RaspberryPiHardware {
    /// Open the GPIO peripheral. Pins are claimed in [`HardwareAdapter::initialize`].
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new()
            .map_err(|e| ThermoError::gpio_error(format!("Failed to initialize GPIO: {}", e)))?;

        Ok(Self { gpio })
    }

    fn claim_output(&self, port: u8) -> Result<OutputPin> {
        let mut pin = self
            .gpio
            .get(port)
            .map_err(|e| ThermoError::gpio_error(format!("Failed to access pin {}: {}", port, e)))?
            .into_output();
        // Relays must hold their last commanded level after the process exits
        pin.set_reset_on_drop(false);
        Ok(pin)
    }
}

impl HardwareAdapter for RaspberryPiHardware {
    type Sensor = Dht22Sensor;
    type Outputs = GpioOutputs;

    fn initialize(self, ports: &HardwarePorts) -> Result<(Dht22Sensor, GpioOutputs)> {
        let mut pins = HashMap::new();
        for port in ports.output_ports() {
            pins.insert(port, self.claim_output(port)?);
        }

        let sensor = self
            .gpio
            .get(ports.sensor)
            .map_err(|e| {
                ThermoError::gpio_error(format!("Failed to access sensor pin {}: {}", ports.sensor, e))
            })?
            .into_io(Mode::Input);

        tracing::info!(sensor = ports.sensor, outputs = ?ports.output_ports(), "GPIO pins claimed");
        Ok((
            Dht22Sensor {
                port: ports.sensor,
                pin: sensor,
            },
            GpioOutputs { pins },
        ))
    }
}

impl SensorLine for Dht22Sensor {
    fn read_sensor(&mut self, port: u8) -> Result<SensorReading> {
        if port != self.port {
            return Err(ThermoError::gpio_error(format!(
                "Sensor pin {} was not initialized",
                port
            )));
        }
        dht22::transfer::read(&mut self.pin)
    }
}

impl OutputLines for GpioOutputs {
    fn set_output(&mut self, port: u8, level: bool) -> Result<()> {
        let pin = self.pins.get_mut(&port).ok_or_else(|| {
            ThermoError::gpio_error(format!("Output pin {} was not initialized", port))
        })?;

        if level {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }
}
