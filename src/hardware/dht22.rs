//! DHT22 / AM2302 single-wire temperature and humidity sensor.
//!
//! A transfer is 40 bits: humidity (16 bits, tenths of a percent),
//! temperature (15 bits in tenths of a degree plus a sign bit) and a
//! checksum byte. Each bit is a ~50µs low followed by a high pulse whose
//! width encodes the value (~27µs for 0, ~70µs for 1).
//!
//! The frame arithmetic lives here as plain functions so it can be tested
//! without a board. The bit-banged transfer itself needs the `gpio` feature.

use crate::error::{Result, ThermoError};
use crate::hardware::SensorReading;
use std::time::Duration;

/// Number of data bits in one transfer.
pub const FRAME_BITS: usize = 40;

/// High pulses longer than this are decoded as a 1 bit.
pub const ONE_BIT_THRESHOLD: Duration = Duration::from_micros(50);

/// Build the 5-byte frame from measured high-pulse widths.
///
/// The sensor's 80µs response pulse may or may not be included, so only the
/// trailing [`FRAME_BITS`] pulses are used.
pub fn frame_from_pulses(pulses: &[Duration]) -> Result<[u8; 5]> {
    if pulses.len() < FRAME_BITS {
        return Err(ThermoError::sensor_error(format!(
            "incomplete transfer: {} of {} bits",
            pulses.len(),
            FRAME_BITS
        )));
    }

    let mut frame = [0u8; 5];
    for (i, width) in pulses[pulses.len() - FRAME_BITS..].iter().enumerate() {
        frame[i / 8] <<= 1;
        if *width > ONE_BIT_THRESHOLD {
            frame[i / 8] |= 1;
        }
    }
    Ok(frame)
}

/// Validate the checksum and convert a raw frame into a reading.
///
/// Zero or negative values are what a DHT22 reports when the transfer was
/// clipped, so they are rejected as bad reads.
pub fn decode_frame(frame: [u8; 5]) -> Result<SensorReading> {
    let sum = frame[..4].iter().map(|b| u32::from(*b)).sum::<u32>() & 0xFF;
    if sum != u32::from(frame[4]) {
        return Err(ThermoError::sensor_error(format!(
            "checksum mismatch: expected {:#04x}, got {:#04x}",
            sum, frame[4]
        )));
    }

    let humidity = f64::from(u16::from(frame[0]) << 8 | u16::from(frame[1])) * 0.1;
    let magnitude = f64::from(u16::from(frame[2] & 0x7F) << 8 | u16::from(frame[3])) * 0.1;
    let temperature = if frame[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    if temperature <= 0.0 || humidity <= 0.0 {
        return Err(ThermoError::sensor_error(format!(
            "implausible reading: {:.1}°C / {:.1}%",
            temperature, humidity
        )));
    }

    Ok(SensorReading::new(temperature, humidity))
}

#[cfg(feature = "gpio")]
pub(crate) mod transfer {
    use super::*;
    use rppal::gpio::{IoPin, Level, Mode};
    use std::thread;
    use std::time::Instant;

    /// Upper bound on level changes in one transfer (start handshake + 40 bits).
    const MAX_TIMINGS: usize = 85;

    /// A level that lasts longer than this means the sensor stopped talking.
    const LEVEL_TIMEOUT: Duration = Duration::from_micros(255);

    /// Attempts per read before giving up for this tick.
    const MAX_ATTEMPTS: u32 = 3;

    /// Read the sensor, retrying a few times on garbled transfers.
    pub fn read(pin: &mut IoPin) -> Result<SensorReading> {
        let mut last_err = ThermoError::sensor_error("no transfer attempted");
        for attempt in 1..=MAX_ATTEMPTS {
            match read_once(pin).and_then(|pulses| frame_from_pulses(&pulses)).and_then(decode_frame) {
                Ok(reading) => return Ok(reading),
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "DHT22 transfer failed");
                    last_err = e;
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }
        Err(last_err)
    }

    fn read_once(pin: &mut IoPin) -> Result<Vec<Duration>> {
        pin.set_mode(Mode::Output);
        pin.set_low();
        thread::sleep(Duration::from_millis(18));
        pin.set_high();
        busy_wait(Duration::from_micros(40));
        pin.set_mode(Mode::Input);

        let mut pulses = Vec::with_capacity(FRAME_BITS + 1);
        let mut last = Level::High;
        for _ in 0..MAX_TIMINGS {
            let started = Instant::now();
            while pin.read() == last {
                if started.elapsed() > LEVEL_TIMEOUT {
                    return Ok(pulses);
                }
            }
            if last == Level::High {
                pulses.push(started.elapsed());
            }
            last = pin.read();
        }
        Ok(pulses)
    }

    fn busy_wait(duration: Duration) {
        let started = Instant::now();
        while started.elapsed() < duration {
            std::hint::spin_loop();
        }
    }
}
