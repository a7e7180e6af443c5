//! Property tests for the heater decision and the DHT22 frame decoder.

use proptest::prelude::*;
use std::time::Duration;
use thermo_pi::decide_heater;
use thermo_pi::hardware::dht22::{decode_frame, frame_from_pulses, FRAME_BITS};

// ── Hysteresis ────────────────────────────────────────────────

proptest! {
    /// Outside the band the prior state never matters.
    #[test]
    fn decision_outside_band_ignores_prior(
        setpoint in -20.0f64..60.0,
        deadband in 0.0f64..5.0,
        offset in 0.01f64..30.0,
        prior in any::<bool>(),
    ) {
        prop_assert!(!decide_heater(setpoint + deadband + offset, setpoint, deadband, prior));
        prop_assert!(decide_heater(setpoint - deadband - offset, setpoint, deadband, prior));
    }

    /// Inside the band (edges included) the heater keeps its state.
    #[test]
    fn decision_inside_band_holds(
        setpoint in -20.0f64..60.0,
        deadband in 0.0f64..5.0,
        fraction in -1.0f64..=1.0,
        prior in any::<bool>(),
    ) {
        let current = setpoint + deadband * fraction;
        prop_assume!(current <= setpoint + deadband && current >= setpoint - deadband);
        prop_assert_eq!(decide_heater(current, setpoint, deadband, prior), prior);
    }

    /// Feeding the decision back as the prior state never flips the heater
    /// twice for a temperature held constant.
    #[test]
    fn decision_is_stable_at_fixed_temperature(
        current in -20.0f64..60.0,
        setpoint in -20.0f64..60.0,
        deadband in 0.0f64..5.0,
        prior in any::<bool>(),
    ) {
        let first = decide_heater(current, setpoint, deadband, prior);
        let second = decide_heater(current, setpoint, deadband, first);
        prop_assert_eq!(first, second);
    }
}

// ── DHT22 frames ──────────────────────────────────────────────

fn frame(humidity_tenths: u16, temperature_tenths: u16) -> [u8; 5] {
    let [h_hi, h_lo] = humidity_tenths.to_be_bytes();
    let [t_hi, t_lo] = temperature_tenths.to_be_bytes();
    let checksum = h_hi.wrapping_add(h_lo).wrapping_add(t_hi).wrapping_add(t_lo);
    [h_hi, h_lo, t_hi, t_lo, checksum]
}

proptest! {
    /// Any positive reading with a correct checksum decodes to its tenths.
    #[test]
    fn valid_frames_decode(humidity in 1u16..=1000, temperature in 1u16..=800) {
        let reading = decode_frame(frame(humidity, temperature)).unwrap();
        prop_assert!((reading.humidity - f64::from(humidity) / 10.0).abs() < 1e-9);
        prop_assert!((reading.temperature - f64::from(temperature) / 10.0).abs() < 1e-9);
    }

    /// A corrupted checksum byte is always rejected.
    #[test]
    fn bad_checksum_is_rejected(
        humidity in 1u16..=1000,
        temperature in 1u16..=800,
        flip in 1u8..=255,
    ) {
        let mut bytes = frame(humidity, temperature);
        bytes[4] ^= flip;
        prop_assert!(decode_frame(bytes).is_err());
    }

    /// Sub-zero temperatures (sign bit set) are treated as bad reads.
    #[test]
    fn negative_temperature_is_rejected(humidity in 1u16..=1000, temperature in 1u16..=400) {
        prop_assert!(decode_frame(frame(humidity, temperature | 0x8000)).is_err());
    }

    /// Pulse widths encode bits MSB first; leading pulses beyond 40 are ignored.
    #[test]
    fn pulses_round_trip_to_frame(bytes in any::<[u8; 5]>(), leading in 0usize..3) {
        let mut pulses = vec![Duration::from_micros(80); leading];
        for byte in bytes {
            for bit in (0..8).rev() {
                let width = if byte >> bit & 1 == 1 { 70 } else { 27 };
                pulses.push(Duration::from_micros(width));
            }
        }
        prop_assert_eq!(pulses.len(), FRAME_BITS + leading);
        prop_assert_eq!(frame_from_pulses(&pulses).unwrap(), bytes);
    }
}
