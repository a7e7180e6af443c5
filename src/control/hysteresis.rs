//! Two-threshold on/off heater control.

/// Decide the heater state for the current temperature.
///
/// The heater turns off above `setpoint + deadband`, turns on below
/// `setpoint - deadband`, and keeps `prior_heater_on` inside the band so the
/// relay does not chatter around the setpoint.
pub fn decide_heater(current: f64, setpoint: f64, deadband: f64, prior_heater_on: bool) -> bool {
    if current > setpoint + deadband {
        false
    } else if current < setpoint - deadband {
        true
    } else {
        prior_heater_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_above_band_turns_off() {
        assert!(!decide_heater(25.6, 25.0, 0.5, true));
        assert!(!decide_heater(25.6, 25.0, 0.5, false));
    }

    #[test]
    fn test_below_band_turns_on() {
        assert!(decide_heater(24.4, 25.0, 0.5, false));
        assert!(decide_heater(24.4, 25.0, 0.5, true));
    }

    #[test]
    fn test_band_edges_hold_prior_state() {
        assert!(decide_heater(25.5, 25.0, 0.5, true));
        assert!(!decide_heater(24.5, 25.0, 0.5, false));
    }

    #[test]
    fn test_reading_sequence() {
        let mut heater = false;
        let mut seen = Vec::new();
        for reading in [24.0, 24.6, 25.6, 26.0] {
            heater = decide_heater(reading, 25.0, 0.5, heater);
            seen.push(heater);
        }
        assert_eq!(seen, vec![true, true, false, false]);
    }

    #[test]
    fn test_zero_deadband_is_a_plain_thermostat() {
        assert!(decide_heater(24.9, 25.0, 0.0, false));
        assert!(!decide_heater(25.1, 25.0, 0.0, true));
        assert!(decide_heater(25.0, 25.0, 0.0, true));
    }
}
