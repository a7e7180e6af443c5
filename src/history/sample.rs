//! Data structures for persisted samples.

use crate::control::state::SystemState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted measurement. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// When the sample was taken (serialized as RFC 3339)
    #[serde(rename = "TimeStamp")]
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    /// Relative humidity in percent
    #[serde(rename = "Humidity")]
    pub humidity: f64,
}

impl SamplePoint {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
        }
    }

    /// Sample the current reading out of a state snapshot.
    pub fn from_state(state: &SystemState, timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, state.current_temperature, state.current_humidity)
    }
}

/// The history as parallel sequences, the shape the chart page plots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySeries {
    pub timestamps: Vec<String>,
    pub temperatures: Vec<f64>,
    pub humidities: Vec<f64>,
}

impl HistorySeries {
    pub fn from_samples(samples: &[SamplePoint]) -> Self {
        let mut series = Self {
            timestamps: Vec::with_capacity(samples.len()),
            temperatures: Vec::with_capacity(samples.len()),
            humidities: Vec::with_capacity(samples.len()),
        };
        for sample in samples {
            series.timestamps.push(sample.timestamp.to_rfc3339());
            series.temperatures.push(round2(sample.temperature));
            series.humidities.push(round2(sample.humidity));
        }
        series
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
