//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thermo_pi::{
    ControllerConfig, HardwareAdapter, HardwarePorts, OutputLines, Result, SensorLine,
    SensorReading, ThermoError,
};

/// Everything the fake board has seen, shared with the test body.
#[derive(Debug)]
pub struct Board {
    /// `(port, level)` for every `set_output` call, in order
    pub writes: Vec<(u8, bool)>,
    /// Readings handed out before falling back to `fallback`; `None` fails the read
    pub script: VecDeque<Option<SensorReading>>,
    /// Returned once the script is exhausted; `None` fails the read
    pub fallback: Option<SensorReading>,
    pub fail_init: bool,
    pub fail_writes: bool,
    /// How long each sensor read blocks, with the board unlocked
    pub read_delay: Duration,
    /// Total adapter calls of any kind
    pub calls: usize,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            writes: Vec::new(),
            script: VecDeque::new(),
            fallback: Some(SensorReading::new(22.0, 50.0)),
            fail_init: false,
            fail_writes: false,
            read_delay: Duration::ZERO,
            calls: 0,
        }
    }
}

/// A [`HardwareAdapter`] that records every call. Its sensor and output
/// handles are clones sharing the same [`Board`].
#[derive(Clone, Default)]
pub struct RecordingHardware(pub Arc<Mutex<Board>>);

impl RecordingHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out `temperatures` (at 50% humidity) one per read, in order.
    pub fn scripted(temperatures: &[f64]) -> Self {
        let hw = Self::new();
        hw.board().script = temperatures
            .iter()
            .map(|t| Some(SensorReading::new(*t, 50.0)))
            .collect();
        hw
    }

    pub fn board(&self) -> std::sync::MutexGuard<'_, Board> {
        self.0.lock().expect("board lock poisoned")
    }

    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.board().writes.clone()
    }

    pub fn calls(&self) -> usize {
        self.board().calls
    }
}

impl HardwareAdapter for RecordingHardware {
    type Sensor = RecordingHardware;
    type Outputs = RecordingHardware;

    fn initialize(self, _ports: &HardwarePorts) -> Result<(Self, Self)> {
        {
            let mut board = self.board();
            board.calls += 1;
            if board.fail_init {
                return Err(ThermoError::hardware_error("GPIO chip not found"));
            }
        }
        Ok((self.clone(), self))
    }
}

impl SensorLine for RecordingHardware {
    fn read_sensor(&mut self, _port: u8) -> Result<SensorReading> {
        let delay = self.board().read_delay;
        std::thread::sleep(delay);

        let mut board = self.board();
        board.calls += 1;
        let next = match board.script.pop_front() {
            Some(scripted) => scripted,
            None => board.fallback,
        };
        next.ok_or_else(|| ThermoError::sensor_error("checksum mismatch"))
    }
}

impl OutputLines for RecordingHardware {
    fn set_output(&mut self, port: u8, level: bool) -> Result<()> {
        let mut board = self.board();
        board.calls += 1;
        if board.fail_writes {
            return Err(ThermoError::hardware_error("relay did not respond"));
        }
        board.writes.push((port, level));
        Ok(())
    }
}

/// A history file path nobody else is using.
pub fn temp_history_path() -> PathBuf {
    std::env::temp_dir().join(format!("thermo_pi_test_{}.json", uuid::Uuid::new_v4()))
}

/// Config with a private history file and a slow loop, so tests drive
/// ticks themselves where timing matters.
pub fn test_config() -> ControllerConfig {
    ControllerConfig::default()
        .with_history_path(temp_history_path())
        .with_control_period(Duration::from_millis(20))
        .with_shutdown_timeout(Duration::from_secs(2))
}
