//! The background control loop.
//!
//! Every tick: read the sensor, record the reading, let the hysteresis
//! controller drive the heater if auto-control is on, and hand a sample to
//! the history store once the flush interval has elapsed. Ticks do not
//! overlap and always run their steps in that order.

use crate::control::bus::HardwareBus;
use crate::control::hysteresis::decide_heater;
use crate::control::run_blocking;
use crate::control::state::StateStore;
use crate::hardware::{Actuator, SensorReading};
use crate::history::{HistoryStore, SamplePoint};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Tracks when the next sample is due, measured from the last successful flush.
#[derive(Debug, Clone, Copy)]
pub struct FlushSchedule {
    interval: Duration,
    last_flush: Instant,
}

impl FlushSchedule {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_flush: start,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) >= self.interval
    }

    pub fn mark_flushed(&mut self, at: Instant) {
        self.last_flush = at;
    }
}

/// What one tick did. Mostly useful for tests and debug logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The reading taken this tick, if the sensor answered
    pub reading: Option<SensorReading>,
    /// New heater state, if the controller changed it
    pub heater_commanded: Option<bool>,
    /// Samples stored after a successful flush this tick
    pub flushed: Option<usize>,
}

/// The control loop and everything it needs.
pub struct ControlLoop {
    store: Arc<StateStore>,
    bus: Arc<HardwareBus>,
    history: Arc<HistoryStore>,
    deadband: f64,
    period: Duration,
    flush: FlushSchedule,
}

impl ControlLoop {
    pub fn new(
        store: Arc<StateStore>,
        bus: Arc<HardwareBus>,
        history: Arc<HistoryStore>,
        deadband: f64,
        period: Duration,
        flush_interval: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            history,
            deadband,
            period,
            flush: FlushSchedule::new(flush_interval, Instant::now()),
        }
    }

    /// Run until `shutdown` fires or the store stops running.
    ///
    /// A tick in progress is always finished; the loop never starts another
    /// one after shutdown has been observed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = self.period.as_millis() as u64, "control loop running");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() || !self.store.is_running() {
                break;
            }
            self.tick(Instant::now()).await;
        }

        info!("control loop stopped");
    }

    /// One pass of the loop at time `now`.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        let bus = Arc::clone(&self.bus);
        match run_blocking(move || bus.read_sensor()).await {
            Ok(reading) => {
                let at = Utc::now();
                self.store.update(|s| s.record_reading(reading, at));
                debug!(temperature = reading.temperature, humidity = reading.humidity, "sensor read");
                report.reading = Some(reading);
            }
            Err(e) => {
                let failures = self.store.update(|s| {
                    s.record_sensor_failure();
                    s.consecutive_sensor_failures
                });
                warn!(error = %e, failures, "sensor read failed, keeping last reading");
            }
        }

        // Only act on a reading taken this tick
        if report.reading.is_some() {
            report.heater_commanded = self.regulate().await;
        }

        if self.flush.is_due(now) {
            report.flushed = self.flush_sample(now).await;
        }

        report
    }

    async fn regulate(&self) -> Option<bool> {
        let bus = Arc::clone(&self.bus);
        let store = Arc::clone(&self.store);
        let deadband = self.deadband;

        // Decide under the output lock so a manual command that lands between
        // the decision and the write is never overridden.
        let result = run_blocking(move || {
            bus.command_if(&store, Actuator::Heater, |s| {
                if !s.running() || !s.auto_control_enabled {
                    return None;
                }
                let wanted =
                    decide_heater(s.current_temperature, s.setpoint_celsius, deadband, s.heater_on);
                (wanted != s.heater_on).then_some(wanted)
            })
        })
        .await;

        match result {
            Ok(Some(on)) => {
                info!(heater = on, "heater switched by auto-control");
                Some(on)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to drive heater");
                None
            }
        }
    }

    async fn flush_sample(&mut self, now: Instant) -> Option<usize> {
        let state = self.store.get();
        if state.last_reading_at.is_none() {
            debug!("no reading yet, skipping flush");
            return None;
        }

        match self.history.append(SamplePoint::from_state(&state, Utc::now())).await {
            Ok(count) => {
                self.flush.mark_flushed(now);
                debug!(count, "sample persisted");
                Some(count)
            }
            Err(e) => {
                warn!(error = %e, "failed to persist sample, retrying next tick");
                None
            }
        }
    }
}
