mod common;

use common::{test_config, temp_history_path, RecordingHardware};
use std::sync::Arc;
use std::time::Duration;
use thermo_pi::control::{ControlLoop, HardwareBus};
use thermo_pi::{
    Actuator, HardwarePorts, HistoryStore, StateStore, SystemState, ThermoError, Thermostat,
};
use tokio::time::Instant;

fn control_loop(hw: &RecordingHardware, history: Arc<HistoryStore>) -> (ControlLoop, Arc<StateStore>) {
    let store = Arc::new(StateStore::new(SystemState::new(25.0, true)));
    let bus = Arc::new(HardwareBus::new(hw.clone(), hw.clone(), HardwarePorts::default()));
    let control = ControlLoop::new(
        Arc::clone(&store),
        bus,
        history,
        0.5,
        Duration::from_secs(1),
        Duration::from_secs(30),
    );
    (control, store)
}

/// Startup drives every actuator to its initial state in shutdown order
#[tokio::test]
async fn test_start_drives_initial_states() {
    let hw = RecordingHardware::new();
    let ports = HardwarePorts::default();
    let thermostat = Thermostat::start(test_config().with_auto_control(false), hw.clone())
        .await
        .expect("Should start thermostat");

    let expected: Vec<(u8, bool)> = Actuator::ALL
        .iter()
        .map(|a| {
            let pin = ports.pin(*a);
            (pin.port, pin.level_for(a.initial_state()))
        })
        .collect();
    assert_eq!(hw.writes()[..4], expected[..]);

    let state = thermostat.state();
    assert!(state.status_led_on);
    assert!(state.cooler_on);
    assert!(state.cooler_top_on);
    assert!(!state.heater_on);
    assert!(thermostat.is_running());

    assert!(thermostat.shutdown().await.is_clean());
}

/// Hysteresis over a rising temperature: on, on (in band), off, off
#[tokio::test]
async fn test_tick_applies_hysteresis() {
    let hw = RecordingHardware::scripted(&[24.0, 24.6, 25.6, 26.0]);
    let history = Arc::new(HistoryStore::new(temp_history_path()));
    let start = Instant::now();
    let (mut control, store) = control_loop(&hw, history);

    let mut heater = Vec::new();
    let mut commanded = Vec::new();
    for _ in 0..4 {
        let report = control.tick(start).await;
        assert!(report.reading.is_some());
        assert_eq!(report.flushed, None);
        commanded.push(report.heater_commanded);
        heater.push(store.get().heater_on);
    }

    assert_eq!(heater, vec![true, true, false, false]);
    assert_eq!(commanded, vec![Some(true), None, Some(false), None]);
    assert_eq!(store.get().current_temperature, 26.0);
}

/// With auto-control off the loop records readings but never touches the heater
#[tokio::test]
async fn test_tick_respects_auto_control_off() {
    let hw = RecordingHardware::scripted(&[10.0]);
    let history = Arc::new(HistoryStore::new(temp_history_path()));
    let (mut control, store) = control_loop(&hw, history);
    store.update(|s| s.auto_control_enabled = false);

    let report = control.tick(Instant::now()).await;

    assert_eq!(report.heater_commanded, None);
    assert!(hw.writes().is_empty());
    assert_eq!(store.get().current_temperature, 10.0);
}

/// A failed read keeps the previous values and takes no action
#[tokio::test]
async fn test_failed_read_keeps_stale_values() {
    let hw = RecordingHardware::scripted(&[23.5]);
    hw.board().script.push_back(None);
    let history = Arc::new(HistoryStore::new(temp_history_path()));
    let (mut control, store) = control_loop(&hw, history);
    let now = Instant::now();

    control.tick(now).await;
    let writes_after_first = hw.writes().len();
    let first = store.get();

    let report = control.tick(now).await;
    assert_eq!(report.reading, None);
    assert_eq!(report.heater_commanded, None);
    assert_eq!(hw.writes().len(), writes_after_first);

    let state = store.get();
    assert_eq!(state.current_temperature, 23.5);
    assert_eq!(state.current_humidity, 50.0);
    assert_eq!(state.last_reading_at, first.last_reading_at);
    assert_eq!(state.consecutive_sensor_failures, 1);
}

/// One sample per elapsed flush interval, in order
#[tokio::test]
async fn test_flush_appends_samples_on_schedule() {
    let hw = RecordingHardware::new();
    let path = temp_history_path();
    let history = Arc::new(HistoryStore::new(&path));
    let (mut control, _store) = control_loop(&hw, Arc::clone(&history));
    let start = Instant::now();

    assert_eq!(control.tick(start).await.flushed, None);
    assert_eq!(control.tick(start + Duration::from_secs(10)).await.flushed, None);
    for (i, secs) in [30, 60, 90].into_iter().enumerate() {
        let report = control.tick(start + Duration::from_secs(secs)).await;
        assert_eq!(report.flushed, Some(i + 1));
    }

    let samples = history.load().await;
    assert_eq!(samples.len(), 3);
    assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(samples.iter().all(|s| s.temperature == 22.0));

    let _ = std::fs::remove_file(&path);
}

/// Nothing is persisted before the first good reading
#[tokio::test]
async fn test_flush_waits_for_first_reading() {
    let hw = RecordingHardware::new();
    hw.board().fallback = None;
    let history = Arc::new(HistoryStore::new(temp_history_path()));
    let (mut control, _store) = control_loop(&hw, Arc::clone(&history));
    let start = Instant::now();

    let report = control.tick(start + Duration::from_secs(30)).await;
    assert_eq!(report.flushed, None);
    assert!(history.load().await.is_empty());

    // Still due on the next tick once the sensor answers
    hw.board().fallback = Some(thermo_pi::SensorReading::new(21.0, 45.0));
    let report = control.tick(start + Duration::from_secs(31)).await;
    assert_eq!(report.flushed, Some(1));
}

/// A manual heater command wins over auto-control and switches it off
#[tokio::test]
async fn test_manual_heater_disables_auto_control() {
    let hw = RecordingHardware::new();
    let thermostat = Thermostat::start(test_config(), hw.clone())
        .await
        .expect("Should start thermostat");

    // 22 °C is well below the band, so auto-control would want the heater on
    thermostat
        .command(Actuator::Heater, false)
        .await
        .expect("Should command heater");

    let state = thermostat.state();
    assert!(!state.auto_control_enabled);
    assert!(!state.heater_on);

    // Give the loop a few ticks; it must leave the heater alone
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!thermostat.state().heater_on);

    thermostat.shutdown().await;
}

/// Shutdown sends exactly one OFF per actuator and the hardware goes quiet
#[tokio::test]
async fn test_shutdown_de_energizes_once() {
    let hw = RecordingHardware::new();
    let ports = HardwarePorts::default();
    let thermostat = Thermostat::start(test_config().with_auto_control(false), hw.clone())
        .await
        .expect("Should start thermostat");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let before = hw.writes().len();
    let report = thermostat.shutdown().await;
    assert!(report.is_clean());

    let off: Vec<(u8, bool)> = Actuator::ALL
        .iter()
        .map(|a| {
            let pin = ports.pin(*a);
            (pin.port, pin.level_for(false))
        })
        .collect();
    assert_eq!(hw.writes()[before..], off[..]);

    let state = thermostat.state();
    for actuator in Actuator::ALL {
        assert!(!state.actuator(actuator));
    }
    assert!(!thermostat.is_running());

    // A second request is a no-op and the loop stays stopped
    let calls = hw.calls();
    assert_eq!(thermostat.shutdown().await, report);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hw.calls(), calls);
}

/// Concurrent shutdown requests run the sequence once and share the report
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_shutdown_runs_once() {
    let hw = RecordingHardware::new();
    let thermostat = Thermostat::start(test_config().with_auto_control(false), hw.clone())
        .await
        .expect("Should start thermostat");
    let before = hw.writes().len();

    let a = tokio::spawn({
        let t = Arc::clone(&thermostat);
        async move { t.shutdown().await }
    });
    let b = tokio::spawn({
        let t = Arc::clone(&thermostat);
        async move { t.shutdown().await }
    });
    let (a, b) = (a.await.expect("task a"), b.await.expect("task b"));

    assert_eq!(a, b);
    assert_eq!(hw.writes().len() - before, Actuator::ALL.len());
}

/// After shutdown manual commands are refused and nothing is written
#[tokio::test]
async fn test_command_after_shutdown_is_refused() {
    let hw = RecordingHardware::new();
    let thermostat = Thermostat::start(test_config(), hw.clone())
        .await
        .expect("Should start thermostat");
    thermostat.shutdown().await;
    let writes = hw.writes().len();

    let err = thermostat
        .command(Actuator::Cooler, true)
        .await
        .expect_err("Should refuse command");
    assert!(matches!(err, ThermoError::Lifecycle(_)));
    assert_eq!(hw.writes().len(), writes);
}

/// Shutdown reports OFF failures but still stops the loop
#[tokio::test]
async fn test_shutdown_reports_failed_outputs() {
    let hw = RecordingHardware::new();
    let thermostat = Thermostat::start(test_config().with_auto_control(false), hw.clone())
        .await
        .expect("Should start thermostat");
    hw.board().fail_writes = true;

    let report = thermostat.shutdown().await;
    assert_eq!(report.actuator_failures, Actuator::ALL.to_vec());
    assert!(report.loop_stopped);
    assert!(!report.is_clean());
}

/// A hardware initialization failure aborts startup before any pin is touched
#[tokio::test]
async fn test_init_failure_aborts_start() {
    let hw = RecordingHardware::new();
    hw.board().fail_init = true;

    let result = Thermostat::start(test_config(), hw.clone()).await;
    assert!(matches!(result, Err(ThermoError::Lifecycle(_))));

    // Only the failed initialize call, no writes and no sensor reads
    assert!(hw.writes().is_empty());
    assert_eq!(hw.calls(), 1);
}

/// A failed initial write aborts startup after a best-effort OFF for everything
#[tokio::test]
async fn test_initial_write_failure_aborts_start() {
    let hw = RecordingHardware::new();
    hw.board().fail_writes = true;

    let result = Thermostat::start(test_config(), hw.clone()).await;
    assert!(matches!(result, Err(ThermoError::Lifecycle(_))));

    // initialize, the first failed command, then one OFF attempt per actuator
    assert_eq!(hw.calls(), 2 + Actuator::ALL.len());
}

/// A sensor read stuck past the timeout cannot hold back the OFF commands
#[tokio::test]
async fn test_shutdown_during_slow_read_still_de_energizes() {
    let hw = RecordingHardware::new();
    hw.board().read_delay = Duration::from_millis(1500);
    let ports = HardwarePorts::default();
    let config = test_config()
        .with_auto_control(false)
        .with_shutdown_timeout(Duration::from_millis(300));
    let thermostat = Thermostat::start(config, hw.clone())
        .await
        .expect("Should start thermostat");

    // The first tick fires immediately and is now blocked in the read
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = hw.writes().len();

    let started = Instant::now();
    let report = thermostat.shutdown().await;
    assert!(started.elapsed() < Duration::from_millis(1200));

    assert!(!report.loop_stopped);
    assert!(report.actuator_failures.is_empty());

    let off: Vec<(u8, bool)> = Actuator::ALL
        .iter()
        .map(|a| {
            let pin = ports.pin(*a);
            (pin.port, pin.level_for(false))
        })
        .collect();
    assert_eq!(hw.writes()[before..], off[..]);

    let state = thermostat.state();
    for actuator in Actuator::ALL {
        assert!(!state.actuator(actuator));
    }
}

/// An invalid configuration never reaches the hardware
#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let hw = RecordingHardware::new();
    let config = test_config().with_deadband(-1.0);

    let result = Thermostat::start(config, hw.clone()).await;
    assert!(matches!(result, Err(ThermoError::Config(_))));
    assert_eq!(hw.calls(), 0);
}

/// Shutdown wakes anyone waiting on the request
#[tokio::test]
async fn test_shutdown_requested_resolves() {
    let hw = RecordingHardware::new();
    let thermostat = Thermostat::start(test_config(), hw)
        .await
        .expect("Should start thermostat");

    let waiter = tokio::spawn({
        let t = Arc::clone(&thermostat);
        async move { t.shutdown_requested().await }
    });
    thermostat.shutdown().await;

    tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(1), waiter).await);
}

/// Startup truncates whatever history a previous run left behind
#[tokio::test]
async fn test_start_resets_history() {
    let path = temp_history_path();
    std::fs::write(
        &path,
        r#"[{"TimeStamp":"2024-01-01T00:00:00Z","Temperature":20.0,"Humidity":40.0}]"#,
    )
    .expect("Should seed history");

    let thermostat = Thermostat::start(
        test_config().with_history_path(&path).with_auto_control(false),
        RecordingHardware::new(),
    )
    .await
    .expect("Should start thermostat");

    assert!(thermostat.history().load().await.is_empty());
    thermostat.shutdown().await;
    let _ = std::fs::remove_file(&path);
}
