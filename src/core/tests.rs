use super::*;
use crate::constants::test_constants::*;
use crate::device::{DeviceSnapshot, MockDeviceClient};
use crate::time_source::ManualClock;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone};
use mockall::predicate::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Instant;

fn utc(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 6, day, hour, minute, second)
        .unwrap()
}

fn schedule_config() -> ScheduleConfig {
    ScheduleConfig {
        device_ids: BTreeSet::from(["1".to_string(), "2".to_string()]),
        day_temp: TEST_DAY_TEMP,
        sunset_temp: TEST_SUNSET_TEMP,
        brightness: TEST_BRIGHTNESS,
        run_when_lights_appear: true,
    }
}

fn engine(client: MockDeviceClient, now: DateTime<FixedOffset>) -> Engine {
    crate::logger::Log::set_enabled(false);
    Engine::new(EngineParams {
        client: Box::new(client),
        clock: Arc::new(ManualClock::new(now)),
        location: GeoLocation::new(TEST_LATITUDE, TEST_LONGITUDE).unwrap(),
        schedule: schedule_config(),
    })
    .unwrap()
}

#[test]
fn test_new_rejects_invalid_schedule() {
    let mut config = schedule_config();
    config.device_ids.clear();

    let result = Engine::new(EngineParams {
        client: Box::new(MockDeviceClient::new()),
        clock: Arc::new(ManualClock::new(utc(21, 12, 0, 0))),
        location: GeoLocation::new(TEST_LATITUDE, TEST_LONGITUDE).unwrap(),
        schedule: config,
    });
    assert_eq!(result.err(), Some(ConfigError::NoDevices));
}

#[test]
fn test_reconcile_commands_all_configured_devices_when_one_drifted() {
    let mut client = MockDeviceClient::new();
    client.expect_list_devices().times(1).returning(|| {
        Ok(vec![
            DeviceSnapshot::new("1", true, 370),
            DeviceSnapshot::new("2", false, 370),
            DeviceSnapshot::new("7", true, 153),
        ])
    });
    client
        .expect_set_color_temperature()
        .with(
            eq(200),
            eq(vec!["1".to_string(), "2".to_string()]),
            eq(COMMAND_TRANSITION),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));

    let mut engine = engine(client, utc(21, 12, 0, 0));
    assert_eq!(
        engine.reconcile().unwrap(),
        ReconcileOutcome::Commanded {
            target: TEST_DAY_TEMP,
            mired: 200,
            devices: vec!["1".to_string(), "2".to_string()],
        }
    );
}

#[test]
fn test_reconcile_ignores_lights_that_are_off_or_unconfigured() {
    let mut client = MockDeviceClient::new();
    client.expect_list_devices().returning(|| {
        Ok(vec![
            DeviceSnapshot::new("1", true, 200),
            DeviceSnapshot::new("2", false, 370),
            DeviceSnapshot::new("7", true, 153),
        ])
    });
    client.expect_set_color_temperature().never();

    let mut engine = engine(client, utc(21, 12, 0, 0));
    assert_eq!(
        engine.reconcile().unwrap(),
        ReconcileOutcome::InSync {
            target: TEST_DAY_TEMP
        }
    );
}

#[test]
fn test_reconcile_ignores_lights_without_color_temperature() {
    let mut client = MockDeviceClient::new();
    client.expect_list_devices().times(1).returning(|| {
        Ok(vec![
            DeviceSnapshot::new("1", true, 0),
            DeviceSnapshot::new("2", true, 200),
        ])
    });
    client.expect_set_color_temperature().never();

    let mut engine = engine(client, utc(21, 12, 0, 0));
    assert_eq!(
        engine.reconcile().unwrap(),
        ReconcileOutcome::InSync {
            target: TEST_DAY_TEMP
        }
    );
}

#[test]
fn test_reconcile_at_night_targets_sunset_temperature() {
    let mut client = MockDeviceClient::new();
    client
        .expect_list_devices()
        .returning(|| Ok(vec![DeviceSnapshot::new("1", true, 200)]));
    client
        .expect_set_color_temperature()
        .with(eq(370), always(), always())
        .times(1)
        .returning(|_, _, _| Ok(()));

    let mut engine = engine(client, utc(21, 23, 0, 0));
    assert!(matches!(
        engine.reconcile().unwrap(),
        ReconcileOutcome::Commanded { target: 2700, .. }
    ));
}

#[test]
fn test_list_failure_is_reported_without_commanding() {
    let mut client = MockDeviceClient::new();
    client
        .expect_list_devices()
        .times(1)
        .returning(|| Err(DeviceError::Transport("timed out".into())));
    client.expect_set_color_temperature().never();

    let mut engine = engine(client, utc(21, 12, 0, 0));
    assert_eq!(
        engine.reconcile(),
        Err(DeviceError::Transport("timed out".into()))
    );
}

#[test]
fn test_command_failure_is_not_fatal() {
    let mut client = MockDeviceClient::new();
    client
        .expect_list_devices()
        .returning(|| Ok(vec![DeviceSnapshot::new("1", true, 370)]));
    let mut calls = 0;
    client
        .expect_set_color_temperature()
        .times(2)
        .returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(DeviceError::Rejected("link button not pressed".into()))
            } else {
                Ok(())
            }
        });

    let mut engine = engine(client, utc(21, 12, 0, 0));
    let reconcile = Work::from_triggers([Trigger::Reconcile]);

    // The failing tick is skipped, the next one retries
    assert_eq!(engine.handle(reconcile), None);
    assert!(matches!(
        engine.handle(reconcile),
        Some(ReconcileOutcome::Commanded { .. })
    ));
}

#[test]
fn test_no_schedule_skips_device_io() {
    let mut client = MockDeviceClient::new();
    client.expect_list_devices().never();
    client.expect_set_color_temperature().never();

    crate::logger::Log::set_enabled(false);
    let winter = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 12, 21, 12, 0, 0)
        .unwrap();
    let mut engine = Engine::new(EngineParams {
        client: Box::new(client),
        clock: Arc::new(ManualClock::new(winter)),
        location: GeoLocation::new(80.0, 0.0).unwrap(),
        schedule: schedule_config(),
    })
    .unwrap();

    assert_eq!(engine.reconcile().unwrap(), ReconcileOutcome::NoSchedule);
    assert!(engine.refresh_schedule().is_err());
}

#[test]
fn test_power_on_forces_exactly_one_reconcile() {
    let mut client = MockDeviceClient::new();
    let mut polls = 0;
    // Poll 1: off. Poll 2: on (forces). Reconcile list. Poll 3: still on.
    client.expect_list_devices().times(4).returning(move || {
        polls += 1;
        let on = polls >= 2;
        Ok(vec![DeviceSnapshot::new("1", on, 370)])
    });
    client
        .expect_set_color_temperature()
        .times(1)
        .returning(|_, _, _| Ok(()));

    let mut engine = engine(client, utc(21, 12, 0, 0));
    let poll = Work::from_triggers([Trigger::PollState]);

    assert_eq!(engine.handle(poll), None);
    assert!(matches!(
        engine.handle(poll),
        Some(ReconcileOutcome::Commanded { .. })
    ));
    assert_eq!(engine.handle(poll), None);
}

#[test]
fn test_power_on_waits_for_tick_when_disabled() {
    let mut client = MockDeviceClient::new();
    let mut polls = 0;
    client.expect_list_devices().times(2).returning(move || {
        polls += 1;
        Ok(vec![DeviceSnapshot::new("1", polls >= 2, 370)])
    });
    client.expect_set_color_temperature().never();

    crate::logger::Log::set_enabled(false);
    let mut engine = Engine::new(EngineParams {
        client: Box::new(client),
        clock: Arc::new(ManualClock::new(utc(21, 12, 0, 0))),
        location: GeoLocation::new(TEST_LATITUDE, TEST_LONGITUDE).unwrap(),
        schedule: ScheduleConfig {
            run_when_lights_appear: false,
            ..schedule_config()
        },
    })
    .unwrap();
    let poll = Work::from_triggers([Trigger::PollState]);

    assert_eq!(engine.handle(poll), None);
    assert_eq!(engine.handle(poll), None);
}

#[test]
fn test_coalesced_work_reconciles_once() {
    let mut client = MockDeviceClient::new();
    let mut polls = 0;
    client.expect_list_devices().times(3).returning(move || {
        polls += 1;
        Ok(vec![DeviceSnapshot::new("1", polls >= 2, 370)])
    });
    client
        .expect_set_color_temperature()
        .times(1)
        .returning(|_, _, _| Ok(()));

    let mut engine = engine(client, utc(21, 12, 0, 0));
    engine.handle(Work::from_triggers([Trigger::PollState]));

    // A forced reconcile and a tick reconcile arriving together run once
    let work = Work::from_triggers([
        Trigger::Reconcile,
        Trigger::PollState,
        Trigger::Reconcile,
        Trigger::RefreshSchedule,
    ]);
    assert!(work.refresh && work.poll && work.reconcile && !work.shutdown);
    assert!(engine.handle(work).is_some());
}

#[test]
fn test_poll_failure_does_not_reconcile() {
    let mut client = MockDeviceClient::new();
    client
        .expect_list_devices()
        .times(1)
        .returning(|| Err(DeviceError::Transport("connection refused".into())));
    client.expect_set_color_temperature().never();

    let mut engine = engine(client, utc(21, 12, 0, 0));
    assert_eq!(engine.handle(Work::from_triggers([Trigger::PollState])), None);
    assert!(engine.tracker().is_empty());
}

#[test]
fn test_refresh_is_noop_within_day() {
    let client = MockDeviceClient::new();
    let clock = ManualClock::new(utc(21, 0, 0, 1));
    crate::logger::Log::set_enabled(false);
    let mut engine = Engine::new(EngineParams {
        client: Box::new(client),
        clock: Arc::new(clock.clone()),
        location: GeoLocation::new(TEST_LATITUDE, TEST_LONGITUDE).unwrap(),
        schedule: schedule_config(),
    })
    .unwrap();

    let first = engine.refresh_schedule().unwrap();
    clock.advance(ChronoDuration::hours(23));
    let second = engine.refresh_schedule().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    clock.advance(ChronoDuration::hours(1));
    let third = engine.refresh_schedule().unwrap();
    assert!(!Arc::ptr_eq(&second, &third));
    assert!(third.calendar_day() > second.calendar_day());
}

#[test]
fn test_spawned_engine_shuts_down_cleanly() {
    let mut client = MockDeviceClient::new();
    client
        .expect_list_devices()
        .returning(|| Ok(vec![DeviceSnapshot::new("1", true, 200)]));
    client
        .expect_set_color_temperature()
        .returning(|_, _, _| Ok(()));

    let engine = engine(client, utc(21, 12, 0, 0));
    let handle = engine.spawn(Intervals {
        schedule_refresh: Duration::from_secs(3600),
        reconcile: Duration::from_secs(3600),
        state_poll: Duration::from_secs(3600),
    });

    assert!(handle.trigger(Trigger::Reconcile));
    let started = std::time::Instant::now();
    handle.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// Client whose `list_devices` blocks while the gate is closed.
struct GatedClient {
    calls: Arc<AtomicUsize>,
    gate: Arc<(Mutex<bool>, Condvar)>,
    entered: mpsc::Sender<()>,
}

impl DeviceClient for GatedClient {
    fn list_devices(&self) -> Result<Vec<DeviceSnapshot>, DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered.send(());

        let (open, changed) = &*self.gate;
        let mut open = open.lock().unwrap();
        while !*open {
            open = changed.wait(open).unwrap();
        }
        Ok(vec![DeviceSnapshot::new("1", true, 200)])
    }

    fn set_color_temperature(
        &self,
        _mired: u32,
        _ids: &[DeviceId],
        _transition: Duration,
    ) -> Result<(), DeviceError> {
        Ok(())
    }
}

fn wait_for_calls(calls: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while calls.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    // Give any unexpected extra pass time to show up
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), expected);
}

#[test]
fn test_triggers_during_slow_reconcile_run_once_afterwards() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new((Mutex::new(true), Condvar::new()));
    let (entered, entered_rx) = mpsc::channel();

    crate::logger::Log::set_enabled(false);
    let engine = Engine::new(EngineParams {
        client: Box::new(GatedClient {
            calls: calls.clone(),
            gate: gate.clone(),
            entered,
        }),
        clock: Arc::new(ManualClock::new(utc(21, 12, 0, 0))),
        location: GeoLocation::new(TEST_LATITUDE, TEST_LONGITUDE).unwrap(),
        schedule: schedule_config(),
    })
    .unwrap();
    let handle = engine.spawn(Intervals {
        schedule_refresh: Duration::from_secs(3600),
        reconcile: Duration::from_secs(3600),
        state_poll: Duration::from_secs(3600),
    });

    // Start-up: one poll and one reconcile, coalesced or not
    wait_for_calls(&calls, 2);
    while entered_rx.try_recv().is_ok() {}

    *gate.0.lock().unwrap() = false;
    assert!(handle.trigger(Trigger::Reconcile));
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Queued while the bridge call is stuck
    for trigger in [
        Trigger::Reconcile,
        Trigger::PollState,
        Trigger::Reconcile,
        Trigger::PollState,
    ] {
        assert!(handle.trigger(trigger));
    }

    *gate.0.lock().unwrap() = true;
    gate.1.notify_all();

    // The stuck reconcile, then one poll and one reconcile for everything queued
    wait_for_calls(&calls, 5);
    handle.shutdown();
}
