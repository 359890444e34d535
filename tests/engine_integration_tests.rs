use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use huebert::config::ScheduleConfig;
use huebert::constants::COMMAND_TRANSITION;
use huebert::core::{
    DaySchedule, Engine, EngineParams, Intervals, ReconcileOutcome, Trigger, Work,
};
use huebert::device::fake::FakeBridge;
use huebert::device::{DeviceError, kelvin_to_mired};
use huebert::geo::GeoLocation;
use huebert::logger::Log;
use huebert::time_source::ManualClock;

const DAY_TEMP: u16 = 5000;
const SUNSET_TEMP: u16 = 2700;

fn location() -> GeoLocation {
    GeoLocation::new(45.0, 0.0).unwrap()
}

fn utc(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 6, day, hour, minute, 0)
        .unwrap()
}

fn setup(now: DateTime<FixedOffset>) -> (Engine, FakeBridge, ManualClock) {
    Log::set_enabled(false);

    let bridge = FakeBridge::new();
    bridge.insert("1", true, kelvin_to_mired(SUNSET_TEMP));
    bridge.insert("2", false, kelvin_to_mired(SUNSET_TEMP));
    bridge.insert("9", true, 153);

    let clock = ManualClock::new(now);
    let engine = Engine::new(EngineParams {
        client: Box::new(bridge.clone()),
        clock: Arc::new(clock.clone()),
        location: location(),
        schedule: ScheduleConfig {
            device_ids: BTreeSet::from(["1".to_string(), "2".to_string()]),
            day_temp: DAY_TEMP,
            sunset_temp: SUNSET_TEMP,
            brightness: 254,
            run_when_lights_appear: true,
        },
    })
    .unwrap();

    (engine, bridge, clock)
}

#[test]
fn test_reconcile_is_idempotent() {
    let (mut engine, bridge, _clock) = setup(utc(21, 12, 0));

    let first = engine.reconcile().unwrap();
    assert_eq!(
        first,
        ReconcileOutcome::Commanded {
            target: DAY_TEMP,
            mired: 200,
            devices: vec!["1".to_string(), "2".to_string()],
        }
    );

    // Same instant, nothing changed on the bridge side
    let second = engine.reconcile().unwrap();
    assert_eq!(second, ReconcileOutcome::InSync { target: DAY_TEMP });

    let batches = bridge.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].transition, COMMAND_TRANSITION);

    // The unconfigured light is never touched
    assert_eq!(bridge.snapshot("9").unwrap().color_temperature_mired, 153);
}

#[test]
fn test_sunrise_midpoint_targets_3850() {
    let day = utc(21, 12, 0);
    let schedule = DaySchedule::compute(&day, location()).unwrap();
    let midpoint =
        schedule.sunrise() + (schedule.golden_rise() - schedule.sunrise()) / 2;

    let (mut engine, bridge, _clock) = setup(midpoint);
    let outcome = engine.reconcile().unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Commanded {
            target: 3850,
            mired: 259,
            devices: vec!["1".to_string(), "2".to_string()],
        }
    );
    assert_eq!(bridge.snapshot("1").unwrap().color_temperature_mired, 259);
}

#[test]
fn test_power_on_forces_single_reconcile() {
    let (mut engine, bridge, _clock) = setup(utc(21, 12, 0));
    let poll = Work::from_triggers([Trigger::PollState]);

    // Bring light 1 in sync first
    engine.reconcile().unwrap();
    assert_eq!(engine.handle(poll), None);

    // Light 2 comes on with yesterday's warm setting
    bridge.set_power("2", true);
    let outcome = engine.handle(poll);
    assert!(matches!(outcome, Some(ReconcileOutcome::Commanded { .. })));
    assert_eq!(bridge.batches().len(), 2);
    assert_eq!(bridge.snapshot("2").unwrap().color_temperature_mired, 200);

    // Staying on does not trigger again
    assert_eq!(engine.handle(poll), None);
    assert_eq!(bridge.batches().len(), 2);
}

#[test]
fn test_power_on_while_in_sync_reconciles_without_commanding() {
    let (mut engine, bridge, _clock) = setup(utc(21, 23, 0));
    let poll = Work::from_triggers([Trigger::PollState]);

    engine.handle(poll);
    bridge.set_power("1", false);
    engine.handle(poll);
    bridge.set_power("1", true);

    // Light 1 is already at the night value, so the forced pass finds nothing to do
    assert_eq!(
        engine.handle(poll),
        Some(ReconcileOutcome::InSync {
            target: SUNSET_TEMP
        })
    );
    assert!(bridge.batches().is_empty());
}

#[test]
fn test_evening_ramp_falls() {
    let day = utc(21, 12, 0);
    let schedule = DaySchedule::compute(&day, location()).unwrap();
    let (mut engine, bridge, clock) = setup(schedule.golden_set());

    let mut last = u16::MAX;
    let step = (schedule.sunset() - schedule.golden_set()) / 8;
    for _ in 0..8 {
        let target = match engine.reconcile().unwrap() {
            ReconcileOutcome::Commanded { target, .. } | ReconcileOutcome::InSync { target } => {
                target
            }
            ReconcileOutcome::NoSchedule => panic!("schedule expected"),
        };
        assert!(target <= last);
        last = target;
        clock.advance(step);
    }

    clock.set(schedule.sunset());
    engine.reconcile().unwrap();
    assert_eq!(
        bridge.snapshot("1").unwrap().color_temperature_mired,
        kelvin_to_mired(SUNSET_TEMP)
    );
}

#[test]
fn test_transient_failures_skip_the_tick_only() {
    let (mut engine, bridge, _clock) = setup(utc(21, 12, 0));
    let reconcile = Work::from_triggers([Trigger::Reconcile]);

    bridge.fail_next_list(DeviceError::Transport("timed out".into()));
    assert_eq!(engine.handle(reconcile), None);
    assert!(bridge.batches().is_empty());

    bridge.fail_next_command(DeviceError::Rejected("internal error".into()));
    assert_eq!(engine.handle(reconcile), None);
    assert!(bridge.batches().is_empty());

    assert!(matches!(
        engine.handle(reconcile),
        Some(ReconcileOutcome::Commanded { .. })
    ));
    assert_eq!(bridge.batches().len(), 1);
}

#[test]
fn test_schedule_rolls_over_at_midnight() {
    let (mut engine, _bridge, clock) = setup(utc(21, 23, 59));

    let today = engine.refresh_schedule().unwrap();
    let again = engine.refresh_schedule().unwrap();
    assert!(Arc::ptr_eq(&today, &again));

    clock.advance(ChronoDuration::minutes(2));
    let tomorrow = engine.refresh_schedule().unwrap();
    assert!(!Arc::ptr_eq(&today, &tomorrow));
    assert_eq!(
        tomorrow.calendar_day(),
        today.calendar_day().succ_opt().unwrap()
    );
}

#[test]
fn test_spawned_engine_reconciles_and_stops() {
    let (engine, bridge, _clock) = setup(utc(21, 12, 0));
    let handle = engine.spawn(Intervals {
        schedule_refresh: Duration::from_secs(3600),
        reconcile: Duration::from_millis(20),
        state_poll: Duration::from_millis(10),
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.batches().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(bridge.batches().len(), 1);

    // Power-on edge picked up by the poll ticker
    bridge.set_power("2", true);
    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.snapshot("2").unwrap().color_temperature_mired != 200
        && Instant::now() < deadline
    {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(bridge.snapshot("2").unwrap().color_temperature_mired, 200);

    assert!(handle.trigger(Trigger::Reconcile));
    handle.shutdown();

    // Nothing runs after shutdown
    let calls = bridge.list_calls();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(bridge.list_calls(), calls);
}
