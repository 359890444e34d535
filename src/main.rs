//! Main application entry point and high-level flow coordination.
//!
//! The binary is a thin shell over the library:
//!
//! 1. Argument parsing and early exit for help/version
//! 2. Configuration loading and validation
//! 3. Location resolution (configured coordinates, then IP geolocation)
//! 4. Either printing the day's schedule (`--times`) or starting the engine
//! 5. Waiting for SIGINT/SIGTERM/SIGHUP and shutting down cooperatively

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use std::path::Path;
use std::sync::Arc;

use huebert::args::{CliAction, ParsedArgs, display_help, display_version_info};
use huebert::config::{self, Settings};
use huebert::constants::EXIT_FAILURE;
use huebert::core::{DaySchedule, Engine, EngineParams, TargetCurve};
use huebert::device::hue::HueBridge;
use huebert::geo::location::{IP_LOOKUP_ENDPOINT, resolve_location};
use huebert::geo::{ConfiguredLocation, GeoLocation, IpGeolocation, LocationProvider};
use huebert::logger::Log;
use huebert::signals::{setup_signal_handler, signal_name};
use huebert::time_source::{Clock, SystemClock};
use huebert::{
    log_block_start, log_decorated, log_end, log_error_exit, log_indented, log_version,
};

fn main() {
    let result = match ParsedArgs::from_env().action {
        CliAction::ShowHelp => {
            display_help();
            Ok(())
        }
        CliAction::ShowVersion => {
            display_version_info();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            config_path,
        } => run_daemon(debug_enabled, config_path.as_deref()),
        CliAction::ShowTimes {
            debug_enabled,
            config_path,
            date,
        } => show_times(debug_enabled, config_path.as_deref(), date),
    };

    if let Err(e) = result {
        log_error_exit!("{e:#}");
        std::process::exit(EXIT_FAILURE);
    }
}

/// Load settings and resolve the location both modes need.
fn prepare(config_path: Option<&str>) -> Result<(Settings, GeoLocation)> {
    let settings = config::load(config_path.map(Path::new))?;
    settings.log_summary();

    let mut providers: Vec<Box<dyn LocationProvider>> = Vec::new();
    if let Some(configured) = &settings.location {
        providers.push(Box::new(ConfiguredLocation::new(
            configured.location,
            configured.name.clone(),
        )));
    }
    providers.push(Box::new(IpGeolocation::new(
        IP_LOOKUP_ENDPOINT,
        settings.bridge.timeout,
    )));

    let location = resolve_location(&providers).context("Could not determine location")?;
    Ok((settings, location))
}

fn run_daemon(debug_enabled: bool, config_path: Option<&str>) -> Result<()> {
    Log::set_debug(debug_enabled);
    Log::set_timestamps(true);
    log_version!();

    let (settings, location) = prepare(config_path)?;

    // Handlers go in before any thread starts so no signal is lost
    let signal_state = setup_signal_handler()?;

    let bridge = HueBridge::new(
        &settings.bridge.address,
        &settings.bridge.username,
        settings.bridge.timeout,
    );
    let engine = Engine::new(EngineParams {
        client: Box::new(bridge),
        clock: Arc::new(SystemClock),
        location,
        schedule: settings.schedule.clone(),
    })?;

    let handle = engine.spawn(settings.intervals);

    if let Some(signal) = signal_state.wait_for_shutdown() {
        log_block_start!("Received {}, shutting down...", signal_name(signal));
    }
    handle.shutdown();
    log_end!();
    Ok(())
}

fn show_times(debug_enabled: bool, config_path: Option<&str>, date: Option<NaiveDate>) -> Result<()> {
    Log::set_debug(debug_enabled);
    log_version!();

    let (settings, location) = prepare(config_path)?;
    let reference = match date {
        Some(date) => local_noon(date)?,
        None => SystemClock.now(),
    };

    let schedule = DaySchedule::compute(&reference, location)?;
    schedule.log();

    let curve = TargetCurve::new(settings.schedule.day_temp, settings.schedule.sunset_temp);
    log_block_start!("Targets");
    for instant in [
        schedule.sunrise(),
        schedule.sunrise() + (schedule.golden_rise() - schedule.sunrise()) / 2,
        schedule.golden_rise(),
        schedule.golden_set(),
        schedule.golden_set() + (schedule.sunset() - schedule.golden_set()) / 2,
        schedule.sunset(),
    ] {
        let (target, region) = curve.evaluate(&instant, &schedule);
        log_indented!("{}  {target}K  ({region})", instant.format("%H:%M:%S"));
    }

    if date.is_none() {
        let now = SystemClock.now();
        let (target, region) = curve.evaluate(&now, &schedule);
        log_decorated!("Now: {target}K ({region})");
    }

    log_end!();
    Ok(())
}

fn local_noon(date: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let noon = date
        .and_hms_opt(12, 0, 0)
        .context("Invalid time of day")?;
    let local = Local
        .from_local_datetime(&noon)
        .earliest()
        .with_context(|| format!("{date} 12:00 does not exist in the local time zone"))?;
    Ok(local.fixed_offset())
}
