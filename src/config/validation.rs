//! Configuration validation.
//!
//! Turns the raw, all-optional [`Config`] into validated runtime settings. Any
//! problem is a [`ConfigError`], reported before a single timer starts.

use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use super::{Config, RawDeviceId};
use crate::constants::*;
use crate::core::Intervals;
use crate::device::DeviceId;
use crate::geo::GeoLocation;

/// Configuration that prevents the engine from starting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    MissingField(&'static str),

    #[error("`schedule.device_ids` must list at least one device")]
    NoDevices,

    #[error("`{field}` ({value}K) must be between {}K and {}K", MINIMUM_TEMP, MAXIMUM_TEMP)]
    TemperatureOutOfRange { field: &'static str, value: u32 },

    #[error("`schedule.brightness` ({0}) must be between 1 and {}", DEFAULT_BRIGHTNESS)]
    BrightnessOutOfRange(u32),

    #[error("`{field}` ({value}) must be between {min} and {max}")]
    IntervalOutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("invalid location: {0}")]
    InvalidLocation(String),
}

/// What the engine drives and how.
///
/// Immutable for the lifetime of one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub device_ids: BTreeSet<DeviceId>,
    /// Kelvin during the day.
    pub day_temp: u16,
    /// Kelvin at and after sunset.
    pub sunset_temp: u16,
    /// Stored and reported; commands only carry color temperature.
    pub brightness: u8,
    /// Reconcile as soon as a configured light is switched on.
    pub run_when_lights_appear: bool,
}

impl ScheduleConfig {
    /// Check ranges on an already-typed schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_ids.is_empty() || self.device_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::NoDevices);
        }
        check_temp("schedule.day_temp", u32::from(self.day_temp))?;
        check_temp("schedule.sunset_temp", u32::from(self.sunset_temp))?;
        check_brightness(u32::from(self.brightness))?;
        Ok(())
    }
}

/// Bridge connection details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub address: String,
    pub username: String,
    pub timeout: Duration,
}

/// Location from the config file, when one is given.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSettings {
    pub location: GeoLocation,
    pub name: Option<String>,
}

/// Fully validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bridge: BridgeSettings,
    /// `None` falls back to IP geolocation.
    pub location: Option<LocationSettings>,
    pub schedule: ScheduleConfig,
    pub intervals: Intervals,
}

/// Validate every section and build [`Settings`].
pub fn validate_config(config: &Config) -> Result<Settings, ConfigError> {
    Ok(Settings {
        bridge: validate_bridge(config)?,
        location: validate_location(config)?,
        schedule: validate_schedule(config)?,
        intervals: validate_intervals(config)?,
    })
}

fn validate_bridge(config: &Config) -> Result<BridgeSettings, ConfigError> {
    let bridge = config
        .bridge
        .as_ref()
        .ok_or(ConfigError::MissingField("bridge"))?;

    let address = non_empty(bridge.address.as_deref(), "bridge.address")?;
    let username = non_empty(bridge.username.as_deref(), "bridge.username")?;
    let timeout_secs = bridge.timeout_secs.unwrap_or(DEFAULT_BRIDGE_TIMEOUT_SECS);
    check_interval("bridge.timeout_secs", timeout_secs, 1, 60)?;

    Ok(BridgeSettings {
        address,
        username,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn validate_location(config: &Config) -> Result<Option<LocationSettings>, ConfigError> {
    let Some(section) = &config.location else {
        return Ok(None);
    };

    match (section.latitude, section.longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            let location = GeoLocation::new(lat, lon)
                .map_err(|e| ConfigError::InvalidLocation(e.to_string()))?;
            Ok(Some(LocationSettings {
                location,
                name: section.name.clone(),
            }))
        }
        (Some(_), None) => Err(ConfigError::MissingField("location.longitude")),
        (None, Some(_)) => Err(ConfigError::MissingField("location.latitude")),
    }
}

fn validate_schedule(config: &Config) -> Result<ScheduleConfig, ConfigError> {
    let section = config
        .schedule
        .as_ref()
        .ok_or(ConfigError::MissingField("schedule"))?;

    let device_ids = section
        .device_ids
        .as_ref()
        .ok_or(ConfigError::MissingField("schedule.device_ids"))?
        .iter()
        .map(RawDeviceId::to_device_id)
        .collect::<BTreeSet<_>>();

    let day_temp = section
        .day_temp
        .ok_or(ConfigError::MissingField("schedule.day_temp"))?;
    let sunset_temp = section
        .sunset_temp
        .ok_or(ConfigError::MissingField("schedule.sunset_temp"))?;
    let brightness = section
        .brightness
        .ok_or(ConfigError::MissingField("schedule.brightness"))?;

    let day_temp = check_temp("schedule.day_temp", day_temp)?;
    let sunset_temp = check_temp("schedule.sunset_temp", sunset_temp)?;
    let brightness = check_brightness(brightness)?;

    let schedule = ScheduleConfig {
        device_ids,
        day_temp,
        sunset_temp,
        brightness,
        run_when_lights_appear: section
            .run_when_lights_appear
            .unwrap_or(DEFAULT_RUN_WHEN_LIGHTS_APPEAR),
    };
    schedule.validate()?;
    Ok(schedule)
}

fn validate_intervals(config: &Config) -> Result<Intervals, ConfigError> {
    let section = config.intervals.clone().unwrap_or_default();

    let refresh = section
        .schedule_refresh_secs
        .unwrap_or(DEFAULT_SCHEDULE_REFRESH_SECS);
    let reconcile = section.reconcile_secs.unwrap_or(DEFAULT_RECONCILE_SECS);
    let poll = section
        .state_poll_millis
        .unwrap_or(DEFAULT_STATE_POLL_MILLIS);

    check_interval(
        "intervals.schedule_refresh_secs",
        refresh,
        MINIMUM_SCHEDULE_REFRESH_SECS,
        MAXIMUM_SCHEDULE_REFRESH_SECS,
    )?;
    check_interval(
        "intervals.reconcile_secs",
        reconcile,
        MINIMUM_RECONCILE_SECS,
        MAXIMUM_RECONCILE_SECS,
    )?;
    check_interval(
        "intervals.state_poll_millis",
        poll,
        MINIMUM_STATE_POLL_MILLIS,
        MAXIMUM_STATE_POLL_MILLIS,
    )?;

    Ok(Intervals {
        schedule_refresh: Duration::from_secs(refresh),
        reconcile: Duration::from_secs(reconcile),
        state_poll: Duration::from_millis(poll),
    })
}

fn non_empty(value: Option<&str>, field: &'static str) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingField(field)),
    }
}

fn check_temp(field: &'static str, value: u32) -> Result<u16, ConfigError> {
    if !(u32::from(MINIMUM_TEMP)..=u32::from(MAXIMUM_TEMP)).contains(&value) {
        return Err(ConfigError::TemperatureOutOfRange { field, value });
    }
    u16::try_from(value).map_err(|_| ConfigError::TemperatureOutOfRange { field, value })
}

fn check_brightness(value: u32) -> Result<u8, ConfigError> {
    if !(1..=u32::from(DEFAULT_BRIGHTNESS)).contains(&value) {
        return Err(ConfigError::BrightnessOutOfRange(value));
    }
    u8::try_from(value).map_err(|_| ConfigError::BrightnessOutOfRange(value))
}

fn check_interval(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::IntervalOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
