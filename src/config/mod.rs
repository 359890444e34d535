//! Configuration system for huebert.
//!
//! Settings live in a single TOML file, by default
//! `$XDG_CONFIG_HOME/huebert/huebert.toml`, or wherever `--config` points:
//!
//! ```toml
//! [bridge]
//! address = "192.168.1.20"   # Hue bridge host (or http://host:port)
//! username = "generated-key" # Application key from bridge pairing
//! timeout_secs = 5           # Per-request timeout (1-60)
//!
//! [location]                 # Optional; IP geolocation is used when absent
//! latitude = 45.0
//! longitude = 0.0
//! name = "Bordeaux"
//!
//! [schedule]
//! device_ids = ["1", "3"]    # Lights to drive
//! day_temp = 5000            # Kelvin during the day (2000-6500)
//! sunset_temp = 2700         # Kelvin at night (2000-6500)
//! brightness = 254           # 1-254
//!
//! [intervals]                # Optional
//! schedule_refresh_secs = 3600
//! reconcile_secs = 60
//! state_poll_millis = 1000
//! ```
//!
//! The raw [`Config`] mirrors the file with every field optional; validation in
//! [`validation`] turns it into [`Settings`] or a [`ConfigError`].

pub mod loading;
pub mod validation;

use serde::Deserialize;

pub use loading::{get_config_path, load, load_from_path};
pub use validation::{
    BridgeSettings, ConfigError, LocationSettings, ScheduleConfig, Settings, validate_config,
};

use crate::device::DeviceId;

/// Raw configuration file contents.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub bridge: Option<BridgeSection>,
    pub location: Option<LocationSection>,
    pub schedule: Option<ScheduleSection>,
    pub intervals: Option<IntervalsSection>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    pub address: Option<String>,
    pub username: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LocationSection {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleSection {
    pub device_ids: Option<Vec<RawDeviceId>>,
    pub day_temp: Option<u32>,
    pub sunset_temp: Option<u32>,
    pub brightness: Option<u32>,
    pub run_when_lights_appear: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct IntervalsSection {
    pub schedule_refresh_secs: Option<u64>,
    pub reconcile_secs: Option<u64>,
    pub state_poll_millis: Option<u64>,
}

/// Device ids may be written as strings or bare integers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawDeviceId {
    Number(u64),
    Text(String),
}

impl RawDeviceId {
    pub fn to_device_id(&self) -> DeviceId {
        match self {
            RawDeviceId::Number(n) => n.to_string(),
            RawDeviceId::Text(s) => s.trim().to_string(),
        }
    }
}

impl Settings {
    /// Log a summary of the loaded configuration.
    pub fn log_summary(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Bridge: {}", self.bridge.address);
        match &self.location {
            Some(LocationSettings {
                location,
                name: Some(name),
            }) => log_indented!("Location: {name} ({location})"),
            Some(LocationSettings { location, .. }) => log_indented!("Location: {location}"),
            None => log_indented!("Location: not configured, using IP geolocation"),
        }

        let ids: Vec<&str> = self.schedule.device_ids.iter().map(String::as_str).collect();
        log_indented!("Devices: {}", ids.join(", "));
        log_indented!("Day temperature: {}K", self.schedule.day_temp);
        log_indented!("Sunset temperature: {}K", self.schedule.sunset_temp);
        log_indented!("Brightness: {}", self.schedule.brightness);
        if !self.schedule.run_when_lights_appear {
            log_indented!("Lights switched on wait for the next reconcile tick");
        }

        log_debug!(
            "Intervals: refresh {}s, reconcile {}s, poll {}ms",
            self.intervals.schedule_refresh.as_secs(),
            self.intervals.reconcile.as_secs(),
            self.intervals.state_poll.as_millis()
        );
    }
}
