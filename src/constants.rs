//! Application-wide constants and defaults.
//!
//! Grouped by concern: timer cadence, device command parameters, validation
//! limits, and exit codes.

use std::time::Duration;

// # Timer Cadence

/// How often the day schedule is checked for a calendar-day rollover.
pub const DEFAULT_SCHEDULE_REFRESH_SECS: u64 = 60 * 60;
/// How often the target curve is evaluated against the devices.
pub const DEFAULT_RECONCILE_SECS: u64 = 60;
/// How often device on/off state is sampled for the power-on fast path.
pub const DEFAULT_STATE_POLL_MILLIS: u64 = 1000;

pub const MINIMUM_SCHEDULE_REFRESH_SECS: u64 = 60;
pub const MAXIMUM_SCHEDULE_REFRESH_SECS: u64 = 24 * 60 * 60;
pub const MINIMUM_RECONCILE_SECS: u64 = 10;
pub const MAXIMUM_RECONCILE_SECS: u64 = 60 * 60;
pub const MINIMUM_STATE_POLL_MILLIS: u64 = 250;
pub const MAXIMUM_STATE_POLL_MILLIS: u64 = 60_000;

// # Device Commands

/// Fade applied to every color temperature command.
pub const COMMAND_TRANSITION: Duration = Duration::from_millis(400);
/// Default bound on a single bridge request, so shutdown never waits forever.
pub const DEFAULT_BRIDGE_TIMEOUT_SECS: u64 = 5;

// # Validation Limits

/// Warmest color temperature a Hue bulb accepts (500 mired).
pub const MINIMUM_TEMP: u16 = 2000;
/// Coolest color temperature a Hue bulb accepts (153 mired).
pub const MAXIMUM_TEMP: u16 = 6500;

pub const DEFAULT_BRIGHTNESS: u8 = 254;
pub const DEFAULT_RUN_WHEN_LIGHTS_APPEAR: bool = true;

// # Exit Codes

pub const EXIT_FAILURE: i32 = 1;
