//! Piecewise linear color temperature curve over a day schedule.
//!
//! ```text
//!   day_temp    ┤            ┌────────────────┐
//!               │           /                  \
//!   sunset_temp ┤──────────┘                    └──────────
//!               └──────────┬──┬──────────────┬──┬──────────
//!                    sunrise  golden_rise   golden_set  sunset
//! ```
//!
//! All regions are half-open: each starts at its left breakpoint inclusive and
//! ends at its right breakpoint exclusive.

use chrono::{DateTime, FixedOffset};
use std::fmt;

use super::schedule::DaySchedule;

/// Which part of the curve an instant falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveRegion {
    /// Before sunrise or from sunset on.
    Night,
    /// Ramping up between sunrise and the end of the morning golden hour.
    Sunrise,
    /// Full daylight temperature.
    Day,
    /// Ramping down between the start of the evening golden hour and sunset.
    Sunset,
}

impl fmt::Display for CurveRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveRegion::Night => write!(f, "Night"),
            CurveRegion::Sunrise => write!(f, "Sunrise"),
            CurveRegion::Day => write!(f, "Day"),
            CurveRegion::Sunset => write!(f, "Sunset"),
        }
    }
}

/// Target temperatures at the two ends of the curve, in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCurve {
    day_temp: u16,
    sunset_temp: u16,
}

impl TargetCurve {
    pub fn new(day_temp: u16, sunset_temp: u16) -> Self {
        Self {
            day_temp,
            sunset_temp,
        }
    }

    /// Target temperature at `now`, with the region it came from.
    pub fn evaluate(&self, now: &DateTime<FixedOffset>, schedule: &DaySchedule) -> (u16, CurveRegion) {
        let now = *now;
        let delta = i32::from(self.day_temp) - i32::from(self.sunset_temp);

        if now >= schedule.golden_rise() && now < schedule.golden_set() {
            (self.day_temp, CurveRegion::Day)
        } else if now >= schedule.sunrise() && now < schedule.golden_rise() {
            let frac = fraction(schedule.sunrise(), now, schedule.golden_rise());
            (
                offset_temp(self.sunset_temp, scaled(delta, frac)),
                CurveRegion::Sunrise,
            )
        } else if now >= schedule.golden_set() && now < schedule.sunset() {
            let frac = fraction(schedule.golden_set(), now, schedule.sunset());
            (
                offset_temp(self.day_temp, -scaled(delta, frac)),
                CurveRegion::Sunset,
            )
        } else {
            (self.sunset_temp, CurveRegion::Night)
        }
    }
}

/// Position of `now` between `start` and `end` as a real ratio.
fn fraction(start: DateTime<FixedOffset>, now: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> f64 {
    let span = (end - start).num_milliseconds();
    if span <= 0 {
        return 0.0;
    }
    (now - start).num_milliseconds() as f64 / span as f64
}

/// `delta * frac`, truncated toward zero.
fn scaled(delta: i32, frac: f64) -> i32 {
    (f64::from(delta) * frac) as i32
}

fn offset_temp(base: u16, offset: i32) -> u16 {
    (i32::from(base) + offset).clamp(0, i32::from(u16::MAX)) as u16
}
