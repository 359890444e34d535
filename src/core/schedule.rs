//! Solar breakpoints for one calendar day and the cache that owns them.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::sync::Arc;

use crate::geo::{Direction, ElevationAngle, GeoLocation, SolarError, time_at_solar_elevation};

/// The four instants that shape the target curve for one local day.
///
/// Ordered `sunrise < golden_rise < golden_set < sunset` wherever the sun
/// reaches the golden-hour elevation.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    calendar_day: NaiveDate,
    sunrise: DateTime<FixedOffset>,
    golden_rise: DateTime<FixedOffset>,
    golden_set: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
}

impl DaySchedule {
    /// Compute the schedule for the local calendar day of `now`.
    pub fn compute(now: &DateTime<FixedOffset>, location: GeoLocation) -> Result<Self, SolarError> {
        let at = |elevation, direction| time_at_solar_elevation(now, location, elevation, direction);

        Ok(Self {
            calendar_day: now.date_naive(),
            sunrise: at(ElevationAngle::Horizon, Direction::Rise)?,
            golden_rise: at(ElevationAngle::GoldenHour, Direction::Rise)?,
            golden_set: at(ElevationAngle::GoldenHour, Direction::Set)?,
            sunset: at(ElevationAngle::Horizon, Direction::Set)?,
        })
    }

    /// Build a schedule from known instants.
    pub fn from_instants(
        sunrise: DateTime<FixedOffset>,
        golden_rise: DateTime<FixedOffset>,
        golden_set: DateTime<FixedOffset>,
        sunset: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            calendar_day: sunrise.date_naive(),
            sunrise,
            golden_rise,
            golden_set,
            sunset,
        }
    }

    pub fn calendar_day(&self) -> NaiveDate {
        self.calendar_day
    }

    pub fn sunrise(&self) -> DateTime<FixedOffset> {
        self.sunrise
    }

    pub fn golden_rise(&self) -> DateTime<FixedOffset> {
        self.golden_rise
    }

    pub fn golden_set(&self) -> DateTime<FixedOffset> {
        self.golden_set
    }

    pub fn sunset(&self) -> DateTime<FixedOffset> {
        self.sunset
    }

    /// Log the four breakpoints as a block.
    pub fn log(&self) {
        log_block_start!("Solar schedule for {}", self.calendar_day);
        log_indented!("Sunrise:        {}", self.sunrise.format("%H:%M:%S"));
        log_indented!("Golden hour up: {}", self.golden_rise.format("%H:%M:%S"));
        log_indented!("Golden hour dn: {}", self.golden_set.format("%H:%M:%S"));
        log_indented!("Sunset:         {}", self.sunset.format("%H:%M:%S"));
    }
}

/// Owner of the current [`DaySchedule`].
///
/// Results are cached per calendar day, failures included, since the
/// calculation is deterministic for a given day and location.
#[derive(Debug)]
pub struct ScheduleCache {
    location: GeoLocation,
    cached: Option<(NaiveDate, Result<Arc<DaySchedule>, SolarError>)>,
}

impl ScheduleCache {
    pub fn new(location: GeoLocation) -> Self {
        Self {
            location,
            cached: None,
        }
    }

    /// True when the next [`refresh`](Self::refresh) at `now` would compute.
    pub fn is_stale(&self, now: &DateTime<FixedOffset>) -> bool {
        match &self.cached {
            Some((day, _)) => *day != now.date_naive(),
            None => true,
        }
    }

    /// Return the schedule for the local day of `now`.
    ///
    /// Within the same day this hands back the cached instance untouched. On a
    /// new day the cache is replaced wholesale.
    pub fn refresh(&mut self, now: &DateTime<FixedOffset>) -> Result<Arc<DaySchedule>, SolarError> {
        let today = now.date_naive();
        if let Some((day, result)) = &self.cached
            && *day == today
        {
            return result.clone();
        }

        let result = DaySchedule::compute(now, self.location).map(Arc::new);
        self.cached = Some((today, result.clone()));
        result
    }

    /// Last computed schedule, if it succeeded.
    pub fn current(&self) -> Option<Arc<DaySchedule>> {
        match &self.cached {
            Some((_, Ok(schedule))) => Some(Arc::clone(schedule)),
            _ => None,
        }
    }
}
