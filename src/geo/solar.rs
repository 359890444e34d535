//! NOAA solar elevation crossings.
//!
//! Computes the instant the sun crosses a given elevation angle on a given
//! calendar day, using the low-precision NOAA spreadsheet equations with two
//! refinement passes. Results are whole seconds and come back in the time zone
//! of the reference instant.
//!
//! Chain of quantities: Julian date -> Julian century -> mean longitude and
//! anomaly -> equation of center -> apparent longitude -> declination and
//! equation of time -> solar noon -> hour angle -> UTC minutes of the crossing.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

use crate::geo::location::GeoLocation;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Apparent horizon dip used for the sunrise/sunset angle.
const HORIZON_REFRACTION: f64 = 0.833;

/// Sun elevation angles the calculator knows how to resolve.
///
/// Dawn and dusk share the same angle; which crossing is wanted is carried by
/// [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElevationAngle {
    /// -18°, end of astronomical twilight
    AstronomicalTwilight,
    /// -12°
    NauticalTwilight,
    /// -6°
    CivilTwilight,
    /// 0°, the conventional sunrise and sunset
    Horizon,
    /// +6°, edge of the golden hour
    GoldenHour,
    /// +12°, roughly when city indoor lighting stops being needed
    IndoorLights,
}

impl ElevationAngle {
    pub const ALL: [ElevationAngle; 6] = [
        Self::AstronomicalTwilight,
        Self::NauticalTwilight,
        Self::CivilTwilight,
        Self::Horizon,
        Self::GoldenHour,
        Self::IndoorLights,
    ];

    /// Signed elevation in degrees.
    pub const fn degrees(self) -> i32 {
        match self {
            Self::AstronomicalTwilight => -18,
            Self::NauticalTwilight => -12,
            Self::CivilTwilight => -6,
            Self::Horizon => 0,
            Self::GoldenHour => 6,
            Self::IndoorLights => 12,
        }
    }

    /// Offset added to 90° to get the zenith angle used in the hour angle.
    fn refraction_correction(self) -> f64 {
        match self {
            Self::Horizon => HORIZON_REFRACTION,
            other => -f64::from(other.degrees()),
        }
    }
}

impl fmt::Display for ElevationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}°", self.degrees())
    }
}

/// Whether the crossing is the morning (rising) or evening (setting) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Rise,
    Set,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Rise => 1.0,
            Direction::Set => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rise => write!(f, "rising"),
            Direction::Set => write!(f, "setting"),
        }
    }
}

/// Errors from the solar calculator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolarError {
    /// The sun stays entirely above or below the requested angle all day
    /// (polar day or polar night for that angle).
    #[error(
        "the sun does not cross {elevation} ({direction}) at latitude {latitude:.4} on {date}"
    )]
    NoCrossing {
        elevation: ElevationAngle,
        direction: Direction,
        latitude: f64,
        date: NaiveDate,
    },
}

/// Instant at which the sun crosses `elevation` in `direction` on the calendar
/// day of `reference_day`.
///
/// Only the local date of `reference_day` matters; its time of day is ignored.
/// The returned instant is expressed in the same time zone as `reference_day`.
///
/// # Errors
/// [`SolarError::NoCrossing`] when the angle is never reached that day at the
/// given latitude. The value is never clamped to a nearby crossing.
pub fn time_at_solar_elevation<Tz: TimeZone>(
    reference_day: &DateTime<Tz>,
    location: GeoLocation,
    elevation: ElevationAngle,
    direction: Direction,
) -> Result<DateTime<Tz>, SolarError> {
    let date = reference_day.date_naive();
    let offset_seconds = reference_day.offset().fix().local_minus_utc();
    let julian_date = julian_date_at_local_midnight(date, offset_seconds);

    let minutes = utc_minutes_at_elevation(
        julian_date,
        location.latitude(),
        location.longitude(),
        elevation,
        direction,
    )
    .ok_or(SolarError::NoCrossing {
        elevation,
        direction,
        latitude: location.latitude(),
        date,
    })?;

    // Whole seconds, rounded down
    let seconds = (minutes * 60.0).floor() as i64;
    let utc_midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let instant = utc_midnight + Duration::seconds(seconds);

    Ok(instant.with_timezone(&reference_day.timezone()))
}

/// Julian date of local midnight, shifted by the UTC offset in fractional days.
fn julian_date_at_local_midnight(date: NaiveDate, offset_seconds: i32) -> f64 {
    use chrono::Datelike;

    let (year, month, day) = (date.year(), date.month() as i32, date.day() as i32);

    // Integer day number; all divisions truncate toward zero
    let a = (month - 14) / 12;
    let jday = (1461 * (year + 4800 + a)) / 4 + (367 * (month - 2 - 12 * a)) / 12
        - (3 * ((year + 4900 + a) / 100)) / 4
        + day
        - 32075;

    // Day fraction for 00:00:00.000 measured from noon
    let fraction = (0.0 - 12.0) / 24.0;

    f64::from(jday) + fraction + f64::from(offset_seconds) / 86400.0
}

fn julian_date_to_century(julian_date: f64) -> f64 {
    (julian_date - 2451545.0) / 36525.0
}

fn century_to_julian_date(century: f64) -> f64 {
    century * 36525.0 + 2451545.0
}

/// Geometric mean longitude of the sun in degrees, normalized into range.
fn sun_geometric_mean_longitude(t: f64) -> f64 {
    let mut longitude = 280.46646 + t * (36000.76983 + 0.0003032 * t);
    while longitude > 360.0 {
        longitude -= 360.0;
    }
    while longitude < 0.0 {
        longitude += 360.0;
    }
    longitude
}

fn mean_obliquity_of_ecliptic(t: f64) -> f64 {
    let seconds = 21.448 - t * (46.8150 + t * (0.00059 - t * 0.001813));
    23.0 + (26.0 + seconds / 60.0) / 60.0
}

/// Longitude of the moon's ascending node, used by the nutation terms.
fn omega(t: f64) -> f64 {
    125.04 - 1934.136 * t
}

fn obliquity_correction(t: f64) -> f64 {
    mean_obliquity_of_ecliptic(t) + 0.00256 * (omega(t) * DEG_TO_RAD).cos()
}

fn earth_orbit_eccentricity(t: f64) -> f64 {
    0.016708634 - t * (0.000042037 + 0.0000001267 * t)
}

fn sun_geometric_mean_anomaly(t: f64) -> f64 {
    357.52911 + t * (35999.05029 - 0.0001537 * t)
}

/// Difference between true and mean solar time, in minutes.
fn equation_of_time(t: f64) -> f64 {
    let epsilon = obliquity_correction(t);
    let mean_longitude = sun_geometric_mean_longitude(t);
    let eccentricity = earth_orbit_eccentricity(t);
    let mean_anomaly = sun_geometric_mean_anomaly(t);

    let mut y = (DEG_TO_RAD * epsilon / 2.0).tan();
    y *= y;

    let sin2l0 = (2.0 * DEG_TO_RAD * mean_longitude).sin();
    let sinm = (DEG_TO_RAD * mean_anomaly).sin();
    let cos2l0 = (2.0 * DEG_TO_RAD * mean_longitude).cos();
    let sin4l0 = (4.0 * DEG_TO_RAD * mean_longitude).sin();
    let sin2m = (2.0 * DEG_TO_RAD * mean_anomaly).sin();

    let e_time = y * sin2l0 - 2.0 * eccentricity * sinm
        + 4.0 * eccentricity * y * sinm * cos2l0
        - 0.5 * y * y * sin4l0
        - 1.25 * eccentricity * eccentricity * sin2m;

    RAD_TO_DEG * e_time * 4.0
}

fn sun_equation_of_center(t: f64) -> f64 {
    let anomaly = DEG_TO_RAD * sun_geometric_mean_anomaly(t);
    let sin1 = anomaly.sin();
    let sin2 = (anomaly + anomaly).sin();
    let sin3 = (anomaly + anomaly + anomaly).sin();

    sin1 * (1.914602 - t * (0.004817 + 0.000014 * t))
        + sin2 * (0.019993 - 0.000101 * t)
        + sin3 * 0.000289
}

fn sun_apparent_longitude(t: f64) -> f64 {
    let true_longitude = sun_geometric_mean_longitude(t) + sun_equation_of_center(t);
    true_longitude - 0.00569 - 0.00478 * (DEG_TO_RAD * omega(t)).sin()
}

/// Solar declination in degrees.
fn sun_declination(t: f64) -> f64 {
    let epsilon = obliquity_correction(t);
    let lambda = sun_apparent_longitude(t);
    let sint = (DEG_TO_RAD * epsilon).sin() * (DEG_TO_RAD * lambda).sin();
    RAD_TO_DEG * sint.asin()
}

/// Solar noon in UTC minutes from midnight. `longitude` is west-positive.
fn solar_noon_utc(t: f64, longitude: f64) -> f64 {
    let t_noon = julian_date_to_century(century_to_julian_date(t) + longitude / 360.0);
    let estimate = 720.0 + longitude * 4.0 - equation_of_time(t_noon);

    let refined = julian_date_to_century(century_to_julian_date(t) - 0.5 + estimate / 1440.0);
    720.0 + longitude * 4.0 - equation_of_time(refined)
}

/// Hour angle in radians, or `None` when the sun never reaches the angle.
fn hour_angle_at_elevation(
    latitude: f64,
    declination: f64,
    elevation: ElevationAngle,
) -> Option<f64> {
    let lat_rad = DEG_TO_RAD * latitude;
    let decl_rad = DEG_TO_RAD * declination;
    let zenith = DEG_TO_RAD * (90.0 + elevation.refraction_correction());

    let cos_hour_angle =
        zenith.cos() / (lat_rad.cos() * decl_rad.cos()) - lat_rad.tan() * decl_rad.tan();

    // NaN falls through here as well
    if (-1.0..=1.0).contains(&cos_hour_angle) {
        Some(cos_hour_angle.acos())
    } else {
        None
    }
}

/// UTC minutes from midnight of the crossing, two passes.
fn utc_minutes_at_elevation(
    julian_date: f64,
    latitude: f64,
    longitude: f64,
    elevation: ElevationAngle,
    direction: Direction,
) -> Option<f64> {
    let longitude = -longitude;
    let century = julian_date_to_century(julian_date);

    let noon_minutes = solar_noon_utc(century, longitude);
    let noon_century = julian_date_to_century(julian_date + noon_minutes / 1440.0);

    // First pass at solar noon
    let first = crossing_minutes(noon_century, latitude, longitude, elevation, direction)?;

    // Second pass at the first estimate of the crossing itself
    let refined_century = julian_date_to_century(century_to_julian_date(century) + first / 1440.0);
    crossing_minutes(refined_century, latitude, longitude, elevation, direction)
}

fn crossing_minutes(
    century: f64,
    latitude: f64,
    longitude: f64,
    elevation: ElevationAngle,
    direction: Direction,
) -> Option<f64> {
    let eq_time = equation_of_time(century);
    let declination = sun_declination(century);
    let hour_angle =
        direction.sign() * hour_angle_at_elevation(latitude, declination, elevation)?;

    let delta = longitude - RAD_TO_DEG * hour_angle;
    Some(720.0 + 4.0 * delta - eq_time)
}
