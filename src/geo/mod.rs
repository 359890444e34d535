//! Geographic location and solar calculations.
//!
//! ## Module Structure
//!
//! - [`location`]: validated coordinates and the providers that supply them
//! - [`solar`]: NOAA solar elevation crossings for a calendar day
//!
//! The schedule engine in [`crate::core`] calls into [`solar`] four times per day
//! (golden-hour and horizon crossings, rising and setting). Everything here is
//! pure apart from the IP lookup fallback in [`location`].

pub mod location;
pub mod solar;

pub use location::{ConfiguredLocation, GeoLocation, IpGeolocation, LocationProvider};
pub use solar::{Direction, ElevationAngle, SolarError, time_at_solar_elevation};
