//! Geographic location and the providers that supply it.
//!
//! The schedule only needs a valid latitude/longitude pair. Where it comes from
//! is up to a [`LocationProvider`]: the coordinates stored in the configuration
//! file, or a one-shot lookup of the bridge's public IP address when none are
//! configured.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Default endpoint for the IP geolocation fallback.
pub const IP_LOOKUP_ENDPOINT: &str = "http://ip-api.com/json";

/// A validated pair of geographic coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    latitude: f64,
    longitude: f64,
}

impl GeoLocation {
    /// Create a location, rejecting coordinates outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!("latitude must be between -90 and 90 degrees (got {latitude})");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("longitude must be between -180 and 180 degrees (got {longitude})");
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.4}°{ns}, {:.4}°{ew}",
            self.latitude.abs(),
            self.longitude.abs()
        )
    }
}

/// Anything that can produce the location the schedule is computed for.
pub trait LocationProvider {
    /// Resolve the location.
    fn location(&self) -> Result<GeoLocation>;

    /// Short human-readable description of where the location came from.
    fn describe(&self) -> String;
}

/// Coordinates taken verbatim from the configuration file.
pub struct ConfiguredLocation {
    location: GeoLocation,
    name: Option<String>,
}

impl ConfiguredLocation {
    pub fn new(location: GeoLocation, name: Option<String>) -> Self {
        Self { location, name }
    }
}

impl LocationProvider for ConfiguredLocation {
    fn location(&self) -> Result<GeoLocation> {
        Ok(self.location)
    }

    fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("configured location {name}"),
            None => "configured location".to_string(),
        }
    }
}

/// Fallback lookup of the approximate location of the host's public IP address.
pub struct IpGeolocation {
    endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    message: Option<String>,
}

impl IpGeolocation {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl LocationProvider for IpGeolocation {
    fn location(&self) -> Result<GeoLocation> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response: IpLookupResponse = agent
            .get(&self.endpoint)
            .call()
            .with_context(|| format!("Failed to query {}", self.endpoint))?
            .into_json()
            .context("Failed to parse geolocation response")?;

        if response.status != "success" {
            anyhow::bail!(
                "Geolocation lookup failed: {}",
                response.message.unwrap_or_else(|| response.status.clone())
            );
        }

        match (response.lat, response.lon) {
            (Some(lat), Some(lon)) => {
                if let Some(city) = &response.city {
                    log_indented!("Geolocation lookup resolved to {city}");
                }
                GeoLocation::new(lat, lon)
            }
            _ => anyhow::bail!("Geolocation response did not contain coordinates"),
        }
    }

    fn describe(&self) -> String {
        format!("IP geolocation via {}", self.endpoint)
    }
}

/// Try each provider in order and return the first location that resolves.
pub fn resolve_location(providers: &[Box<dyn LocationProvider>]) -> Result<GeoLocation> {
    let mut last_error = None;

    for provider in providers {
        match provider.location() {
            Ok(location) => {
                log_info!("Location: {} ({})", location, provider.describe());
                return Ok(location);
            }
            Err(e) => {
                log_warning!("{} unavailable: {e}", provider.describe());
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No location provider configured")))
}
