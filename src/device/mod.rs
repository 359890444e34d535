//! Device control abstraction for the lights that follow the sun.
//!
//! The engine talks to lights only through the [`DeviceClient`] trait: one call
//! to enumerate on/off state and current color temperature, one call to push a
//! color temperature to a batch of devices. The Hue bridge implementation lives
//! in [`hue`]; an in-memory bridge for tests lives in `fake`.
//!
//! ## Units
//!
//! Configuration and the target curve work in Kelvin. Devices report and accept
//! mired (`1_000_000 / Kelvin`), so comparisons always happen after converting
//! the target with [`kelvin_to_mired`].

use std::time::Duration;
use thiserror::Error;

pub mod hue;

#[cfg(any(test, feature = "testing-support"))]
pub mod fake;

/// Identifier the bridge uses for a light.
pub type DeviceId = String;

/// Point-in-time view of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub is_on: bool,
    /// Current color temperature; 0 for devices that do not report one.
    pub color_temperature_mired: u32,
}

impl DeviceSnapshot {
    pub fn new(id: impl Into<DeviceId>, is_on: bool, color_temperature_mired: u32) -> Self {
        Self {
            id: id.into(),
            is_on,
            color_temperature_mired,
        }
    }
}

/// Transient failure talking to the device transport.
///
/// These never stop the engine: the tick that hit one is skipped and the next
/// tick tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The request never produced a usable response (connection, timeout, parse).
    #[error("device transport failed: {0}")]
    Transport(String),
    /// The bridge answered but refused the request.
    #[error("bridge rejected request: {0}")]
    Rejected(String),
}

/// Capability to enumerate and command the configured lights.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceClient: Send {
    /// Snapshot every device the transport knows about.
    fn list_devices(&self) -> Result<Vec<DeviceSnapshot>, DeviceError>;

    /// Set `ids` to `mired`, fading over `transition`.
    fn set_color_temperature(
        &self,
        mired: u32,
        ids: &[DeviceId],
        transition: Duration,
    ) -> Result<(), DeviceError>;
}

/// Convert a Kelvin temperature to mired, truncating.
pub fn kelvin_to_mired(kelvin: u16) -> u32 {
    if kelvin == 0 {
        return 0;
    }
    1_000_000 / u32::from(kelvin)
}
