//! Philips Hue bridge client over the v1 REST API.
//!
//! Only two endpoints are used:
//!
//! - `GET /api/<username>/lights` to snapshot every light
//! - `PUT /api/<username>/lights/<id>/state` to set color temperature
//!
//! The bridge reports most failures in-band: an HTTP 200 whose body is an array
//! of `{"error": {...}}` objects. Both those and transport failures become
//! [`DeviceError`]s. Every request is bounded by the configured timeout so a
//! shutdown never waits on an unresponsive bridge.

use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{DeviceClient, DeviceError, DeviceId, DeviceSnapshot};

/// Bridge error type for a state change sent to a light that is switched off.
const DEVICE_OFF: u64 = 201;

/// Client for one paired Hue bridge.
pub struct HueBridge {
    base_url: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct LightEntry {
    state: LightState,
}

#[derive(Debug, Deserialize)]
struct LightState {
    on: bool,
    /// Absent on lights without color temperature support.
    ct: Option<u32>,
}

impl HueBridge {
    /// Build a client for the bridge at `address` (host or host:port).
    pub fn new(address: &str, username: &str, timeout: Duration) -> Self {
        let address = address.trim_end_matches('/');
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            format!("{address}/api/{username}")
        } else {
            format!("http://{address}/api/{username}")
        };

        Self {
            base_url,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn get_json(&self, url: &str) -> Result<Value, DeviceError> {
        self.agent
            .get(url)
            .call()
            .map_err(transport_error)?
            .into_json()
            .map_err(|e| DeviceError::Transport(format!("invalid response from {url}: {e}")))
    }

    fn put_json(&self, url: &str, body: Value) -> Result<Value, DeviceError> {
        self.agent
            .put(url)
            .send_json(body)
            .map_err(transport_error)?
            .into_json()
            .map_err(|e| DeviceError::Transport(format!("invalid response from {url}: {e}")))
    }
}

impl DeviceClient for HueBridge {
    fn list_devices(&self) -> Result<Vec<DeviceSnapshot>, DeviceError> {
        let url = format!("{}/lights", self.base_url);
        parse_lights(self.get_json(&url)?)
    }

    fn set_color_temperature(
        &self,
        mired: u32,
        ids: &[DeviceId],
        transition: Duration,
    ) -> Result<(), DeviceError> {
        let body = command_body(mired, transition);
        let mut first_error = None;

        // Keep going after a failure so one unreachable light does not hold the rest back
        for id in ids {
            let url = format!("{}/lights/{id}/state", self.base_url);
            let result = self
                .put_json(&url, body.clone())
                .and_then(check_command_response);
            if let Err(e) = result {
                log_debug!("Light {id} did not accept command: {e}");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn transport_error(error: ureq::Error) -> DeviceError {
    match error {
        ureq::Error::Status(code, response) => {
            DeviceError::Rejected(format!("HTTP {code} from {}", response.get_url()))
        }
        ureq::Error::Transport(transport) => DeviceError::Transport(transport.to_string()),
    }
}

/// Request body for a color temperature change. The bridge counts transitions
/// in units of 100 ms.
fn command_body(mired: u32, transition: Duration) -> Value {
    let transition_time = transition.as_millis() / 100;
    json!({ "ct": mired, "transitiontime": transition_time })
}

/// First in-band error description in a bridge response, if any.
fn bridge_error(value: &Value) -> Option<String> {
    value.as_array()?.iter().find_map(|entry| {
        let error = entry.get("error")?;
        Some(
            error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown bridge error")
                .to_string(),
        )
    })
}

fn parse_lights(value: Value) -> Result<Vec<DeviceSnapshot>, DeviceError> {
    if let Some(description) = bridge_error(&value) {
        return Err(DeviceError::Rejected(description));
    }

    let lights: BTreeMap<String, LightEntry> = serde_json::from_value(value)
        .map_err(|e| DeviceError::Transport(format!("unexpected lights payload: {e}")))?;

    Ok(lights
        .into_iter()
        .map(|(id, light)| DeviceSnapshot::new(id, light.state.on, light.state.ct.unwrap_or(0)))
        .collect())
}

/// Accept a command response unless it carries an error other than "device off".
///
/// Off lights stay in every batch so they come back at the right value; the
/// bridge answers those with a [`DEVICE_OFF`] error that is not a failure.
fn check_command_response(value: Value) -> Result<(), DeviceError> {
    let errors = value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("error"));

    for error in errors {
        if error.get("type").and_then(Value::as_u64) == Some(DEVICE_OFF) {
            continue;
        }
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown bridge error");
        return Err(DeviceError::Rejected(description.to_string()));
    }
    Ok(())
}
