//! In-memory bridge for tests.
//!
//! Holds a set of lights, records every command batch it receives, and applies
//! commands the way a real bridge does: lights that are on take the new color
//! temperature, lights that are off keep their old one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{DeviceClient, DeviceError, DeviceId, DeviceSnapshot};

/// One call to [`DeviceClient::set_color_temperature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    pub mired: u32,
    pub ids: Vec<DeviceId>,
    pub transition: Duration,
}

#[derive(Debug, Default)]
struct FakeState {
    lights: BTreeMap<DeviceId, DeviceSnapshot>,
    batches: Vec<CommandBatch>,
    list_calls: usize,
    fail_next_list: Option<DeviceError>,
    fail_next_command: Option<DeviceError>,
}

/// Shared-handle fake; clones see and mutate the same lights.
#[derive(Debug, Clone, Default)]
pub struct FakeBridge {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a light.
    pub fn insert(&self, id: &str, is_on: bool, mired: u32) {
        self.lock()
            .lights
            .insert(id.to_string(), DeviceSnapshot::new(id, is_on, mired));
    }

    /// Flip a light on or off, keeping its color temperature.
    pub fn set_power(&self, id: &str, is_on: bool) {
        if let Some(light) = self.lock().lights.get_mut(id) {
            light.is_on = is_on;
        }
    }

    pub fn snapshot(&self, id: &str) -> Option<DeviceSnapshot> {
        self.lock().lights.get(id).cloned()
    }

    /// Every batch received so far, oldest first.
    pub fn batches(&self) -> Vec<CommandBatch> {
        self.lock().batches.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn fail_next_list(&self, error: DeviceError) {
        self.lock().fail_next_list = Some(error);
    }

    pub fn fail_next_command(&self, error: DeviceError) {
        self.lock().fail_next_command = Some(error);
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceClient for FakeBridge {
    fn list_devices(&self) -> Result<Vec<DeviceSnapshot>, DeviceError> {
        let mut state = self.lock();
        state.list_calls += 1;
        if let Some(error) = state.fail_next_list.take() {
            return Err(error);
        }
        Ok(state.lights.values().cloned().collect())
    }

    fn set_color_temperature(
        &self,
        mired: u32,
        ids: &[DeviceId],
        transition: Duration,
    ) -> Result<(), DeviceError> {
        let mut state = self.lock();
        if let Some(error) = state.fail_next_command.take() {
            return Err(error);
        }

        state.batches.push(CommandBatch {
            mired,
            ids: ids.to_vec(),
            transition,
        });
        for id in ids {
            if let Some(light) = state.lights.get_mut(id)
                && light.is_on
            {
                light.color_temperature_mired = mired;
            }
        }
        Ok(())
    }
}
