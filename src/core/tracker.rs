//! Device power-state tracking for the power-on fast path.
//!
//! A light that gets switched on comes back at whatever color temperature it
//! had when it went off. Rather than wait for the next reconcile tick, the
//! tracker notices the off→on edge and asks for an immediate reconcile.

use std::collections::{BTreeMap, BTreeSet};

use crate::device::{DeviceId, DeviceSnapshot};

/// Result of feeding one poll into the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Devices observed going from off to on since the previous poll.
    pub powered_on: Vec<DeviceId>,
    /// Configured devices seen for the first time.
    pub first_seen: Vec<DeviceId>,
}

impl PollOutcome {
    pub fn force_reconcile(&self) -> bool {
        !self.powered_on.is_empty()
    }
}

/// Last known snapshot of every configured device.
#[derive(Debug, Default)]
pub struct StateTracker {
    configured: BTreeSet<DeviceId>,
    snapshots: BTreeMap<DeviceId, DeviceSnapshot>,
}

impl StateTracker {
    pub fn new(configured: BTreeSet<DeviceId>) -> Self {
        Self {
            configured,
            snapshots: BTreeMap::new(),
        }
    }

    /// Diff a fresh poll against the retained snapshots and replace them.
    ///
    /// Devices outside the configured set are ignored. A device seen for the
    /// first time is recorded without forcing anything. Devices missing from
    /// the poll keep their last snapshot.
    pub fn observe(&mut self, polled: Vec<DeviceSnapshot>) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        for snapshot in polled {
            if !self.configured.contains(&snapshot.id) {
                continue;
            }

            match self.snapshots.get(&snapshot.id) {
                Some(previous) if !previous.is_on && snapshot.is_on => {
                    outcome.powered_on.push(snapshot.id.clone());
                }
                Some(_) => {}
                None => outcome.first_seen.push(snapshot.id.clone()),
            }

            self.snapshots.insert(snapshot.id.clone(), snapshot);
        }

        outcome
    }

    pub fn snapshot(&self, id: &str) -> Option<&DeviceSnapshot> {
        self.snapshots.get(id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
