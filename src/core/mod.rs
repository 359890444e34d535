//! Schedule engine and reconciliation loop.
//!
//! The [`Engine`] owns everything mutable: the cached [`DaySchedule`], the
//! device snapshot map and the schedule configuration. Three ticker threads
//! post [`Trigger`]s into its inbox:
//!
//! - schedule refresh (hourly by default) recomputes the day's breakpoints
//!   when the calendar day has rolled over
//! - reconcile (every minute by default) evaluates the [`TargetCurve`] and
//!   pushes one command batch when any light that is on has drifted
//! - state poll (every second by default) watches for lights being switched
//!   on and reconciles immediately when one is
//!
//! The actor thread drains whatever is waiting in the inbox into a single
//! [`Work`] batch before acting, so a burst of triggers that piles up during a
//! slow bridge call results in at most one further reconcile.

pub mod curve;
pub mod schedule;
pub mod tracker;

mod ticker;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{ConfigError, ScheduleConfig};
use crate::constants::*;
use crate::device::{DeviceClient, DeviceError, DeviceId, kelvin_to_mired};
use crate::geo::{GeoLocation, SolarError};
use crate::time_source::Clock;

pub use curve::{CurveRegion, TargetCurve};
pub use schedule::{DaySchedule, ScheduleCache};
pub use tracker::{PollOutcome, StateTracker};

use ticker::Ticker;

/// Cadence of the three periodic activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub schedule_refresh: Duration,
    pub reconcile: Duration,
    pub state_poll: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            schedule_refresh: Duration::from_secs(DEFAULT_SCHEDULE_REFRESH_SECS),
            reconcile: Duration::from_secs(DEFAULT_RECONCILE_SECS),
            state_poll: Duration::from_millis(DEFAULT_STATE_POLL_MILLIS),
        }
    }
}

/// Messages posted to the engine inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    RefreshSchedule,
    Reconcile,
    PollState,
    Shutdown,
}

/// A coalesced batch of triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Work {
    pub refresh: bool,
    pub poll: bool,
    pub reconcile: bool,
    pub shutdown: bool,
}

impl Work {
    pub fn absorb(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::RefreshSchedule => self.refresh = true,
            Trigger::Reconcile => self.reconcile = true,
            Trigger::PollState => self.poll = true,
            Trigger::Shutdown => self.shutdown = true,
        }
    }

    pub fn from_triggers(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        let mut work = Self::default();
        for trigger in triggers {
            work.absorb(trigger);
        }
        work
    }
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No schedule exists for today (the sun never reaches the needed angles).
    NoSchedule,
    /// Every configured light that is on already shows the target.
    InSync { target: u16 },
    /// One batch was sent to every configured light.
    Commanded {
        target: u16,
        mired: u32,
        devices: Vec<DeviceId>,
    },
}

/// Dependencies for creating an [`Engine`].
pub struct EngineParams {
    pub client: Box<dyn DeviceClient>,
    pub clock: Arc<dyn Clock>,
    pub location: GeoLocation,
    pub schedule: ScheduleConfig,
}

/// Single owner of schedule, device snapshots and configuration.
pub struct Engine {
    client: Box<dyn DeviceClient>,
    clock: Arc<dyn Clock>,
    config: ScheduleConfig,
    device_ids: Vec<DeviceId>,
    curve: TargetCurve,
    cache: ScheduleCache,
    tracker: StateTracker,
}

impl Engine {
    /// Create an engine, refusing an invalid schedule configuration.
    pub fn new(params: EngineParams) -> Result<Self, ConfigError> {
        params.schedule.validate()?;

        let config = params.schedule;
        Ok(Self {
            client: params.client,
            clock: params.clock,
            device_ids: config.device_ids.iter().cloned().collect(),
            curve: TargetCurve::new(config.day_temp, config.sunset_temp),
            cache: ScheduleCache::new(params.location),
            tracker: StateTracker::new(config.device_ids.clone()),
            config,
        })
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Ensure the cached schedule matches today, computing it if needed.
    pub fn refresh_schedule(&mut self) -> Result<Arc<DaySchedule>, SolarError> {
        let now = self.clock.now();
        let stale = self.cache.is_stale(&now);
        let result = self.cache.refresh(&now);

        if stale {
            match &result {
                Ok(schedule) => schedule.log(),
                Err(e) => {
                    log_pipe!();
                    log_warning!("No solar schedule for {}: {e}", now.date_naive());
                    log_indented!("Lights will be left alone until the next day");
                }
            }
        }
        result
    }

    /// Compare the lights against the curve and correct them if needed.
    ///
    /// Sends at most one batch. Lights that are off or report no color
    /// temperature are never compared, but every configured light is included
    /// in the batch so they all come back at the right temperature.
    pub fn reconcile(&mut self) -> Result<ReconcileOutcome, DeviceError> {
        let Ok(schedule) = self.refresh_schedule() else {
            return Ok(ReconcileOutcome::NoSchedule);
        };

        let now = self.clock.now();
        let (target, region) = self.curve.evaluate(&now, &schedule);
        let mired = kelvin_to_mired(target);
        log_debug!("Target {target}K ({mired} mired) in {region} at {}", now.format("%H:%M:%S"));

        let snapshots = self.client.list_devices()?;
        let drifted: Vec<&str> = snapshots
            .iter()
            .filter(|s| self.config.device_ids.contains(&s.id))
            .filter(|s| s.is_on && s.color_temperature_mired != 0)
            .filter(|s| s.color_temperature_mired != mired)
            .map(|s| s.id.as_str())
            .collect();

        if drifted.is_empty() {
            return Ok(ReconcileOutcome::InSync { target });
        }
        log_debug!("Out of sync: {}", drifted.join(", "));

        self.client
            .set_color_temperature(mired, &self.device_ids, COMMAND_TRANSITION)?;

        log_decorated!(
            "Updating devices [{}] to {target}K ({mired} mired)",
            self.device_ids.join(", ")
        );
        Ok(ReconcileOutcome::Commanded {
            target,
            mired,
            devices: self.device_ids.clone(),
        })
    }

    /// Sample device power state and diff it against the last sample.
    pub fn poll_state(&mut self) -> Result<PollOutcome, DeviceError> {
        let snapshots = self.client.list_devices()?;
        let outcome = self.tracker.observe(snapshots);

        for id in &outcome.first_seen {
            log_debug!("Tracking device {id}");
        }
        Ok(outcome)
    }

    /// Process one coalesced batch: refresh, then poll, then reconcile once.
    ///
    /// Device failures are logged and the affected step is skipped; nothing
    /// here is fatal. Returns the reconcile outcome when one ran successfully.
    pub fn handle(&mut self, work: Work) -> Option<ReconcileOutcome> {
        if work.refresh {
            let _ = self.refresh_schedule();
        }

        let mut reconcile = work.reconcile;
        if work.poll {
            match self.poll_state() {
                Ok(outcome) if outcome.force_reconcile() && self.config.run_when_lights_appear => {
                    log_decorated!(
                        "Device {} switched on, reconciling now",
                        outcome.powered_on.join(", ")
                    );
                    reconcile = true;
                }
                Ok(_) => {}
                Err(e) => log_debug!("State poll skipped: {e}"),
            }
        }

        if !reconcile {
            return None;
        }
        match self.reconcile() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log_warning!("Reconcile skipped: {e}");
                None
            }
        }
    }

    /// Start the actor and ticker threads.
    ///
    /// Reconcile and poll fire immediately; the first scheduled refresh comes
    /// one interval after the start-up refresh.
    pub fn spawn(self, intervals: Intervals) -> EngineHandle {
        let (inbox, inbox_rx) = mpsc::channel::<Trigger>();
        let _ = inbox.send(Trigger::RefreshSchedule);

        let actor = thread::spawn(move || self.run(inbox_rx));

        let tickers = vec![
            Ticker::start(
                Trigger::RefreshSchedule,
                intervals.schedule_refresh,
                intervals.schedule_refresh,
                inbox.clone(),
            ),
            Ticker::start(
                Trigger::Reconcile,
                Duration::ZERO,
                intervals.reconcile,
                inbox.clone(),
            ),
            Ticker::start(
                Trigger::PollState,
                Duration::ZERO,
                intervals.state_poll,
                inbox.clone(),
            ),
        ];

        EngineHandle {
            inbox,
            actor,
            tickers,
        }
    }

    fn run(mut self, inbox: Receiver<Trigger>) {
        log_block_start!(
            "Engine started for {} device(s)",
            self.device_ids.len()
        );

        while let Ok(first) = inbox.recv() {
            let mut work = Work::default();
            work.absorb(first);
            while let Ok(next) = inbox.try_recv() {
                work.absorb(next);
            }

            if work.shutdown {
                break;
            }
            self.handle(work);
        }

        log_block_start!("Engine stopped");
    }
}

/// Handle to a running engine.
///
/// Dropping the handle also stops everything, without waiting.
pub struct EngineHandle {
    inbox: Sender<Trigger>,
    actor: JoinHandle<()>,
    tickers: Vec<Ticker>,
}

impl EngineHandle {
    /// Post a trigger out of band. Returns false once the engine has stopped.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        self.inbox.send(trigger).is_ok()
    }

    /// Stop the tickers, let in-flight work finish, then join the actor.
    pub fn shutdown(self) {
        for ticker in self.tickers {
            ticker.stop();
        }
        let _ = self.inbox.send(Trigger::Shutdown);
        if self.actor.join().is_err() {
            log_error!("Engine thread panicked");
        }
    }
}

#[cfg(test)]
mod tests;
