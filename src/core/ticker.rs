//! Periodic trigger threads.
//!
//! A ticker only ever posts a [`Trigger`] into the engine inbox; it never
//! touches devices itself, so a slow bridge call cannot delay any timer.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Trigger;

pub(crate) struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Post `trigger` after `first_delay`, then every `period`.
    ///
    /// The thread exits when stopped, when the handle is dropped, or when the
    /// inbox is gone.
    pub fn start(
        trigger: Trigger,
        first_delay: Duration,
        period: Duration,
        inbox: Sender<Trigger>,
    ) -> Self {
        let (stop, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let mut wait = first_delay;
            loop {
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        if inbox.send(trigger).is_err() {
                            break;
                        }
                        wait = period;
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self { stop, handle }
    }

    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}
