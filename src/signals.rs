//! Signal handling for cooperative shutdown.
//!
//! SIGINT, SIGTERM and SIGHUP all ask the daemon to stop. A background thread
//! turns them into [`SignalMessage`]s on a channel the main thread waits on.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    sync::mpsc::{self, Receiver},
    thread,
};

/// Messages produced by the signal thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    Shutdown { signal: i32 },
}

/// Receiving end of the signal thread.
pub struct SignalState {
    pub signal_receiver: Receiver<SignalMessage>,
}

impl SignalState {
    /// Block until a shutdown is requested.
    pub fn wait_for_shutdown(&self) -> Option<i32> {
        match self.signal_receiver.recv() {
            Ok(SignalMessage::Shutdown { signal }) => Some(signal),
            Err(_) => None,
        }
    }
}

pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGHUP => "SIGHUP",
        _ => "signal",
    }
}

/// Register handlers and start the signal thread.
pub fn setup_signal_handler() -> Result<SignalState> {
    let (signal_sender, signal_receiver) = mpsc::channel::<SignalMessage>();

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;

    thread::spawn(move || {
        for sig in signals.forever() {
            log_debug!("Received {}", signal_name(sig));
            if signal_sender
                .send(SignalMessage::Shutdown { signal: sig })
                .is_err()
            {
                break;
            }
        }
    });

    Ok(SignalState { signal_receiver })
}
