//! # Huebert Library
//!
//! Internal library for the huebert binary: sun-driven color temperature for
//! Philips Hue lights.
//!
//! This library exists to enable testing of the schedule engine and provide
//! clean separation between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Solar**: `geo` computes sunrise, sunset and golden-hour instants with the
//!   NOAA approximation, and resolves the location they are computed for
//! - **Engine**: `core` caches the day schedule, evaluates the target curve,
//!   tracks device power state and reconciles lights toward the target
//! - **Devices**: `device` defines the client trait and the Hue bridge adapter
//! - **Configuration**: `config` loads and validates the TOML settings
//! - **Infrastructure**: clock abstraction, signal handling, and logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod config;
pub mod constants;
pub mod core;
pub mod device;
pub mod geo;
pub mod signals;
pub mod time_source;
