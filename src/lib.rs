//! TwinFan firmware library.
//!
//! Two-fan, temperature-driven PWM cooling controller.  Exposes the control
//! core for integration testing and for the ESP-IDF binary.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; everything else runs unchanged on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pins;
pub mod scheduler;
pub mod system;

pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;

pub use config::{ControllerConfig, FanSettings, ProbeSelection};
pub use error::{Error, Result};
pub use system::TwinFan;
