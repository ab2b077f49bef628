//! Sensor subsystem: tachometer pulse counting and the one-wire
//! temperature probes with their aggregating snapshot.

pub mod onewire;
pub mod tach;
pub mod temperature;

/// Compile-time capacity of the probe list.  `ControllerConfig::max_probes`
/// selects how many of these slots discovery may fill.
pub const MAX_PROBES: usize = 8;
