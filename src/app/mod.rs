//! Application boundary: the port traits the control core is written
//! against, and the read-only status document external consumers render.
//!
//! Hardware only enters through [`ports`]; [`status`] only leaves through
//! the published fan and temperature snapshots, so neither can drive the
//! core.

pub mod ports;
pub mod status;
