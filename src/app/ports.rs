//! Port traits: the boundary between the control core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ control core (sensors, control)
//! ```
//!
//! Driven adapters (clock, probe bus, tachometer edge source) implement
//! these traits.  The core consumes them via generics, so it never touches
//! a peripheral register directly and runs unchanged on the host.
//! PWM outputs use `embedded_hal::pwm::SetDutyCycle` directly.

use std::sync::Arc;

use crate::error::Result;
use crate::sensors::onewire::{ProbeAddress, Resolution};
use crate::sensors::tach::PulseCounter;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Free-running monotonic clock.  Both readings are 32-bit and wrap;
/// consumers must use [`elapsed_since`](crate::adapters::time::elapsed_since).
pub trait ClockPort {
    /// Microseconds since boot, wrapping at `u32::MAX`.
    fn micros(&self) -> u32;

    /// Milliseconds since boot, wrapping at `u32::MAX`.
    fn millis(&self) -> u32;
}

impl<T: ClockPort + ?Sized> ClockPort for Arc<T> {
    fn micros(&self) -> u32 {
        (**self).micros()
    }

    fn millis(&self) -> u32 {
        (**self).millis()
    }
}

// ───────────────────────────────────────────────────────────────
// Probe bus port (one-wire, logical contract)
// ───────────────────────────────────────────────────────────────

/// Logical view of a shared one-wire bus carrying DS18x20 probes.
///
/// Raw readings are in 1/128 °C units.  A probe that cannot be read is
/// reported as [`DEVICE_DISCONNECTED_RAW`](crate::sensors::onewire::DEVICE_DISCONNECTED_RAW).
pub trait ProbeBus {
    /// Restart device enumeration from the beginning of the bus.
    fn reset_search(&mut self);

    /// Next ROM code on the bus, or `None` once the search is exhausted.
    /// Returned codes are unvalidated.
    fn next_device(&mut self) -> Option<[u8; 8]>;

    /// Program the conversion resolution of one probe.
    fn set_resolution(&mut self, address: &ProbeAddress, resolution: Resolution);

    /// Start a conversion on every probe and wait until it completes.
    fn request_conversion(&mut self);

    /// Start a conversion on one probe and wait until it completes.
    fn request_conversion_for(&mut self, address: &ProbeAddress);

    /// Read the latest converted value of one probe.
    fn read_raw(&mut self, address: &ProbeAddress) -> i16;
}

// ───────────────────────────────────────────────────────────────
// Edge source port (tachometer interrupt registration)
// ───────────────────────────────────────────────────────────────

/// A capability that delivers tachometer falling edges to a counter.
///
/// The implementation decides how edges are produced (GPIO interrupt on
/// hardware, injected pulses in simulation); the counter only ever sees
/// [`PulseCounter::record_edge`] calls from the producer side.
pub trait EdgeSource {
    /// Route every future edge to `counter`.  Called once at startup.
    fn subscribe(&mut self, counter: Arc<PulseCounter>) -> Result<()>;
}
