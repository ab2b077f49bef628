//! ESP32 time adapter.
//!
//! Provides the wrapping 32-bit monotonic clock the control core measures
//! with.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer, truncated to 32 bits.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side simulation.
//!
//! [`SimClock`] is a manually-stepped clock for tests and simulations that
//! need to exercise rollover.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::app::ports::ClockPort;

/// Elapsed ticks between two readings of a wrapping clock.
///
/// When the clock has rolled over (`previous > now`) the elapsed value is
/// `(u32::MAX - previous) + now`.
pub fn elapsed_since(previous: u32, now: u32) -> u32 {
    if previous > now {
        (u32::MAX - previous) + now
    } else {
        now - previous
    }
}

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time reads the RTC-backed system timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn micros(&self) -> u32 {
        self.uptime_us() as u32
    }

    fn millis(&self) -> u32 {
        (self.uptime_us() / 1000) as u32
    }
}

/// Manually advanced clock.  Both counters wrap independently.
#[derive(Debug, Default)]
pub struct SimClock {
    micros: AtomicU32,
    millis: AtomicU32,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at explicit counter values (e.g. just before rollover).
    pub fn starting_at(micros: u32, millis: u32) -> Self {
        Self {
            micros: AtomicU32::new(micros),
            millis: AtomicU32::new(millis),
        }
    }

    /// Advance both counters by `ms` milliseconds, wrapping.
    pub fn advance_ms(&self, ms: u32) {
        self.millis.fetch_add(ms, Ordering::Relaxed);
        self.micros.fetch_add(ms.wrapping_mul(1000), Ordering::Relaxed);
    }

    /// Advance the microsecond counter only.
    pub fn advance_us(&self, us: u32) {
        self.micros.fetch_add(us, Ordering::Relaxed);
    }

    pub fn set_micros(&self, micros: u32) {
        self.micros.store(micros, Ordering::Relaxed);
    }

    pub fn set_millis(&self, millis: u32) {
        self.millis.store(millis, Ordering::Relaxed);
    }
}

impl ClockPort for SimClock {
    fn micros(&self) -> u32 {
        self.micros.load(Ordering::Relaxed)
    }

    fn millis(&self) -> u32 {
        self.millis.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_without_rollover_is_plain_difference() {
        assert_eq!(elapsed_since(1_000, 4_500), 3_500);
        assert_eq!(elapsed_since(7, 7), 0);
    }

    #[test]
    fn elapsed_across_rollover() {
        let previous = u32::MAX - 100;
        assert_eq!(elapsed_since(previous, 400), 500);
    }

    #[test]
    fn sim_clock_wraps() {
        let clock = SimClock::starting_at(u32::MAX - 999, u32::MAX);
        clock.advance_ms(1);
        assert_eq!(clock.micros(), 0);
        assert_eq!(clock.millis(), 0);
    }

    #[test]
    fn host_clock_is_monotonic() {
        let clock = Esp32TimeAdapter::new();
        let a = clock.micros();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(elapsed_since(a, clock.micros()) >= 2_000);
    }
}
