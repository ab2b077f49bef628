//! Fan tachometer pulse counter.
//!
//! A 4-pin PC fan pulls its open-collector tach line low twice per
//! mechanical revolution.  The GPIO ISR calls [`PulseCounter::record_edge`]
//! on each falling edge; the consumer periodically calls
//! [`PulseCounter::read_and_reset`] and turns the window into RPM.
//!
//! The ISR side is a single relaxed `fetch_add` and never blocks.  The
//! consumer side swaps the count and stamps the window start inside one
//! short critical section, so two consumers can never split a window.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;

use crate::adapters::time::elapsed_since;

/// Tachometer edges per mechanical revolution.
pub const EDGES_PER_REVOLUTION: u32 = 2;

/// One measurement window taken from the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseWindow {
    /// Edges counted since the previous read.
    pub edges: u32,
    /// Microseconds since the previous read (rollover-corrected).
    pub elapsed_us: u32,
}

impl PulseWindow {
    /// Fan speed over this window.  No edges or no elapsed time reads as
    /// 0 RPM ("no signal yet"), never as a fault.
    pub fn rpm(&self) -> u32 {
        if self.edges == 0 || self.elapsed_us == 0 {
            return 0;
        }
        let revolutions = f64::from(self.edges) / f64::from(EDGES_PER_REVOLUTION);
        let seconds = f64::from(self.elapsed_us) / 1_000_000.0;
        (revolutions / seconds * 60.0).round() as u32
    }
}

/// Interrupt-safe edge counter for one fan.
pub struct PulseCounter {
    edges: AtomicU32,
    /// Start of the current window; `None` until the first read.
    window_start_us: Mutex<Cell<Option<u32>>>,
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            edges: AtomicU32::new(0),
            window_start_us: Mutex::new(Cell::new(None)),
        }
    }

    /// Called from the GPIO ISR on each falling edge.
    /// Lock-free and allocation-free.
    #[inline]
    pub fn record_edge(&self) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically take the edge count and restart the window at `now_us`.
    ///
    /// The very first call has no window start to measure from, so it
    /// reports zero elapsed time (and the caller reads 0 RPM).
    pub fn read_and_reset(&self, now_us: u32) -> PulseWindow {
        critical_section::with(|cs| {
            let start = self.window_start_us.borrow(cs);
            let edges = self.edges.swap(0, Ordering::Relaxed);
            let elapsed_us = start.get().map_or(0, |prev| elapsed_since(prev, now_us));
            start.set(Some(now_us));
            PulseWindow { edges, elapsed_us }
        })
    }

    /// Edges counted so far in the current window, without resetting.
    pub fn pending_edges(&self) -> u32 {
        self.edges.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_edges_in_one_second_is_600_rpm() {
        let counter = PulseCounter::new();
        counter.read_and_reset(0);
        for _ in 0..20 {
            counter.record_edge();
        }
        let window = counter.read_and_reset(1_000_000);
        assert_eq!(window, PulseWindow { edges: 20, elapsed_us: 1_000_000 });
        assert_eq!(window.rpm(), 600);
    }

    #[test]
    fn first_read_reports_no_signal() {
        let counter = PulseCounter::new();
        counter.record_edge();
        let window = counter.read_and_reset(5_000);
        assert_eq!(window.elapsed_us, 0);
        assert_eq!(window.rpm(), 0);
    }

    #[test]
    fn read_resets_the_count() {
        let counter = PulseCounter::new();
        counter.read_and_reset(0);
        counter.record_edge();
        counter.record_edge();
        assert_eq!(counter.pending_edges(), 2);
        counter.read_and_reset(100);
        assert_eq!(counter.pending_edges(), 0);
        let window = counter.read_and_reset(200);
        assert_eq!(window.edges, 0);
        assert_eq!(window.rpm(), 0);
    }

    #[test]
    fn rollover_uses_wrapping_elapsed() {
        let counter = PulseCounter::new();
        let previous = u32::MAX - 250_000;
        counter.read_and_reset(previous);
        for _ in 0..10 {
            counter.record_edge();
        }
        let window = counter.read_and_reset(250_000);
        assert_eq!(window.elapsed_us, (u32::MAX - previous) + 250_000);
        assert_eq!(window.elapsed_us, 500_000);
        // 5 revolutions in 0.5 s
        assert_eq!(window.rpm(), 600);
    }

    #[test]
    fn rpm_rounds_to_nearest() {
        // 3 edges = 1.5 rev in 0.7 s => 128.571... rpm
        let window = PulseWindow { edges: 3, elapsed_us: 700_000 };
        assert_eq!(window.rpm(), 129);
    }

    #[test]
    fn concurrent_edges_are_never_lost() {
        use std::sync::Arc;

        let counter = Arc::new(PulseCounter::new());
        counter.read_and_reset(0);
        let producer = {
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.record_edge();
                }
            })
        };
        let mut total = 0;
        for t in 1..50 {
            total += counter.read_and_reset(t * 1000).edges;
        }
        producer.join().unwrap();
        total += counter.read_and_reset(1_000_000).edges;
        assert_eq!(total, 10_000);
    }
}
