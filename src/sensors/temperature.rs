//! Multi-probe temperature aggregation over a shared one-wire bus.
//!
//! The poll activity owns the [`TemperatureAggregator`] (and through it
//! the bus).  Everyone else reads through a cloneable [`TemperatureView`].
//! Each poll builds a complete [`ProbeSnapshot`] off to the side and
//! publishes it with a single swap inside a critical section, so a reader
//! always sees the per-probe readings and the maximum of the same cycle.
//!
//! Out-of-range probe indices and never-polled probes read as
//! [`NO_READING`] instead of failing.

use core::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use log::{debug, info};

use super::onewire::{raw_to_celsius, raw_to_fahrenheit, ProbeAddress, Resolution};
use super::MAX_PROBES;
use crate::app::ports::ProbeBus;
use crate::scheduler::PeriodicActivity;

/// Sentinel for "no data" in every temperature accessor.
pub const NO_READING: f32 = -999.0;

/// One complete poll cycle: every probe's raw reading plus their maximum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeSnapshot {
    raw: heapless::Vec<f32, MAX_PROBES>,
    max_raw: Option<f32>,
    /// Number of polls published so far (0 = discovery placeholder).
    cycle: u32,
}

impl ProbeSnapshot {
    fn placeholder(probe_count: usize) -> Self {
        let mut raw = heapless::Vec::new();
        for _ in 0..probe_count.min(MAX_PROBES) {
            let _ = raw.push(NO_READING);
        }
        Self { raw, max_raw: None, cycle: 0 }
    }

    pub fn probe_count(&self) -> usize {
        self.raw.len()
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn raw(&self, index: usize) -> f32 {
        self.raw.get(index).copied().unwrap_or(NO_READING)
    }

    pub fn fahrenheit(&self, index: usize) -> f32 {
        self.converted(self.raw.get(index).copied(), raw_to_fahrenheit)
    }

    pub fn celsius(&self, index: usize) -> f32 {
        self.converted(self.raw.get(index).copied(), raw_to_celsius)
    }

    pub fn max_raw(&self) -> f32 {
        self.max_raw.unwrap_or(NO_READING)
    }

    pub fn max_fahrenheit(&self) -> f32 {
        self.converted(self.max_raw, raw_to_fahrenheit)
    }

    pub fn max_celsius(&self) -> f32 {
        self.converted(self.max_raw, raw_to_celsius)
    }

    fn converted(&self, raw: Option<f32>, convert: fn(f32) -> f32) -> f32 {
        match raw {
            Some(raw) if self.cycle > 0 => convert(raw),
            _ => NO_READING,
        }
    }
}

/// Cloneable, read-only handle onto the last published snapshot.
#[derive(Clone)]
pub struct TemperatureView {
    published: Arc<CriticalSectionMutex<RefCell<ProbeSnapshot>>>,
}

impl TemperatureView {
    fn new() -> Self {
        Self {
            published: Arc::new(CriticalSectionMutex::new(RefCell::new(ProbeSnapshot::default()))),
        }
    }

    fn publish(&self, snapshot: ProbeSnapshot) {
        self.published.lock(|cell| *cell.borrow_mut() = snapshot);
    }

    /// Copy of the whole last published cycle, for multi-field consumers.
    pub fn snapshot(&self) -> ProbeSnapshot {
        self.published.lock(|cell| cell.borrow().clone())
    }

    fn read<R>(&self, f: impl FnOnce(&ProbeSnapshot) -> R) -> R {
        self.published.lock(|cell| f(&cell.borrow()))
    }

    pub fn probe_count(&self) -> usize {
        self.read(ProbeSnapshot::probe_count)
    }

    pub fn read_raw(&self, index: usize) -> f32 {
        self.read(|s| s.raw(index))
    }

    pub fn read_fahrenheit(&self, index: usize) -> f32 {
        self.read(|s| s.fahrenheit(index))
    }

    pub fn read_celsius(&self, index: usize) -> f32 {
        self.read(|s| s.celsius(index))
    }

    pub fn read_max_fahrenheit(&self) -> f32 {
        self.read(ProbeSnapshot::max_fahrenheit)
    }

    pub fn read_max_celsius(&self) -> f32 {
        self.read(ProbeSnapshot::max_celsius)
    }
}

/// Owns the probe bus and the discovered probe list; publishes readings.
pub struct TemperatureAggregator<B: ProbeBus> {
    bus: B,
    addresses: heapless::Vec<ProbeAddress, MAX_PROBES>,
    max_probes: usize,
    resolution: Resolution,
    cycle: u32,
    view: TemperatureView,
}

impl<B: ProbeBus> TemperatureAggregator<B> {
    /// `max_probes` is capped at [`MAX_PROBES`].
    pub fn new(bus: B, resolution: Resolution, max_probes: usize) -> Self {
        Self {
            bus,
            addresses: heapless::Vec::new(),
            max_probes: max_probes.min(MAX_PROBES),
            resolution,
            cycle: 0,
            view: TemperatureView::new(),
        }
    }

    /// Enumerate the bus and keep up to `max_probes` valid temperature
    /// probes in the order found.  Malformed and foreign devices are
    /// skipped.  Returns the number kept.
    pub fn discover(&mut self) -> usize {
        self.addresses.clear();
        self.bus.reset_search();

        while self.addresses.len() < self.max_probes {
            let Some(rom) = self.bus.next_device() else {
                break;
            };
            let address = ProbeAddress(rom);
            if !address.is_valid() {
                debug!("probes: skipping {} (bad CRC)", address);
                continue;
            }
            if !address.is_temperature_family() {
                debug!("probes: skipping {} (family 0x{:02X})", address, address.family());
                continue;
            }
            info!("probes: #{} at {}", self.addresses.len(), address);
            let _ = self.addresses.push(address);
        }

        for address in &self.addresses {
            self.bus.set_resolution(address, self.resolution);
        }

        info!(
            "probes: {} discovered ({}-bit)",
            self.addresses.len(),
            self.resolution.bits()
        );
        self.view.publish(ProbeSnapshot::placeholder(self.addresses.len()));
        self.addresses.len()
    }

    /// Convert on every probe, read each one, and publish the new cycle.
    pub fn poll(&mut self) {
        self.bus.request_conversion();

        let mut raw = heapless::Vec::<f32, MAX_PROBES>::new();
        for address in &self.addresses {
            let _ = raw.push(f32::from(self.bus.read_raw(address)));
        }
        let max_raw = raw.iter().copied().reduce(f32::max);

        self.cycle = self.cycle.wrapping_add(1).max(1);
        self.view.publish(ProbeSnapshot { raw, max_raw, cycle: self.cycle });
    }

    /// Convert and read a single probe immediately, bypassing the
    /// published snapshot.  Returns the raw reading or [`NO_READING`].
    pub fn read_probe_now(&mut self, index: usize) -> f32 {
        match self.addresses.get(index) {
            Some(address) => {
                self.bus.request_conversion_for(address);
                f32::from(self.bus.read_raw(address))
            }
            None => NO_READING,
        }
    }

    pub fn probe_addresses(&self) -> &[ProbeAddress] {
        &self.addresses
    }

    /// A read handle for control loops and status consumers.
    pub fn view(&self) -> TemperatureView {
        self.view.clone()
    }

    pub fn probe_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn read_raw(&self, index: usize) -> f32 {
        self.view.read_raw(index)
    }

    pub fn read_fahrenheit(&self, index: usize) -> f32 {
        self.view.read_fahrenheit(index)
    }

    pub fn read_celsius(&self, index: usize) -> f32 {
        self.view.read_celsius(index)
    }

    pub fn read_max_fahrenheit(&self) -> f32 {
        self.view.read_max_fahrenheit()
    }

    pub fn read_max_celsius(&self) -> f32 {
        self.view.read_max_celsius()
    }
}

/// Periodic driver for [`TemperatureAggregator::poll`].
pub struct ProbePollActivity<B: ProbeBus> {
    aggregator: TemperatureAggregator<B>,
    period: Duration,
}

impl<B: ProbeBus> ProbePollActivity<B> {
    pub fn new(aggregator: TemperatureAggregator<B>, period: Duration) -> Self {
        Self { aggregator, period }
    }
}

impl<B: ProbeBus + Send> PeriodicActivity for ProbePollActivity<B> {
    fn name(&self) -> &'static str {
        "probe-poll"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn step(&mut self) {
        self.aggregator.poll();
    }
}
