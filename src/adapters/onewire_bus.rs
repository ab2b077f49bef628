//! ESP32 one-wire probe bus adapter.
//!
//! Implements [`ProbeBus`] on top of the ESP-IDF RMT one-wire driver
//! (`esp_idf_hal::onewire::OWDriver`).  The driver handles slot timing;
//! this adapter only issues ROM/function commands and decodes scratchpads.
//!
//! Conversions are waited out with a task delay sized from the configured
//! resolution, so `request_conversion` blocks the poll activity (and only
//! the poll activity) for up to 750 ms.

use std::time::Duration;

use esp_idf_hal::gpio::{InputPin, OutputPin};
use esp_idf_hal::onewire::OWDriver;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::RmtChannel;
use log::{info, warn};

use crate::app::ports::ProbeBus;
use crate::error::{Error, Result};
use crate::sensors::onewire::{
    scratchpad_to_raw, ProbeAddress, Resolution, CMD_CONVERT_T, CMD_MATCH_ROM,
    CMD_READ_SCRATCHPAD, CMD_SKIP_ROM, CMD_WRITE_SCRATCHPAD, DEVICE_DISCONNECTED_RAW,
    FAMILY_DS18S20, SCRATCHPAD_LEN,
};

/// ROM codes buffered per search (more than the probe cap so foreign
/// devices on the bus cannot crowd out probes).
const SEARCH_CAPACITY: usize = 16;

pub struct EspProbeBus<'d> {
    driver: OWDriver<'d>,
    found: heapless::Vec<[u8; 8], SEARCH_CAPACITY>,
    cursor: usize,
    resolution: Resolution,
}

impl<'d> EspProbeBus<'d> {
    pub fn new<C: RmtChannel>(
        pin: impl Peripheral<P = impl InputPin + OutputPin> + 'd,
        channel: impl Peripheral<P = C> + 'd,
    ) -> Result<Self> {
        let driver = OWDriver::new(pin, channel).map_err(|e| {
            warn!("onewire: RMT driver init failed: {:?}", e);
            Error::Bus("RMT one-wire driver init failed")
        })?;
        info!("onewire: bus ready");
        Ok(Self {
            driver,
            found: heapless::Vec::new(),
            cursor: 0,
            resolution: Resolution::Bits12,
        })
    }

    fn select(&self, address: &ProbeAddress) -> bool {
        let mut frame = [0u8; 9];
        frame[0] = CMD_MATCH_ROM;
        frame[1..].copy_from_slice(&address.0);
        self.driver.reset().is_ok() && self.driver.write(&frame).is_ok()
    }

    fn read_scratchpad(&self, address: &ProbeAddress) -> Option<[u8; SCRATCHPAD_LEN]> {
        if !self.select(address) || self.driver.write(&[CMD_READ_SCRATCHPAD]).is_err() {
            return None;
        }
        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        self.driver.read(&mut scratchpad).ok()?;
        Some(scratchpad)
    }

    fn wait_for_conversion(&self) {
        std::thread::sleep(Duration::from_millis(u64::from(
            self.resolution.conversion_time_ms(),
        )));
    }
}

impl ProbeBus for EspProbeBus<'_> {
    fn reset_search(&mut self) {
        self.found.clear();
        self.cursor = 0;
        let search = match self.driver.search() {
            Ok(search) => search,
            Err(e) => {
                warn!("onewire: search failed: {:?}", e);
                return;
            }
        };
        for device in search {
            match device {
                Ok(address) => {
                    if self.found.push(address.address().to_le_bytes()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("onewire: search aborted: {:?}", e);
                    break;
                }
            }
        }
    }

    fn next_device(&mut self) -> Option<[u8; 8]> {
        let rom = self.found.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(rom)
    }

    fn set_resolution(&mut self, address: &ProbeAddress, resolution: Resolution) {
        self.resolution = resolution;
        if address.family() == FAMILY_DS18S20 {
            return;
        }
        let Some(scratchpad) = self.read_scratchpad(address) else {
            warn!("onewire: {} did not answer, resolution unchanged", address);
            return;
        };
        // Keep the alarm registers, replace the config byte.
        let frame = [
            CMD_WRITE_SCRATCHPAD,
            scratchpad[2],
            scratchpad[3],
            resolution.config_register(),
        ];
        if !self.select(address) || self.driver.write(&frame).is_err() {
            warn!("onewire: {} rejected resolution write", address);
        }
    }

    fn request_conversion(&mut self) {
        let ok = self.driver.reset().is_ok()
            && self.driver.write(&[CMD_SKIP_ROM, CMD_CONVERT_T]).is_ok();
        if !ok {
            warn!("onewire: bus-wide conversion request failed");
        }
        self.wait_for_conversion();
    }

    fn request_conversion_for(&mut self, address: &ProbeAddress) {
        if !self.select(address) || self.driver.write(&[CMD_CONVERT_T]).is_err() {
            warn!("onewire: conversion request to {} failed", address);
        }
        self.wait_for_conversion();
    }

    fn read_raw(&mut self, address: &ProbeAddress) -> i16 {
        self.read_scratchpad(address)
            .map_or(DEVICE_DISCONNECTED_RAW, |sp| scratchpad_to_raw(address.family(), &sp))
    }
}
