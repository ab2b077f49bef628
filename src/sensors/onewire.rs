//! DS18x20 one-wire probe addressing and raw-reading conversions.
//!
//! Only the logical contract is modelled here: 64-bit ROM codes, family
//! and CRC validation, resolution selection, and the 1/128 °C raw unit the
//! bus adapters report in.  Bit timing lives in the bus adapter.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Raw value a bus adapter reports for a probe that did not answer
/// (-55 °C, the DS18B20 power-on minimum, in 1/128 °C units).
pub const DEVICE_DISCONNECTED_RAW: i16 = -7040;

/// Degrees Celsius per raw unit.
const CELSIUS_PER_RAW: f32 = 0.007_812_5;
/// Degrees Fahrenheit per raw unit.
const FAHRENHEIT_PER_RAW: f32 = 0.014_062_5;

/// Family codes of the supported temperature probes.
pub const FAMILY_DS18S20: u8 = 0x10;
pub const FAMILY_DS1822: u8 = 0x22;
pub const FAMILY_DS18B20: u8 = 0x28;
pub const FAMILY_DS1825: u8 = 0x3B;
pub const FAMILY_DS28EA00: u8 = 0x42;

/// Conversion resolution.  Higher resolution means a longer conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl Resolution {
    pub fn bits(self) -> u8 {
        match self {
            Self::Bits9 => 9,
            Self::Bits10 => 10,
            Self::Bits11 => 11,
            Self::Bits12 => 12,
        }
    }

    /// Worst-case conversion time from the DS18B20 datasheet.
    pub fn conversion_time_ms(self) -> u32 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }

    /// Configuration register value (R1:R0 in bits 6:5).
    pub fn config_register(self) -> u8 {
        ((self.bits() - 9) << 5) | 0x1F
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// 64-bit ROM code: family byte, 48-bit serial, CRC byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeAddress(pub [u8; 8]);

impl ProbeAddress {
    /// Build a ROM code with a correct CRC byte.
    pub fn with_crc(family: u8, serial: [u8; 6]) -> Self {
        let mut rom = [0u8; 8];
        rom[0] = family;
        rom[1..7].copy_from_slice(&serial);
        rom[7] = crc8(&rom[..7]);
        Self(rom)
    }

    pub fn family(&self) -> u8 {
        self.0[0]
    }

    /// Bus-level identity check: the trailing byte is the CRC of the rest.
    pub fn is_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }

    /// Whether the family code is a supported temperature probe.
    pub fn is_temperature_family(&self) -> bool {
        matches!(
            self.family(),
            FAMILY_DS18S20 | FAMILY_DS1822 | FAMILY_DS18B20 | FAMILY_DS1825 | FAMILY_DS28EA00
        )
    }

    /// Little-endian 64-bit form used by the ESP-IDF one-wire driver.
    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }
}

impl fmt::Display for ProbeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

pub fn raw_to_celsius(raw: f32) -> f32 {
    raw * CELSIUS_PER_RAW
}

pub fn raw_to_fahrenheit(raw: f32) -> f32 {
    raw * FAHRENHEIT_PER_RAW + 32.0
}

pub fn celsius_to_raw(celsius: f32) -> i16 {
    (celsius / CELSIUS_PER_RAW).round() as i16
}

pub fn fahrenheit_to_raw(fahrenheit: f32) -> i16 {
    ((fahrenheit - 32.0) / FAHRENHEIT_PER_RAW).round() as i16
}

/// ROM command: address one device by its 64-bit code.
pub const CMD_MATCH_ROM: u8 = 0x55;
/// ROM command: address every device at once.
pub const CMD_SKIP_ROM: u8 = 0xCC;
/// Function command: start a temperature conversion.
pub const CMD_CONVERT_T: u8 = 0x44;
/// Function command: read the 9-byte scratchpad.
pub const CMD_READ_SCRATCHPAD: u8 = 0xBE;
/// Function command: write TH, TL and (DS18B20 family) the config byte.
pub const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;

pub const SCRATCHPAD_LEN: usize = 9;

/// Decode a scratchpad into the 1/128 °C raw unit.
///
/// A scratchpad that fails its CRC, or reads back all zeros (nobody
/// answered), decodes as [`DEVICE_DISCONNECTED_RAW`].
pub fn scratchpad_to_raw(family: u8, scratchpad: &[u8; SCRATCHPAD_LEN]) -> i16 {
    if scratchpad.iter().all(|&b| b == 0) || crc8(&scratchpad[..8]) != scratchpad[8] {
        return DEVICE_DISCONNECTED_RAW;
    }
    // 1/16 °C register shifted up to 1/128 °C.
    let mut raw = i32::from(i16::from_le_bytes([scratchpad[0], scratchpad[1]])) << 3;

    if family == FAMILY_DS18S20 {
        // 0.5 °C register, extended with COUNT_REMAIN / COUNT_PER_C.
        let count_per_c = i32::from(scratchpad[7]);
        let count_remain = i32::from(scratchpad[6]);
        if count_per_c != 0 {
            raw = ((raw & !0x0F) << 3) - 32 + (((count_per_c - count_remain) << 7) / count_per_c);
        }
    }
    raw.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

// ═══════════════════════════════════════════════════════════════
//  Host simulation bus
// ═══════════════════════════════════════════════════════════════

#[cfg(not(target_os = "espidf"))]
pub use sim::SimProbeBus;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::sync::{Arc, Mutex, PoisonError};

    use super::{ProbeAddress, Resolution, DEVICE_DISCONNECTED_RAW};
    use crate::app::ports::ProbeBus;

    #[derive(Debug)]
    struct SimDevice {
        rom: [u8; 8],
        raw: i16,
        resolution: Option<Resolution>,
    }

    #[derive(Debug, Default)]
    struct SimBusState {
        devices: Vec<SimDevice>,
        cursor: usize,
        /// Reading sets applied in turn, one per bus-wide conversion.
        script: Vec<Vec<i16>>,
        script_pos: usize,
        conversions: u32,
    }

    /// Scripted in-memory bus.  Clones share state so a test can keep a
    /// handle after the aggregator takes ownership.
    #[derive(Debug, Clone, Default)]
    pub struct SimProbeBus {
        state: Arc<Mutex<SimBusState>>,
    }

    impl SimProbeBus {
        pub fn new() -> Self {
            Self::default()
        }

        fn with<R>(&self, f: impl FnOnce(&mut SimBusState) -> R) -> R {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        }

        /// Attach a device with an arbitrary (possibly invalid) ROM code.
        pub fn attach_rom(&self, rom: [u8; 8], raw: i16) {
            self.with(|s| s.devices.push(SimDevice { rom, raw, resolution: None }));
        }

        /// Attach a well-formed DS18B20 whose serial ends in `serial`.
        pub fn attach_ds18b20(&self, serial: u8, raw: i16) -> ProbeAddress {
            let address = ProbeAddress::with_crc(super::FAMILY_DS18B20, [serial, 0, 0, 0, 0, 0]);
            self.attach_rom(address.0, raw);
            address
        }

        /// Change the value the next conversion of device `index` reads.
        pub fn set_raw(&self, index: usize, raw: i16) {
            self.with(|s| {
                if let Some(device) = s.devices.get_mut(index) {
                    device.raw = raw;
                }
            });
        }

        /// Cycle through whole reading sets, one per bus-wide conversion.
        pub fn script(&self, sets: Vec<Vec<i16>>) {
            self.with(|s| {
                s.script = sets;
                s.script_pos = 0;
            });
        }

        pub fn conversions(&self) -> u32 {
            self.with(|s| s.conversions)
        }

        pub fn resolution_of(&self, address: &ProbeAddress) -> Option<Resolution> {
            self.with(|s| {
                s.devices
                    .iter()
                    .find(|d| d.rom == address.0)
                    .and_then(|d| d.resolution)
            })
        }
    }

    impl ProbeBus for SimProbeBus {
        fn reset_search(&mut self) {
            self.with(|s| s.cursor = 0);
        }

        fn next_device(&mut self) -> Option<[u8; 8]> {
            self.with(|s| {
                let rom = s.devices.get(s.cursor).map(|d| d.rom);
                if rom.is_some() {
                    s.cursor += 1;
                }
                rom
            })
        }

        fn set_resolution(&mut self, address: &ProbeAddress, resolution: Resolution) {
            self.with(|s| {
                if let Some(device) = s.devices.iter_mut().find(|d| d.rom == address.0) {
                    device.resolution = Some(resolution);
                }
            });
        }

        fn request_conversion(&mut self) {
            self.with(|s| {
                s.conversions += 1;
                if s.script.is_empty() {
                    return;
                }
                let set = s.script[s.script_pos % s.script.len()].clone();
                s.script_pos += 1;
                for (device, raw) in s.devices.iter_mut().zip(set) {
                    device.raw = raw;
                }
            });
        }

        fn request_conversion_for(&mut self, _address: &ProbeAddress) {
            self.with(|s| s.conversions += 1);
        }

        fn read_raw(&mut self, address: &ProbeAddress) -> i16 {
            self.with(|s| {
                s.devices
                    .iter()
                    .find(|d| d.rom == address.0)
                    .map_or(DEVICE_DISCONNECTED_RAW, |d| d.raw)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_maxim_reference_rom() {
        // Maxim application note 27 worked example.
        let rom = ProbeAddress([0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0x00, 0xA2]);
        assert!(rom.is_valid());
    }

    #[test]
    fn corrupted_rom_fails_crc() {
        let rom = ProbeAddress([0x28, 0xFF, 0x4B, 0x8C, 0x51, 0x16, 0x04, 0xED]);
        assert!(rom.is_valid());
        let mut bad = rom;
        bad.0[3] ^= 0x01;
        assert!(!bad.is_valid());
    }

    #[test]
    fn family_filter() {
        let ds18b20 = ProbeAddress::with_crc(FAMILY_DS18B20, [1, 2, 3, 4, 5, 6]);
        let eeprom = ProbeAddress::with_crc(0x2D, [1, 2, 3, 4, 5, 6]);
        assert!(ds18b20.is_temperature_family());
        assert!(!eeprom.is_temperature_family());
        assert!(eeprom.is_valid());
    }

    #[test]
    fn address_display_is_colon_hex() {
        let rom = ProbeAddress([0x28, 0xFF, 0x4B, 0x8C, 0x51, 0x16, 0x04, 0xED]);
        assert_eq!(rom.to_string(), "28:FF:4B:8C:51:16:04:ED");
    }

    #[test]
    fn raw_conversions() {
        // 25.0625 °C is 3208 raw
        assert!((raw_to_celsius(3208.0) - 25.0625).abs() < 1e-4);
        assert!((raw_to_fahrenheit(0.0) - 32.0).abs() < 1e-6);
        assert!((raw_to_fahrenheit(f32::from(celsius_to_raw(100.0))) - 212.0).abs() < 1e-3);
        let raw = fahrenheit_to_raw(85.5);
        assert!((raw_to_fahrenheit(f32::from(raw)) - 85.5).abs() < 0.01);
    }

    fn scratchpad(temp: [u8; 2], tail: [u8; 6]) -> [u8; SCRATCHPAD_LEN] {
        let mut sp = [0u8; SCRATCHPAD_LEN];
        sp[..2].copy_from_slice(&temp);
        sp[2..8].copy_from_slice(&tail);
        sp[8] = crc8(&sp[..8]);
        sp
    }

    #[test]
    fn ds18b20_scratchpad_decodes_to_raw() {
        // 0x0191 = 25.0625 °C in 1/16 °C
        let sp = scratchpad([0x91, 0x01], [0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10]);
        assert_eq!(scratchpad_to_raw(FAMILY_DS18B20, &sp), 3208);
        // 0xFF5E = -10.125 °C
        let sp = scratchpad([0x5E, 0xFF], [0x4B, 0x46, 0x7F, 0xFF, 0x02, 0x10]);
        assert!((raw_to_celsius(f32::from(scratchpad_to_raw(FAMILY_DS18B20, &sp))) + 10.125).abs() < 1e-4);
    }

    #[test]
    fn ds18s20_uses_count_remain() {
        // 0x0032 = 25.0 °C in 0.5 °C steps, COUNT_REMAIN 12 of 16
        let sp = scratchpad([0x32, 0x00], [0x4B, 0x46, 0xFF, 0xFF, 0x0C, 0x10]);
        let c = raw_to_celsius(f32::from(scratchpad_to_raw(FAMILY_DS18S20, &sp)));
        assert!((c - 25.0).abs() < 1e-4);
    }

    #[test]
    fn bad_scratchpad_reads_disconnected() {
        assert_eq!(scratchpad_to_raw(FAMILY_DS18B20, &[0; SCRATCHPAD_LEN]), DEVICE_DISCONNECTED_RAW);
        let mut sp = scratchpad([0x91, 0x01], [0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10]);
        sp[0] ^= 0x01;
        assert_eq!(scratchpad_to_raw(FAMILY_DS18B20, &sp), DEVICE_DISCONNECTED_RAW);
    }

    #[test]
    fn resolution_register_and_timing() {
        assert_eq!(Resolution::Bits9.config_register(), 0x1F);
        assert_eq!(Resolution::Bits12.config_register(), 0x7F);
        assert!(Resolution::Bits12.conversion_time_ms() > Resolution::Bits9.conversion_time_ms());
    }
}
