//! Fuzz target: `scratchpad_to_raw`
//!
//! Decodes arbitrary 9-byte scratchpads for every supported family.
//!
//! Invariants checked:
//! - No panics (DS18S20 divides by COUNT_PER_C)
//! - A scratchpad whose CRC byte is wrong always decodes as disconnected
//!
//! cargo fuzz run fuzz_scratchpad

#![no_main]

use libfuzzer_sys::fuzz_target;
use twinfan::sensors::onewire::{
    crc8, scratchpad_to_raw, DEVICE_DISCONNECTED_RAW, FAMILY_DS1822, FAMILY_DS18B20,
    FAMILY_DS18S20, SCRATCHPAD_LEN,
};

fuzz_target!(|data: &[u8]| {
    let Ok(scratchpad) = <[u8; SCRATCHPAD_LEN]>::try_from(data) else {
        return;
    };
    let crc_ok = crc8(&scratchpad[..8]) == scratchpad[8];

    for family in [FAMILY_DS18S20, FAMILY_DS1822, FAMILY_DS18B20] {
        let raw = scratchpad_to_raw(family, &scratchpad);
        if !crc_ok {
            assert_eq!(raw, DEVICE_DISCONNECTED_RAW);
        }
    }
});
