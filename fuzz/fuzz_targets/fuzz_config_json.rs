//! Fuzz target: `ControllerConfig::from_json`
//!
//! Feeds arbitrary bytes to the configuration parser and checks that any
//! document it accepts also passes validation on its own, so a config that
//! loads can never trip the range checks later at assembly.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use twinfan::ControllerConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ControllerConfig::from_json(text) {
        assert!(config.validate().is_ok());
        assert_ne!(config.fans[0].pwm_channel, config.fans[1].pwm_channel);
        for fan in &config.fans {
            assert!(fan.full_speed_temp_f > fan.setpoint_f);
        }
    }
});
