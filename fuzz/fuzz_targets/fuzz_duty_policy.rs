//! Fuzz target: `FanActuator::apply_duty_cycle`
//!
//! Interprets the input as a policy followed by a stream of
//! `(request, time step)` commands and checks the applied duty after
//! every command.
//!
//! Invariants checked:
//! - The applied duty never exceeds the scale maximum
//! - With off disallowed the fan never stops
//! - A nonzero applied duty is never below the minimum duty
//!
//! cargo fuzz run fuzz_duty_policy

#![no_main]

use core::convert::Infallible;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use libfuzzer_sys::fuzz_target;
use twinfan::control::{DutyPolicy, DutyScale, FanActuator};

struct SinkPwm;

impl ErrorType for SinkPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SinkPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }
    let (head, commands) = data.split_at(5);
    let scale = DutyScale::new(8);
    let policy = DutyPolicy {
        min_duty: u16::from(head[0]),
        off_threshold: u16::from(head[1]),
        allow_off: head[2] & 1 == 1,
        min_runtime_ms: u32::from(u16::from_le_bytes([head[3], head[4]])),
    };
    let mut fan = FanActuator::new(SinkPwm, scale, policy);

    let mut now = 0u32;
    for command in commands.chunks_exact(3) {
        let request = u16::from_le_bytes([command[0], command[1]]);
        now = now.wrapping_add(u32::from(command[2]) * 100);

        let applied = fan.apply_duty_cycle(request, now);
        assert!(applied <= scale.max_duty());
        if !policy.allow_off {
            assert!(applied >= policy.min_duty);
        }
        if applied != 0 {
            assert!(applied >= policy.min_duty);
        }
    }
});
