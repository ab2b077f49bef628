//! LEDC-backed fan PWM output.
//!
//! Exposes one configured LEDC channel as an `embedded_hal::pwm::SetDutyCycle`
//! so the fan actuator never touches LEDC directly.  The last written duty
//! is mirrored in an atomic for diagnostics and host tests.

use core::sync::atomic::{AtomicU16, Ordering};

use embedded_hal::pwm::{ErrorType, SetDutyCycle};

use super::hw_init;
use crate::error::PwmError;

pub struct LedcFanPwm {
    channel: u8,
    max_duty: u16,
    duty: AtomicU16,
}

impl LedcFanPwm {
    /// The channel must already be configured by
    /// [`hw_init::init_fan_pwm`] at `resolution_bits`.
    pub fn new(channel: u8, resolution_bits: u8) -> Self {
        let bits = u32::from(resolution_bits.clamp(1, 16));
        Self {
            channel,
            max_duty: ((1u32 << bits) - 1) as u16,
            duty: AtomicU16::new(0),
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Duty most recently accepted by the hardware.
    pub fn current_duty(&self) -> u16 {
        self.duty.load(Ordering::Relaxed)
    }
}

impl ErrorType for LedcFanPwm {
    type Error = PwmError;
}

impl SetDutyCycle for LedcFanPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let duty = duty.min(self.max_duty);
        hw_init::ledc_set(self.channel, u32::from(duty))?;
        self.duty.store(duty, Ordering::Relaxed);
        Ok(())
    }
}
