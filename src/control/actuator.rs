//! Fan actuator: turns a requested duty cycle into the duty actually
//! applied to the PWM output.
//!
//! Resolution order for [`FanActuator::apply_duty_cycle`]:
//!
//! ```text
//!   requested ──▶ record as last requested
//!             ──▶ <= off threshold ? 0 : max(requested, min duty)
//!             ──▶ 0 and off not allowed        ? min duty
//!             ──▶ 0 and inside minimum runtime ? min duty
//!             ──▶ 0 -> nonzero                 ? stamp run start
//!             ──▶ write PWM, record as last applied
//! ```
//!
//! [`FanActuator::set_full_speed`] skips the three middle rules.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::adapters::time::elapsed_since;
use crate::config::FanSettings;

/// N-bit duty-cycle domain (`0 ..= 2^N - 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyScale {
    bits: u8,
}

impl DutyScale {
    /// `bits` is clamped to 1..=16.
    pub const fn new(bits: u8) -> Self {
        let bits = if bits == 0 {
            1
        } else if bits > 16 {
            16
        } else {
            bits
        };
        Self { bits }
    }

    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Largest representable duty, `2^N - 1`.
    pub const fn max_duty(self) -> u16 {
        ((1u32 << self.bits) - 1) as u16
    }

    /// `round(p / 100 * 2^N)` with `p` clamped to 0..=100, capped at
    /// `2^N - 1` (100 % would otherwise round to `2^N`).
    pub fn percent_to_duty(self, percent: f64) -> u16 {
        let p = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let duty = (p / 100.0 * f64::from(1u32 << self.bits)).round() as u32;
        duty.min(u32::from(self.max_duty())) as u16
    }

    pub fn duty_to_percent(self, duty: u16) -> f64 {
        f64::from(duty) / f64::from(self.max_duty()) * 100.0
    }
}

impl Default for DutyScale {
    fn default() -> Self {
        Self::new(crate::pins::PWM_RESOLUTION_BITS)
    }
}

/// Off/minimum/runtime constraints, in the duty domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyPolicy {
    pub min_duty: u16,
    pub off_threshold: u16,
    pub allow_off: bool,
    /// 0 disables the minimum-runtime rule.
    pub min_runtime_ms: u32,
}

impl DutyPolicy {
    pub fn from_settings(settings: &FanSettings, scale: DutyScale) -> Self {
        Self {
            min_duty: scale.percent_to_duty(settings.min_duty_percent),
            off_threshold: scale.percent_to_duty(settings.off_duty_percent),
            allow_off: settings.allow_off,
            min_runtime_ms: settings.min_runtime_ms,
        }
    }
}

impl Default for DutyPolicy {
    fn default() -> Self {
        Self {
            min_duty: 0,
            off_threshold: 0,
            allow_off: true,
            min_runtime_ms: 0,
        }
    }
}

/// Duty-cycle policy in front of one PWM output.
pub struct FanActuator<P: SetDutyCycle> {
    pwm: P,
    scale: DutyScale,
    policy: DutyPolicy,
    last_applied: u16,
    last_requested: u16,
    /// Millisecond timestamp of the most recent 0 -> nonzero transition.
    run_started_ms: Option<u32>,
}

impl<P: SetDutyCycle> FanActuator<P> {
    pub fn new(pwm: P, scale: DutyScale, policy: DutyPolicy) -> Self {
        Self {
            pwm,
            scale,
            policy,
            last_applied: 0,
            last_requested: 0,
            run_started_ms: None,
        }
    }

    /// Resolve `requested` against the policy and drive the output.
    /// Returns the applied duty.
    ///
    /// A request above the scale maximum is recorded as the maximum.
    pub fn apply_duty_cycle(&mut self, requested: u16, now_ms: u32) -> u16 {
        let requested = requested.min(self.scale.max_duty());
        self.last_requested = requested;

        let mut duty = if requested <= self.policy.off_threshold {
            0
        } else {
            requested.max(self.policy.min_duty)
        };

        if duty == 0 && !self.policy.allow_off {
            duty = self.policy.min_duty;
        }

        if duty == 0 && self.inside_min_runtime(now_ms) {
            duty = self.policy.min_duty;
        }

        self.commit(duty, now_ms);
        duty
    }

    /// Maximum duty, bypassing the off and runtime rules.
    pub fn set_full_speed(&mut self, now_ms: u32) -> u16 {
        let max = self.scale.max_duty();
        self.last_requested = max;
        self.commit(max, now_ms);
        max
    }

    pub fn set_duty_cycle_percent(&mut self, percent: f64, now_ms: u32) -> u16 {
        self.apply_duty_cycle(self.scale.percent_to_duty(percent), now_ms)
    }

    /// Only a running fan is held; a stopped fan's old run start must not
    /// come back into range when the millisecond clock wraps.
    fn inside_min_runtime(&self, now_ms: u32) -> bool {
        match self.run_started_ms {
            Some(start) if self.last_applied > 0 && self.policy.min_runtime_ms > 0 => {
                elapsed_since(start, now_ms) < self.policy.min_runtime_ms
            }
            _ => false,
        }
    }

    fn commit(&mut self, duty: u16, now_ms: u32) {
        if self.last_applied == 0 && duty > 0 {
            self.run_started_ms = Some(now_ms);
        }
        self.write_pwm(duty);
        self.last_applied = duty;
    }

    fn write_pwm(&mut self, duty: u16) {
        let hw_max = u32::from(self.pwm.max_duty_cycle());
        let domain_max = u32::from(self.scale.max_duty());
        let hw_duty = if hw_max == domain_max {
            duty
        } else {
            (u32::from(duty) * hw_max / domain_max) as u16
        };
        if let Err(e) = self.pwm.set_duty_cycle(hw_duty) {
            warn!("fan: PWM rejected duty {}: {:?}", hw_duty, e);
        }
    }

    // --- Telemetry ---

    pub fn last_duty_cycle(&self) -> u16 {
        self.last_applied
    }

    pub fn last_requested_duty_cycle(&self) -> u16 {
        self.last_requested
    }

    pub fn last_duty_cycle_percent(&self) -> f64 {
        self.scale.duty_to_percent(self.last_applied)
    }

    pub fn last_requested_duty_cycle_percent(&self) -> f64 {
        self.scale.duty_to_percent(self.last_requested)
    }

    /// Start of the current (or most recent) run, if the fan ever ran.
    pub fn run_started_ms(&self) -> Option<u32> {
        self.run_started_ms
    }

    pub fn scale(&self) -> DutyScale {
        self.scale
    }

    pub fn policy(&self) -> DutyPolicy {
        self.policy
    }

    // --- Runtime policy setters (take effect on the next request) ---

    pub fn set_min_duty(&mut self, duty: u16) {
        self.policy.min_duty = duty.min(self.scale.max_duty());
    }

    pub fn set_min_duty_percent(&mut self, percent: f64) {
        self.policy.min_duty = self.scale.percent_to_duty(percent);
    }

    pub fn set_off_threshold(&mut self, duty: u16) {
        self.policy.off_threshold = duty.min(self.scale.max_duty());
    }

    pub fn set_off_threshold_percent(&mut self, percent: f64) {
        self.policy.off_threshold = self.scale.percent_to_duty(percent);
    }

    pub fn set_allow_off(&mut self, allow: bool) {
        self.policy.allow_off = allow;
    }

    pub fn set_min_runtime_ms(&mut self, ms: u32) {
        self.policy.min_runtime_ms = ms;
    }
}
