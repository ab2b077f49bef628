//! System configuration parameters
//!
//! All tunable parameters for the TwinFan controller.  Supplied once at
//! startup (defaults or a JSON document) and immutable for the run.

use serde::{Deserialize, Serialize};

use crate::pins;
use crate::sensors::onewire::Resolution;
use crate::sensors::MAX_PROBES;

/// Which temperature a control loop regulates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeSelection {
    /// The hottest probe on the bus at the most recent poll.
    AggregateMax,
    /// One specific probe, by discovery index.
    Probe(u8),
}

/// Per-fan closed-loop settings and hardware bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanSettings {
    // --- PID ---
    /// Target temperature (°F)
    pub setpoint_f: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,

    // --- Duty-cycle policy ---
    /// At or above this temperature (°F) the fan is forced to full speed
    pub full_speed_temp_f: f64,
    /// Lowest duty (0-100%) the fan is ever driven at while running
    pub min_duty_percent: f64,
    /// Requests at or below this duty (0-100%) turn the fan off
    pub off_duty_percent: f64,
    /// Whether the fan may be stopped completely
    pub allow_off: bool,
    /// Once started, keep the fan running at least this long (0 = no limit)
    pub min_runtime_ms: u32,

    // --- Sensor ---
    pub probe: ProbeSelection,

    // --- Hardware binding ---
    pub pwm_channel: u8,
    pub pwm_gpio: i32,
    pub tach_gpio: i32,
}

impl FanSettings {
    fn with_binding(probe: ProbeSelection, pwm_channel: u8, pwm_gpio: i32, tach_gpio: i32) -> Self {
        Self {
            setpoint_f: 85.0,
            kp: 2.0,
            ki: 5.0,
            kd: 1.0,
            full_speed_temp_f: 95.0,
            min_duty_percent: 30.0,
            off_duty_percent: 0.0,
            allow_off: false,
            min_runtime_ms: 0,
            probe,
            pwm_channel,
            pwm_gpio,
            tach_gpio,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let percent = 0.0..=100.0;
        if !percent.contains(&self.min_duty_percent) {
            return Err(ConfigError::ValidationFailed("min_duty_percent outside 0-100"));
        }
        if !percent.contains(&self.off_duty_percent) {
            return Err(ConfigError::ValidationFailed("off_duty_percent outside 0-100"));
        }
        if ![self.setpoint_f, self.kp, self.ki, self.kd, self.full_speed_temp_f]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ConfigError::ValidationFailed("non-finite PID setting"));
        }
        if self.kp < 0.0 || self.ki < 0.0 || self.kd < 0.0 {
            return Err(ConfigError::ValidationFailed("PID gains must be non-negative"));
        }
        if self.full_speed_temp_f <= self.setpoint_f {
            return Err(ConfigError::ValidationFailed(
                "full_speed_temp_f must be above setpoint_f",
            ));
        }
        if let ProbeSelection::Probe(index) = self.probe {
            if index as usize >= MAX_PROBES {
                return Err(ConfigError::ValidationFailed("probe index beyond bus capacity"));
            }
        }
        Ok(())
    }
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub fans: [FanSettings; 2],

    // --- Probes ---
    pub probe_resolution: Resolution,
    /// Probes kept at discovery, in bus order
    pub max_probes: u8,

    // --- PWM ---
    pub pwm_frequency_hz: u32,
    pub pwm_resolution_bits: u8,

    // --- Timing ---
    /// Probe poll interval (milliseconds)
    pub temp_poll_interval_ms: u32,
    /// Per-fan control loop interval (milliseconds)
    pub control_interval_ms: u32,
    /// Diagnostics log interval (milliseconds)
    pub diagnostics_interval_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fans: [
                FanSettings::with_binding(
                    ProbeSelection::AggregateMax,
                    pins::FAN1_PWM_CHANNEL,
                    pins::FAN1_PWM_GPIO,
                    pins::FAN1_TACH_GPIO,
                ),
                FanSettings::with_binding(
                    ProbeSelection::Probe(1),
                    pins::FAN2_PWM_CHANNEL,
                    pins::FAN2_PWM_GPIO,
                    pins::FAN2_TACH_GPIO,
                ),
            ],

            probe_resolution: Resolution::Bits12,
            max_probes: 4,

            pwm_frequency_hz: pins::FAN_PWM_FREQ_HZ,
            pwm_resolution_bits: pins::PWM_RESOLUTION_BITS,

            temp_poll_interval_ms: 250,  // 4 Hz
            control_interval_ms: 100,    // 10 Hz
            diagnostics_interval_ms: 1000,
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values instead of clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for fan in &self.fans {
            fan.validate()?;
        }
        if self.max_probes == 0 || self.max_probes as usize > MAX_PROBES {
            return Err(ConfigError::ValidationFailed("max_probes outside 1..=8"));
        }
        if !(1..=16).contains(&self.pwm_resolution_bits) {
            return Err(ConfigError::ValidationFailed("pwm_resolution_bits outside 1..=16"));
        }
        if self.pwm_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("pwm_frequency_hz must be non-zero"));
        }
        if self.temp_poll_interval_ms == 0
            || self.control_interval_ms == 0
            || self.diagnostics_interval_ms == 0
        {
            return Err(ConfigError::ValidationFailed("intervals must be non-zero"));
        }
        if self.fans[0].pwm_channel == self.fans[1].pwm_channel {
            return Err(ConfigError::ValidationFailed("fans share a PWM channel"));
        }
        Ok(())
    }
}

/// Errors from accepting a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for [`ControllerConfig`].
    Malformed,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Malformed => Self::Config("malformed config document"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}
