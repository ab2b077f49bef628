//! GPIO / peripheral pin assignments for the TwinFan controller board.
//!
//! Single source of truth for the default wiring.  The values here seed
//! [`ControllerConfig::default`](crate::config::ControllerConfig); a
//! deployed unit may override the fan bindings in its config document.

// ---------------------------------------------------------------------------
// Fan 1 (4-pin PWM fan)
// ---------------------------------------------------------------------------

/// LEDC channel driving fan 1.
pub const FAN1_PWM_CHANNEL: u8 = 0;
/// PWM output to fan 1 (blue wire).
pub const FAN1_PWM_GPIO: i32 = 16;
/// Open-collector tachometer from fan 1 (green wire), pulled up.
pub const FAN1_TACH_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// Fan 2
// ---------------------------------------------------------------------------

pub const FAN2_PWM_CHANNEL: u8 = 1;
pub const FAN2_PWM_GPIO: i32 = 18;
pub const FAN2_TACH_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Temperature probes
// ---------------------------------------------------------------------------

/// Shared one-wire bus for the DS18x20 probes (4.7 kOhm pull-up).
pub const TEMP_ONEWIRE_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u8 = 8;
/// Intel 4-wire fan spec: 25 kHz PWM carrier.
pub const FAN_PWM_FREQ_HZ: u32 = 25_000;

// ---------------------------------------------------------------------------
// Task placement
// ---------------------------------------------------------------------------

/// The core that does not run the WiFi / lwIP stacks.
pub const NON_WIFI_CORE: i32 = 1;
