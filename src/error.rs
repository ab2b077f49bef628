//! Unified error types for the TwinFan firmware.
//!
//! The control core itself is total: out-of-range lookups return sentinels
//! and missing tachometer signal reads as 0 RPM.  Errors only exist at the
//! edges, where hardware is bound at startup or a configuration document is
//! accepted.  All variants are `Copy` so they can be passed around without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible startup operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed.
    Init(InitError),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
    /// A PWM duty-cycle write was rejected by the output driver.
    Pwm(PwmError),
    /// The temperature probe bus could not be driven.
    Bus(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Pwm(e) => write!(f, "pwm: {e}"),
            Self::Bus(msg) => write!(f, "probe bus: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Peripheral initialisation errors
// ---------------------------------------------------------------------------

/// Errors during one-shot peripheral binding.  The `i32` payload is the raw
/// ESP-IDF return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
    /// The pin is already bound to another edge subscriber.
    EdgeSourceInUse,
    ThreadSpawnFailed,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LedcTimerFailed(rc) => write!(f, "LEDC timer config failed (rc={rc})"),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={rc})"),
            Self::EdgeSourceInUse => write!(f, "edge source already subscribed"),
            Self::ThreadSpawnFailed => write!(f, "task spawn failed"),
        }
    }
}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// PWM errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// `ledc_set_duty` / `ledc_update_duty` returned a non-OK code.
    DutyWriteFailed(i32),
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DutyWriteFailed(rc) => write!(f, "duty write failed (rc={rc})"),
        }
    }
}

impl embedded_hal::pwm::Error for PwmError {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

impl From<PwmError> for Error {
    fn from(e: PwmError) -> Self {
        Self::Pwm(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
