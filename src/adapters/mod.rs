//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements  | Connects to                    |
//! |----------------|-------------|--------------------------------|
//! | `time`         | ClockPort   | ESP32 system timer / host clock|
//! | `onewire_bus`  | ProbeBus    | ESP-IDF RMT one-wire driver    |
//!
//! The tachometer [`EdgeSource`](crate::app::ports::EdgeSource) lives in
//! `drivers::tach` next to the GPIO ISR it registers.

#[cfg(target_os = "espidf")]
pub mod onewire_bus;
pub mod time;
