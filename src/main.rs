//! TwinFan Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspProbeBus      LedcFanPwm ×2     GpioEdgeSource ×2          │
//! │  (ProbeBus)       (SetDutyCycle)    (EdgeSource)               │
//! │  Esp32TimeAdapter (ClockPort)                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  TemperatureAggregator · ControlLoop ×2 · FanController│    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler: probe-poll · fan1-ctl · fan2-ctl · diagnostics     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use log::info;

use twinfan::adapters::onewire_bus::EspProbeBus;
use twinfan::adapters::time::Esp32TimeAdapter;
use twinfan::drivers::fan_pwm::LedcFanPwm;
use twinfan::drivers::hw_init;
use twinfan::drivers::tach::GpioEdgeSource;
use twinfan::drivers::task_pin::Core;
use twinfan::pins;
use twinfan::scheduler;
use twinfan::{ControllerConfig, Error, TwinFan};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  TwinFan v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = ControllerConfig::default();
    config.validate().map_err(Error::from)?;

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_fan_pwm(&config).map_err(Error::from)?;
    hw_init::init_isr_service().map_err(Error::from)?;

    let peripherals = Peripherals::take()?;
    // One-wire probes on pins::TEMP_ONEWIRE_GPIO.
    const _: () = assert!(pins::TEMP_ONEWIRE_GPIO == 15);
    let bus = EspProbeBus::new(peripherals.pins.gpio15, peripherals.rmt.channel0)?;

    let bits = config.pwm_resolution_bits;
    let pwms = [
        LedcFanPwm::new(config.fans[0].pwm_channel, bits),
        LedcFanPwm::new(config.fans[1].pwm_channel, bits),
    ];
    let edges = [
        GpioEdgeSource::new(config.fans[0].tach_gpio),
        GpioEdgeSource::new(config.fans[1].tach_gpio),
    ];
    let clock = Arc::new(Esp32TimeAdapter::new());

    // ── 4. Discover probes, bind fans, spin both to 100 % ─────
    let controller = TwinFan::assemble(&config, bus, pwms, edges, Arc::clone(&clock))?;

    // ── 5. Start activities ───────────────────────────────────
    let handles = controller.into_scheduler(clock, Core::CONTROL).start()?;
    info!("System ready: {} activities running", handles.len());

    let dead = scheduler::join_all(handles, Duration::from_secs(1));
    anyhow::bail!("{} activity thread(s) panicked; all activities stopped", dead)
}
