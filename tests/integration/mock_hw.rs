//! Mock hardware for integration tests.
//!
//! Records every PWM write so tests can assert on the full duty history
//! without touching real LEDC registers, and builds a fully assembled
//! controller around the simulated probe bus, edge sources and clock.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use twinfan::adapters::time::SimClock;
use twinfan::drivers::tach::SimEdgeSource;
use twinfan::error::PwmError;
use twinfan::sensors::onewire::{fahrenheit_to_raw, SimProbeBus};
use twinfan::{ControllerConfig, TwinFan};

// ── MockPwm ───────────────────────────────────────────────────

/// PWM output whose write history survives being moved into a fan.
#[derive(Clone, Default)]
pub struct MockPwm {
    writes: Arc<Mutex<Vec<u16>>>,
    fail_writes: Arc<Mutex<bool>>,
}

#[allow(dead_code)]
impl MockPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<u16> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<u16> {
        self.writes().last().copied()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) = failing;
    }
}

impl ErrorType for MockPwm {
    type Error = PwmError;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(PwmError::DutyWriteFailed(-1));
        }
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duty);
        Ok(())
    }
}

// ── Assembled rig ─────────────────────────────────────────────

pub type Rig = TwinFan<SimProbeBus, MockPwm, Arc<SimClock>>;

pub struct Bench {
    pub controller: Rig,
    pub bus: SimProbeBus,
    pub pwms: [MockPwm; 2],
    pub tachs: [SimEdgeSource; 2],
    pub clock: Arc<SimClock>,
}

/// Assemble a controller with one DS18B20 per entry in `probes_f`.
pub fn bench(config: &ControllerConfig, probes_f: &[f32]) -> Bench {
    let bus = SimProbeBus::new();
    for (i, f) in probes_f.iter().enumerate() {
        bus.attach_ds18b20(i as u8 + 1, fahrenheit_to_raw(*f));
    }
    let pwms = [MockPwm::new(), MockPwm::new()];
    let tachs = [SimEdgeSource::new(), SimEdgeSource::new()];
    let clock = Arc::new(SimClock::new());
    let controller = TwinFan::assemble(
        config,
        bus.clone(),
        pwms.clone(),
        tachs.clone(),
        Arc::clone(&clock),
    )
    .expect("assemble");
    Bench {
        controller,
        bus,
        pwms,
        tachs,
        clock,
    }
}
