//! One fan: actuator policy plus tachometer measurement.
//!
//! The owning control loop drives the [`FanController`].  Telemetry
//! consumers (diagnostics, status) hold a [`FanHandle`] and read the duty
//! state the controller publishes after every command.

use core::cell::Cell;
use std::sync::Arc;

use critical_section::Mutex;
use embedded_hal::pwm::SetDutyCycle;

use super::actuator::{DutyScale, FanActuator};
use crate::adapters::time::elapsed_since;
use crate::app::ports::ClockPort;
use crate::sensors::tach::PulseCounter;

/// Duty bookkeeping visible outside the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DutyState {
    applied: u16,
    requested: u16,
    run_started_ms: Option<u32>,
}

struct FanShared {
    counter: Arc<PulseCounter>,
    duty: Mutex<Cell<DutyState>>,
    scale: DutyScale,
}

/// Cloneable read-only view of one fan.
#[derive(Clone)]
pub struct FanHandle<C: ClockPort + Clone> {
    shared: Arc<FanShared>,
    clock: C,
}

impl<C: ClockPort + Clone> FanHandle<C> {
    fn duty(&self) -> DutyState {
        critical_section::with(|cs| self.shared.duty.borrow(cs).get())
    }

    /// Speed since the previous call.  Reading restarts the pulse window,
    /// so exactly one consumer should poll this on a steady cadence.
    pub fn fan_rpm(&self) -> u32 {
        self.shared.counter.read_and_reset(self.clock.micros()).rpm()
    }

    pub fn last_duty_cycle(&self) -> u16 {
        self.duty().applied
    }

    pub fn last_requested_duty_cycle(&self) -> u16 {
        self.duty().requested
    }

    pub fn last_duty_cycle_percent(&self) -> f64 {
        self.shared.scale.duty_to_percent(self.duty().applied)
    }

    pub fn last_requested_duty_cycle_percent(&self) -> f64 {
        self.shared.scale.duty_to_percent(self.duty().requested)
    }

    /// How long the fan has been running continuously; 0 while stopped.
    pub fn runtime_millis(&self) -> u32 {
        let duty = self.duty();
        match duty.run_started_ms {
            Some(start) if duty.applied > 0 => elapsed_since(start, self.clock.millis()),
            _ => 0,
        }
    }
}

/// Owns one fan's actuator and pulse counter.
pub struct FanController<P: SetDutyCycle, C: ClockPort + Clone> {
    actuator: FanActuator<P>,
    handle: FanHandle<C>,
}

impl<P: SetDutyCycle, C: ClockPort + Clone> FanController<P, C> {
    /// The pulse window is armed here, so the first RPM read covers the
    /// time since construction.
    pub fn new(actuator: FanActuator<P>, clock: C) -> Self {
        let counter = Arc::new(PulseCounter::new());
        counter.read_and_reset(clock.micros());
        let shared = Arc::new(FanShared {
            counter,
            duty: Mutex::new(Cell::new(DutyState::default())),
            scale: actuator.scale(),
        });
        Self {
            actuator,
            handle: FanHandle { shared, clock },
        }
    }

    /// Counter to hand to the tachometer edge source.
    pub fn pulse_counter(&self) -> Arc<PulseCounter> {
        Arc::clone(&self.handle.shared.counter)
    }

    pub fn handle(&self) -> FanHandle<C> {
        self.handle.clone()
    }

    pub fn set_duty_cycle(&mut self, duty: u16) -> u16 {
        let now = self.handle.clock.millis();
        let applied = self.actuator.apply_duty_cycle(duty, now);
        self.publish();
        applied
    }

    pub fn set_duty_cycle_percent(&mut self, percent: f64) -> u16 {
        let now = self.handle.clock.millis();
        let applied = self.actuator.set_duty_cycle_percent(percent, now);
        self.publish();
        applied
    }

    pub fn set_full_speed(&mut self) -> u16 {
        let now = self.handle.clock.millis();
        let applied = self.actuator.set_full_speed(now);
        self.publish();
        applied
    }

    fn publish(&self) {
        let state = DutyState {
            applied: self.actuator.last_duty_cycle(),
            requested: self.actuator.last_requested_duty_cycle(),
            run_started_ms: self.actuator.run_started_ms(),
        };
        critical_section::with(|cs| self.handle.shared.duty.borrow(cs).set(state));
    }

    /// Policy setters.  Changes apply from the next duty command.
    pub fn actuator_mut(&mut self) -> &mut FanActuator<P> {
        &mut self.actuator
    }

    pub fn scale(&self) -> DutyScale {
        self.actuator.scale()
    }

    // --- Telemetry (same values a FanHandle reads) ---

    pub fn fan_rpm(&self) -> u32 {
        self.handle.fan_rpm()
    }

    pub fn last_duty_cycle(&self) -> u16 {
        self.actuator.last_duty_cycle()
    }

    pub fn last_requested_duty_cycle(&self) -> u16 {
        self.actuator.last_requested_duty_cycle()
    }

    pub fn last_duty_cycle_percent(&self) -> f64 {
        self.actuator.last_duty_cycle_percent()
    }

    pub fn last_requested_duty_cycle_percent(&self) -> f64 {
        self.actuator.last_requested_duty_cycle_percent()
    }

    pub fn runtime_millis(&self) -> u32 {
        self.handle.runtime_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::time::SimClock;
    use crate::control::actuator::DutyPolicy;
    use core::convert::Infallible;

    struct NullPwm;

    impl embedded_hal::pwm::ErrorType for NullPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for NullPwm {
        fn max_duty_cycle(&self) -> u16 {
            255
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn fan(clock: &Arc<SimClock>) -> FanController<NullPwm, Arc<SimClock>> {
        let policy = DutyPolicy {
            min_duty: 77,
            off_threshold: 0,
            allow_off: true,
            min_runtime_ms: 0,
        };
        FanController::new(
            FanActuator::new(NullPwm, DutyScale::new(8), policy),
            Arc::clone(clock),
        )
    }

    #[test]
    fn rpm_measures_from_construction() {
        let clock = Arc::new(SimClock::starting_at(5_000, 5));
        let fan = fan(&clock);
        let counter = fan.pulse_counter();
        for _ in 0..40 {
            counter.record_edge();
        }
        clock.advance_ms(1_000);
        assert_eq!(fan.fan_rpm(), 1_200);
        clock.advance_ms(1_000);
        assert_eq!(fan.handle().fan_rpm(), 0);
    }

    #[test]
    fn handle_sees_published_duty() {
        let clock = Arc::new(SimClock::new());
        let mut fan = fan(&clock);
        let handle = fan.handle();
        assert_eq!(handle.last_duty_cycle(), 0);
        fan.set_duty_cycle(10);
        assert_eq!(handle.last_requested_duty_cycle(), 10);
        assert_eq!(handle.last_duty_cycle(), 77);
        fan.set_full_speed();
        assert!((handle.last_duty_cycle_percent() - 100.0).abs() < 1e-9);
        assert!((handle.last_requested_duty_cycle_percent() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn runtime_counts_while_running_only() {
        let clock = Arc::new(SimClock::starting_at(0, 1_000));
        let mut fan = fan(&clock);
        assert_eq!(fan.runtime_millis(), 0);
        fan.set_duty_cycle_percent(50.0);
        clock.advance_ms(2_500);
        assert_eq!(fan.runtime_millis(), 2_500);
        fan.set_duty_cycle(0);
        assert_eq!(fan.runtime_millis(), 0);
    }
}
