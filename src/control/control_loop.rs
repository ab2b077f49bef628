//! Per-fan closed-loop control step.
//!
//! Every tick: read the selected temperature, run the reverse-acting PID,
//! then either force full speed (at or above the trip temperature) or
//! command the rounded PID output.  The PID keeps integrating during the
//! override so control resumes without a jump once the temperature falls
//! back below the trip point.
//!
//! A missing reading arrives as the -999 °F sentinel and is fed to the
//! PID like any other value.

use std::time::Duration;

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use super::fan::FanController;
use super::pid::{Direction, PidController};
use crate::app::ports::ClockPort;
use crate::config::{FanSettings, ProbeSelection};
use crate::scheduler::PeriodicActivity;
use crate::sensors::temperature::TemperatureView;

/// What one control step commanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlOutcome {
    /// Trip temperature reached; PWM at maximum.
    FullSpeed { temperature_f: f32 },
    /// PID output after the actuator policy.
    Duty {
        temperature_f: f32,
        requested: u16,
        applied: u16,
    },
}

pub struct ControlLoop<P: SetDutyCycle, C: ClockPort + Clone> {
    name: &'static str,
    fan: FanController<P, C>,
    temperatures: TemperatureView,
    probe: ProbeSelection,
    full_speed_temp_f: f64,
    pid: PidController,
    period: Duration,
}

impl<P: SetDutyCycle, C: ClockPort + Clone> ControlLoop<P, C> {
    pub fn new(
        name: &'static str,
        settings: &FanSettings,
        fan: FanController<P, C>,
        temperatures: TemperatureView,
        period: Duration,
    ) -> Self {
        let mut pid = PidController::new(
            settings.kp,
            settings.ki,
            settings.kd,
            settings.setpoint_f,
            Direction::Reverse,
        );
        pid.set_limits(0.0, f64::from(fan.scale().max_duty()));
        Self {
            name,
            fan,
            temperatures,
            probe: settings.probe,
            full_speed_temp_f: settings.full_speed_temp_f,
            pid,
            period,
        }
    }

    /// The process variable this loop regulates (°F).
    pub fn process_variable(&self) -> f32 {
        match self.probe {
            ProbeSelection::AggregateMax => self.temperatures.read_max_fahrenheit(),
            ProbeSelection::Probe(index) => self.temperatures.read_fahrenheit(usize::from(index)),
        }
    }

    /// One control iteration.
    pub fn step(&mut self) -> ControlOutcome {
        let temperature_f = self.process_variable();
        let output = self.pid.compute(f64::from(temperature_f), self.period.as_secs_f64());

        if f64::from(temperature_f) >= self.full_speed_temp_f {
            self.fan.set_full_speed();
            debug!("{}: {:.1}F >= trip, full speed", self.name, temperature_f);
            return ControlOutcome::FullSpeed { temperature_f };
        }

        let requested = output.round() as u16;
        let applied = self.fan.set_duty_cycle(requested);
        debug!(
            "{}: {:.1}F pid={:.1} -> duty {} (applied {})",
            self.name, temperature_f, output, requested, applied
        );
        ControlOutcome::Duty {
            temperature_f,
            requested,
            applied,
        }
    }

    pub fn fan(&self) -> &FanController<P, C> {
        &self.fan
    }

    pub fn fan_mut(&mut self) -> &mut FanController<P, C> {
        &mut self.fan
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }
}

impl<P, C> PeriodicActivity for ControlLoop<P, C>
where
    P: SetDutyCycle + Send,
    C: ClockPort + Clone + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn step(&mut self) {
        ControlLoop::step(self);
    }
}
