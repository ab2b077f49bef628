//! Composition root.
//!
//! Builds every controller object from a [`ControllerConfig`] and the
//! hardware handles `main` (or a test) supplies, in the boot order the
//! controller has always used:
//!
//! 1. discover probes and apply their resolution,
//! 2. bind each fan's PWM output and tachometer edge source,
//! 3. drive both fans to 100 %,
//! 4. hand the poll, control and diagnostics activities to the scheduler.
//!
//! Nothing here is global; tasks only receive the handles they need.

use std::time::Duration;

use embedded_hal::pwm::SetDutyCycle;
use log::info;

use crate::app::ports::{ClockPort, EdgeSource, ProbeBus};
use crate::config::{ControllerConfig, FanSettings};
use crate::control::actuator::{DutyPolicy, DutyScale, FanActuator};
use crate::control::control_loop::ControlLoop;
use crate::control::fan::{FanController, FanHandle};
use crate::diagnostics::DiagnosticsActivity;
use crate::drivers::task_pin::Core;
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::sensors::temperature::{ProbePollActivity, TemperatureAggregator, TemperatureView};

const CONTROL_PRIORITY: u8 = 5;
const POLL_PRIORITY: u8 = 4;
const DIAGNOSTICS_PRIORITY: u8 = 2;
const CONTROL_STACK_KB: usize = 4;
const POLL_STACK_KB: usize = 6;
const DIAGNOSTICS_STACK_KB: usize = 8;

const LOOP_NAMES: [&str; 2] = ["fan1-ctl", "fan2-ctl"];

/// Every activity and read handle of a booted controller.
pub struct TwinFan<B: ProbeBus, P: SetDutyCycle, C: ClockPort + Clone> {
    pub poll: ProbePollActivity<B>,
    pub loops: [ControlLoop<P, C>; 2],
    pub diagnostics: DiagnosticsActivity<C>,
    pub fans: [FanHandle<C>; 2],
    pub temperatures: TemperatureView,
    pub probe_count: usize,
}

fn bind_fan<P, C, E>(
    settings: &FanSettings,
    pwm: P,
    edges: &mut E,
    scale: DutyScale,
    clock: C,
) -> Result<FanController<P, C>>
where
    P: SetDutyCycle,
    C: ClockPort + Clone,
    E: EdgeSource,
{
    let actuator = FanActuator::new(pwm, scale, DutyPolicy::from_settings(settings, scale));
    let fan = FanController::new(actuator, clock);
    edges.subscribe(fan.pulse_counter())?;
    Ok(fan)
}

impl<B, P, C> TwinFan<B, P, C>
where
    B: ProbeBus,
    P: SetDutyCycle,
    C: ClockPort + Clone,
{
    /// Validate the config, then run boot steps 1-3.
    pub fn assemble<E: EdgeSource>(
        config: &ControllerConfig,
        bus: B,
        pwms: [P; 2],
        mut edges: [E; 2],
        clock: C,
    ) -> Result<Self> {
        config.validate()?;

        let mut aggregator =
            TemperatureAggregator::new(bus, config.probe_resolution, usize::from(config.max_probes));
        let probe_count = aggregator.discover();
        let temperatures = aggregator.view();

        let scale = DutyScale::new(config.pwm_resolution_bits);
        let [pwm1, pwm2] = pwms;
        let [edges1, edges2] = &mut edges;
        let mut fan1 = bind_fan(&config.fans[0], pwm1, edges1, scale, clock.clone())?;
        let mut fan2 = bind_fan(&config.fans[1], pwm2, edges2, scale, clock.clone())?;

        fan1.set_full_speed();
        fan2.set_full_speed();
        info!("boot: {} probe(s), both fans at 100%", probe_count);

        let fans = [fan1.handle(), fan2.handle()];
        let control_period = Duration::from_millis(u64::from(config.control_interval_ms));
        let loops = [
            ControlLoop::new(LOOP_NAMES[0], &config.fans[0], fan1, temperatures.clone(), control_period),
            ControlLoop::new(LOOP_NAMES[1], &config.fans[1], fan2, temperatures.clone(), control_period),
        ];

        let poll = ProbePollActivity::new(
            aggregator,
            Duration::from_millis(u64::from(config.temp_poll_interval_ms)),
        );
        let diagnostics = DiagnosticsActivity::new(
            fans.to_vec(),
            temperatures.clone(),
            Duration::from_millis(u64::from(config.diagnostics_interval_ms)),
        );

        Ok(Self {
            poll,
            loops,
            diagnostics,
            fans,
            temperatures,
            probe_count,
        })
    }
}

impl<B, P, C> TwinFan<B, P, C>
where
    B: ProbeBus + Send + 'static,
    P: SetDutyCycle + Send + 'static,
    C: ClockPort + Clone + Send + 'static,
{
    /// Boot step 4: register every activity on a scheduler.
    pub fn into_scheduler(self, clock: C, core: Core) -> Scheduler<C> {
        let mut scheduler = Scheduler::new(clock, core);
        scheduler.add(self.poll, POLL_PRIORITY, POLL_STACK_KB);
        for control in self.loops {
            scheduler.add(control, CONTROL_PRIORITY, CONTROL_STACK_KB);
        }
        scheduler.add(self.diagnostics, DIAGNOSTICS_PRIORITY, DIAGNOSTICS_STACK_KB);
        scheduler
    }
}
