//! Periodic diagnostics printout.
//!
//! Once a second, logs every probe, the aggregate maximum, and each fan's
//! speed and duty.  This activity is the RPM consumer: it is the only
//! caller of `fan_rpm()` at runtime, so each printed RPM covers exactly
//! one diagnostics period.

use std::time::Duration;

use log::{debug, info};

use crate::app::ports::ClockPort;
use crate::app::status::StatusReport;
use crate::control::fan::FanHandle;
use crate::scheduler::PeriodicActivity;
use crate::sensors::temperature::TemperatureView;

pub struct DiagnosticsActivity<C: ClockPort + Clone> {
    fans: Vec<FanHandle<C>>,
    temperatures: TemperatureView,
    period: Duration,
}

impl<C: ClockPort + Clone> DiagnosticsActivity<C> {
    pub fn new(fans: Vec<FanHandle<C>>, temperatures: TemperatureView, period: Duration) -> Self {
        Self {
            fans,
            temperatures,
            period,
        }
    }

    /// Collect and log one report.  Returned for callers that also want to
    /// serve it.
    pub fn report(&self) -> StatusReport {
        let report = StatusReport::collect(&self.fans, &self.temperatures);

        for (i, sensor) in report.temp_sensors.sensors.iter().enumerate() {
            info!("probe {}: {:.2}F ({:.2}C)", i, sensor.temp_f, sensor.temp_c);
        }
        info!("max: {:.2}F", report.temp_sensors.max_temp_f);

        for (i, (fan, handle)) in report.fans.iter().zip(&self.fans).enumerate() {
            info!(
                "fan{}: {} rpm, duty {:.1}% (requested {:.1}%), running {} ms",
                i + 1,
                fan.rpm,
                fan.duty,
                handle.last_requested_duty_cycle_percent(),
                handle.runtime_millis()
            );
        }

        if log::log_enabled!(log::Level::Debug) {
            if let Ok(json) = report.to_json() {
                debug!("status: {}", json);
            }
        }
        report
    }
}

impl<C: ClockPort + Clone + Send> PeriodicActivity for DiagnosticsActivity<C> {
    fn name(&self) -> &'static str {
        "diagnostics"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn step(&mut self) {
        self.report();
    }
}
