//! Status document assembled from a running controller.

use twinfan::app::status::StatusReport;
use twinfan::scheduler::PeriodicActivity;
use twinfan::ControllerConfig;

use crate::mock_hw::bench;

#[test]
fn status_reflects_fans_and_probes() {
    let mut b = bench(&ControllerConfig::default(), &[85.5, 70.0, 62.1]);
    b.controller.poll.step();
    for ctl in &mut b.controller.loops {
        ctl.step();
    }
    b.tachs[0].pulse(30);
    b.clock.advance_ms(500);

    let report = StatusReport::collect(&b.controller.fans, &b.controller.temperatures);
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    let fans = value["fans"].as_array().unwrap();
    assert_eq!(fans.len(), 2);
    assert_eq!(fans[0]["rpm"], 1_800);
    assert_eq!(fans[1]["rpm"], 0);
    // Both PID outputs sit under the 30% floor on the first step.
    assert_eq!(b.controller.fans[0].last_requested_duty_cycle(), 1);
    assert_eq!(b.controller.fans[1].last_requested_duty_cycle(), 0);
    for fan in fans {
        assert!((fan["duty"].as_f64().unwrap() - 30.196).abs() < 0.01);
    }

    let sensors = value["tempSensors"]["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 3);
    let max_f = value["tempSensors"]["maxTempF"].as_f64().unwrap();
    assert!((max_f - 85.5).abs() < 0.02);
    assert_eq!(sensors[0]["tempF"], value["tempSensors"]["maxTempF"]);
    let c = sensors[1]["tempC"].as_f64().unwrap();
    assert!((c - 21.11).abs() < 0.02);
}

#[test]
fn status_before_first_poll_uses_sentinel() {
    let b = bench(&ControllerConfig::default(), &[80.0]);
    let report = StatusReport::collect(&b.controller.fans, &b.controller.temperatures);

    assert_eq!(report.temp_sensors.max_temp_f, -999.0);
    assert_eq!(report.temp_sensors.max_temp_c, -999.0);
    assert_eq!(report.temp_sensors.sensors.len(), 1);
    assert_eq!(report.temp_sensors.sensors[0].temp_f, -999.0);
    for fan in &report.fans {
        assert!((fan.duty - 100.0).abs() < 1e-9);
    }
}

#[test]
fn reading_rpm_restarts_the_window() {
    let b = bench(&ControllerConfig::default(), &[80.0]);
    b.tachs[1].pulse(20);
    b.clock.advance_ms(1_000);
    let first = StatusReport::collect(&b.controller.fans, &b.controller.temperatures);
    assert_eq!(first.fans[1].rpm, 600);

    b.clock.advance_ms(1_000);
    let second = StatusReport::collect(&b.controller.fans, &b.controller.temperatures);
    assert_eq!(second.fans[1].rpm, 0);
}
