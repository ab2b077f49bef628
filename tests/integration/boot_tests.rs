//! Boot sequence: discovery, fan binding, full-speed start, scheduling.

use twinfan::drivers::task_pin::Core;
use twinfan::error::Error;
use twinfan::{ControllerConfig, TwinFan};

use crate::mock_hw::{bench, MockPwm};

#[test]
fn boot_drives_both_fans_to_full_speed() {
    let b = bench(&ControllerConfig::default(), &[70.0, 72.0]);
    assert_eq!(b.controller.probe_count, 2);
    assert_eq!(b.pwms[0].writes(), vec![255]);
    assert_eq!(b.pwms[1].writes(), vec![255]);
    for fan in &b.controller.fans {
        assert!((fan.last_duty_cycle_percent() - 100.0).abs() < 1e-9);
    }
}

#[test]
fn readings_are_sentinel_until_first_poll() {
    let b = bench(&ControllerConfig::default(), &[70.0]);
    assert_eq!(b.controller.temperatures.probe_count(), 1);
    assert_eq!(b.controller.temperatures.read_fahrenheit(0), -999.0);
    assert_eq!(b.controller.temperatures.read_max_fahrenheit(), -999.0);
}

#[test]
fn max_probes_caps_discovery() {
    let mut config = ControllerConfig::default();
    config.max_probes = 2;
    let b = bench(&config, &[70.0, 71.0, 72.0, 73.0]);
    assert_eq!(b.controller.probe_count, 2);
}

#[test]
fn invalid_config_is_rejected_before_touching_hardware() {
    let mut config = ControllerConfig::default();
    config.fans[1].min_duty_percent = 140.0;
    let pwms = [MockPwm::new(), MockPwm::new()];
    let result = TwinFan::assemble(
        &config,
        twinfan::sensors::onewire::SimProbeBus::new(),
        pwms.clone(),
        [
            twinfan::drivers::tach::SimEdgeSource::new(),
            twinfan::drivers::tach::SimEdgeSource::new(),
        ],
        std::sync::Arc::new(twinfan::adapters::time::SimClock::new()),
    );
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(pwms[0].writes().is_empty());
}

#[test]
fn tach_edges_reach_the_right_fan() {
    let b = bench(&ControllerConfig::default(), &[70.0]);
    b.tachs[0].pulse(40);
    b.tachs[1].pulse(10);
    b.clock.advance_ms(1_000);
    assert_eq!(b.controller.fans[0].fan_rpm(), 1_200);
    assert_eq!(b.controller.fans[1].fan_rpm(), 300);
}

#[test]
fn scheduler_gets_every_activity() {
    let b = bench(&ControllerConfig::default(), &[70.0]);
    let scheduler = b.controller.into_scheduler(b.clock, Core::App);
    // probe poll, two control loops, diagnostics
    assert_eq!(scheduler.len(), 4);
}
