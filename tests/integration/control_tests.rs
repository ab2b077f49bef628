//! Closed-loop behaviour against the simulated bus, PWM and clock.

use twinfan::control::ControlOutcome;
use twinfan::scheduler::PeriodicActivity;
use twinfan::sensors::onewire::fahrenheit_to_raw;
use twinfan::ControllerConfig;

use crate::mock_hw::bench;

#[test]
fn steady_setpoint_settles_at_min_duty() {
    let mut b = bench(&ControllerConfig::default(), &[85.0, 85.0]);
    b.controller.poll.step();

    let mut applied = Vec::new();
    for _ in 0..300 {
        for ctl in &mut b.controller.loops {
            ctl.step();
        }
        b.clock.advance_ms(100);
        applied.push(b.controller.fans[0].last_duty_cycle());
    }

    let tail = &applied[200..];
    assert!(tail.iter().all(|&d| d == tail[0]), "duty oscillates: {tail:?}");
    for fan in &b.controller.fans {
        assert!((fan.last_duty_cycle_percent() - 30.0).abs() < 0.5);
    }
}

#[test]
fn hot_probe_forces_only_its_fan_to_full_speed() {
    let mut b = bench(&ControllerConfig::default(), &[85.0, 85.0]);
    b.bus.set_raw(0, fahrenheit_to_raw(96.0));
    b.controller.poll.step();

    let [fan1, fan2] = &mut b.controller.loops;
    // fan 1 follows the aggregate maximum, fan 2 follows probe 1
    assert!(matches!(fan1.step(), ControlOutcome::FullSpeed { .. }));
    assert!(matches!(fan2.step(), ControlOutcome::Duty { .. }));
    assert_eq!(b.pwms[0].last(), Some(255));
    assert_eq!(b.pwms[1].last(), Some(77));
}

#[test]
fn temperature_rise_increases_duty() {
    let mut b = bench(&ControllerConfig::default(), &[85.0, 85.0]);
    b.controller.poll.step();
    b.controller.loops[0].step();
    let cool = b.controller.fans[0].last_duty_cycle();

    b.bus.set_raw(0, fahrenheit_to_raw(92.0));
    b.controller.poll.step();
    for _ in 0..20 {
        b.controller.loops[0].step();
    }
    assert!(b.controller.fans[0].last_duty_cycle() > cool);
}

#[test]
fn min_runtime_holds_fan_after_boot() {
    let mut config = ControllerConfig::default();
    config.fans[0].allow_off = true;
    config.fans[0].off_duty_percent = 10.0;
    config.fans[0].min_runtime_ms = 5_000;
    let mut b = bench(&config, &[70.0, 70.0]);
    b.controller.poll.step();

    // Boot full-speed started the run at t=0.
    b.controller.loops[0].step();
    assert_eq!(b.pwms[0].last(), Some(77));
    b.clock.advance_ms(4_999);
    b.controller.loops[0].step();
    assert_eq!(b.pwms[0].last(), Some(77));
    assert_eq!(b.controller.fans[0].runtime_millis(), 4_999);

    b.clock.advance_ms(1);
    b.controller.loops[0].step();
    assert_eq!(b.pwms[0].last(), Some(0));
    assert_eq!(b.controller.fans[0].runtime_millis(), 0);
    assert_eq!(b.controller.fans[0].last_requested_duty_cycle(), 0);
}

#[test]
fn rejected_pwm_write_keeps_policy_state() {
    let mut b = bench(&ControllerConfig::default(), &[70.0, 70.0]);
    b.controller.poll.step();
    b.pwms[0].set_failing(true);
    b.controller.loops[0].step();
    assert_eq!(b.pwms[0].writes(), vec![255]);
    assert_eq!(b.controller.fans[0].last_duty_cycle(), 77);
}
