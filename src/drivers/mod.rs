//! Fan PWM output, tachometer edge sources, hardware initialisation, and
//! core-pinned task spawning.

pub mod fan_pwm;
pub mod hw_init;
pub mod tach;
pub mod task_pin;
