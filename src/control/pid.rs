//! PID compensator for fan duty cycle
//!
//! Positional PID in the classic Arduino `PID_v1` arrangement: the integral
//! term is accumulated straight into an output sum that is clamped to the
//! output limits (so it cannot wind up), and the derivative acts on the
//! measurement rather than the error (so setpoint changes do not kick).

/// Sign convention between error and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Output rises when the measurement is below the setpoint (heater).
    Direct,
    /// Output rises when the measurement is above the setpoint (cooler).
    Reverse,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    direction: Direction,
    setpoint: f64,
    /// Integral contribution, already scaled by `ki` and clamped.
    output_sum: f64,
    /// `None` until the first sample, so the first step has no D kick.
    last_input: Option<f64>,
    last_output: f64,
    output_min: f64,
    output_max: f64,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64, setpoint: f64, direction: Direction) -> Self {
        Self {
            kp,
            ki,
            kd,
            direction,
            setpoint,
            output_sum: 0.0,
            last_input: None,
            last_output: 0.0,
            output_min: 0.0,
            output_max: 255.0,
        }
    }

    /// Set output limits.  The accumulated state is pulled inside them.
    pub fn set_limits(&mut self, min: f64, max: f64) {
        if min >= max {
            return;
        }
        self.output_min = min;
        self.output_max = max;
        self.output_sum = self.output_sum.clamp(min, max);
        self.last_output = self.last_output.clamp(min, max);
    }

    pub fn limits(&self) -> (f64, f64) {
        (self.output_min, self.output_max)
    }

    /// Update setpoint
    pub fn set_target(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn target(&self) -> f64 {
        self.setpoint
    }

    pub fn set_tunings(&mut self, kp: f64, ki: f64, kd: f64) {
        if kp < 0.0 || ki < 0.0 || kd < 0.0 {
            return;
        }
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Compute a new output from `measurement` taken `dt` seconds after
    /// the previous one.
    pub fn compute(&mut self, measurement: f64, dt: f64) -> f64 {
        let sign = match self.direction {
            Direction::Direct => 1.0,
            Direction::Reverse => -1.0,
        };
        let error = sign * (self.setpoint - measurement);
        let d_input = self
            .last_input
            .map_or(0.0, |last| sign * (measurement - last));

        self.output_sum = (self.output_sum + self.ki * dt * error)
            .clamp(self.output_min, self.output_max);

        let derivative = if dt > 0.0 { self.kd * d_input / dt } else { 0.0 };
        let output = (self.kp * error + self.output_sum - derivative)
            .clamp(self.output_min, self.output_max);

        self.last_input = Some(measurement);
        self.last_output = output;
        output
    }

    /// Most recent output (0 before the first compute).
    pub fn output(&self) -> f64 {
        self.last_output
    }

    /// Bumpless start: continue from `output` as if the loop had been
    /// producing it all along.
    pub fn initialize(&mut self, measurement: f64, output: f64) {
        self.output_sum = output.clamp(self.output_min, self.output_max);
        self.last_output = self.output_sum;
        self.last_input = Some(measurement);
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.output_sum = 0.0;
        self.last_input = None;
        self.last_output = 0.0;
    }
}
