//! Fan control: PID compensator, duty-cycle policy, per-fan controller and
//! the periodic control loop that ties them to the temperature snapshot.

pub mod actuator;
pub mod control_loop;
pub mod fan;
pub mod pid;

pub use actuator::{DutyPolicy, DutyScale, FanActuator};
pub use control_loop::{ControlLoop, ControlOutcome};
pub use fan::{FanController, FanHandle};
