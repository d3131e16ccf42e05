use crate::dynamics::state::CraneState;

/// Anything that turns a crane snapshot and a destination into a cart
/// acceleration command.
///
/// The control loop calls `control` once per tick with the freshly
/// integrated state; the returned acceleration is written into the state
/// before it is committed.
pub trait Controller {
    /// Acceleration command in track units/s^2.
    fn control(&mut self, state: &CraneState, destination: f64) -> f64;

    /// Drop any internal state carried between ticks.
    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Commands a constant acceleration. Handy for driving the plant open loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCommand(pub f64);

impl Controller for ConstantCommand {
    fn control(&mut self, _state: &CraneState, _destination: f64) -> f64 {
        self.0
    }

    fn name(&self) -> &str {
        "constant"
    }
}
