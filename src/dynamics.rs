pub mod state;

use crate::dynamics::state::{CraneState, TrackConstants, MAX_ANGLE};

// ---------------------------------------------------------------------------
// Equations of motion (single axis, linearized sway)
// ---------------------------------------------------------------------------

/// Rates of change of the cart over one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deriv {
    pub dvel: f64,   // velocity change over the tick
    pub dangle: f64, // sway increment over the tick
}

/// Kinematic increments for `state` on `track` over `dt` seconds.
///
/// Sway is driven by the change in commanded acceleration rather than by the
/// acceleration itself: a constant command leaves the rope angle where it
/// is, a sudden change kicks it by `atan(Δa / g)`.
pub fn derivatives(state: &CraneState, track: &TrackConstants, dt: f64) -> Deriv {
    Deriv {
        dvel: state.acceleration * dt,
        dangle: sway_increment(
            state.previous_acceleration,
            state.acceleration,
            track.gravity_constant,
        ),
    }
}

/// Angle kick caused by the acceleration stepping from `previous` to `current`.
pub fn sway_increment(previous: f64, current: f64, gravity: f64) -> f64 {
    ((previous - current) / gravity).atan()
}

/// Keep an accumulated angle inside the representable range.
pub fn clamp_angle(angle: f64) -> f64 {
    angle.clamp(-MAX_ANGLE, MAX_ANGLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_command_does_not_swing() {
        let track = TrackConstants::default();
        let state = CraneState {
            acceleration: 5.0,
            previous_acceleration: 5.0,
            ..CraneState::at_rest(20.0)
        };
        let d = derivatives(&state, &track, track.time_quantum);
        assert_eq!(d.dangle, 0.0);
        assert_relative_eq!(d.dvel, 0.005, epsilon = 1e-12);
    }

    #[test]
    fn speeding_up_swings_payload_backwards() {
        // Payload trails the cart when the command jumps forward
        let kick = sway_increment(0.0, 9.81, 9.81);
        assert_relative_eq!(kick, -std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert!(sway_increment(9.81, 0.0, 9.81) > 0.0);
    }

    #[test]
    fn accumulated_angle_is_bounded() {
        assert_eq!(clamp_angle(2.0), MAX_ANGLE);
        assert_eq!(clamp_angle(-2.0), -MAX_ANGLE);
        assert_eq!(clamp_angle(0.3), 0.3);
    }
}
