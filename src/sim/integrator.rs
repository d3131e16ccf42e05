use crate::dynamics::{self, clamp_angle};
use crate::dynamics::state::{CraneState, TrackConstants};

// ---------------------------------------------------------------------------
// Explicit single-tick integrator
// ---------------------------------------------------------------------------

/// Advance `state` by `dt` seconds.
///
/// Position is clamped at the rails as a hard stop. The velocity is left as
/// it was even when the cart is pinned, so a cart pushed into a rail keeps
/// its stored speed until the controller winds it down.
///
/// The acceleration command is carried over unchanged; the controller
/// replaces it before the state is committed.
pub fn step(state: &CraneState, track: &TrackConstants, dt: f64) -> CraneState {
    let d = dynamics::derivatives(state, track, dt);

    let velocity = state.velocity + d.dvel;
    let position = track.clamp_position(state.position + velocity * dt);

    CraneState {
        position,
        velocity,
        acceleration: state.acceleration,
        previous_acceleration: state.acceleration,
        angle: clamp_angle(state.angle + d.dangle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::dynamics::state::MAX_ANGLE;

    #[test]
    fn semi_implicit_position_update() {
        let track = TrackConstants::default();
        let s = CraneState {
            velocity: 2.0,
            acceleration: 10.0,
            previous_acceleration: 10.0,
            ..CraneState::at_rest(40.0)
        };
        let next = step(&s, &track, 0.1);
        assert_relative_eq!(next.velocity, 3.0, epsilon = 1e-12);
        // new velocity drives the position
        assert_relative_eq!(next.position, 40.3, epsilon = 1e-12);
        assert_eq!(next.angle, 0.0);
        assert_eq!(next.previous_acceleration, 10.0);
        assert_eq!(next.acceleration, 10.0);
    }

    #[test]
    fn rest_stays_at_rest() {
        let track = TrackConstants::default();
        let s = CraneState::at_rest(50.0);
        assert_eq!(step(&s, &track, track.time_quantum), s);
    }

    #[test]
    fn acceleration_change_swings_payload() {
        let track = TrackConstants { gravity_constant: 10.0, ..TrackConstants::default() };
        let s = CraneState {
            acceleration: 10.0,
            previous_acceleration: 0.0,
            ..CraneState::at_rest(50.0)
        };
        let next = step(&s, &track, 0.001);
        assert_relative_eq!(next.angle, -std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn pinned_cart_keeps_its_velocity() {
        // Hard stop at the rail: position is clamped, velocity is not zeroed.
        let track = TrackConstants::default();
        let s = CraneState { velocity: -5.0, ..CraneState::at_rest(0.001) };
        let next = step(&s, &track, 0.01);
        assert_eq!(next.position, 0.0);
        assert_eq!(next.velocity, -5.0);

        let s = CraneState { velocity: 5.0, ..CraneState::at_rest(100.0) };
        let next = step(&s, &track, 0.01);
        assert_eq!(next.position, 100.0);
        assert_eq!(next.velocity, 5.0);
    }

    #[test]
    fn angle_never_leaves_range() {
        let track = TrackConstants { gravity_constant: 1.0, ..TrackConstants::default() };
        let mut s = CraneState { angle: 1.5, ..CraneState::at_rest(50.0) };
        for i in 0..50 {
            // large command steps, all kicking the same way
            s.previous_acceleration = 1e6 * (i as f64);
            s.acceleration = -1e6;
            s = step(&s, &track, 0.001);
            assert!(s.angle.abs() <= MAX_ANGLE);
        }
        assert_eq!(s.angle, MAX_ANGLE);
    }
}
