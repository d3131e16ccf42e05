use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::error::{CraneError, Result};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// Standard gravity expressed in track units per s^2 (track units are cm).
pub const GRAVITY_CM: f64 = 981.0;

/// Largest sway magnitude the model can represent (rope horizontal).
pub const MAX_ANGLE: f64 = FRAC_PI_2;

// ---------------------------------------------------------------------------
// Crane state: cart kinematics plus payload sway
// ---------------------------------------------------------------------------

/// Snapshot of the crane. Replaced as a whole on every commit, never edited
/// field by field while shared.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CraneState {
    pub position: f64,              // track units from the track start
    pub velocity: f64,              // units/s, negative = towards the start
    pub acceleration: f64,          // units/s^2, latest controller command
    pub previous_acceleration: f64, // command of the tick before, feeds sway
    pub angle: f64,                 // rad, negative = payload trails forward motion
}

impl CraneState {
    /// Cart standing still at `position` with the rope vertical.
    pub fn at_rest(position: f64) -> Self {
        Self { position, ..Self::default() }
    }

    /// Copy of this state with the fields set in `update` replaced.
    pub fn with(&self, update: StateUpdate) -> CraneState {
        update.apply(self)
    }

    /// Whether position and angle satisfy the track invariants.
    pub fn is_within(&self, track: &TrackConstants) -> bool {
        // NaN fails both comparisons
        (0.0..=track.track_length).contains(&self.position)
            && (-MAX_ANGLE..=MAX_ANGLE).contains(&self.angle)
    }

    /// `Ok(())` if the state may be committed on `track`.
    pub fn check(&self, track: &TrackConstants) -> Result<()> {
        if self.is_within(track) {
            Ok(())
        } else {
            Err(CraneError::InvariantViolation {
                position: self.position,
                angle: self.angle,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Partial state update
// ---------------------------------------------------------------------------

/// Fields to change in a [`CraneState`]; unset fields keep the base value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateUpdate {
    position: Option<f64>,
    velocity: Option<f64>,
    acceleration: Option<f64>,
    previous_acceleration: Option<f64>,
    angle: Option<f64>,
}

impl StateUpdate {
    pub fn position(mut self, v: f64) -> Self { self.position = Some(v); self }
    pub fn velocity(mut self, v: f64) -> Self { self.velocity = Some(v); self }
    pub fn acceleration(mut self, v: f64) -> Self { self.acceleration = Some(v); self }
    pub fn previous_acceleration(mut self, v: f64) -> Self { self.previous_acceleration = Some(v); self }
    pub fn angle(mut self, v: f64) -> Self { self.angle = Some(v); self }

    /// Build the full replacement state.
    pub fn apply(self, base: &CraneState) -> CraneState {
        CraneState {
            position: self.position.unwrap_or(base.position),
            velocity: self.velocity.unwrap_or(base.velocity),
            acceleration: self.acceleration.unwrap_or(base.acceleration),
            previous_acceleration: self
                .previous_acceleration
                .unwrap_or(base.previous_acceleration),
            angle: self.angle.unwrap_or(base.angle),
        }
    }
}

// ---------------------------------------------------------------------------
// Track constants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConstants {
    pub track_length: f64,     // track units
    pub time_quantum: f64,     // s, control tick period
    pub min_accel_time: f64,   // s, time to reach a new target velocity
    pub gravity_constant: f64, // units/s^2, sway calibration
}

impl Default for TrackConstants {
    fn default() -> Self {
        Self {
            track_length: 100.0,
            time_quantum: 0.001, // 1 kHz
            min_accel_time: 0.3,
            gravity_constant: GRAVITY_CM,
        }
    }
}

impl TrackConstants {
    /// Midpoint of the track, where the cart starts.
    pub fn midpoint(&self) -> f64 {
        self.track_length / 2.0
    }

    pub fn clamp_position(&self, x: f64) -> f64 {
        x.clamp(0.0, self.track_length)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("track_length", self.track_length),
            ("time_quantum", self.time_quantum),
            ("min_accel_time", self.min_accel_time),
            ("gravity_constant", self.gravity_constant),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CraneError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}
