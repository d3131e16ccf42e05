use nalgebra::Vector3;
use tracing::trace;

use crate::config::CraneConfig;
use crate::dynamics::state::CraneState;
use crate::error::Result;
use crate::fuzzy::{defuzzify, LinguisticVariable, RuleBank};
use super::Controller;

// ---------------------------------------------------------------------------
// Fuzzy anti-sway regulator
// ---------------------------------------------------------------------------

/// Intermediate values of one inference, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub distance: Vector3<f64>, // DN, DZ, DP grades
    pub angle: Vector3<f64>,    // AN, AZ, AP grades
    pub output: Vector3<f64>,   // VN, VZ, VP after aggregation
    pub target_velocity: f64,
}

/// Maps (distance error, sway angle) to a target velocity through the rule
/// bank, then to the acceleration that reaches it in `min_accel_time`.
///
/// Holds no state between ticks.
#[derive(Debug, Clone)]
pub struct FuzzyRegulator {
    distance: LinguisticVariable,
    angle: LinguisticVariable,
    velocity: LinguisticVariable,
    rules: RuleBank,
    min_accel_time: f64,
}

impl FuzzyRegulator {
    pub fn new(
        distance: LinguisticVariable,
        angle: LinguisticVariable,
        velocity: LinguisticVariable,
        min_accel_time: f64,
    ) -> Self {
        Self {
            distance,
            angle,
            velocity,
            rules: RuleBank::default(),
            min_accel_time,
        }
    }

    /// Build the three variables from `config`. Fails on the first
    /// malformed fuzzy set.
    pub fn from_config(config: &CraneConfig) -> Result<Self> {
        Ok(Self::new(
            config.distance.build("distance")?,
            config.angle.build("angle")?,
            config.velocity.build("velocity")?,
            config.track.min_accel_time,
        ))
    }

    pub fn with_rules(mut self, rules: RuleBank) -> Self { self.rules = rules; self }

    pub fn rules(&self) -> &RuleBank {
        &self.rules
    }

    /// Run fuzzification, the rule bank and defuzzification for
    /// `error = destination - position` and the current sway `angle`.
    pub fn infer(&self, error: f64, angle: f64) -> Inference {
        let distance = self.distance.fuzzify(error);
        let angle = self.angle.fuzzify(angle);
        let output = self.rules.evaluate(&distance, &angle);
        let target_velocity = defuzzify(&output, &self.velocity.peaks());
        Inference { distance, angle, output, target_velocity }
    }

    pub fn target_velocity(&self, error: f64, angle: f64) -> f64 {
        self.infer(error, angle).target_velocity
    }
}

impl Controller for FuzzyRegulator {
    fn control(&mut self, state: &CraneState, destination: f64) -> f64 {
        let error = destination - state.position;
        let target = self.target_velocity(error, state.angle);
        let acceleration = (target - state.velocity) / self.min_accel_time;
        trace!(error, angle = state.angle, target, acceleration, "fuzzy control");
        acceleration
    }

    fn name(&self) -> &str {
        "FuzzyRegulator"
    }
}
