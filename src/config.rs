//! Startup configuration: track constants, linguistic variables and alarms.
//!
//! Everything has a default, so a TOML file only needs the sections it wants
//! to change. A linguistic variable is replaced as a whole (all three terms):
//!
//! ```toml
//! sway_alarm = 0.2
//!
//! [track]
//! min_accel_time = 0.5
//!
//! [velocity]
//! negative = { shape = "falling_slope", edge = -20.0, end = 0.0 }
//! zero = { shape = "pyramidal", start = -20.0, edge = 0.0, end = 20.0 }
//! positive = { shape = "rising_slope", start = 0.0, edge = 20.0 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dynamics::state::{TrackConstants, MAX_ANGLE};
use crate::error::{CraneError, Result};
use crate::fuzzy::{LinguisticVariable, MembershipFunction, Shape};

// ---------------------------------------------------------------------------
// Membership function description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MembershipSpec {
    pub shape: Shape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl MembershipSpec {
    pub fn rising(start: f64, edge: f64) -> Self {
        Self { shape: Shape::RisingSlope, start: Some(start), edge: Some(edge), end: None }
    }

    pub fn falling(edge: f64, end: f64) -> Self {
        Self { shape: Shape::FallingSlope, start: None, edge: Some(edge), end: Some(end) }
    }

    pub fn pyramidal(start: f64, edge: f64, end: f64) -> Self {
        Self { shape: Shape::Pyramidal, start: Some(start), edge: Some(edge), end: Some(end) }
    }

    pub fn build(&self) -> Result<MembershipFunction> {
        let edge = self.edge.ok_or_else(|| {
            CraneError::InvalidShape(format!("{:?} is missing its edge", self.shape))
        })?;
        MembershipFunction::new(self.shape, self.start, edge, self.end)
    }
}

// ---------------------------------------------------------------------------
// Linguistic variable description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub negative: MembershipSpec,
    pub zero: MembershipSpec,
    pub positive: MembershipSpec,
}

impl VariableConfig {
    /// Falling / pyramid / rising sets meeting at zero, saturating at `width`.
    pub fn symmetric(width: f64) -> Self {
        Self {
            negative: MembershipSpec::falling(-width, 0.0),
            zero: MembershipSpec::pyramidal(-width, 0.0, width),
            positive: MembershipSpec::rising(0.0, width),
        }
    }

    /// Like [`symmetric`](Self::symmetric) with the outer sets swapped, so
    /// that the Negative term covers positive inputs.
    pub fn mirrored(width: f64) -> Self {
        Self {
            negative: MembershipSpec::rising(0.0, width),
            zero: MembershipSpec::pyramidal(-width, 0.0, width),
            positive: MembershipSpec::falling(-width, 0.0),
        }
    }

    pub fn build(&self, name: &str) -> Result<LinguisticVariable> {
        let term = |set: &MembershipSpec, term: &str| {
            set.build().map_err(|e| match e {
                CraneError::InvalidShape(msg) => {
                    CraneError::InvalidShape(format!("{name}.{term}: {msg}"))
                }
                other => other,
            })
        };
        Ok(LinguisticVariable::new(
            name,
            term(&self.negative, "negative")?,
            term(&self.zero, "zero")?,
            term(&self.positive, "positive")?,
        ))
    }
}

// ---------------------------------------------------------------------------
// Crane configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraneConfig {
    /// |angle| in rad above which a sway alarm is raised.
    pub sway_alarm: f64,
    pub track: TrackConstants,
    /// Error `destination - position`. The Negative term is the cart sitting
    /// on the track-start side of its destination.
    pub distance: VariableConfig,
    pub angle: VariableConfig,
    /// Output: target cart velocity.
    pub velocity: VariableConfig,
}

impl Default for CraneConfig {
    fn default() -> Self {
        Self {
            sway_alarm: 0.2,
            track: TrackConstants::default(),
            distance: VariableConfig::mirrored(40.0),
            angle: VariableConfig::symmetric(0.5),
            velocity: VariableConfig::symmetric(25.0),
        }
    }
}

impl CraneConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CraneConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| CraneError::InvalidConfig(format!("cannot serialize: {e}")))
    }

    /// Check the track constants and that every fuzzy set can be built.
    pub fn validate(&self) -> Result<()> {
        self.track.validate()?;
        if !(self.sway_alarm > 0.0 && self.sway_alarm <= MAX_ANGLE) {
            return Err(CraneError::InvalidConfig(format!(
                "sway_alarm must be in (0, pi/2], got {}",
                self.sway_alarm
            )));
        }
        self.distance.build("distance")?;
        self.angle.build("angle")?;
        self.velocity.build("velocity")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preset configurations
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// 1 m track in centimetres, 1 ms tick, up to 25 cm/s.
    pub fn standard() -> CraneConfig {
        CraneConfig::default()
    }

    /// Slower and softer: 20 cm/s, half a second to reach a new speed.
    pub fn gentle() -> CraneConfig {
        CraneConfig {
            track: TrackConstants {
                min_accel_time: 0.5,
                ..TrackConstants::default()
            },
            velocity: VariableConfig::symmetric(20.0),
            ..CraneConfig::default()
        }
    }

    pub fn by_name(name: &str) -> Option<CraneConfig> {
        match name {
            "standard" => Some(standard()),
            "gentle" => Some(gentle()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::Term;

    #[test]
    fn defaults_validate() {
        CraneConfig::default().validate().unwrap();
        presets::gentle().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CraneConfig::from_toml_str(
            r#"
            sway_alarm = 0.1

            [track]
            min_accel_time = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.sway_alarm, 0.1);
        assert_eq!(config.track.min_accel_time, 0.5);
        assert_eq!(config.track.track_length, 100.0);
        assert_eq!(config.velocity, VariableConfig::symmetric(25.0));
    }

    #[test]
    fn toml_round_trip_of_defaults() {
        let config = CraneConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(CraneConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_edge_is_invalid_shape() {
        let err = CraneConfig::from_toml_str(
            r#"
            [angle.negative]
            shape = "falling_slope"
            edge = -0.5
            end = 0.0

            [angle.zero]
            shape = "pyramidal"
            start = -0.5
            end = 0.5

            [angle.positive]
            shape = "rising_slope"
            start = 0.0
            edge = 0.5
            "#,
        )
        .unwrap_err();
        match err {
            CraneError::InvalidShape(msg) => assert!(msg.contains("angle.zero"), "{msg}"),
            other => panic!("expected InvalidShape, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_gravity_is_rejected() {
        let err = CraneConfig::from_toml_str("[track]\ngravity_constant = 0.0\n").unwrap_err();
        assert!(matches!(err, CraneError::InvalidConfig(_)));
    }

    #[test]
    fn mirrored_distance_puts_negative_on_positive_errors() {
        let distance = VariableConfig::mirrored(40.0).build("distance").unwrap();
        assert_eq!(distance.term(Term::Negative).grade(40.0), 1.0);
        assert_eq!(distance.term(Term::Positive).grade(-40.0), 1.0);
        assert_eq!(distance.term(Term::Negative).grade(-1.0), 0.0);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crane.toml");
        std::fs::write(&path, "[track]\ntrack_length = 80.0\n").unwrap();
        let config = CraneConfig::load(&path).unwrap();
        assert_eq!(config.track.track_length, 80.0);
        assert!(presets::by_name("gentle").is_some());
        assert!(presets::by_name("reckless").is_none());
    }
}
