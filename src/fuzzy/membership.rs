use serde::{Deserialize, Serialize};

use crate::error::{CraneError, Result};

// ---------------------------------------------------------------------------
// Piecewise-linear membership functions (single edge)
// ---------------------------------------------------------------------------
//
//   Pyramidal         Falling slope       Rising slope
//  1 |    /\         1 |----\            1 |       /----
//    |   /  \          |     \             |      /
//  0 +--/----\-->    0 +------\----->    0 +-----/------->
//      s  e  n               e  n              s  e

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// 0 below `start`, ramps to 1 at `edge`, 1 beyond.
    RisingSlope,
    /// 1 up to `edge`, ramps to 0 at `end` (or stays 1 without an end).
    FallingSlope,
    /// Ramps up from `start` to `edge`, then down to `end`.
    Pyramidal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembershipFunction {
    shape: Shape,
    start: Option<f64>,
    edge: f64,
    end: Option<f64>,
}

impl MembershipFunction {
    /// Create a fuzzy set. At least one of `start` and `end` must be given,
    /// and the breakpoints must be finite and ordered `start <= edge <= end`.
    pub fn new(shape: Shape, start: Option<f64>, edge: f64, end: Option<f64>) -> Result<Self> {
        if start.is_none() && end.is_none() {
            return Err(CraneError::InvalidShape(format!(
                "{shape:?} at {edge}: at least one of start and end is required"
            )));
        }
        let points = [start, Some(edge), end];
        if points.iter().flatten().any(|p| !p.is_finite()) {
            return Err(CraneError::InvalidShape(format!(
                "{shape:?}: breakpoints must be finite"
            )));
        }
        if start.is_some_and(|s| s > edge) || end.is_some_and(|e| e < edge) {
            return Err(CraneError::InvalidShape(format!(
                "{shape:?}: breakpoints out of order ({start:?}, {edge}, {end:?})"
            )));
        }
        Ok(Self { shape, start, edge, end })
    }

    pub fn rising(start: f64, edge: f64) -> Result<Self> {
        Self::new(Shape::RisingSlope, Some(start), edge, None)
    }

    pub fn falling(edge: f64, end: f64) -> Result<Self> {
        Self::new(Shape::FallingSlope, None, edge, Some(end))
    }

    pub fn pyramidal(start: f64, edge: f64, end: f64) -> Result<Self> {
        Self::new(Shape::Pyramidal, Some(start), edge, Some(end))
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn start(&self) -> Option<f64> {
        self.start
    }

    pub fn edge(&self) -> f64 {
        self.edge
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Degree of membership of `x`, in `[0, 1]`. Non-finite input has no
    /// membership at all.
    pub fn grade(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return 0.0;
        }
        if x == self.edge {
            return 1.0;
        }

        if x < self.edge {
            if self.shape == Shape::FallingSlope {
                return 1.0;
            }
            return match self.start {
                None => 1.0,
                Some(s) if x <= s => 0.0,
                Some(s) => (x - s) / (self.edge - s),
            };
        }

        if self.shape == Shape::RisingSlope {
            return 1.0;
        }
        match self.end {
            None => 1.0,
            Some(e) if x >= e => 0.0,
            Some(e) => (e - x) / (e - self.edge),
        }
    }

    /// Most representative crisp value of the set, used as its singleton
    /// during defuzzification.
    pub fn peak_value(&self) -> f64 {
        match self.shape {
            Shape::Pyramidal => self.edge,
            Shape::FallingSlope => self.start.map_or(self.edge, |s| (s + self.edge) / 2.0),
            Shape::RisingSlope => self.end.map_or(self.edge, |e| (self.edge + e) / 2.0),
        }
    }
}
