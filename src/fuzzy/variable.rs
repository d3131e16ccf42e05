use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::membership::MembershipFunction;

/// Linguistic term of a three-valued variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Negative,
    Zero,
    Positive,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::Negative, Term::Zero, Term::Positive];

    /// Row/column of the term in grade vectors and the rule table.
    pub fn index(self) -> usize {
        match self {
            Term::Negative => 0,
            Term::Zero => 1,
            Term::Positive => 2,
        }
    }
}

/// A measured or output quantity described by Negative/Zero/Positive sets.
#[derive(Debug, Clone, PartialEq)]
pub struct LinguisticVariable {
    name: String,
    sets: [MembershipFunction; 3],
}

impl LinguisticVariable {
    pub fn new(
        name: impl Into<String>,
        negative: MembershipFunction,
        zero: MembershipFunction,
        positive: MembershipFunction,
    ) -> Self {
        Self {
            name: name.into(),
            sets: [negative, zero, positive],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn term(&self, term: Term) -> &MembershipFunction {
        &self.sets[term.index()]
    }

    /// Membership of `x` in each term, Negative/Zero/Positive order.
    pub fn fuzzify(&self, x: f64) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.sets[i].grade(x))
    }

    /// Singleton of each term, Negative/Zero/Positive order.
    pub fn peaks(&self) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.sets[i].peak_value())
    }
}
