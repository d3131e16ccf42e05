use nalgebra::{Matrix3, Vector3};

use super::variable::Term;

// ---------------------------------------------------------------------------
// Two-input, one-output Mamdani rule bank
// ---------------------------------------------------------------------------

/// Consequent term for every (distance, angle) antecedent pair.
///
/// Antecedents are combined with `min`, rules sharing a consequent are
/// aggregated with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleBank {
    consequents: [[Term; 3]; 3], // [distance][angle]
}

impl Default for RuleBank {
    fn default() -> Self {
        Self::anti_sway()
    }
}

impl RuleBank {
    pub fn new(consequents: [[Term; 3]; 3]) -> Self {
        Self { consequents }
    }

    /// The crane table: brake whenever the payload leans towards overshoot,
    /// hold still on target with the rope vertical, drive towards the target
    /// when the payload leans away from it.
    pub fn anti_sway() -> Self {
        use Term::{Negative as N, Positive as P, Zero as Z};
        Self::new([
            // angle:  N  Z  P
            [N, P, P], // distance N
            [N, Z, P], // distance Z
            [N, N, P], // distance P
        ])
    }

    pub fn consequent(&self, distance: Term, angle: Term) -> Term {
        self.consequents[distance.index()][angle.index()]
    }

    /// Firing strength of every rule, indexed `(distance, angle)`.
    pub fn firing(&self, distance: &Vector3<f64>, angle: &Vector3<f64>) -> Matrix3<f64> {
        Matrix3::from_fn(|i, j| distance[i].min(angle[j]))
    }

    /// Membership of each output term after max-aggregation.
    pub fn evaluate(&self, distance: &Vector3<f64>, angle: &Vector3<f64>) -> Vector3<f64> {
        let firing = self.firing(distance, angle);
        let mut output = Vector3::<f64>::zeros();
        for d in Term::ALL {
            for a in Term::ALL {
                let k = self.consequent(d, a).index();
                output[k] = output[k].max(firing[(d.index(), a.index())]);
            }
        }
        output
    }
}

/// Weighted average of the output singletons. No fired rule yields exactly
/// zero instead of a division by zero.
pub fn defuzzify(grades: &Vector3<f64>, peaks: &Vector3<f64>) -> f64 {
    let weight = grades.sum();
    if weight <= 0.0 {
        return 0.0;
    }
    grades.dot(peaks) / weight
}
