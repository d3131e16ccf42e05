pub mod membership;
pub mod variable;
pub mod rules;

pub use membership::{MembershipFunction, Shape};
pub use variable::{LinguisticVariable, Term};
pub use rules::{defuzzify, RuleBank};
