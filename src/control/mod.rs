pub mod controller;
pub mod fuzzy;

pub use controller::{ConstantCommand, Controller};
pub use fuzzy::{FuzzyRegulator, Inference};
