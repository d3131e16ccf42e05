pub mod error;
pub mod dynamics;
pub mod fuzzy;
pub mod config;
pub mod store;
pub mod control;
pub mod sim;
pub mod crane;
pub mod io;

pub use config::{presets, CraneConfig};
pub use crane::Crane;
pub use error::{CraneError, Result};

pub mod types {
    pub use crate::dynamics::state::{CraneState, StateUpdate, TrackConstants, GRAVITY_CM, MAX_ANGLE};
    pub use crate::fuzzy::{LinguisticVariable, MembershipFunction, Shape, Term};
    pub use crate::sim::{Recording, Sample, Script};
}
