pub mod integrator;
pub mod runner;
pub mod event;
pub mod scheduler;

pub use runner::{simulate, simulate_with, tick, DestinationChange, Recording, Sample, Script};
pub use integrator::step;
pub use event::{EventDetector, EventKind, Rail, SimEvent};
pub use scheduler::Scheduler;
