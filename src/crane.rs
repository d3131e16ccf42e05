use std::sync::Arc;

use tracing::info;

use crate::config::CraneConfig;
use crate::control::{Controller, FuzzyRegulator};
use crate::dynamics::state::{CraneState, TrackConstants};
use crate::error::Result;
use crate::sim::Scheduler;
use crate::store::StateStore;

// ---------------------------------------------------------------------------
// Crane: store + control loop, the surface a UI talks to
// ---------------------------------------------------------------------------

/// A running crane. The control loop starts disabled; call
/// [`start`](Self::start) to let it move the cart.
#[derive(Debug)]
pub struct Crane {
    config: CraneConfig,
    store: Arc<StateStore>,
    scheduler: Scheduler,
}

impl Crane {
    /// Crane driven by the fuzzy regulator described by `config`.
    pub fn new(config: CraneConfig) -> Result<Self> {
        config.validate()?;
        let regulator = FuzzyRegulator::from_config(&config)?;
        Self::with_controller(config, Box::new(regulator))
    }

    pub fn with_controller(
        config: CraneConfig,
        controller: Box<dyn Controller + Send>,
    ) -> Result<Self> {
        config.validate()?;
        let name = controller.name().to_string();
        let store = Arc::new(StateStore::new(config.track));
        let scheduler = Scheduler::spawn(Arc::clone(&store), controller)?;
        info!(
            controller = %name,
            track_length = config.track.track_length,
            tick_s = config.track.time_quantum,
            "crane ready"
        );
        Ok(Self { config, store, scheduler })
    }

    pub fn config(&self) -> &CraneConfig {
        &self.config
    }

    pub fn track(&self) -> &TrackConstants {
        self.store.track()
    }

    /// Shared handle for observers that outlive a borrow of the crane.
    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    pub fn state(&self) -> CraneState {
        self.store.state()
    }

    pub fn destination(&self) -> f64 {
        self.store.destination()
    }

    /// Clamped onto the track; returns the applied destination.
    pub fn set_destination(&self, x: f64) -> f64 {
        self.store.set_destination(x)
    }

    pub fn try_set_destination(&self, x: f64) -> Result<()> {
        self.store.try_set_destination(x)
    }

    pub fn start(&self) { self.scheduler.start() }
    pub fn stop(&self) { self.scheduler.stop() }
    pub fn is_running(&self) -> bool { self.scheduler.is_running() }
    pub fn ticks(&self) -> u64 { self.scheduler.ticks() }
    pub fn late_ticks(&self) -> u64 { self.scheduler.late_ticks() }

    /// |angle| above the configured alarm threshold.
    pub fn sway_alarm(&self) -> bool {
        self.state().angle.abs() > self.config.sway_alarm
    }

    /// Stop the control loop for good. Reports the fault that ended it, if
    /// any.
    pub fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use crate::control::ConstantCommand;
    use crate::error::CraneError;

    #[test]
    fn fresh_crane_is_parked_at_midpoint() {
        let mut crane = Crane::new(CraneConfig::default()).unwrap();
        assert!(!crane.is_running());
        assert_eq!(crane.state(), CraneState::at_rest(50.0));
        assert_eq!(crane.destination(), 50.0);
        assert!(!crane.sway_alarm());
        crane.shutdown().unwrap();
    }

    #[test]
    fn destination_policies() {
        let crane = Crane::new(CraneConfig::default()).unwrap();
        assert_eq!(crane.set_destination(250.0), 100.0);
        assert!(matches!(
            crane.try_set_destination(-1.0),
            Err(CraneError::InvalidDestination(_))
        ));
        assert_eq!(crane.destination(), 100.0);
        crane.try_set_destination(20.0).unwrap();
        assert_eq!(crane.destination(), 20.0);
    }

    #[test]
    fn runs_towards_destination_in_real_time() {
        let mut crane = Crane::new(CraneConfig::default()).unwrap();
        crane.set_destination(10.0);
        crane.start();

        let limit = Instant::now() + Duration::from_secs(5);
        while crane.ticks() < 50 && Instant::now() < limit {
            thread::sleep(Duration::from_millis(2));
        }
        crane.stop();
        assert!(crane.ticks() >= 50, "only {} ticks", crane.ticks());
        let s = crane.state();
        assert!(s.position < 50.0 && s.velocity < 0.0, "{:?}", s);
        assert!(s.position >= 0.0 && s.angle.abs() <= std::f64::consts::FRAC_PI_2);
        crane.shutdown().unwrap();
    }

    #[test]
    fn bad_config_is_rejected_up_front() {
        let mut config = CraneConfig::default();
        config.track.time_quantum = -1.0;
        assert!(Crane::new(config.clone()).is_err());
        assert!(Crane::with_controller(config, Box::new(ConstantCommand(0.0))).is_err());
    }
}
