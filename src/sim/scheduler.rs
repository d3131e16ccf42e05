//! Fixed-rate control loop on a dedicated worker thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::control::Controller;
use crate::error::{CraneError, Result};
use crate::store::StateStore;
use super::runner::tick;

#[derive(Debug, Default)]
struct Shared {
    enabled: AtomicBool,
    alive: AtomicBool,
    ticks: AtomicU64,
    late_ticks: AtomicU64,
    fault: Mutex<Option<CraneError>>,
}

/// Owns the worker running one control tick per `time_quantum`.
///
/// The worker is spawned disabled. [`start`](Self::start) and
/// [`stop`](Self::stop) toggle it at tick boundaries; the store keeps its
/// last committed state while stopped. [`shutdown`](Self::shutdown) wakes
/// the worker immediately, joins it and reports a fault if the loop died.
#[derive(Debug)]
pub struct Scheduler {
    shared: Arc<Shared>,
    cancel: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn(store: Arc<StateStore>, controller: Box<dyn Controller + Send>) -> Result<Self> {
        store.track().validate()?;
        let period = Duration::try_from_secs_f64(store.track().time_quantum)
            .map_err(|e| CraneError::InvalidConfig(format!("time_quantum: {e}")))?;
        let shared = Arc::new(Shared::default());
        shared.alive.store(true, Ordering::Release);
        let (cancel, cancelled) = mpsc::channel();

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("crane-control".into())
            .spawn(move || run(&store, controller, period, &worker, &cancelled))?;

        Ok(Self { shared, cancel: Some(cancel), handle: Some(handle) })
    }

    pub fn start(&self) {
        if !self.shared.alive.load(Ordering::Acquire) {
            warn!("control loop has exited, start ignored");
            return;
        }
        if !self.shared.enabled.swap(true, Ordering::AcqRel) {
            info!("control loop started");
        }
    }

    pub fn stop(&self) {
        if self.shared.enabled.swap(false, Ordering::AcqRel) {
            info!("control loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire) && self.shared.alive.load(Ordering::Acquire)
    }

    /// Ticks committed so far.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Deadlines the worker woke up after.
    pub fn late_ticks(&self) -> u64 {
        self.shared.late_ticks.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for it. Returns the fault that ended the
    /// loop, if any. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.shared.enabled.store(false, Ordering::Release);
        // Disconnecting the channel wakes the worker out of its wait.
        drop(self.cancel.take());
        if handle.join().is_err() {
            error!("control loop panicked");
            return Err(CraneError::SchedulerPanicked);
        }
        info!(ticks = self.ticks(), late = self.late_ticks(), "control loop shut down");
        match self.shared.fault.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "control loop ended with a fault");
        }
    }
}

fn run(
    store: &StateStore,
    mut controller: Box<dyn Controller + Send>,
    period: Duration,
    shared: &Shared,
    cancelled: &mpsc::Receiver<()>,
) {
    let track = *store.track();
    let mut deadline = Instant::now() + period;

    loop {
        match cancelled.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let enabled = shared.enabled.load(Ordering::Acquire);
        if enabled {
            if let Err(e) = tick(store, controller.as_mut(), &track) {
                error!(error = %e, "control loop halted");
                *shared.fault.lock() = Some(e);
                shared.alive.store(false, Ordering::Release);
                shared.enabled.store(false, Ordering::Release);
                break;
            }
            shared.ticks.fetch_add(1, Ordering::Relaxed);
        }

        deadline += period;
        let now = Instant::now();
        if now > deadline {
            // Re-anchor instead of bursting through the missed deadlines.
            // Idle wake-ups are not control ticks and are not counted.
            if enabled {
                let late = shared.late_ticks.fetch_add(1, Ordering::Relaxed) + 1;
                if late % 1000 == 1 {
                    warn!(late, behind_us = (now - deadline).as_micros() as u64, "control tick late");
                }
            }
            deadline = now;
        }
    }

    shared.alive.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ConstantCommand, FuzzyRegulator};
    use crate::config::CraneConfig;
    use crate::dynamics::state::{CraneState, TrackConstants};

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let limit = Instant::now() + Duration::from_secs(5);
        while Instant::now() < limit {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    fn fuzzy() -> Box<dyn Controller + Send> {
        Box::new(FuzzyRegulator::from_config(&CraneConfig::default()).unwrap())
    }

    #[test]
    fn spawned_disabled() {
        let store = Arc::new(StateStore::new(TrackConstants::default()));
        store.set_destination(90.0);
        let mut sched = Scheduler::spawn(Arc::clone(&store), fuzzy()).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!sched.is_running());
        assert_eq!(sched.ticks(), 0);
        assert_eq!(store.state(), CraneState::at_rest(50.0));
        sched.shutdown().unwrap();
    }

    #[test]
    fn start_moves_cart_and_stop_freezes_it() {
        let store = Arc::new(StateStore::new(TrackConstants::default()));
        store.set_destination(90.0);
        let mut sched = Scheduler::spawn(Arc::clone(&store), fuzzy()).unwrap();

        sched.start();
        assert!(sched.is_running());
        assert!(wait_until(|| sched.ticks() >= 20), "worker never ticked");
        assert!(store.state().position > 50.0);

        sched.stop();
        assert!(!sched.is_running());
        thread::sleep(Duration::from_millis(10));
        let (ticks, frozen) = (sched.ticks(), store.state());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sched.ticks(), ticks);
        assert_eq!(store.state(), frozen);

        // resumes from the frozen state
        sched.start();
        assert!(wait_until(|| sched.ticks() > ticks + 5));
        assert!(store.state().position >= frozen.position);
        sched.shutdown().unwrap();
        assert!(!sched.is_running());
    }

    #[test]
    fn idle_wakeups_are_not_late_ticks() {
        // A 1 us period is missed on nearly every wake-up.
        let track = TrackConstants { time_quantum: 1e-6, ..TrackConstants::default() };
        let store = Arc::new(StateStore::new(track));
        let mut sched = Scheduler::spawn(store, Box::new(ConstantCommand(0.0))).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sched.ticks(), 0);
        assert_eq!(sched.late_ticks(), 0);
        sched.shutdown().unwrap();
    }

    #[test]
    fn shutdown_interrupts_long_wait() {
        let track = TrackConstants { time_quantum: 30.0, ..TrackConstants::default() };
        let store = Arc::new(StateStore::new(track));
        let mut sched = Scheduler::spawn(store, Box::new(ConstantCommand(0.0))).unwrap();
        sched.start();

        let t0 = Instant::now();
        sched.shutdown().unwrap();
        assert!(t0.elapsed() < Duration::from_secs(5), "shutdown waited for the tick");
        // second call is a no-op
        sched.shutdown().unwrap();
    }

    #[test]
    fn invariant_violation_halts_the_loop() {
        let store = Arc::new(StateStore::new(TrackConstants::default()));
        let mut sched =
            Scheduler::spawn(Arc::clone(&store), Box::new(ConstantCommand(f64::NAN))).unwrap();
        sched.start();
        assert!(wait_until(|| !sched.is_running()), "loop kept running");

        // the last good state is still there
        let s = store.state();
        assert!(s.position.is_finite() && s.angle.is_finite());

        sched.start();
        assert!(!sched.is_running());
        assert!(matches!(sched.shutdown(), Err(CraneError::InvariantViolation { .. })));
    }
}
