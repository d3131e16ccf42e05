use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::CraneConfig;
use crate::control::{Controller, FuzzyRegulator};
use crate::dynamics::state::{CraneState, StateUpdate, TrackConstants};
use crate::error::Result;
use crate::store::StateStore;
use super::event::{
    ArrivalDetector, EventDetector, RailContactDetector, SimEvent, SwayDetector,
};
use super::integrator;

// ---------------------------------------------------------------------------
// Control tick
// ---------------------------------------------------------------------------

/// One pass of the control pipeline: integrate the committed state over a
/// tick, let the controller pick the new acceleration from the integrated
/// state, then commit the result.
///
/// The store is read once at the start and written once at the end, so
/// readers see either the old or the new state.
pub fn tick(
    store: &StateStore,
    controller: &mut dyn Controller,
    track: &TrackConstants,
) -> Result<CraneState> {
    let state = store.state();
    let destination = store.destination();

    let candidate = integrator::step(&state, track, track.time_quantum);
    let acceleration = controller.control(&candidate, destination);
    let next = candidate.with(StateUpdate::default().acceleration(acceleration));

    store.commit(next)?;
    trace!(position = next.position, angle = next.angle, acceleration, "tick");
    Ok(next)
}

// ---------------------------------------------------------------------------
// Scripted offline runs
// ---------------------------------------------------------------------------

/// Operator input: move the destination before tick `tick` runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestinationChange {
    pub tick: u64,
    pub destination: f64,
}

/// What to run: tick count, starting point and destination schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub ticks: u64,
    /// Defaults to the track midpoint at rest.
    pub initial: Option<CraneState>,
    pub destination: f64,
    pub changes: Vec<DestinationChange>,
}

impl Script {
    pub fn new(ticks: u64, destination: f64) -> Self {
        Self { ticks, initial: None, destination, changes: Vec::new() }
    }

    pub fn starting_at(mut self, state: CraneState) -> Self { self.initial = Some(state); self }

    pub fn change_at(mut self, tick: u64, destination: f64) -> Self {
        self.changes.push(DestinationChange { tick, destination });
        self
    }
}

/// One committed tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub tick: u64,
    pub time: f64, // s
    pub state: CraneState,
    pub destination: f64,
}

#[derive(Debug, Clone)]
pub struct Recording {
    pub controller: String,
    pub track: TrackConstants,
    /// Starts with the initial state at tick 0.
    pub samples: Vec<Sample>,
    pub events: Vec<SimEvent>,
}

impl Recording {
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

/// Run `script` with a custom controller, as fast as possible.
pub fn simulate_with(
    config: &CraneConfig,
    script: &Script,
    controller: &mut dyn Controller,
) -> Result<Recording> {
    config.validate()?;
    let track = config.track;
    let initial = script
        .initial
        .unwrap_or_else(|| CraneState::at_rest(track.midpoint()));
    let store = StateStore::with_state(track, initial, script.destination)?;

    let mut changes = script.changes.clone();
    changes.sort_by_key(|c| c.tick);
    let mut changes = changes.into_iter().peekable();

    let mut detectors: Vec<Box<dyn EventDetector>> = vec![
        Box::new(ArrivalDetector::default()),
        Box::new(RailContactDetector::new(track.track_length)),
        Box::new(SwayDetector::new(config.sway_alarm)),
    ];

    info!(
        controller = controller.name(),
        ticks = script.ticks,
        start = initial.position,
        destination = script.destination,
        "offline run"
    );

    let mut samples = Vec::with_capacity(script.ticks.min(1_000_000) as usize + 1);
    let mut events = Vec::new();
    let mut prev = Sample { tick: 0, time: 0.0, state: initial, destination: store.destination() };
    samples.push(prev);

    for n in 1..=script.ticks {
        while let Some(change) = changes.next_if(|c| c.tick <= n) {
            store.set_destination(change.destination);
        }

        let state = tick(&store, controller, &track)?;
        let sample = Sample {
            tick: n,
            time: n as f64 * track.time_quantum,
            state,
            destination: store.destination(),
        };

        for det in detectors.iter_mut() {
            if let Some(kind) = det.check(&prev, &sample) {
                debug!(tick = n, ?kind, "event");
                events.push(SimEvent { tick: n, time: sample.time, kind, state });
            }
        }

        samples.push(sample);
        prev = sample;
    }

    Ok(Recording {
        controller: controller.name().to_string(),
        track,
        samples,
        events,
    })
}

/// Run `script` with the fuzzy regulator built from `config`.
pub fn simulate(config: &CraneConfig, script: &Script) -> Result<Recording> {
    let mut controller = FuzzyRegulator::from_config(config)?;
    simulate_with(config, script, &mut controller)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ConstantCommand;
    use crate::dynamics::state::MAX_ANGLE;
    use crate::error::CraneError;
    use crate::sim::event::{EventKind, Rail};

    #[test]
    fn tick_commits_controller_command() {
        let track = TrackConstants::default();
        let store = StateStore::new(track);
        let mut ctrl = ConstantCommand(3.0);
        let s = tick(&store, &mut ctrl, &track).unwrap();
        assert_eq!(s.acceleration, 3.0);
        assert_eq!(s.previous_acceleration, 0.0);
        assert_eq!(store.state(), s);
    }

    #[test]
    fn steady_state_on_target() {
        let rec = simulate(&CraneConfig::default(), &Script::new(2_000, 50.0)).unwrap();
        for s in &rec.samples {
            assert_eq!(s.state, CraneState::at_rest(50.0), "moved at tick {}", s.tick);
        }
    }

    #[test]
    fn travels_full_track_without_backtracking() {
        let script = Script::new(10_000, 100.0).starting_at(CraneState::at_rest(0.0));
        let rec = simulate(&CraneConfig::default(), &script).unwrap();
        assert_eq!(rec.samples.len(), 10_001);

        let errors: Vec<f64> = rec
            .samples
            .iter()
            .map(|s| (s.destination - s.state.position).abs())
            .collect();
        for (i, w) in errors.windows(2).enumerate() {
            assert!(w[1] <= w[0] + 1e-9, "error grew at tick {}: {} -> {}", i + 1, w[0], w[1]);
        }

        let last = rec.last().unwrap();
        let final_error = (last.destination - last.state.position).abs();
        assert!(final_error < 0.5, "final error too large: {}", final_error);

        let max_angle = rec.samples.iter().map(|s| s.state.angle.abs()).fold(0.0, f64::max);
        assert!(max_angle < 0.2, "payload swung too far: {}", max_angle);
    }

    #[test]
    fn returns_to_track_start() {
        let script = Script::new(10_000, 0.0).starting_at(CraneState::at_rest(100.0));
        let rec = simulate(&CraneConfig::default(), &script).unwrap();
        let last = rec.last().unwrap();
        assert!(last.state.position < 0.5, "ended at {}", last.state.position);
    }

    #[test]
    fn arrival_is_reported_once() {
        let script = Script::new(10_000, 30.0).starting_at(CraneState::at_rest(80.0));
        let rec = simulate(&CraneConfig::default(), &script).unwrap();
        let arrivals: Vec<_> = rec
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Arrival { .. }))
            .collect();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].kind, EventKind::Arrival { destination: 30.0 });
    }

    #[test]
    fn invariants_hold_under_erratic_operator() {
        let script = Script::new(8_000, 10.0)
            .change_at(300, 95.0)
            .change_at(900, -20.0)
            .change_at(1_000, 150.0)
            .change_at(1_001, 0.0)
            .change_at(2_500, f64::NAN)
            .change_at(4_000, 100.0)
            .change_at(4_050, 33.3);
        let rec = simulate(&CraneConfig::default(), &script).unwrap();
        for s in &rec.samples {
            assert!((0.0..=100.0).contains(&s.state.position), "tick {}: {:?}", s.tick, s.state);
            assert!(s.state.angle.abs() <= MAX_ANGLE, "tick {}: {:?}", s.tick, s.state);
            assert!((0.0..=100.0).contains(&s.destination));
        }
        // clamped, then the NaN request is ignored
        assert_eq!(rec.samples[1_000].destination, 100.0);
        assert_eq!(rec.samples[2_600].destination, 0.0);
        assert_eq!(rec.last().unwrap().destination, 33.3);
    }

    #[test]
    fn open_loop_push_pins_cart_at_the_rail() {
        let script = Script::new(400, 100.0).starting_at(CraneState::at_rest(90.0));
        let mut push = ConstantCommand(500.0);
        let rec = simulate_with(&CraneConfig::default(), &script, &mut push).unwrap();

        assert!(rec
            .events
            .iter()
            .any(|e| e.kind == EventKind::RailContact { rail: Rail::End }));
        // the kick of the first command swings the payload past the alarm
        assert!(rec.events.iter().any(|e| matches!(e.kind, EventKind::SwayAlarm { .. })));

        let last = rec.last().unwrap().state;
        assert_eq!(last.position, 100.0);
        // pinned, but the stored velocity is not zeroed
        assert!(last.velocity > 0.0);
        assert_eq!(rec.controller, "constant");
    }

    #[test]
    fn invalid_start_is_rejected() {
        let script = Script::new(10, 50.0).starting_at(CraneState::at_rest(120.0));
        assert!(matches!(
            simulate(&CraneConfig::default(), &script),
            Err(CraneError::InvariantViolation { .. })
        ));
    }
}
