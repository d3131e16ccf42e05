//! Shared crane state.
//!
//! The store is the only owner of the crane state and the destination. The
//! control loop replaces the state wholesale through [`StateStore::commit`];
//! readers get `Copy` snapshots and never observe a half-written state.

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::dynamics::state::{CraneState, TrackConstants};
use crate::error::{CraneError, Result};

#[derive(Debug)]
pub struct StateStore {
    track: TrackConstants,
    state: RwLock<CraneState>,
    destination: RwLock<f64>,
}

impl StateStore {
    /// Cart at the track midpoint, at rest, with the destination where it
    /// stands.
    pub fn new(track: TrackConstants) -> Self {
        let start = track.midpoint();
        Self {
            track,
            state: RwLock::new(CraneState::at_rest(start)),
            destination: RwLock::new(start),
        }
    }

    /// Start from an arbitrary valid state and destination.
    pub fn with_state(track: TrackConstants, state: CraneState, destination: f64) -> Result<Self> {
        state.check(&track)?;
        let store = Self {
            track,
            state: RwLock::new(state),
            destination: RwLock::new(track.midpoint()),
        };
        store.try_set_destination(destination)?;
        Ok(store)
    }

    pub fn track(&self) -> &TrackConstants {
        &self.track
    }

    /// Consistent snapshot of the last committed state.
    pub fn state(&self) -> CraneState {
        *self.state.read()
    }

    /// Atomically replace the state. Off-track states are refused and the
    /// previous state is kept.
    pub fn commit(&self, new_state: CraneState) -> Result<()> {
        if let Err(e) = new_state.check(&self.track) {
            error!(?new_state, "refusing to commit state outside track bounds");
            return Err(e);
        }
        *self.state.write() = new_state;
        Ok(())
    }

    pub fn destination(&self) -> f64 {
        *self.destination.read()
    }

    /// Move the destination, clamping it onto the track. Returns the value
    /// actually stored; non-finite requests leave the destination unchanged.
    pub fn set_destination(&self, x: f64) -> f64 {
        if !x.is_finite() {
            warn!(requested = x, "ignoring non-finite destination");
            return self.destination();
        }
        let clamped = self.track.clamp_position(x);
        if clamped != x {
            warn!(requested = x, applied = clamped, "destination clamped to track");
        }
        *self.destination.write() = clamped;
        debug!(destination = clamped, "destination set");
        clamped
    }

    /// Move the destination, refusing anything off the track.
    pub fn try_set_destination(&self, x: f64) -> Result<()> {
        if !(x.is_finite() && (0.0..=self.track.track_length).contains(&x)) {
            return Err(CraneError::InvalidDestination(x));
        }
        *self.destination.write() = x;
        debug!(destination = x, "destination set");
        Ok(())
    }
}
