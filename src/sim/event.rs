use serde::Serialize;

use crate::dynamics::state::CraneState;
use super::runner::Sample;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rail {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Cart settled on its destination.
    Arrival { destination: f64 },
    /// Cart ran into a rail and is pinned there.
    RailContact { rail: Rail },
    /// |angle| rose above the alarm threshold.
    SwayAlarm { angle: f64 },
    /// |angle| fell back to or below the alarm threshold.
    SwayCleared,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    pub tick: u64,
    pub time: f64,
    pub kind: EventKind,
    pub state: CraneState,
}

/// Passive observer of consecutive committed samples.
pub trait EventDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind>;
}

/// Fires once when the cart is within `tolerance` of its destination and
/// slower than `speed_tolerance`. Re-arms whenever the destination moves.
#[derive(Debug, Clone)]
pub struct ArrivalDetector {
    pub tolerance: f64,
    pub speed_tolerance: f64,
    armed: bool,
}

impl ArrivalDetector {
    pub fn new(tolerance: f64, speed_tolerance: f64) -> Self {
        Self { tolerance, speed_tolerance, armed: true }
    }
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

impl EventDetector for ArrivalDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        if current.destination != prev.destination {
            self.armed = true;
        }
        if !self.armed {
            return None;
        }
        let s = &current.state;
        if (current.destination - s.position).abs() <= self.tolerance
            && s.velocity.abs() <= self.speed_tolerance
        {
            self.armed = false;
            Some(EventKind::Arrival { destination: current.destination })
        } else {
            None
        }
    }
}

/// Detects the cart reaching either end of the track.
#[derive(Debug, Clone)]
pub struct RailContactDetector {
    pub track_length: f64,
}

impl RailContactDetector {
    pub fn new(track_length: f64) -> Self {
        Self { track_length }
    }

    fn rail(&self, position: f64) -> Option<Rail> {
        if position <= 0.0 {
            Some(Rail::Start)
        } else if position >= self.track_length {
            Some(Rail::End)
        } else {
            None
        }
    }
}

impl EventDetector for RailContactDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        match (self.rail(prev.state.position), self.rail(current.state.position)) {
            (None, Some(rail)) => Some(EventKind::RailContact { rail }),
            _ => None,
        }
    }
}

/// Sway alarm with the threshold taken from the configuration.
#[derive(Debug, Clone)]
pub struct SwayDetector {
    pub threshold: f64,
}

impl SwayDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl EventDetector for SwayDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        let was = prev.state.angle.abs() > self.threshold;
        let is = current.state.angle.abs() > self.threshold;
        match (was, is) {
            (false, true) => Some(EventKind::SwayAlarm { angle: current.state.angle }),
            (true, false) => Some(EventKind::SwayCleared),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64, state: CraneState, destination: f64) -> Sample {
        Sample { tick, time: tick as f64 * 0.001, state, destination }
    }

    #[test]
    fn arrival_fires_once_and_rearms_on_new_destination() {
        let mut det = ArrivalDetector::default();
        let far = sample(0, CraneState::at_rest(20.0), 30.0);
        let near = sample(1, CraneState::at_rest(29.8), 30.0);
        let still_near = sample(2, CraneState::at_rest(29.9), 30.0);
        assert_eq!(det.check(&far, &near), Some(EventKind::Arrival { destination: 30.0 }));
        assert_eq!(det.check(&near, &still_near), None);

        let moved = sample(3, CraneState::at_rest(29.9), 60.0);
        assert_eq!(det.check(&still_near, &moved), None);
        let there = sample(4, CraneState::at_rest(60.0), 60.0);
        assert_eq!(det.check(&moved, &there), Some(EventKind::Arrival { destination: 60.0 }));
    }

    #[test]
    fn passing_through_fast_is_not_arrival() {
        let mut det = ArrivalDetector::default();
        let a = sample(0, CraneState::at_rest(29.0), 30.0);
        let b = sample(1, CraneState { velocity: 20.0, ..CraneState::at_rest(30.0) }, 30.0);
        assert_eq!(det.check(&a, &b), None);
    }

    #[test]
    fn rail_contact_on_entry_only() {
        let mut det = RailContactDetector::new(100.0);
        let inside = sample(0, CraneState::at_rest(99.9), 100.0);
        let pinned = sample(1, CraneState::at_rest(100.0), 100.0);
        assert_eq!(det.check(&inside, &pinned), Some(EventKind::RailContact { rail: Rail::End }));
        assert_eq!(det.check(&pinned, &pinned), None);

        let start = sample(2, CraneState::at_rest(0.0), 0.0);
        let near = sample(1, CraneState::at_rest(0.2), 0.0);
        assert_eq!(det.check(&near, &start), Some(EventKind::RailContact { rail: Rail::Start }));
    }

    #[test]
    fn sway_alarm_raises_and_clears() {
        let mut det = SwayDetector::new(0.2);
        let calm = sample(0, CraneState::at_rest(50.0), 50.0);
        let swinging = sample(1, CraneState { angle: -0.3, ..CraneState::at_rest(50.0) }, 50.0);
        assert_eq!(det.check(&calm, &swinging), Some(EventKind::SwayAlarm { angle: -0.3 }));
        assert_eq!(det.check(&swinging, &swinging), None);
        assert_eq!(det.check(&swinging, &calm), Some(EventKind::SwayCleared));
    }
}
