use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::sim::Sample;

/// One CSV row per committed tick.
#[derive(Debug, Serialize)]
struct Row {
    tick: u64,
    time: f64,
    position: f64,
    velocity: f64,
    acceleration: f64,
    angle_deg: f64,
    destination: f64,
    error: f64,
}

impl From<&Sample> for Row {
    fn from(s: &Sample) -> Self {
        Self {
            tick: s.tick,
            time: s.time,
            position: s.state.position,
            velocity: s.state.velocity,
            acceleration: s.state.acceleration,
            angle_deg: s.state.angle.to_degrees(),
            destination: s.destination,
            error: s.destination - s.state.position,
        }
    }
}

/// Write recorded samples as CSV, one row every `every` ticks (the last
/// sample is always written).
pub fn write_trajectory<W: Write>(writer: W, samples: &[Sample], every: usize) -> Result<()> {
    let every = every.max(1);
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    let last = samples.len().saturating_sub(1);
    for (i, s) in samples.iter().enumerate() {
        if i % every == 0 || i == last {
            wtr.serialize(Row::from(s))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trajectory_file(path: impl AsRef<Path>, samples: &[Sample], every: usize) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_trajectory(file, samples, every)
}
