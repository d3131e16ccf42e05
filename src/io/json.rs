use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sim::{EventKind, Recording};

/// Headline numbers of a recorded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub controller: String,
    pub ticks: u64,
    pub duration_s: f64,
    pub start_position: f64,
    pub final_position: f64,
    pub final_destination: f64,
    pub final_error: f64,
    pub max_abs_angle_rad: f64,
    pub max_abs_velocity: f64,
    /// Time of the first arrival, if the cart ever settled.
    pub arrival_time_s: Option<f64>,
    pub rail_contacts: usize,
    pub sway_alarms: usize,
}

impl RunSummary {
    pub fn from_recording(rec: &Recording) -> Self {
        let first = rec.samples.first();
        let last = rec.samples.last();

        let max_abs_angle_rad = rec
            .samples
            .iter()
            .map(|s| s.state.angle.abs())
            .fold(0.0_f64, f64::max);
        let max_abs_velocity = rec
            .samples
            .iter()
            .map(|s| s.state.velocity.abs())
            .fold(0.0_f64, f64::max);

        let count = |pred: fn(&EventKind) -> bool| rec.events.iter().filter(|e| pred(&e.kind)).count();

        let final_position = last.map_or(0.0, |s| s.state.position);
        let final_destination = last.map_or(0.0, |s| s.destination);

        RunSummary {
            controller: rec.controller.clone(),
            ticks: last.map_or(0, |s| s.tick),
            duration_s: last.map_or(0.0, |s| s.time),
            start_position: first.map_or(0.0, |s| s.state.position),
            final_position,
            final_destination,
            final_error: final_destination - final_position,
            max_abs_angle_rad,
            max_abs_velocity,
            arrival_time_s: rec
                .events
                .iter()
                .find(|e| matches!(e.kind, EventKind::Arrival { .. }))
                .map(|e| e.time),
            rail_contacts: count(|k| matches!(k, EventKind::RailContact { .. })),
            sway_alarms: count(|k| matches!(k, EventKind::SwayAlarm { .. })),
        }
    }
}

/// Pretty-printed JSON of the summary.
pub fn write_summary<W: Write>(writer: W, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

pub fn write_summary_file(path: impl AsRef<Path>, summary: &RunSummary) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_summary(file, summary)
}
