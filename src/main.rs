//! # crane-sim
//!
//! Headless runner for the anti-sway crane.
//!
//! Usage:
//!   crane-sim                                  # midpoint -> 90, standard preset
//!   crane-sim --start 0 --destination 100      # full track
//!   crane-sim --config crane.toml --csv run.csv --summary run.json
//!   crane-sim --realtime 5                     # threaded loop, wall clock

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crane_sim::io::{self, RunSummary};
use crane_sim::sim::{self, EventKind, Recording, Script};
use crane_sim::types::CraneState;
use crane_sim::{presets, Crane, CraneConfig};

#[derive(Parser)]
#[command(name = "crane-sim")]
#[command(about = "Single-axis trolley crane with a fuzzy anti-sway controller")]
struct Args {
    /// Configuration file (TOML); overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named configuration: standard, gentle
    #[arg(long, default_value = "standard")]
    preset: String,

    /// Starting cart position (defaults to the track midpoint)
    #[arg(long)]
    start: Option<f64>,

    /// Destination of the cart
    #[arg(long, default_value = "90.0")]
    destination: f64,

    /// Number of control ticks to simulate
    #[arg(long, default_value = "10000")]
    ticks: u64,

    /// Write per-tick telemetry as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Keep every Nth tick in the CSV output
    #[arg(long, default_value = "10")]
    csv_every: usize,

    /// Write a JSON run summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Run the threaded control loop for this many seconds instead
    #[arg(long)]
    realtime: Option<f64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CraneConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => match presets::by_name(&args.preset) {
            Some(c) => c,
            None => bail!("unknown preset '{}' (standard, gentle)", args.preset),
        },
    };

    if args.dump_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    match args.realtime {
        Some(seconds) => run_realtime(config, &args, seconds),
        None => run_offline(&config, &args),
    }
}

// ---------------------------------------------------------------------------
// Offline run
// ---------------------------------------------------------------------------

fn run_offline(config: &CraneConfig, args: &Args) -> Result<()> {
    let mut script = Script::new(args.ticks, args.destination);
    if let Some(x) = args.start {
        script = script.starting_at(CraneState::at_rest(x));
    }

    let rec = sim::simulate(config, &script).context("simulation failed")?;
    let summary = RunSummary::from_recording(&rec);

    print_report(config, &rec, &summary);

    if let Some(path) = &args.csv {
        io::write_trajectory_file(path, &rec.samples, args.csv_every)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "trajectory written");
    }
    if let Some(path) = &args.summary {
        io::write_summary_file(path, &summary)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

fn print_report(config: &CraneConfig, rec: &Recording, summary: &RunSummary) {
    let track = &config.track;

    println!();
    println!("====================================================================");
    println!("  CRANE SIMULATION — {}", rec.controller);
    println!("====================================================================");
    println!();
    println!("  Track");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Length:        {:>8.1}       Tick:         {:>8.4} s",
        track.track_length, track.time_quantum
    );
    println!(
        "  Accel time:    {:>8.3} s     Gravity:      {:>8.1}",
        track.min_accel_time, track.gravity_constant
    );
    println!("  Sway alarm:    {:>8.1} deg", config.sway_alarm.to_degrees());
    println!();

    println!("  Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    if rec.events.is_empty() {
        println!("  (none)");
    }
    for e in &rec.events {
        let what = match &e.kind {
            EventKind::Arrival { destination } => format!("ARRIVAL     at {:.2}", destination),
            EventKind::RailContact { rail } => format!("RAIL        {:?}", rail),
            EventKind::SwayAlarm { angle } => format!("SWAY ALARM  {:.1} deg", angle.to_degrees()),
            EventKind::SwayCleared => "SWAY CLEAR".to_string(),
        };
        println!("  t={:>7.3}s   x={:>7.2}   {}", e.time, e.state.position, what);
    }
    println!();

    println!("  Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Start:         {:>8.2}       Destination:  {:>8.2}",
        summary.start_position, summary.final_destination
    );
    println!(
        "  Final pos:     {:>8.3}       Final error:  {:>8.3}",
        summary.final_position, summary.final_error
    );
    println!(
        "  Max |angle|:   {:>8.2} deg   Max |vel|:    {:>8.2}",
        summary.max_abs_angle_rad.to_degrees(),
        summary.max_abs_velocity
    );
    match summary.arrival_time_s {
        Some(t) => println!("  Arrived after: {:>8.3} s", t),
        None => println!("  Arrived after:      n/a"),
    }
    println!();

    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>8}  {:>8}  {:>9}  {:>8}",
        "t (s)", "pos", "vel", "accel", "angle°"
    );
    println!("  {}", "─".repeat(48));

    let interval = (rec.samples.len() / 25).max(1);
    let last = rec.samples.len().saturating_sub(1);
    for (i, s) in rec.samples.iter().enumerate() {
        if i % interval != 0 && i != last {
            continue;
        }
        println!(
            "  {:>7.3}  {:>8.3}  {:>8.3}  {:>9.3}  {:>8.3}",
            s.time,
            s.state.position,
            s.state.velocity,
            s.state.acceleration,
            s.state.angle.to_degrees()
        );
    }

    println!();
    println!("  Simulation: {} ticks, dt={} s", summary.ticks, track.time_quantum);
    println!("====================================================================");
    println!();
}

// ---------------------------------------------------------------------------
// Real-time run
// ---------------------------------------------------------------------------

fn run_realtime(config: CraneConfig, args: &Args, seconds: f64) -> Result<()> {
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("--realtime needs a positive number of seconds, got {seconds}");
    }
    if args.start.is_some() {
        bail!("--start is only supported for offline runs");
    }

    let mut crane = Crane::new(config)?;
    let applied = crane.set_destination(args.destination);
    crane.start();

    let t0 = Instant::now();
    let run_for = Duration::from_secs_f64(seconds);
    while t0.elapsed() < run_for {
        thread::sleep(Duration::from_millis(250));
        let s = crane.state();
        info!(
            t = t0.elapsed().as_secs_f64(),
            position = s.position,
            velocity = s.velocity,
            angle_deg = s.angle.to_degrees(),
            alarm = crane.sway_alarm(),
            "snapshot"
        );
    }

    crane.stop();
    let s = crane.state();
    let (ticks, late) = (crane.ticks(), crane.late_ticks());
    crane.shutdown().context("control loop faulted")?;

    println!(
        "  {} ticks ({} late) in {:.1} s, cart at {:.3} for destination {:.3}, angle {:.2} deg",
        ticks,
        late,
        seconds,
        s.position,
        applied,
        s.angle.to_degrees()
    );
    Ok(())
}
