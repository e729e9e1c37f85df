//! Bee Labe - attitude logging for behavioral field research
//!
//! This is the trace-replay entry point: it feeds a CSV of raw sensor
//! samples recorded in the field through the fusion/calibration pipeline and
//! exports the session as a JSON artifact.
//!
//! Run with: cargo run -- trace.csv [--calibrate] [--realtime]
//!
//! The trace format is one row per raw sample: `time_ms,sensor,x,y,z`,
//! where `sensor` is one of `acc`, `mag`, `gyro`.

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

use bee_labe::{
    AppSettings, Attitude, CalibrationConfig, DisplaySink, Pipeline, PipelineConfig, SensorEvent,
    SensorKind, TiltCompensatedEstimator,
};

/// One row of a raw sensor trace.
#[derive(Debug, Deserialize)]
struct TraceRow {
    time_ms: u64,
    sensor: String,
    x: f32,
    y: f32,
    z: f32,
}

/// Prints every Nth corrected attitude so a long replay stays readable.
struct ConsoleDisplay {
    every: usize,
    seen: usize,
}

impl DisplaySink for ConsoleDisplay {
    fn show(&mut self, attitude: &Attitude) {
        self.seen += 1;
        if self.seen % self.every == 0 {
            println!("[{}] {}", self.seen, attitude.to_string().replace('\n', "  "));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let calibrate = args.iter().any(|arg| arg == "--calibrate");
    let realtime = args.iter().any(|arg| arg == "--realtime");
    let trace_path = args
        .iter()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .cloned()
        .context("Usage: bee-labe <trace.csv> [--calibrate] [--realtime]")?;

    // Get configuration from saved settings, overridable by environment
    let settings = AppSettings::load();
    let experimenter =
        env::var("EXPERIMENTER_NAME").unwrap_or_else(|_| settings.experimenter.clone());
    let phone_model = env::var("PHONE_MODEL").unwrap_or_else(|_| settings.phone_model.clone());
    let log_raw = env::var("LOG_RAW")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(settings.log_raw);
    let calibration_ms: u64 = env::var("CALIBRATION_DURATION_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.calibration_duration_ms);
    let sampling_period_ms: u64 = env::var("SAMPLING_PERIOD_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.sampling_period_ms);
    let data_dir = env::var("DATA_DIR").ok().or_else(|| {
        if settings.data_dir.is_empty() {
            None
        } else {
            Some(settings.data_dir.clone())
        }
    });

    let mut config = PipelineConfig::default()
        .with_sampling_period(Duration::from_millis(sampling_period_ms))
        .with_log_raw(log_raw)
        .with_calibration(
            CalibrationConfig::default().with_duration(Duration::from_millis(calibration_ms)),
        );
    if let Some(dir) = data_dir {
        config = config.with_data_dir(PathBuf::from(dir));
    }

    info!(
        trace = %trace_path,
        experimenter = %experimenter,
        phone_model = %phone_model,
        "Replaying sensor trace"
    );

    let mut reader = csv::Reader::from_path(&trace_path)
        .with_context(|| format!("Failed to open trace file {}", trace_path))?;
    let rows: Vec<TraceRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .context("Malformed trace row")?;
    if rows.is_empty() {
        anyhow::bail!("Trace file contains no samples");
    }

    let mut pipeline = Pipeline::new(TiltCompensatedEstimator, config);
    let mut display = ConsoleDisplay { every: 20, seen: 0 };

    let base = Instant::now();
    if calibrate {
        pipeline.start_calibration_at(base)?;
        info!(duration_ms = calibration_ms, "Calibrating over leading window");
    }
    pipeline.start_recording_at(chrono::Local::now(), base)?;

    let mut last_time_ms = 0u64;
    for row in &rows {
        if realtime && row.time_ms > last_time_ms {
            tokio::time::sleep(Duration::from_millis(row.time_ms - last_time_ms)).await;
        }
        last_time_ms = row.time_ms;

        let event = SensorEvent::new(
            SensorKind::from_tag(&row.sensor),
            vec![row.x, row.y, row.z],
        );
        pipeline.handle_event_at(&event, base + Duration::from_millis(row.time_ms), &mut display);
    }

    if pipeline.is_calibrating() {
        warn!("Trace ended before the calibration window closed; offsets unchanged");
    }

    let offsets = pipeline.offsets();
    info!(
        samples = pipeline.sample_count(),
        pitch_offset = offsets.pitch,
        roll_offset = offsets.roll,
        "Replay finished"
    );

    let path = pipeline.stop_recording(&experimenter, &phone_model)?;
    info!(destination = %path.display(), "Writing session artifact");
    match pipeline.finish_writes() {
        Some(Ok(written)) => println!("Session saved to {}", written.display()),
        Some(Err(err)) => anyhow::bail!("Failed to write session artifact: {}", err),
        None => anyhow::bail!("No artifact write was started"),
    }

    Ok(())
}
