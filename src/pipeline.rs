//! The sensor-event adapter.
//!
//! [`Pipeline`] is the platform-agnostic replacement for the original
//! activity's tangle of callbacks: it subscribes to raw sensor events,
//! caches the latest gravity and magnetic-field vectors, runs the estimator
//! and calibration engine, and forwards each corrected attitude to a display
//! sink and, while recording, to the session recorder. It has no knowledge
//! of any UI; buttons and dialogs live in whatever host drives it.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use thiserror::Error;
use tracing::{info, trace, warn};

use crate::attitude::Attitude;
use crate::calibration::{
    CalibrationConfig, CalibrationEngine, CalibrationError, CalibrationOffsets,
};
use crate::estimator::OrientationEstimator;
use crate::recorder::{RecorderError, SessionArtifact, SessionMeta, SessionRecorder};
use crate::sensor::{SensorEvent, SensorKind};
use crate::storage::{ArtifactWriter, StorageError};

/// Default sensor sampling period, matching the original app's 50 ms
/// listener registration. A tunable, not a correctness contract.
pub const DEFAULT_SAMPLING_PERIOD_MS: u64 = 50;

/// Pipeline command errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("No failed artifact write to retry")]
    NothingToRetry,
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Nominal delivery period of the host sensor layer.
    pub sampling_period: Duration,
    /// Whether raw sensor samples are logged alongside fused attitudes.
    pub log_raw: bool,
    /// Directory session artifacts are written to.
    pub data_dir: PathBuf,
    pub calibration: CalibrationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_period: Duration::from_millis(DEFAULT_SAMPLING_PERIOD_MS),
            log_raw: true,
            data_dir: crate::storage::default_data_dir().unwrap_or_else(|| PathBuf::from(".")),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_sampling_period(mut self, period: Duration) -> Self {
        self.sampling_period = period;
        self
    }

    pub fn with_log_raw(mut self, log_raw: bool) -> Self {
        self.log_raw = log_raw;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }
}

/// Receives every corrected attitude for live display.
pub trait DisplaySink {
    fn show(&mut self, attitude: &Attitude);
}

/// A sink that discards everything (headless operation).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show(&mut self, _attitude: &Attitude) {}
}

/// Drives sensor events through estimation, calibration, display, and
/// recording. Single-threaded: the host must deliver events serially.
pub struct Pipeline<E> {
    estimator: E,
    calibration: CalibrationEngine,
    recorder: SessionRecorder,
    writer: ArtifactWriter,
    config: PipelineConfig,
    gravity: Option<[f32; 3]>,
    magnetic: Option<[f32; 3]>,
    // Kept until the artifact write succeeds so a failed write can be
    // retried without losing the session.
    unwritten: Option<(SessionArtifact, PathBuf)>,
}

impl<E: OrientationEstimator> Pipeline<E> {
    pub fn new(estimator: E, config: PipelineConfig) -> Self {
        Self {
            estimator,
            calibration: CalibrationEngine::new(config.calibration.clone()),
            recorder: SessionRecorder::new(),
            writer: ArtifactWriter::new(),
            config,
            gravity: None,
            magnetic: None,
            unwritten: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn offsets(&self) -> CalibrationOffsets {
        self.calibration.offsets()
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_calibrating()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Whether an artifact write is outstanding. While true, starting a new
    /// recording is refused.
    pub fn is_writing(&self) -> bool {
        self.writer.is_busy()
    }

    pub fn sample_count(&self) -> usize {
        self.recorder.sample_count()
    }

    /// Process one raw sensor event delivered at `now`.
    ///
    /// Returns the corrected attitude when the event completed a fusion,
    /// `None` when it only updated one of the cached vectors or the
    /// estimator rejected the pair (the event is dropped, never fatal).
    pub fn handle_event_at(
        &mut self,
        event: &SensorEvent,
        now: Instant,
        sink: &mut dyn DisplaySink,
    ) -> Option<Attitude> {
        if self.config.log_raw && self.recorder.is_recording() {
            // The session is open, so logging cannot fail here.
            let _ = self
                .recorder
                .log_raw_at(event.kind, event.values.clone(), now);
        }

        match event.kind {
            SensorKind::Accelerometer => self.gravity = event.as_vector3(),
            SensorKind::Magnetometer => self.magnetic = event.as_vector3(),
            _ => return None,
        }

        let (gravity, magnetic) = match (self.gravity, self.magnetic) {
            (Some(g), Some(m)) => (g, m),
            _ => return None,
        };

        let orientation = match self.estimator.estimate(gravity, magnetic) {
            Ok(orientation) => orientation,
            Err(err) => {
                trace!(%err, "Dropping sensor event");
                return None;
            }
        };

        let observation = self
            .calibration
            .observe_at(Attitude::from_orientation(orientation), now);
        if observation.completed {
            let offsets = self.calibration.offsets();
            info!(
                pitch_offset = offsets.pitch,
                roll_offset = offsets.roll,
                "Calibration offsets updated"
            );
        }

        sink.show(&observation.attitude);
        if self.recorder.is_recording() {
            let _ = self.recorder.log_at(observation.attitude, now);
        }

        Some(observation.attitude)
    }

    /// Process one raw sensor event delivered now.
    pub fn handle_event(
        &mut self,
        event: &SensorEvent,
        sink: &mut dyn DisplaySink,
    ) -> Option<Attitude> {
        self.handle_event_at(event, Instant::now(), sink)
    }

    pub fn start_calibration(&mut self) -> Result<(), PipelineError> {
        self.start_calibration_at(Instant::now())
    }

    pub fn start_calibration_at(&mut self, now: Instant) -> Result<(), PipelineError> {
        self.calibration.start_at(now)?;
        Ok(())
    }

    /// Open a recording session.
    ///
    /// Refused while the previous session's artifact write is outstanding;
    /// harvest it with [`poll_write`](Self::poll_write) or
    /// [`finish_writes`](Self::finish_writes) first.
    pub fn start_recording(&mut self) -> Result<(), PipelineError> {
        self.start_recording_at(Local::now(), Instant::now())
    }

    pub fn start_recording_at(
        &mut self,
        wall: chrono::DateTime<Local>,
        mono: Instant,
    ) -> Result<(), PipelineError> {
        if self.writer.is_busy() {
            warn!("Recording refused: previous artifact write still in flight");
            return Err(StorageError::WritePending.into());
        }
        self.recorder.start_at(wall, mono)?;
        Ok(())
    }

    /// Close the session and hand its artifact to the background writer.
    ///
    /// Returns the destination path. The artifact is kept in memory until
    /// the write is confirmed, so a failed write can be retried.
    pub fn stop_recording(
        &mut self,
        experimenter: &str,
        phone_model: &str,
    ) -> Result<PathBuf, PipelineError> {
        self.stop_recording_at(experimenter, phone_model, Local::now())
    }

    pub fn stop_recording_at(
        &mut self,
        experimenter: &str,
        phone_model: &str,
        ended_wall: chrono::DateTime<Local>,
    ) -> Result<PathBuf, PipelineError> {
        let meta = SessionMeta {
            experimenter: experimenter.to_string(),
            phone_model: phone_model.to_string(),
            calibration: self.calibration.offsets(),
        };
        let output = self.recorder.stop_at(meta, ended_wall)?;
        let path = self.config.data_dir.join(&output.suggested_filename);

        self.unwritten = Some((output.artifact.clone(), path.clone()));
        self.writer.begin(output.artifact, path.clone())?;
        Ok(path)
    }

    /// Harvest a finished artifact write without blocking.
    ///
    /// On success the retained artifact copy is released; on failure it is
    /// kept for [`retry_write`](Self::retry_write).
    pub fn poll_write(&mut self) -> Option<Result<PathBuf, StorageError>> {
        let result = self.writer.try_finish()?;
        Some(self.settle_write(result))
    }

    /// Block until the in-flight write (if any) finishes.
    pub fn finish_writes(&mut self) -> Option<Result<PathBuf, StorageError>> {
        let result = self.writer.wait()?;
        Some(self.settle_write(result))
    }

    /// Re-dispatch the artifact whose write previously failed.
    pub fn retry_write(&mut self) -> Result<(), PipelineError> {
        let (artifact, path) = self.unwritten.clone().ok_or(PipelineError::NothingToRetry)?;
        self.writer.begin(artifact, path)?;
        Ok(())
    }

    fn settle_write(&mut self, result: Result<PathBuf, StorageError>) -> Result<PathBuf, StorageError> {
        match &result {
            Ok(_) => self.unwritten = None,
            Err(err) => warn!(%err, "Artifact write failed; session data retained for retry"),
        }
        result
    }
}
