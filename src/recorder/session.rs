//! The session recorder state machine.
//!
//! Exactly two states: idle and recording. `start` opens a session, `log` /
//! `log_raw` append to it, `stop` consumes it and emits the artifact. All
//! samples stay in memory for the session's duration; nothing is flushed
//! incrementally, so a session is never partially serialized.

use std::time::Instant;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;

use crate::attitude::Attitude;
use crate::calibration::CalibrationOffsets;
use crate::recorder::artifact::{
    artifact_filename, AttitudePoint, RawPoint, SessionArtifact, ARTIFACT_TIME_FORMAT,
};
use crate::sensor::SensorKind;

/// Recorder errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderError {
    #[error("A recording session is already open")]
    AlreadyRecording,
    #[error("No recording session is open")]
    NotRecording,
}

/// Collaborator-supplied metadata attached to the artifact at stop time.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub experimenter: String,
    pub phone_model: String,
    /// The calibration offsets in effect at recording time, radians.
    pub calibration: CalibrationOffsets,
}

/// A stopped session: the artifact plus the filename the storage
/// collaborator should use for it.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub artifact: SessionArtifact,
    pub suggested_filename: String,
}

#[derive(Debug)]
struct RecordingSession {
    started_wall: DateTime<Local>,
    started_mono: Instant,
    samples: Vec<AttitudePoint>,
    raw_samples: Vec<RawPoint>,
}

impl RecordingSession {
    fn elapsed_ms(&self, now: Instant) -> u64 {
        // Sub-millisecond precision truncates.
        now.duration_since(self.started_mono).as_millis() as u64
    }
}

/// Buffers timestamped samples during a recording session and serializes
/// them deterministically on stop.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    session: Option<RecordingSession>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Number of attitude samples in the open session, 0 when idle.
    pub fn sample_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.samples.len())
    }

    /// Number of raw samples in the open session, 0 when idle.
    pub fn raw_sample_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.raw_samples.len())
    }

    /// Open a new session now.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        self.start_at(Local::now(), Instant::now())
    }

    /// Open a new session with an explicit wall-clock start and monotonic
    /// reference instant.
    pub fn start_at(&mut self, wall: DateTime<Local>, mono: Instant) -> Result<(), RecorderError> {
        if self.session.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        self.session = Some(RecordingSession {
            started_wall: wall,
            started_mono: mono,
            samples: Vec::new(),
            raw_samples: Vec::new(),
        });
        info!("Recording started");
        Ok(())
    }

    /// Append one corrected attitude sample.
    pub fn log(&mut self, attitude: Attitude) -> Result<(), RecorderError> {
        self.log_at(attitude, Instant::now())
    }

    /// Append one corrected attitude sample observed at `now`.
    pub fn log_at(&mut self, attitude: Attitude, now: Instant) -> Result<(), RecorderError> {
        let session = self.session.as_mut().ok_or(RecorderError::NotRecording)?;
        let time = session.elapsed_ms(now);
        session.samples.push(AttitudePoint {
            time,
            yaw: attitude.yaw,
            pitch: attitude.pitch,
            roll: attitude.roll,
        });
        Ok(())
    }

    /// Append one raw sensor sample.
    pub fn log_raw(&mut self, kind: SensorKind, values: Vec<f32>) -> Result<(), RecorderError> {
        self.log_raw_at(kind, values, Instant::now())
    }

    /// Append one raw sensor sample observed at `now`.
    pub fn log_raw_at(
        &mut self,
        kind: SensorKind,
        values: Vec<f32>,
        now: Instant,
    ) -> Result<(), RecorderError> {
        let session = self.session.as_mut().ok_or(RecorderError::NotRecording)?;
        let time = session.elapsed_ms(now);
        session.raw_samples.push(RawPoint { time, kind, values });
        Ok(())
    }

    /// Close the session now and produce its artifact.
    pub fn stop(&mut self, meta: SessionMeta) -> Result<SessionOutput, RecorderError> {
        self.stop_at(meta, Local::now())
    }

    /// Close the session with an explicit wall-clock end time.
    ///
    /// The session is consumed and cleared exactly here; a new `start` sees
    /// none of its samples. `raw_data` is omitted from the artifact when no
    /// raw samples were logged.
    pub fn stop_at(
        &mut self,
        meta: SessionMeta,
        ended_wall: DateTime<Local>,
    ) -> Result<SessionOutput, RecorderError> {
        let session = self.session.take().ok_or(RecorderError::NotRecording)?;

        info!(
            samples = session.samples.len(),
            raw_samples = session.raw_samples.len(),
            "Recording stopped"
        );

        let suggested_filename = artifact_filename(&session.started_wall, &meta.experimenter);
        let raw_data = if session.raw_samples.is_empty() {
            None
        } else {
            Some(session.raw_samples)
        };

        let artifact = SessionArtifact {
            start_time: session
                .started_wall
                .format(ARTIFACT_TIME_FORMAT)
                .to_string(),
            end_time: ended_wall.format(ARTIFACT_TIME_FORMAT).to_string(),
            experimenter: meta.experimenter,
            phone_model: meta.phone_model,
            calibration: meta.calibration,
            data: session.samples,
            raw_data,
        };

        Ok(SessionOutput {
            artifact,
            suggested_filename,
        })
    }
}
