//! Zero-offset calibration engine.
//!
//! A researcher mounts the phone, presses "calibrate", and holds still. For
//! the calibration window every raw attitude is buffered; when the window
//! elapses the mean buffered pitch and roll become the new offsets, and every
//! subsequent observation has them subtracted. Yaw is heading, not
//! mounting tilt, and is never calibrated.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::attitude::Attitude;

/// Calibration window length used by the original field app.
pub const DEFAULT_CALIBRATION_DURATION_MS: u64 = 3000;

/// Calibration errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("Calibration already in progress")]
    AlreadyCalibrating,
}

/// Configuration for the calibration engine.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// How long samples are accumulated before offsets are computed.
    pub duration: Duration,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(DEFAULT_CALIBRATION_DURATION_MS),
        }
    }
}

impl CalibrationConfig {
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// The pitch/roll corrections currently in effect, radians.
///
/// Zero until the first completed calibration; overwritten only by the next
/// completed calibration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationOffsets {
    pub pitch: f32,
    pub roll: f32,
}

/// Result of feeding one raw attitude through the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// The offset-corrected attitude for display and recording.
    pub attitude: Attitude,
    /// True exactly once per calibration cycle, on the sample that closed the
    /// window. The corrected attitude of that sample already uses the new
    /// offsets.
    pub completed: bool,
}

/// Owns the zero-offset calibration protocol.
///
/// Samples are buffered only while a calibration is in progress; the buffer
/// is cleared exactly once, when the window closes. All methods are
/// synchronous and expect serialized delivery of sensor events.
#[derive(Debug)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
    offsets: CalibrationOffsets,
    samples: Vec<Attitude>,
    started_at: Option<Instant>,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            offsets: CalibrationOffsets::default(),
            samples: Vec::new(),
            started_at: None,
        }
    }

    /// The offsets currently applied by [`observe`](Self::observe).
    pub fn offsets(&self) -> CalibrationOffsets {
        self.offsets
    }

    pub fn is_calibrating(&self) -> bool {
        self.started_at.is_some()
    }

    /// Begin a calibration window now.
    pub fn start(&mut self) -> Result<(), CalibrationError> {
        self.start_at(Instant::now())
    }

    /// Begin a calibration window at `now`.
    ///
    /// Rejected (not queued) while a window is already open. Existing offsets
    /// stay in effect for live correction until the new ones replace them.
    pub fn start_at(&mut self, now: Instant) -> Result<(), CalibrationError> {
        if self.started_at.is_some() {
            return Err(CalibrationError::AlreadyCalibrating);
        }

        self.samples.clear();
        self.started_at = Some(now);
        info!("Calibration started");
        Ok(())
    }

    /// Feed one freshly normalized, offset-uncorrected attitude.
    pub fn observe(&mut self, raw: Attitude) -> Observation {
        self.observe_at(raw, Instant::now())
    }

    /// Feed one raw attitude observed at `now`.
    ///
    /// Returns the corrected attitude: pitch and roll have the current
    /// offsets subtracted, yaw passes through. While a window is open the
    /// raw sample is buffered; the sample that closes the window is corrected
    /// with the freshly computed offsets, so the first post-calibration
    /// reading of a still device sits near zero.
    pub fn observe_at(&mut self, raw: Attitude, now: Instant) -> Observation {
        let mut completed = false;

        if let Some(started_at) = self.started_at {
            if now.duration_since(started_at) >= self.config.duration {
                self.finish_window();
                completed = true;
            } else {
                self.samples.push(raw);
            }
        }

        Observation {
            attitude: self.apply(raw),
            completed,
        }
    }

    fn apply(&self, raw: Attitude) -> Attitude {
        Attitude {
            yaw: raw.yaw,
            pitch: raw.pitch - self.offsets.pitch,
            roll: raw.roll - self.offsets.roll,
        }
    }

    fn finish_window(&mut self) {
        // A window that elapsed before any sample arrived keeps the previous
        // offsets; averaging an empty buffer has no meaning.
        if self.samples.is_empty() {
            debug!("Calibration window closed with no samples; offsets unchanged");
        } else {
            let n = self.samples.len() as f32;
            let pitch = self.samples.iter().map(|a| a.pitch).sum::<f32>() / n;
            let roll = self.samples.iter().map(|a| a.roll).sum::<f32>() / n;
            self.offsets = CalibrationOffsets { pitch, roll };
            info!(
                samples = self.samples.len(),
                pitch_offset = pitch,
                roll_offset = roll,
                "Calibration complete"
            );
        }

        self.samples.clear();
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pitch: f32, roll: f32) -> Attitude {
        Attitude::new(1.0, pitch, roll)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_offsets_are_means_of_buffered_samples() {
        let mut engine = CalibrationEngine::default();
        let t0 = Instant::now();
        engine.start_at(t0).unwrap();

        engine.observe_at(raw(0.10, 0.20), t0 + ms(500));
        engine.observe_at(raw(0.12, 0.22), t0 + ms(1500));
        engine.observe_at(raw(0.11, 0.24), t0 + ms(2500));

        let obs = engine.observe_at(raw(0.11, 0.22), t0 + ms(3000));
        assert!(obs.completed);
        assert!(!engine.is_calibrating());

        let offsets = engine.offsets();
        assert!((offsets.pitch - 0.11).abs() < 1e-6);
        assert!((offsets.roll - 0.22).abs() < 1e-6);
    }

    #[test]
    fn test_closing_sample_uses_new_offsets() {
        let mut engine = CalibrationEngine::default();
        let t0 = Instant::now();
        engine.start_at(t0).unwrap();

        let still = raw(0.15, -0.08);
        engine.observe_at(still, t0 + ms(1000));
        engine.observe_at(still, t0 + ms(2000));

        let obs = engine.observe_at(still, t0 + ms(3000));
        assert!(obs.completed);
        assert!(obs.attitude.pitch.abs() < 1e-6);
        assert!(obs.attitude.roll.abs() < 1e-6);
        assert!((obs.attitude.yaw - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_corrected_near_zero_right_after_calibration() {
        let mut engine = CalibrationEngine::default();
        let t0 = Instant::now();
        engine.start_at(t0).unwrap();

        let still = raw(0.15, -0.08);
        engine.observe_at(still, t0 + ms(1000));
        engine.observe_at(still, t0 + ms(3000));

        let obs = engine.observe_at(still, t0 + ms(3050));
        assert!(!obs.completed);
        assert!(obs.attitude.pitch.abs() < 1e-6);
        assert!(obs.attitude.roll.abs() < 1e-6);
    }

    #[test]
    fn test_restart_while_calibrating_rejected() {
        let mut engine = CalibrationEngine::default();
        let t0 = Instant::now();
        engine.start_at(t0).unwrap();
        engine.observe_at(raw(0.3, 0.1), t0 + ms(100));

        assert_eq!(
            engine.start_at(t0 + ms(200)),
            Err(CalibrationError::AlreadyCalibrating)
        );
        // Buffered state survives the rejected restart.
        let obs = engine.observe_at(raw(0.3, 0.1), t0 + ms(3000));
        assert!(obs.completed);
        assert!((engine.offsets().pitch - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_empty_window_keeps_previous_offsets() {
        let mut engine = CalibrationEngine::default();
        let t0 = Instant::now();

        // First cycle establishes non-zero offsets.
        engine.start_at(t0).unwrap();
        engine.observe_at(raw(0.2, 0.1), t0 + ms(100));
        engine.observe_at(raw(0.2, 0.1), t0 + ms(3000));
        let before = engine.offsets();

        // Second cycle: window elapses without a single buffered sample.
        engine.start_at(t0 + ms(4000)).unwrap();
        let obs = engine.observe_at(raw(0.9, 0.9), t0 + ms(8000));
        assert!(obs.completed);
        assert_eq!(engine.offsets(), before);
    }

    #[test]
    fn test_yaw_never_calibrated() {
        let mut engine = CalibrationEngine::default();
        let t0 = Instant::now();
        engine.start_at(t0).unwrap();
        engine.observe_at(Attitude::new(2.0, 0.5, 0.5), t0 + ms(100));
        engine.observe_at(Attitude::new(2.0, 0.5, 0.5), t0 + ms(3000));

        let obs = engine.observe_at(Attitude::new(2.0, 0.5, 0.5), t0 + ms(3100));
        assert!((obs.attitude.yaw - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_observe_without_calibration_applies_zero_offsets() {
        let mut engine = CalibrationEngine::default();
        let obs = engine.observe(raw(0.4, -0.3));
        assert!(!obs.completed);
        assert_eq!(obs.attitude, Attitude::new(1.0, 0.4, -0.3));
    }
}
