//! Orientation estimation seam.
//!
//! The fusion of gravity and magnetic-field vectors into an orientation
//! estimate is a host-platform capability; the rest of the pipeline only
//! depends on the [`OrientationEstimator`] trait. A tilt-compensated
//! rotation-matrix implementation is provided for hosts without a native
//! fusion routine (trace replay, tests).

use thiserror::Error;

/// Estimation errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorError {
    #[error("Degenerate sensor vectors (free fall or parallel fields)")]
    Degenerate,
}

/// Raw fused orientation, before attitude normalization.
///
/// Azimuth is in `(−π, π]`, pitch in `[−π/2, π/2]`, roll in `(−π, π]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub azimuth: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub fn new(azimuth: f32, pitch: f32, roll: f32) -> Self {
        Self {
            azimuth,
            pitch,
            roll,
        }
    }
}

/// Fuses a gravity vector and a magnetic-field vector into an orientation.
///
/// Treated as a pure function with possible failure: degenerate input (free
/// fall, vectors near parallel) yields an error and the caller drops the
/// sensor event.
pub trait OrientationEstimator {
    fn estimate(&self, gravity: [f32; 3], magnetic: [f32; 3])
        -> Result<Orientation, EstimatorError>;
}

/// Minimum magnitude of `gravity × magnetic` accepted by the
/// tilt-compensated estimator. Below this the device is in free fall or the
/// field vectors are close to parallel and no stable heading exists.
const MIN_CROSS_NORM: f32 = 0.1;

/// Tilt-compensated rotation-matrix estimator.
///
/// Builds an orthonormal East/North/Up frame from cross products of the
/// gravity and magnetic-field vectors and extracts azimuth/pitch/roll from
/// the resulting rotation matrix with atan2/asin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiltCompensatedEstimator;

impl OrientationEstimator for TiltCompensatedEstimator {
    fn estimate(
        &self,
        gravity: [f32; 3],
        magnetic: [f32; 3],
    ) -> Result<Orientation, EstimatorError> {
        // East axis: magnetic × gravity, rejected when near-degenerate.
        let h = cross(magnetic, gravity);
        let norm_h = norm(h);
        if norm_h < MIN_CROSS_NORM {
            return Err(EstimatorError::Degenerate);
        }
        let h = scale(h, 1.0 / norm_h);

        let norm_a = norm(gravity);
        if norm_a == 0.0 {
            return Err(EstimatorError::Degenerate);
        }
        let a = scale(gravity, 1.0 / norm_a);

        // Horizontal-north axis completes the right-handed frame.
        let m = cross(a, h);

        // Rotation matrix rows are H, M, A; the standard angle extraction:
        let azimuth = h[1].atan2(m[1]);
        let pitch = (-a[1]).asin();
        let roll = (-a[0]).atan2(a[2]);

        Ok(Orientation::new(azimuth, pitch, roll))
    }
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn scale(v: [f32; 3], s: f32) -> [f32; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}
