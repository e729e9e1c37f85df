//! Attitude value type and raw-orientation normalization.
//!
//! An [`Attitude`] is one immutable yaw/pitch/roll snapshot in radians. It is
//! built exactly once per sensor update from the raw estimator output; the
//! calibration and recording stages never re-derive angles from raw vectors.

use std::f32::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::estimator::Orientation;

/// A 3-axis orientation estimate in radians.
///
/// `yaw` is normalized to `[0, 2π)`. `pitch` and `roll` are signed and, once
/// the value has passed through the calibration engine, offset-corrected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    /// Heading, `[0, 2π)` radians.
    pub yaw: f32,
    /// Tilt about the device's lateral axis, radians.
    pub pitch: f32,
    /// Tilt about the device's longitudinal axis, radians.
    pub roll: f32,
}

impl Attitude {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Normalize raw estimator output into an uncalibrated attitude.
    ///
    /// The estimator reports azimuth in `(−π, π]`; negative azimuth wraps by
    /// `+2π` so yaw lands in `[0, 2π)`. Raw pitch is sign-flipped so that
    /// tilting the device top edge up reads positive.
    pub fn from_orientation(orientation: Orientation) -> Self {
        let mut yaw = orientation.azimuth;
        if yaw < 0.0 {
            yaw += 2.0 * PI;
        }

        Self {
            yaw,
            pitch: -orientation.pitch,
            roll: orientation.roll,
        }
    }
}

impl fmt::Display for Attitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Yaw: {:.2}°\nPitch: {:.2}°\nRoll: {:.2}°",
            self.yaw.to_degrees(),
            self.pitch.to_degrees(),
            self.roll.to_degrees()
        )
    }
}
