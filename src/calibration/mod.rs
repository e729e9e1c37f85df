//! Zero-offset calibration for pitch and roll.

mod engine;

pub use engine::{
    CalibrationConfig, CalibrationEngine, CalibrationError, CalibrationOffsets, Observation,
    DEFAULT_CALIBRATION_DURATION_MS,
};
