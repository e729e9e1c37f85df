// Copyright 2017 University of Sussex (Original Android implementation)
// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Bee Labe
//!
//! Attitude calibration and session recording for behavioral field research.
//!
//! This library is the platform-agnostic core of a phone-based
//! data-collection tool: raw accelerometer and magnetometer samples go in,
//! calibrated yaw/pitch/roll attitudes come out, and a recording session
//! serializes deterministically to one self-describing JSON artifact. The
//! host platform supplies the sensor events and the UI; the core supplies
//! the calibration protocol, the session state machine, and the artifact
//! format.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bee_labe::{
//!     NullDisplay, Pipeline, PipelineConfig, SensorEvent, SensorKind,
//!     TiltCompensatedEstimator,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut pipeline = Pipeline::new(TiltCompensatedEstimator, PipelineConfig::default());
//!     let mut display = NullDisplay;
//!
//!     pipeline.start_recording()?;
//!     let acc = SensorEvent::new(SensorKind::Accelerometer, vec![0.0, 0.0, 9.81]);
//!     let mag = SensorEvent::new(SensorKind::Magnetometer, vec![0.0, 22.0, -42.0]);
//!     pipeline.handle_event(&acc, &mut display);
//!     pipeline.handle_event(&mag, &mut display);
//!
//!     let path = pipeline.stop_recording("Alex Dewar", "Nexus 5")?;
//!     pipeline.finish_writes();
//!     println!("Session saved to {}", path.display());
//!     Ok(())
//! }
//! ```

pub mod attitude;
pub mod calibration;
pub mod estimator;
pub mod pipeline;
pub mod recorder;
pub mod sensor;
pub mod settings;
pub mod storage;

pub use attitude::Attitude;
pub use calibration::{
    CalibrationConfig, CalibrationEngine, CalibrationError, CalibrationOffsets, Observation,
};
pub use estimator::{EstimatorError, Orientation, OrientationEstimator, TiltCompensatedEstimator};
pub use pipeline::{
    DisplaySink, NullDisplay, Pipeline, PipelineConfig, PipelineError, DEFAULT_SAMPLING_PERIOD_MS,
};
pub use recorder::{
    AttitudePoint, RawPoint, RecorderError, SessionArtifact, SessionMeta, SessionOutput,
    SessionRecorder,
};
pub use sensor::{SensorEvent, SensorKind};
pub use settings::AppSettings;
pub use storage::{ArtifactWriter, StorageError};
