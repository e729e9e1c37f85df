//! Session recording and artifact serialization.

mod artifact;
mod session;

pub use artifact::{AttitudePoint, RawPoint, SessionArtifact};
pub use session::{RecorderError, SessionMeta, SessionOutput, SessionRecorder};
