//! Artifact persistence.
//!
//! The core hands a finished [`SessionArtifact`] to this layer; writing is
//! the one slow operation in the system, so [`ArtifactWriter`] moves it off
//! the event-delivery path onto a worker thread. At most one write is ever
//! in flight, and a new one is refused until the previous result has been
//! harvested — the same gate the recording controls honor.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{error, info};

use crate::recorder::SessionArtifact;

/// Storage errors. I/O and serialization failures are recoverable: the
/// caller still holds the artifact and may retry.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("A previous artifact write is still in flight")]
    WritePending,
    #[error("Failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve the default data directory for session artifacts.
pub fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("uk.ac", "sussex", "bee-labe")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Serialize the artifact and write it to `path`, creating parent
/// directories as needed.
pub fn write_artifact(artifact: &SessionArtifact, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = artifact.to_json()?;
    fs::write(path, content)?;
    Ok(())
}

/// List the session artifacts in `dir`, the `.json` set the export/share
/// collaborator bundles into an archive.
pub fn list_artifacts(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == "json")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Dispatches artifact writes to a worker thread, one at a time.
#[derive(Debug, Default)]
pub struct ArtifactWriter {
    inflight: Option<JoinHandle<Result<PathBuf, StorageError>>>,
}

impl ArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a write is outstanding (started and not yet harvested).
    pub fn is_busy(&self) -> bool {
        self.inflight.is_some()
    }

    /// Start writing `artifact` to `path` on the worker thread.
    ///
    /// Ownership of the serialized data transfers to the writer before the
    /// write begins. Fails with [`StorageError::WritePending`] while the
    /// previous write is outstanding.
    pub fn begin(&mut self, artifact: SessionArtifact, path: PathBuf) -> Result<(), StorageError> {
        if self.inflight.is_some() {
            return Err(StorageError::WritePending);
        }

        self.inflight = Some(thread::spawn(move || {
            write_artifact(&artifact, &path)?;
            info!(path = %path.display(), "Artifact written");
            Ok(path)
        }));
        Ok(())
    }

    /// Harvest the result of a finished write without blocking.
    ///
    /// `None` while the write is still running (or none was started); the
    /// writer stays busy in that case.
    pub fn try_finish(&mut self) -> Option<Result<PathBuf, StorageError>> {
        match self.inflight.take() {
            Some(handle) if handle.is_finished() => Some(Self::join(handle)),
            Some(handle) => {
                self.inflight = Some(handle);
                None
            }
            None => None,
        }
    }

    /// Block until the in-flight write finishes and return its result.
    pub fn wait(&mut self) -> Option<Result<PathBuf, StorageError>> {
        self.inflight.take().map(Self::join)
    }

    fn join(handle: JoinHandle<Result<PathBuf, StorageError>>) -> Result<PathBuf, StorageError> {
        match handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Artifact writer thread panicked");
                Err(StorageError::Io(std::io::Error::other(
                    "artifact writer thread panicked",
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationOffsets;
    use crate::recorder::AttitudePoint;
    use std::process;

    fn test_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bee-labe-test-{}-{}", tag, process::id()))
    }

    fn artifact() -> SessionArtifact {
        SessionArtifact {
            start_time: "18/09/2017 14:03:21".to_string(),
            end_time: "18/09/2017 14:05:02".to_string(),
            experimenter: "Alex Dewar".to_string(),
            phone_model: "Nexus 5".to_string(),
            calibration: CalibrationOffsets::default(),
            data: vec![AttitudePoint {
                time: 10,
                yaw: 1.0,
                pitch: 0.1,
                roll: 0.2,
            }],
            raw_data: None,
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = test_dir("write");
        let path = dir.join("data_20170918_140321_ad.json");
        write_artifact(&artifact(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: SessionArtifact = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, artifact());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_list_artifacts_filters_json_suffix() {
        let dir = test_dir("list");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("data_a.json"), "{}").unwrap();
        fs::write(dir.join("data_b.json"), "{}").unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();

        let files = list_artifacts(&dir).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.extension().unwrap() == "json"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_writer_allows_one_inflight_write() {
        let dir = test_dir("gate");
        let mut writer = ArtifactWriter::new();

        writer
            .begin(artifact(), dir.join("first.json"))
            .unwrap();
        let second = writer.begin(artifact(), dir.join("second.json"));
        assert!(matches!(second, Err(StorageError::WritePending)));

        let result = writer.wait().unwrap();
        assert!(result.is_ok());
        assert!(!writer.is_busy());

        // Gate reopens once the result is harvested.
        writer
            .begin(artifact(), dir.join("second.json"))
            .unwrap();
        writer.wait().unwrap().unwrap();

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_write_surfaces_error() {
        // A path under an existing *file* cannot be created.
        let dir = test_dir("fail");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("blocker"), "x").unwrap();

        let mut writer = ArtifactWriter::new();
        writer
            .begin(artifact(), dir.join("blocker").join("out.json"))
            .unwrap();
        let result = writer.wait().unwrap();
        assert!(matches!(result, Err(StorageError::Io(_))));

        fs::remove_dir_all(&dir).unwrap();
    }
}
