//! Shared settings for the bee-labe tools.
//! Persisted in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::calibration::DEFAULT_CALIBRATION_DURATION_MS;
use crate::pipeline::DEFAULT_SAMPLING_PERIOD_MS;

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Experimenter name stamped into session artifacts
    pub experimenter: String,
    /// Device label stamped into session artifacts
    pub phone_model: String,
    /// Sensor sampling period in milliseconds
    pub sampling_period_ms: u64,
    /// Whether raw sensor samples are logged alongside fused attitudes
    pub log_raw: bool,
    /// Calibration window length in milliseconds
    pub calibration_duration_ms: u64,
    /// Session artifact directory (empty = platform data directory)
    pub data_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            experimenter: "(unknown)".to_string(),
            phone_model: "unknown".to_string(),
            sampling_period_ms: DEFAULT_SAMPLING_PERIOD_MS,
            log_raw: true,
            calibration_duration_ms: DEFAULT_CALIBRATION_DURATION_MS,
            data_dir: String::new(),
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("uk.ac", "sussex", "bee-labe")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file.
    pub fn load() -> Self {
        let defaults = Self::default();

        let mut loaded = Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str::<Self>(&content).ok())
            .unwrap_or_default();

        // Backfill fields missing from older config files
        if loaded.experimenter.is_empty() {
            loaded.experimenter = defaults.experimenter;
        }
        if loaded.sampling_period_ms == 0 {
            loaded.sampling_period_ms = defaults.sampling_period_ms;
        }
        if loaded.calibration_duration_ms == 0 {
            loaded.calibration_duration_ms = defaults.calibration_duration_ms;
        }

        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_field_app() {
        let settings = AppSettings::default();
        assert_eq!(settings.experimenter, "(unknown)");
        assert_eq!(settings.sampling_period_ms, 50);
        assert_eq!(settings.calibration_duration_ms, 3000);
        assert!(settings.log_raw);
    }

    #[test]
    fn test_partial_config_backfills_defaults() {
        let parsed: AppSettings =
            serde_json::from_str(r#"{"experimenter": "Alex Dewar"}"#).unwrap();
        assert_eq!(parsed.experimenter, "Alex Dewar");
        assert_eq!(parsed.sampling_period_ms, 50);
        assert!(parsed.log_raw);
    }
}
