//! The self-describing session artifact and its file-naming convention.
//!
//! One artifact per completed recording session. The field layout is shared
//! with the analysis tooling downstream, so serde renames pin the exact JSON
//! member names and `raw_data` is omitted entirely (never an empty array)
//! when no raw samples were logged.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationOffsets;
use crate::sensor::SensorKind;

/// Timestamp format used inside the artifact body.
pub(crate) const ARTIFACT_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Timestamp format used in artifact filenames.
pub(crate) const FILENAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One fused attitude sample, relative-timestamped in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudePoint {
    pub time: u64,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// One raw sensor sample kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub time: u64,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub values: Vec<f32>,
}

/// The serialized form of one completed recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionArtifact {
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    pub experimenter: String,
    pub phone_model: String,
    pub calibration: CalibrationOffsets,
    pub data: Vec<AttitudePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<RawPoint>>,
}

impl SessionArtifact {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Derive the suggested artifact filename from the session start time and
/// the experimenter name: `data_<YYYYMMDD_HHMMSS>_<initials-or-name>.json`.
///
/// A multi-word name contributes its lowercase initials, a single word is
/// used whole; an empty or non-alphanumeric name falls back to `anon`.
pub(crate) fn artifact_filename(started_at: &DateTime<Local>, experimenter: &str) -> String {
    format!(
        "data_{}_{}.json",
        started_at.format(FILENAME_TIME_FORMAT),
        name_token(experimenter)
    )
}

fn name_token(experimenter: &str) -> String {
    let words: Vec<&str> = experimenter
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .collect();

    let token: String = match words.as_slice() {
        [] => String::new(),
        [single] => single
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase(),
        many => many
            .iter()
            .filter_map(|w| w.chars().find(|c| c.is_alphanumeric()))
            .collect::<String>()
            .to_lowercase(),
    };

    if token.is_empty() {
        "anon".to_string()
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn artifact(raw_data: Option<Vec<RawPoint>>) -> SessionArtifact {
        SessionArtifact {
            start_time: "18/09/2017 14:03:21".to_string(),
            end_time: "18/09/2017 14:05:02".to_string(),
            experimenter: "Alex Dewar".to_string(),
            phone_model: "Nexus 5".to_string(),
            calibration: CalibrationOffsets {
                pitch: 0.11,
                roll: -0.02,
            },
            data: vec![AttitudePoint {
                time: 10,
                yaw: 1.0,
                pitch: 0.1,
                roll: 0.2,
            }],
            raw_data,
        }
    }

    #[test]
    fn test_artifact_field_names() {
        let value = serde_json::to_value(artifact(None)).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["startTime", "endTime", "experimenter", "phone_model", "calibration", "data"] {
            assert!(obj.contains_key(key), "missing field {}", key);
        }
        assert_eq!(value["calibration"]["pitch"], 0.11f32);
        assert_eq!(value["data"][0]["time"], 10);
    }

    #[test]
    fn test_raw_data_omitted_when_absent() {
        let value = serde_json::to_value(artifact(None)).unwrap();
        assert!(!value.as_object().unwrap().contains_key("raw_data"));
    }

    #[test]
    fn test_raw_data_present_with_type_tags() {
        let raw = vec![RawPoint {
            time: 5,
            kind: SensorKind::Accelerometer,
            values: vec![0.0, 0.1, 9.8],
        }];
        let value = serde_json::to_value(artifact(Some(raw))).unwrap();
        assert_eq!(value["raw_data"][0]["type"], "acc");
        assert_eq!(value["raw_data"][0]["time"], 5);
    }

    #[test]
    fn test_json_round_trip() {
        let original = artifact(Some(vec![RawPoint {
            time: 7,
            kind: SensorKind::Gyroscope,
            values: vec![0.01, 0.02, 0.03],
        }]));
        let parsed: SessionArtifact =
            serde_json::from_str(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_filename_uses_initials_for_multi_word_names() {
        let start = Local.with_ymd_and_hms(2017, 9, 18, 14, 3, 21).unwrap();
        assert_eq!(
            artifact_filename(&start, "Alex Dewar"),
            "data_20170918_140321_ad.json"
        );
    }

    #[test]
    fn test_filename_uses_whole_single_word_name() {
        let start = Local.with_ymd_and_hms(2017, 9, 18, 14, 3, 21).unwrap();
        assert_eq!(
            artifact_filename(&start, "Alex"),
            "data_20170918_140321_alex.json"
        );
    }

    #[test]
    fn test_filename_falls_back_to_anon() {
        let start = Local.with_ymd_and_hms(2017, 9, 18, 14, 3, 21).unwrap();
        assert_eq!(
            artifact_filename(&start, "  "),
            "data_20170918_140321_anon.json"
        );
        assert_eq!(
            artifact_filename(&start, "(unknown)"),
            "data_20170918_140321_unknown.json"
        );
    }
}
