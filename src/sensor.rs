//! Shared raw-sensor types.

use serde::{Deserialize, Serialize};

/// The kind of sensor a raw sample came from.
///
/// Serialized with the short tags the session artifact format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    #[serde(rename = "acc")]
    Accelerometer,
    #[serde(rename = "mag")]
    Magnetometer,
    #[serde(rename = "gyro")]
    Gyroscope,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SensorKind {
    /// Parse the short tag used in trace files and artifacts.
    /// Unrecognized tags map to `Unknown` rather than failing.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "acc" => SensorKind::Accelerometer,
            "mag" => SensorKind::Magnetometer,
            "gyro" => SensorKind::Gyroscope,
            _ => SensorKind::Unknown,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "acc",
            SensorKind::Magnetometer => "mag",
            SensorKind::Gyroscope => "gyro",
            SensorKind::Unknown => "unknown",
        }
    }
}

/// One raw sample delivered by the host sensor layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorKind,
    /// Sensor-specific vector; accelerometer and magnetometer deliver 3 axes.
    pub values: Vec<f32>,
}

impl SensorEvent {
    pub fn new(kind: SensorKind, values: Vec<f32>) -> Self {
        Self { kind, values }
    }

    /// The sample as a 3-vector, if it has exactly three components.
    pub fn as_vector3(&self) -> Option<[f32; 3]> {
        match self.values.as_slice() {
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in [
            SensorKind::Accelerometer,
            SensorKind::Magnetometer,
            SensorKind::Gyroscope,
            SensorKind::Unknown,
        ] {
            assert_eq!(SensorKind::from_tag(kind.as_tag()), kind);
        }
    }

    #[test]
    fn test_unrecognized_tag_is_unknown() {
        assert_eq!(SensorKind::from_tag("barometer"), SensorKind::Unknown);
    }

    #[test]
    fn test_kind_serializes_as_short_tag() {
        let json = serde_json::to_string(&SensorKind::Accelerometer).unwrap();
        assert_eq!(json, "\"acc\"");
    }

    #[test]
    fn test_as_vector3() {
        let event = SensorEvent::new(SensorKind::Magnetometer, vec![1.0, 2.0, 3.0]);
        assert_eq!(event.as_vector3(), Some([1.0, 2.0, 3.0]));

        let short = SensorEvent::new(SensorKind::Unknown, vec![1.0]);
        assert_eq!(short.as_vector3(), None);
    }
}
