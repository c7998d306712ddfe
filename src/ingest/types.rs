//! Core types for raw track input
//!
//! Every summary field is optional at the serde level: a record that is missing
//! fields still deserializes and reaches the fragment builder, which substitutes
//! defaults instead of failing the whole batch. Numeric fields accept any JSON
//! number (counts may arrive as `5.0`); values of the wrong JSON type read as
//! absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One time-series sample of a raw track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Time on the track-local clock (seconds, starts near 0); samples
    /// without one are dropped by the builder
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Turn rate at this sample (NaN when present but not a number)
    #[serde(default, deserialize_with = "lenient_rate")]
    pub turn_rate: f64,
    /// X coordinate (pixels), if tracked
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Y coordinate (pixels), if tracked
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Whether the stimulus was on at this sample
    #[serde(default, deserialize_with = "lenient_flag")]
    pub stimulus_flag: bool,
}

impl Default for RawSample {
    fn default() -> Self {
        Self {
            time: None,
            turn_rate: 0.0,
            x: None,
            y: None,
            stimulus_flag: false,
        }
    }
}

impl RawSample {
    /// Create a sample without position
    pub fn new(time: f64, turn_rate: f64) -> Self {
        Self {
            time: Some(time),
            turn_rate,
            ..Default::default()
        }
    }

    /// Create a sample with a tracked position
    pub fn at(time: f64, turn_rate: f64, x: f64, y: f64) -> Self {
        Self {
            time: Some(time),
            turn_rate,
            x: Some(x),
            y: Some(y),
            stimulus_flag: false,
        }
    }

    /// Mark this sample as recorded during the stimulus
    pub fn with_stimulus(mut self, on: bool) -> Self {
        self.stimulus_flag = on;
        self
    }

    /// Position, when both coordinates are present and finite
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

/// One raw track as delivered by the tracking pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    /// Track identifier (numeric keys are read as their decimal text)
    #[serde(default, deserialize_with = "lenient_key", skip_serializing_if = "Option::is_none")]
    pub track_key: Option<String>,
    /// Recorded duration (seconds)
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Number of reorientation events detected; the builder checks it is a
    /// non-negative integer
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub reorientation_count: Option<f64>,
    /// Number of frames in the track; checked like `reorientation_count`
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<f64>,
    /// Declared acquisition frame rate (frames/second)
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    /// Frame on the experiment clock at which the track starts, if the
    /// acquisition recorded it
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<f64>,
    /// Time series. Entries that are not sample objects are kept as untimed
    /// samples; a value that is not an array reads as absent.
    #[serde(default, deserialize_with = "lenient_samples", skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<RawSample>>,
}

impl RawTrack {
    /// Create a track with the given key and summary fields
    pub fn new(track_key: impl Into<String>, duration: f64, reorientation_count: u32) -> Self {
        Self {
            track_key: Some(track_key.into()),
            duration: Some(duration),
            reorientation_count: Some(f64::from(reorientation_count)),
            ..Default::default()
        }
    }

    /// Set frame count and frame rate
    pub fn with_frames(mut self, frame_count: u64, frame_rate: f64) -> Self {
        self.frame_count = Some(frame_count as f64);
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Set the declared experiment start frame
    pub fn with_start_frame(mut self, start_frame: u64) -> Self {
        self.start_frame = Some(start_frame as f64);
        self
    }

    /// Set the time series
    pub fn with_samples(mut self, samples: Vec<RawSample>) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Number of samples (0 when the sample array is missing)
    pub fn sample_count(&self) -> usize {
        self.samples.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// Any JSON number as `f64`; null and other value types read as absent
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

fn lenient_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.unwrap_or(f64::NAN))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(on)) => on,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

fn lenient_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(key)) => Some(key),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_samples<'de, D>(deserializer: D) -> Result<Option<Vec<RawSample>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => Some(
            entries
                .into_iter()
                .map(|entry| serde_json::from_value(entry).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}
