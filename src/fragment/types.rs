//! Fragment data structures

use crate::time::alignment::AlignmentStatus;
use serde::{Deserialize, Serialize};

/// A 2D position in tracking coordinates (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A data-quality problem recovered while building a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum InputIssue {
    /// No track key; a positional id was substituted
    MissingTrackKey,
    /// No sample array; summaries are zeroed
    MissingSamples,
    /// No usable duration; the sample time span was used
    MissingDuration,
    /// No frame count; the sample count was used
    MissingFrameCount,
    /// No usable frame rate; the configured default was used
    MissingFrameRate,
    /// No reorientation count; 0 was used
    MissingReorientationCount,
    /// Samples with non-finite time or turn rate were dropped
    NonFiniteSamples { dropped: usize },
    /// Samples without a time were dropped
    UntimedSamples { dropped: usize },
    /// A count was negative, non-finite or out of range; the default was used
    InvalidCount { field: String },
    /// A count had a fractional part; it was rounded down
    NonIntegralCount { field: String },
    /// The track id was already taken in the batch; a suffixed id was used
    DuplicateTrackId { original: String },
}

/// One fragment of a trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFragment {
    /// Unique track identifier
    pub track_id: String,
    /// Recorded duration (seconds)
    pub duration_seconds: f64,
    /// Number of frames
    pub frame_count: u64,
    /// Frame rate used for classification (frames/second)
    pub frame_rate: f64,
    /// Number of reorientation events
    pub reorientation_count: u32,
    /// Start on the fragment's own clock (seconds)
    pub local_start_time: f64,
    /// End on the fragment's own clock (seconds)
    pub local_end_time: f64,
    /// Estimated start on the experiment clock
    pub experiment_start_time: Option<f64>,
    /// Estimated end on the experiment clock
    pub experiment_end_time: Option<f64>,
    /// How the experiment-clock estimate was obtained
    pub alignment: AlignmentStatus,
    /// Acquisition offset declared by the raw track (seconds), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_start_seconds: Option<f64>,
    /// First tracked position
    pub first_position: Option<Position>,
    /// Last tracked position
    pub last_position: Option<Position>,
    /// Mean turn rate over all samples
    pub mean_response_rate: f64,
    /// Turn rates recorded during the stimulus
    pub stimulus_response_samples: Vec<f64>,
    /// Heuristic classification as a truncated piece of a longer trajectory
    pub is_incomplete: bool,
    /// Problems recovered while building this fragment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_issues: Vec<InputIssue>,
}

impl TrackFragment {
    /// Duration on the local clock
    pub fn local_duration(&self) -> f64 {
        self.local_end_time - self.local_start_time
    }

    /// Experiment-clock interval, when aligned
    pub fn experiment_interval(&self) -> Option<(f64, f64)> {
        match (self.experiment_start_time, self.experiment_end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Check if the fragment has experiment-clock times
    pub fn is_aligned(&self) -> bool {
        self.experiment_interval().is_some()
    }

    /// Mean of the stimulus-response samples, if any were recorded
    pub fn stimulus_response_mean(&self) -> Option<f64> {
        if self.stimulus_response_samples.is_empty() {
            return None;
        }
        let sum: f64 = self.stimulus_response_samples.iter().sum();
        Some(sum / self.stimulus_response_samples.len() as f64)
    }

    /// Copy of this fragment placed at `start` on the experiment clock.
    ///
    /// The end is `start + duration_seconds`, so the interval is never inverted.
    pub fn aligned_at(&self, start: f64, policy: &str) -> Self {
        let mut aligned = self.clone();
        aligned.experiment_start_time = Some(start);
        aligned.experiment_end_time = Some(start + self.duration_seconds.max(0.0));
        aligned.alignment = AlignmentStatus::Aligned {
            policy: policy.to_string(),
        };
        aligned
    }

    /// Copy of this fragment with alignment marked unavailable
    pub fn unaligned(&self, reason: impl Into<String>) -> Self {
        let mut unaligned = self.clone();
        unaligned.experiment_start_time = None;
        unaligned.experiment_end_time = None;
        unaligned.alignment = AlignmentStatus::Unavailable {
            reason: reason.into(),
        };
        unaligned
    }
}
