//! Fragment-set statistics and data quality grading

use super::types::TrackFragment;
use serde::{Deserialize, Serialize};

/// Summary of a fragment set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentStatistics {
    pub total_tracks: usize,
    pub incomplete_tracks: usize,
    pub complete_tracks: usize,
    /// Share of incomplete tracks (0-100); 0 for an empty set
    pub incomplete_percentage: f64,
    /// Mean duration of incomplete tracks (seconds)
    pub avg_duration_incomplete: Option<f64>,
    /// Mean duration of complete tracks (seconds)
    pub avg_duration_complete: Option<f64>,
    pub shortest_track: Option<f64>,
    pub longest_track: Option<f64>,
    /// Fragments excluded from matching because alignment was unavailable
    pub unaligned_tracks: usize,
}

impl FragmentStatistics {
    /// Compute statistics over a fragment set
    pub fn from_fragments(fragments: &[TrackFragment]) -> Self {
        let (incomplete, complete): (Vec<&TrackFragment>, Vec<&TrackFragment>) =
            fragments.iter().partition(|f| f.is_incomplete);

        let durations = fragments.iter().map(|f| f.duration_seconds);
        let shortest_track = durations.clone().reduce(f64::min);
        let longest_track = durations.reduce(f64::max);

        let incomplete_percentage = if fragments.is_empty() {
            0.0
        } else {
            incomplete.len() as f64 / fragments.len() as f64 * 100.0
        };

        Self {
            total_tracks: fragments.len(),
            incomplete_tracks: incomplete.len(),
            complete_tracks: complete.len(),
            incomplete_percentage,
            avg_duration_incomplete: mean_duration(&incomplete),
            avg_duration_complete: mean_duration(&complete),
            shortest_track,
            longest_track,
            unaligned_tracks: fragments.iter().filter(|f| !f.is_aligned()).count(),
        }
    }
}

fn mean_duration(fragments: &[&TrackFragment]) -> Option<f64> {
    if fragments.is_empty() {
        return None;
    }
    Some(fragments.iter().map(|f| f.duration_seconds).sum::<f64>() / fragments.len() as f64)
}

/// Coarse data quality grade of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl DataQuality {
    /// Grade a track by its duration and behavioral event count
    pub fn grade(duration_seconds: f64, reorientation_count: u32) -> Self {
        if duration_seconds > 1000.0 && reorientation_count > 20 {
            DataQuality::Excellent
        } else if duration_seconds > 500.0 && reorientation_count > 10 {
            DataQuality::Good
        } else if duration_seconds > 100.0 && reorientation_count > 2 {
            DataQuality::Fair
        } else {
            DataQuality::Poor
        }
    }

    /// Grade a fragment
    pub fn of(fragment: &TrackFragment) -> Self {
        Self::grade(fragment.duration_seconds, fragment.reorientation_count)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Poor => "poor",
            DataQuality::Fair => "fair",
            DataQuality::Good => "good",
            DataQuality::Excellent => "excellent",
        }
    }
}
