//! Timing summary of an aligned fragment set

use crate::fragment::types::TrackFragment;
use serde::{Deserialize, Serialize};

/// Whether any fragment carries experiment-clock times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStatus {
    NoExperimentalTiming,
    Available,
}

/// Uncovered stretch of the experiment clock between two fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingGap {
    pub after_track: String,
    pub before_track: String,
    pub gap_start_time: f64,
    pub gap_end_time: f64,
    pub gap_duration_seconds: f64,
}

/// Experiment timeline overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub status: TimingStatus,
    pub tracks_with_timing: usize,
    pub earliest_track_start: Option<f64>,
    pub latest_track_end: Option<f64>,
    /// Latest end minus earliest start (seconds)
    pub experiment_duration_seconds: Option<f64>,
    /// Positive gaps between consecutive fragments ordered by start time
    pub timing_gaps: Vec<TimingGap>,
}

impl TimingSummary {
    pub fn from_fragments(fragments: &[TrackFragment]) -> Self {
        let mut timed: Vec<(&TrackFragment, f64, f64)> = fragments
            .iter()
            .filter_map(|f| f.experiment_interval().map(|(start, end)| (f, start, end)))
            .collect();

        if timed.is_empty() {
            return Self {
                status: TimingStatus::NoExperimentalTiming,
                tracks_with_timing: 0,
                earliest_track_start: None,
                latest_track_end: None,
                experiment_duration_seconds: None,
                timing_gaps: Vec::new(),
            };
        }

        timed.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.track_id.cmp(&b.0.track_id)));

        let earliest = timed.iter().map(|t| t.1).fold(f64::INFINITY, f64::min);
        let latest = timed.iter().map(|t| t.2).fold(f64::NEG_INFINITY, f64::max);

        let timing_gaps = timed
            .windows(2)
            .filter_map(|pair| {
                let (current, _, current_end) = pair[0];
                let (next, next_start, _) = pair[1];
                let gap = next_start - current_end;
                (gap > 0.0).then(|| TimingGap {
                    after_track: current.track_id.clone(),
                    before_track: next.track_id.clone(),
                    gap_start_time: current_end,
                    gap_end_time: next_start,
                    gap_duration_seconds: gap,
                })
            })
            .collect();

        Self {
            status: TimingStatus::Available,
            tracks_with_timing: timed.len(),
            earliest_track_start: Some(earliest),
            latest_track_end: Some(latest),
            experiment_duration_seconds: Some(latest - earliest),
            timing_gaps,
        }
    }
}
