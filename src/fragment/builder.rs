//! Fragment Builder
//!
//! Converts one raw track into a [`TrackFragment`]. Building never fails: a
//! malformed record is repaired with empty/zero defaults, the repair is
//! recorded as an [`InputIssue`] and logged, and the batch carries on.

use super::types::{InputIssue, Position, TrackFragment};
use crate::app::config::FragmentConfig;
use crate::ingest::types::{RawSample, RawTrack};
use crate::time::alignment::AlignmentStatus;
use std::collections::HashSet;

/// Classify a fragment as incomplete.
///
/// Pure function of the four summary values: a track is incomplete when it is
/// shorter than a full recording, when its recorded duration falls short of the
/// duration its frame count implies by more than the tolerance, or when it has
/// too few reorientations for a full-length recording.
pub fn classify_incomplete(
    config: &FragmentConfig,
    duration_seconds: f64,
    frame_count: u64,
    frame_rate: f64,
    reorientation_count: u32,
) -> bool {
    if duration_seconds < config.min_full_duration_s {
        return true;
    }

    if frame_rate > 0.0 {
        let frame_implied = frame_count as f64 / frame_rate;
        let mismatch = (duration_seconds - frame_implied).abs() > config.frame_mismatch_tolerance_s;
        if mismatch && duration_seconds < frame_implied {
            return true;
        }
    }

    reorientation_count < config.min_reorientations
}

/// Fragment builder
pub struct FragmentBuilder {
    config: FragmentConfig,
}

impl FragmentBuilder {
    /// Create with default thresholds
    pub fn new() -> Self {
        Self::with_config(FragmentConfig::default())
    }

    /// Create with custom thresholds
    pub fn with_config(config: FragmentConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &FragmentConfig {
        &self.config
    }

    /// Build fragments for a whole batch, preserving input order.
    ///
    /// Track ids are unique across the returned batch. Explicit keys claim
    /// their ids first; a later duplicate, or a positional id that collides
    /// with an explicit key, gets a `-<n>` suffix and a
    /// [`InputIssue::DuplicateTrackId`].
    pub fn build_all(&self, tracks: &[RawTrack]) -> Vec<TrackFragment> {
        let mut fragments: Vec<TrackFragment> = tracks
            .iter()
            .enumerate()
            .map(|(index, raw)| self.build(index, raw))
            .collect();
        assign_unique_ids(&mut fragments);

        let incomplete = fragments.iter().filter(|f| f.is_incomplete).count();
        tracing::info!(
            total = fragments.len(),
            incomplete,
            "Built fragments"
        );
        fragments
    }

    /// Build the fragment for the track at `index` of its batch
    pub fn build(&self, index: usize, raw: &RawTrack) -> TrackFragment {
        let mut issues = Vec::new();

        let track_id = match raw.track_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                issues.push(InputIssue::MissingTrackKey);
                positional_id(index)
            }
        };

        let samples: Vec<Sample> = match &raw.samples {
            Some(all) => {
                let untimed = all.iter().filter(|s| s.time.is_none()).count();
                let valid: Vec<Sample> = all.iter().filter_map(Sample::from_raw).collect();
                if untimed > 0 {
                    issues.push(InputIssue::UntimedSamples { dropped: untimed });
                }
                let non_finite = all.len() - untimed - valid.len();
                if non_finite > 0 {
                    issues.push(InputIssue::NonFiniteSamples { dropped: non_finite });
                }
                valid
            }
            None => {
                issues.push(InputIssue::MissingSamples);
                Vec::new()
            }
        };

        let sample_span = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time.max(first.time))),
            _ => None,
        };

        let duration_seconds = match raw.duration {
            Some(d) if d.is_finite() && d >= 0.0 => d,
            _ => {
                issues.push(InputIssue::MissingDuration);
                sample_span.map(|(start, end)| end - start).unwrap_or(0.0)
            }
        };

        let frame_rate = match raw.frame_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => rate,
            _ => {
                issues.push(InputIssue::MissingFrameRate);
                self.config.default_frame_rate
            }
        };

        let frame_count = read_count(
            raw.frame_count,
            "frame_count",
            u64::MAX as f64,
            InputIssue::MissingFrameCount,
            &mut issues,
        )
        .map(|count| count as u64)
        .unwrap_or(samples.len() as u64);

        let reorientation_count = read_count(
            raw.reorientation_count,
            "reorientation_count",
            f64::from(u32::MAX),
            InputIssue::MissingReorientationCount,
            &mut issues,
        )
        .map(|count| count as u32)
        .unwrap_or(0);

        let declared_start_seconds = match raw.start_frame {
            Some(frame) if frame.is_finite() && frame >= 0.0 => Some(frame / frame_rate),
            Some(_) => {
                issues.push(InputIssue::InvalidCount {
                    field: "start_frame".to_string(),
                });
                None
            }
            None => None,
        };

        let (local_start_time, local_end_time) = sample_span.unwrap_or((0.0, duration_seconds));

        let first_position = samples.iter().find_map(|s| s.position);
        let last_position = samples.iter().rev().find_map(|s| s.position);

        if !issues.is_empty() {
            tracing::warn!(
                track = %track_id,
                index,
                issues = ?issues,
                "Recovered malformed track input"
            );
        }

        TrackFragment {
            is_incomplete: classify_incomplete(
                &self.config,
                duration_seconds,
                frame_count,
                frame_rate,
                reorientation_count,
            ),
            track_id,
            duration_seconds,
            frame_count,
            frame_rate,
            reorientation_count,
            local_start_time,
            local_end_time,
            experiment_start_time: None,
            experiment_end_time: None,
            alignment: AlignmentStatus::Pending,
            declared_start_seconds,
            first_position,
            last_position,
            mean_response_rate: mean_turn_rate(&samples),
            stimulus_response_samples: self.stimulus_responses(&samples),
            input_issues: issues,
        }
    }

    /// Turn rates recorded during the stimulus
    fn stimulus_responses(&self, samples: &[Sample]) -> Vec<f64> {
        let start = self.config.stimulus_window_start_s;
        let end = self.config.stimulus_window_end_s;
        samples
            .iter()
            .filter(|s| {
                if self.config.use_stimulus_flag {
                    s.stimulus
                } else {
                    s.time >= start && s.time <= end
                }
            })
            .map(|s| s.turn_rate)
            .collect()
    }
}

impl Default for FragmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A raw sample with a finite time and turn rate
struct Sample {
    time: f64,
    turn_rate: f64,
    position: Option<Position>,
    stimulus: bool,
}

impl Sample {
    fn from_raw(raw: &RawSample) -> Option<Self> {
        let time = raw.time?;
        if !time.is_finite() || !raw.turn_rate.is_finite() {
            return None;
        }
        Some(Self {
            time,
            turn_rate: raw.turn_rate,
            position: raw.position().map(Position::from),
            stimulus: raw.stimulus_flag,
        })
    }
}

fn positional_id(index: usize) -> String {
    format!("track-{}", index)
}

/// Read a count that may arrive as a float.
///
/// Absent values record `missing`; negative, non-finite or values above `max`
/// record [`InputIssue::InvalidCount`]; both yield `None`. Fractional values
/// are rounded down.
fn read_count(
    value: Option<f64>,
    field: &str,
    max: f64,
    missing: InputIssue,
    issues: &mut Vec<InputIssue>,
) -> Option<f64> {
    match value {
        None => {
            issues.push(missing);
            None
        }
        Some(v) if !v.is_finite() || v < 0.0 || v > max => {
            issues.push(InputIssue::InvalidCount {
                field: field.to_string(),
            });
            None
        }
        Some(v) => {
            if v.fract() != 0.0 {
                issues.push(InputIssue::NonIntegralCount {
                    field: field.to_string(),
                });
            }
            Some(v.floor())
        }
    }
}

/// Make track ids unique across a batch, explicit keys first
fn assign_unique_ids(fragments: &mut [TrackFragment]) {
    let positional = |f: &TrackFragment| f.input_issues.contains(&InputIssue::MissingTrackKey);

    let mut taken = HashSet::new();
    let mut clashes = Vec::new();
    for claim_positional in [false, true] {
        for (i, fragment) in fragments.iter().enumerate() {
            if positional(fragment) == claim_positional && !taken.insert(fragment.track_id.clone()) {
                clashes.push(i);
            }
        }
    }
    clashes.sort_unstable();

    for i in clashes {
        let fragment = &mut fragments[i];
        let original = fragment.track_id.clone();
        let mut suffix = 2usize;
        let renamed = loop {
            let candidate = format!("{}-{}", original, suffix);
            if taken.insert(candidate.clone()) {
                break candidate;
            }
            suffix += 1;
        };

        tracing::warn!(
            track = %original,
            index = i,
            renamed = %renamed,
            "Track id already taken in batch"
        );
        fragment.track_id = renamed;
        fragment.input_issues.push(InputIssue::DuplicateTrackId { original });
    }
}

/// Arithmetic mean of the turn rates; 0 with no samples
fn mean_turn_rate(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.turn_rate).sum::<f64>() / samples.len() as f64
}
