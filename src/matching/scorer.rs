//! Match Scorer
//!
//! Evaluates every incomplete, aligned fragment as a predecessor against the
//! aligned fragments that start inside its gap window. Pairs are gated first
//! (overlap, gap, distance), then scored as a weighted sum of four similarity
//! factors. A malformed pair is skipped; a scan always returns a ranked list.

use super::candidate_index::CandidateIndex;
use super::types::{FragmentMatch, MatchType};
use crate::app::config::MatchingConfig;
use crate::fragment::types::TrackFragment;

/// Why a pair did not produce a match
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Predecessor and successor are the same fragment
    SameTrack,
    /// Predecessor has no experiment-clock times
    PredecessorUnaligned,
    /// Successor has no experiment-clock times
    SuccessorUnaligned,
    /// Successor starts before the predecessor ends
    Overlap { gap: f64 },
    /// Gap exceeds the hard gate
    GapTooLarge { gap: f64 },
    /// Endpoints are farther apart than the hard gate
    TooFar { distance: f64 },
    /// A required value is not finite
    Malformed(&'static str),
    /// Scored, but not above the minimum confidence
    BelowThreshold { confidence: f64 },
}

/// Result of a full matching pass
#[derive(Debug, Clone, Default)]
pub struct MatchScan {
    /// Matches ranked by descending confidence
    pub matches: Vec<FragmentMatch>,
    /// Incomplete aligned fragments evaluated as predecessors
    pub predecessors_considered: usize,
    /// Pair evaluations performed
    pub pairs_evaluated: u64,
    /// The pair-evaluation cap stopped the scan early
    pub truncated: bool,
}

/// Match scorer
pub struct MatchScorer {
    config: MatchingConfig,
}

impl MatchScorer {
    /// Create with default gates and weights
    pub fn new() -> Self {
        Self::with_config(MatchingConfig::default())
    }

    /// Create with custom gates and weights
    pub fn with_config(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Ranked matches for a fragment set
    pub fn find_matches(&self, fragments: &[TrackFragment]) -> Vec<FragmentMatch> {
        self.scan(fragments).matches
    }

    /// Run a matching pass and report scan statistics alongside the matches
    pub fn scan(&self, fragments: &[TrackFragment]) -> MatchScan {
        let index = CandidateIndex::build(fragments);
        let mut scan = MatchScan::default();

        'predecessors: for predecessor in fragments.iter().filter(|f| f.is_incomplete) {
            let Some((_, end)) = predecessor.experiment_interval() else {
                continue;
            };
            scan.predecessors_considered += 1;

            // Slightly widened window; the exact gates are applied by `evaluate`.
            let slack = 1e-6 * (1.0 + end.abs() + self.config.max_gap_s);
            let mut found = 0usize;
            for candidate in index.starting_between(end - slack, end + self.config.max_gap_s + slack) {
                if let Some(cap) = self.config.max_pair_evaluations {
                    if scan.pairs_evaluated >= cap {
                        scan.truncated = true;
                        break 'predecessors;
                    }
                }
                scan.pairs_evaluated += 1;

                let successor = &fragments[candidate];
                match self.evaluate(predecessor, successor) {
                    Ok(m) => {
                        found += 1;
                        scan.matches.push(m);
                    }
                    Err(rejection) => {
                        tracing::trace!(
                            predecessor = %predecessor.track_id,
                            successor = %successor.track_id,
                            ?rejection,
                            "Pair rejected"
                        );
                    }
                }
            }

            if found == 0 {
                tracing::debug!(track = %predecessor.track_id, "No candidate matches");
            }
        }

        if scan.truncated {
            tracing::warn!(
                cap = ?self.config.max_pair_evaluations,
                matches = scan.matches.len(),
                "Pair evaluation cap reached; match list is partial"
            );
        }

        rank(&mut scan.matches);

        tracing::info!(
            predecessors = scan.predecessors_considered,
            pairs = scan.pairs_evaluated,
            matches = scan.matches.len(),
            "Fragment matching complete"
        );
        scan
    }

    /// Gate and score one directed pair
    pub fn evaluate(
        &self,
        predecessor: &TrackFragment,
        successor: &TrackFragment,
    ) -> Result<FragmentMatch, Rejection> {
        let c = &self.config;

        if predecessor.track_id == successor.track_id {
            return Err(Rejection::SameTrack);
        }
        let (_, predecessor_end) = predecessor
            .experiment_interval()
            .ok_or(Rejection::PredecessorUnaligned)?;
        let (successor_start, _) = successor
            .experiment_interval()
            .ok_or(Rejection::SuccessorUnaligned)?;

        let gap = successor_start - predecessor_end;
        if !gap.is_finite() {
            return Err(Rejection::Malformed("temporal gap"));
        }
        if gap < 0.0 {
            return Err(Rejection::Overlap { gap });
        }
        if gap > c.max_gap_s {
            return Err(Rejection::GapTooLarge { gap });
        }

        let distance = match (predecessor.last_position, successor.first_position) {
            (Some(last), Some(first)) => Some(last.distance_to(&first)),
            _ => None,
        };
        if let Some(d) = distance {
            if !d.is_finite() {
                return Err(Rejection::Malformed("spatial distance"));
            }
            if d > c.max_distance_px {
                return Err(Rejection::TooFar { distance: d });
            }
        }

        if !predecessor.mean_response_rate.is_finite() || !successor.mean_response_rate.is_finite() {
            return Err(Rejection::Malformed("mean response rate"));
        }

        let temporal_score = linear_decay(gap, c.temporal_scale_s);
        let spatial_score = distance
            .map(|d| linear_decay(d, c.spatial_scale_px))
            .unwrap_or(0.0);
        let behavioral_consistency = similarity(
            predecessor.mean_response_rate,
            successor.mean_response_rate,
            c.behavioral_scale,
        );
        let response_alignment = match (
            predecessor.stimulus_response_mean(),
            successor.stimulus_response_mean(),
        ) {
            (Some(a), Some(b)) => similarity(a, b, c.behavioral_scale),
            _ => 0.0,
        };

        let confidence = (c.temporal_weight * temporal_score
            + c.spatial_weight * spatial_score
            + c.behavioral_weight * behavioral_consistency
            + c.response_weight * response_alignment)
            .clamp(0.0, 1.0);

        if confidence <= c.min_confidence {
            return Err(Rejection::BelowThreshold { confidence });
        }

        let match_type = if spatial_score > temporal_score {
            MatchType::SpatialProximity
        } else if behavioral_consistency > c.behavioral_pattern_threshold {
            MatchType::BehavioralPattern
        } else {
            MatchType::TemporalContinuity
        };

        Ok(FragmentMatch {
            predecessor_id: predecessor.track_id.clone(),
            successor_id: successor.track_id.clone(),
            temporal_gap: gap,
            spatial_distance: distance,
            temporal_score,
            spatial_score,
            behavioral_consistency,
            response_alignment,
            confidence,
            match_type,
        })
    }

    /// Matches into `track_id` whose confidence clears the high-confidence threshold
    pub fn high_confidence_predecessors<'a>(
        &self,
        matches: &'a [FragmentMatch],
        track_id: &str,
    ) -> Vec<&'a FragmentMatch> {
        matches
            .iter()
            .filter(|m| m.successor_id == track_id && m.confidence > self.config.high_confidence_threshold)
            .collect()
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by descending confidence, ties by (predecessor, successor)
pub fn rank(matches: &mut [FragmentMatch]) {
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.predecessor_id.cmp(&b.predecessor_id))
            .then_with(|| a.successor_id.cmp(&b.successor_id))
    });
}

/// `max(0, 1 - value / scale)`
fn linear_decay(value: f64, scale: f64) -> f64 {
    (1.0 - value / scale).max(0.0)
}

/// Similarity in [0, 1] of two scalars; 0 when either is not finite
fn similarity(a: f64, b: f64, scale: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    linear_decay((a - b).abs(), scale).min(1.0)
}
