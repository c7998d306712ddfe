//! Match data structures

use serde::{Deserialize, Serialize};

/// Factor that dominated a match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    TemporalContinuity,
    SpatialProximity,
    BehavioralPattern,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::TemporalContinuity => "temporal_continuity",
            MatchType::SpatialProximity => "spatial_proximity",
            MatchType::BehavioralPattern => "behavioral_pattern",
        }
    }
}

/// Display tier of a confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            ConfidenceTier::High
        } else if confidence > 0.4 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

/// A directed candidate link `predecessor → successor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentMatch {
    pub predecessor_id: String,
    pub successor_id: String,
    /// Successor start minus predecessor end on the experiment clock (seconds)
    pub temporal_gap: f64,
    /// Distance between predecessor's last and successor's first position;
    /// absent when either position is unknown
    pub spatial_distance: Option<f64>,
    pub temporal_score: f64,
    pub spatial_score: f64,
    pub behavioral_consistency: f64,
    pub response_alignment: f64,
    /// Weighted combination of the four factors, in [0, 1]
    pub confidence: f64,
    pub match_type: MatchType,
}

impl FragmentMatch {
    /// The (predecessor, successor) pair this match links
    pub fn key(&self) -> (&str, &str) {
        (&self.predecessor_id, &self.successor_id)
    }

    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }
}
