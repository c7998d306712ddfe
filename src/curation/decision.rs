//! Curation decision records

use crate::matching::types::{FragmentMatch, MatchType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason recorded when a rejection carries no explicit reason
pub const DEFAULT_REJECTION_REASON: &str = "manual_rejection";

/// What the curator decided about a suggested link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Link,
    Reject,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Link => "link",
            DecisionAction::Reject => "reject",
        }
    }
}

/// Score breakdown of the suggestion at decision time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub temporal_gap: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_distance: Option<f64>,
    pub temporal_score: f64,
    pub spatial_score: f64,
    pub behavioral_consistency: f64,
    pub response_alignment: f64,
    pub match_type: MatchType,
}

impl From<&FragmentMatch> for MatchEvidence {
    fn from(m: &FragmentMatch) -> Self {
        Self {
            temporal_gap: m.temporal_gap,
            spatial_distance: m.spatial_distance,
            temporal_score: m.temporal_score,
            spatial_score: m.spatial_score,
            behavioral_consistency: m.behavioral_consistency,
            response_alignment: m.response_alignment,
            match_type: m.match_type,
        }
    }
}

/// One append-only curation action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkingDecision {
    pub action: DecisionAction,
    pub predecessor_id: String,
    pub successor_id: String,
    /// Confidence of the suggestion when the decision was made
    pub confidence_at_decision: f64,
    pub evidence: MatchEvidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LinkingDecision {
    /// Accept a suggestion as a real link
    pub fn link(suggestion: &FragmentMatch) -> Self {
        Self::record(DecisionAction::Link, suggestion, None)
    }

    /// Reject a suggestion
    pub fn reject(suggestion: &FragmentMatch, reason: impl Into<String>) -> Self {
        Self::record(DecisionAction::Reject, suggestion, Some(reason.into()))
    }

    fn record(action: DecisionAction, suggestion: &FragmentMatch, reason: Option<String>) -> Self {
        Self {
            action,
            predecessor_id: suggestion.predecessor_id.clone(),
            successor_id: suggestion.successor_id.clone(),
            confidence_at_decision: suggestion.confidence,
            evidence: MatchEvidence::from(suggestion),
            reason,
            timestamp: Utc::now(),
        }
    }

    pub fn is_link(&self) -> bool {
        self.action == DecisionAction::Link
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.predecessor_id, &self.successor_id)
    }
}
