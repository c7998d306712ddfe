//! Curation Session
//!
//! One owned session per experiment. Holds the active suggestion set and the
//! pending decision list; these are the only mutable curation state.
//!
//! ```text
//! Suggested ──accept──▶ Accepted (link decision appended)
//!     │
//!     └──────reject──▶ Rejected (reject decision appended)
//! ```
//!
//! A pair may be suggested again after a recomputation and receive a
//! different decision; decisions are never rewritten.

use super::decision::{LinkingDecision, DEFAULT_REJECTION_REASON};
use super::export::{ExportOutcome, ExportPayload, LinkingGraph};
use crate::app::config::MatchingConfig;
use crate::matching::types::FragmentMatch;
use crate::{Error, Result};
use chrono::Utc;
use uuid::Uuid;

/// Per-experiment curation state
#[derive(Debug, Clone)]
pub struct CurationSession {
    experiment_id: String,
    pipeline_version: String,
    analysis_parameters: MatchingConfig,
    suggestions: Vec<FragmentMatch>,
    pending: Vec<LinkingDecision>,
}

impl CurationSession {
    /// Create an empty session
    pub fn new(experiment_id: impl Into<String>, pipeline_version: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            pipeline_version: pipeline_version.into(),
            analysis_parameters: MatchingConfig::default(),
            suggestions: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Record the matching parameters the suggestions were produced with
    pub fn with_parameters(mut self, parameters: MatchingConfig) -> Self {
        self.analysis_parameters = parameters;
        self
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    pub fn pipeline_version(&self) -> &str {
        &self.pipeline_version
    }

    pub fn analysis_parameters(&self) -> &MatchingConfig {
        &self.analysis_parameters
    }

    /// Replace the active suggestion set; pending decisions are kept
    pub fn load_suggestions(&mut self, matches: Vec<FragmentMatch>) {
        tracing::debug!(
            experiment = %self.experiment_id,
            suggestions = matches.len(),
            pending = self.pending.len(),
            "Loaded suggestions"
        );
        self.suggestions = matches;
    }

    /// Active suggestions in ranked order
    pub fn suggestions(&self) -> &[FragmentMatch] {
        &self.suggestions
    }

    /// Decisions not yet exported
    pub fn pending(&self) -> &[LinkingDecision] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Look up an active suggestion by fragment pair
    pub fn find_suggestion(&self, predecessor_id: &str, successor_id: &str) -> Option<&FragmentMatch> {
        self.suggestions
            .iter()
            .find(|m| m.predecessor_id == predecessor_id && m.successor_id == successor_id)
    }

    /// Accept a suggestion as a real link
    pub fn accept(&mut self, suggestion: &FragmentMatch) -> Result<&LinkingDecision> {
        let active = self.take_suggestion(suggestion)?;
        tracing::info!(
            predecessor = %active.predecessor_id,
            successor = %active.successor_id,
            confidence = active.confidence,
            "Accepted link"
        );
        self.pending.push(LinkingDecision::link(&active));
        self.last_decision()
    }

    /// Reject a suggestion with the default reason
    pub fn reject(&mut self, suggestion: &FragmentMatch) -> Result<&LinkingDecision> {
        self.reject_with_reason(suggestion, DEFAULT_REJECTION_REASON)
    }

    /// Reject a suggestion
    pub fn reject_with_reason(
        &mut self,
        suggestion: &FragmentMatch,
        reason: impl Into<String>,
    ) -> Result<&LinkingDecision> {
        let active = self.take_suggestion(suggestion)?;
        let reason = reason.into();
        tracing::info!(
            predecessor = %active.predecessor_id,
            successor = %active.successor_id,
            reason = %reason,
            "Rejected link"
        );
        self.pending.push(LinkingDecision::reject(&active, reason));
        self.last_decision()
    }

    /// Export pending decisions and clear them.
    ///
    /// With nothing pending the session is left untouched.
    pub fn export(&mut self) -> ExportOutcome {
        if self.pending.is_empty() {
            tracing::info!(experiment = %self.experiment_id, "Nothing to export");
            return ExportOutcome::NothingToExport;
        }

        let decisions = std::mem::take(&mut self.pending);
        let payload = ExportPayload {
            export_id: Uuid::new_v4(),
            experiment_id: self.experiment_id.clone(),
            pipeline_version: self.pipeline_version.clone(),
            exported_at: Utc::now(),
            linking_graph: LinkingGraph::from_decisions(&decisions),
            decisions,
            analysis_parameters: self.analysis_parameters.clone(),
        };

        tracing::info!(
            experiment = %payload.experiment_id,
            export_id = %payload.export_id,
            decisions = payload.decisions.len(),
            "Exported decisions"
        );
        ExportOutcome::Exported(payload)
    }

    /// Remove the active suggestion for the pair; the stored copy is authoritative
    fn take_suggestion(&mut self, suggestion: &FragmentMatch) -> Result<FragmentMatch> {
        let position = self
            .suggestions
            .iter()
            .position(|m| m.key() == suggestion.key())
            .ok_or_else(|| Error::UnknownSuggestion {
                predecessor: suggestion.predecessor_id.clone(),
                successor: suggestion.successor_id.clone(),
            })?;
        Ok(self.suggestions.remove(position))
    }

    fn last_decision(&self) -> Result<&LinkingDecision> {
        self.pending
            .last()
            .ok_or_else(|| Error::Curation("decision was not recorded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curation::decision::DecisionAction;
    use crate::matching::types::MatchType;

    fn suggestion(p: &str, s: &str, confidence: f64) -> FragmentMatch {
        FragmentMatch {
            predecessor_id: p.to_string(),
            successor_id: s.to_string(),
            temporal_gap: 5.0,
            spatial_distance: Some(3.0),
            temporal_score: 0.83,
            spatial_score: 0.94,
            behavioral_consistency: 1.0,
            response_alignment: 1.0,
            confidence,
            match_type: MatchType::SpatialProximity,
        }
    }

    fn session() -> CurationSession {
        let mut s = CurationSession::new("exp-1", "test");
        s.load_suggestions(vec![suggestion("A", "B", 0.9), suggestion("C", "D", 0.5)]);
        s
    }

    #[test]
    fn test_accept_appends_link_and_removes_suggestion() {
        let mut s = session();
        let ab = s.suggestions()[0].clone();

        let decision = s.accept(&ab).unwrap();
        assert_eq!(decision.action, DecisionAction::Link);
        assert_eq!(decision.confidence_at_decision, 0.9);

        assert_eq!(s.pending().len(), 1);
        assert_eq!(s.suggestions().len(), 1);
        assert!(s.find_suggestion("A", "B").is_none());
    }

    #[test]
    fn test_accept_uses_active_confidence() {
        let mut s = session();
        let stale = suggestion("A", "B", 0.2);
        let decision = s.accept(&stale).unwrap();
        assert_eq!(decision.confidence_at_decision, 0.9);
    }

    #[test]
    fn test_reject_default_reason() {
        let mut s = session();
        let cd = s.suggestions()[1].clone();
        let decision = s.reject(&cd).unwrap();
        assert_eq!(decision.action, DecisionAction::Reject);
        assert_eq!(decision.reason.as_deref(), Some("manual_rejection"));
    }

    #[test]
    fn test_reject_with_reason() {
        let mut s = session();
        let cd = s.suggestions()[1].clone();
        let decision = s.reject_with_reason(&cd, "different larva").unwrap();
        assert_eq!(decision.reason.as_deref(), Some("different larva"));
    }

    #[test]
    fn test_unknown_suggestion() {
        let mut s = session();
        let result = s.accept(&suggestion("X", "Y", 0.9));
        assert!(matches!(result, Err(Error::UnknownSuggestion { .. })));
        assert!(s.pending().is_empty());
    }

    #[test]
    fn test_decided_suggestion_is_terminal() {
        let mut s = session();
        let ab = s.suggestions()[0].clone();
        s.accept(&ab).unwrap();
        assert!(s.reject(&ab).is_err());
        assert_eq!(s.pending().len(), 1);
    }

    #[test]
    fn test_export_clears_pending() {
        let mut s = session();
        let ab = s.suggestions()[0].clone();
        s.accept(&ab).unwrap();

        match s.export() {
            ExportOutcome::Exported(payload) => {
                assert_eq!(payload.experiment_id, "exp-1");
                assert_eq!(payload.pipeline_version, "test");
                assert_eq!(payload.decisions.len(), 1);
                assert_eq!(payload.decisions[0].key(), ("A", "B"));
                assert_eq!(payload.linking_graph.chains, vec![vec!["A".to_string(), "B".to_string()]]);
            }
            ExportOutcome::NothingToExport => panic!("expected a payload"),
        }

        assert!(!s.has_pending());
        assert_eq!(s.export(), ExportOutcome::NothingToExport);
    }

    #[test]
    fn test_empty_export_leaves_state() {
        let mut s = session();
        assert_eq!(s.export(), ExportOutcome::NothingToExport);
        assert_eq!(s.suggestions().len(), 2);
        assert!(s.pending().is_empty());
    }

    #[test]
    fn test_reload_keeps_pending_and_allows_resuggestion() {
        let mut s = session();
        let ab = s.suggestions()[0].clone();
        s.reject(&ab).unwrap();

        s.load_suggestions(vec![suggestion("A", "B", 0.9)]);
        assert_eq!(s.pending().len(), 1);

        let again = s.suggestions()[0].clone();
        s.accept(&again).unwrap();
        assert_eq!(s.pending().len(), 2);
        assert_eq!(s.pending()[0].action, DecisionAction::Reject);
        assert_eq!(s.pending()[1].action, DecisionAction::Link);
    }

    #[test]
    fn test_parameters_recorded_in_export() {
        let params = MatchingConfig {
            max_gap_s: 45.0,
            ..MatchingConfig::default()
        };
        let mut s = session().with_parameters(params.clone());
        let ab = s.suggestions()[0].clone();
        s.accept(&ab).unwrap();

        let ExportOutcome::Exported(payload) = s.export() else {
            panic!("expected a payload");
        };
        assert_eq!(payload.analysis_parameters, params);
    }
}
