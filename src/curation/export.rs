//! Export payload
//!
//! A complete, replayable record of curation decisions plus the provenance a
//! downstream re-linking step needs. The decision list is the source of truth;
//! the linking graph is derived from it for convenience.

use super::decision::{DecisionAction, LinkingDecision};
use crate::app::config::MatchingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use uuid::Uuid;

/// Result of exporting a session
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Exported(ExportPayload),
    /// No pending decisions; the session was not changed
    NothingToExport,
}

impl ExportOutcome {
    pub fn payload(&self) -> Option<&ExportPayload> {
        match self {
            ExportOutcome::Exported(payload) => Some(payload),
            ExportOutcome::NothingToExport => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub export_id: Uuid,
    pub experiment_id: String,
    pub pipeline_version: String,
    pub exported_at: DateTime<Utc>,
    pub decisions: Vec<LinkingDecision>,
    #[serde(default)]
    pub linking_graph: LinkingGraph,
    /// Matching parameters the suggestions were scored with
    #[serde(default)]
    pub analysis_parameters: MatchingConfig,
}

impl ExportPayload {
    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), decisions = self.decisions.len(), "Saved export");
        Ok(())
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let payload: ExportPayload = serde_json::from_str(&content)?;
        Ok(payload)
    }

    /// Default file name, `<experiment>-<timestamp>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            self.experiment_id,
            self.exported_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    pub fn link_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_link()).count()
    }
}

/// A fragment with more than one accepted partner on one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkConflict {
    MultipleSuccessors { track_id: String, successors: Vec<String> },
    MultiplePredecessors { track_id: String, predecessors: Vec<String> },
}

/// Trajectories implied by accepted links
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingGraph {
    /// Fragment id paths; every accepted link appears in exactly one chain
    pub chains: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<LinkConflict>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_pairs: Vec<(String, String)>,
}

impl LinkingGraph {
    pub fn from_decisions(decisions: &[LinkingDecision]) -> Self {
        let mut successors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut predecessors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut rejected: BTreeSet<(String, String)> = BTreeSet::new();

        for d in decisions {
            match d.action {
                DecisionAction::Link => {
                    successors
                        .entry(d.predecessor_id.as_str())
                        .or_default()
                        .insert(d.successor_id.as_str());
                    predecessors
                        .entry(d.successor_id.as_str())
                        .or_default()
                        .insert(d.predecessor_id.as_str());
                }
                DecisionAction::Reject => {
                    rejected.insert((d.predecessor_id.clone(), d.successor_id.clone()));
                }
            }
        }

        let mut conflicts = Vec::new();
        for (id, next) in &successors {
            if next.len() > 1 {
                conflicts.push(LinkConflict::MultipleSuccessors {
                    track_id: id.to_string(),
                    successors: next.iter().map(|s| s.to_string()).collect(),
                });
            }
        }
        for (id, prev) in &predecessors {
            if prev.len() > 1 {
                conflicts.push(LinkConflict::MultiplePredecessors {
                    track_id: id.to_string(),
                    predecessors: prev.iter().map(|s| s.to_string()).collect(),
                });
            }
        }

        let mut uncovered: BTreeSet<(&str, &str)> = successors
            .iter()
            .flat_map(|(p, next)| next.iter().map(move |s| (*p, *s)))
            .collect();

        // Roots first, then whatever remains (branches and cycles)
        let roots: Vec<&str> = successors
            .keys()
            .copied()
            .filter(|id| !predecessors.contains_key(id))
            .collect();

        let mut chains = Vec::new();
        for root in roots {
            while let Some(chain) = walk_chain(root, &successors, &mut uncovered) {
                chains.push(chain);
            }
        }
        while let Some(&(start, _)) = uncovered.iter().next() {
            match walk_chain(start, &successors, &mut uncovered) {
                Some(chain) => chains.push(chain),
                None => break,
            }
        }

        Self {
            chains,
            conflicts,
            rejected_pairs: rejected.into_iter().collect(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Follow uncovered links from `start`, preferring the lowest successor id
fn walk_chain<'a>(
    start: &'a str,
    successors: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    uncovered: &mut BTreeSet<(&'a str, &'a str)>,
) -> Option<Vec<String>> {
    let mut chain = vec![start.to_string()];
    let mut current = start;
    loop {
        let next = successors
            .get(current)
            .and_then(|next| next.iter().find(|s| uncovered.contains(&(current, **s))))
            .copied();
        match next {
            Some(s) => {
                uncovered.remove(&(current, s));
                chain.push(s.to_string());
                current = s;
            }
            None => break,
        }
    }
    (chain.len() > 1).then_some(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::types::{FragmentMatch, MatchType};
    use tempfile::TempDir;

    fn m(p: &str, s: &str) -> FragmentMatch {
        FragmentMatch {
            predecessor_id: p.to_string(),
            successor_id: s.to_string(),
            temporal_gap: 2.0,
            spatial_distance: None,
            temporal_score: 0.93,
            spatial_score: 0.0,
            behavioral_consistency: 0.9,
            response_alignment: 0.0,
            confidence: 0.55,
            match_type: MatchType::BehavioralPattern,
        }
    }

    fn link(p: &str, s: &str) -> LinkingDecision {
        LinkingDecision::link(&m(p, s))
    }

    fn ids(chain: &[&str]) -> Vec<String> {
        chain.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chain_from_links() {
        let graph = LinkingGraph::from_decisions(&[link("B", "C"), link("A", "B"), link("X", "Y")]);
        assert_eq!(graph.chains, vec![ids(&["A", "B", "C"]), ids(&["X", "Y"])]);
        assert!(!graph.has_conflicts());
    }

    #[test]
    fn test_branch_is_conflict() {
        let graph = LinkingGraph::from_decisions(&[link("A", "B"), link("A", "C")]);
        assert_eq!(graph.chains, vec![ids(&["A", "B"]), ids(&["A", "C"])]);
        assert_eq!(
            graph.conflicts,
            vec![LinkConflict::MultipleSuccessors {
                track_id: "A".to_string(),
                successors: ids(&["B", "C"]),
            }]
        );
    }

    #[test]
    fn test_merge_is_conflict() {
        let graph = LinkingGraph::from_decisions(&[link("A", "C"), link("B", "C")]);
        assert_eq!(graph.chains.len(), 2);
        assert!(matches!(
            graph.conflicts.as_slice(),
            [LinkConflict::MultiplePredecessors { track_id, .. }] if track_id == "C"
        ));
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = LinkingGraph::from_decisions(&[link("A", "B"), link("B", "A")]);
        assert_eq!(graph.chains, vec![ids(&["A", "B", "A"])]);
    }

    #[test]
    fn test_rejected_pairs_listed() {
        let graph = LinkingGraph::from_decisions(&[
            LinkingDecision::reject(&m("A", "B"), "manual_rejection"),
            link("A", "C"),
        ]);
        assert_eq!(graph.rejected_pairs, vec![("A".to_string(), "B".to_string())]);
        assert_eq!(graph.chains, vec![ids(&["A", "C"])]);
    }

    #[test]
    fn test_payload_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let decisions = vec![link("A", "B")];
        let payload = ExportPayload {
            export_id: Uuid::new_v4(),
            experiment_id: "exp-7".to_string(),
            pipeline_version: "fragment-linker/test".to_string(),
            exported_at: Utc::now(),
            linking_graph: LinkingGraph::from_decisions(&decisions),
            decisions,
            analysis_parameters: MatchingConfig::default(),
        };

        let path = temp_dir.path().join("nested").join(payload.file_name());
        payload.save(&path).unwrap();
        let loaded = ExportPayload::load(&path).unwrap();

        assert_eq!(loaded, payload);
        assert_eq!(loaded.link_count(), 1);
        assert!(payload.file_name().starts_with("exp-7-"));
    }

    #[test]
    fn test_outcome_payload_accessor() {
        assert!(ExportOutcome::NothingToExport.payload().is_none());
    }
}
