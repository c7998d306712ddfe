//! Fragment Pipeline
//!
//! Runs the analysis stages in order over one experiment's raw tracks:
//! build fragments, place them on the experiment clock, then score links.
//! Each stage consumes the previous stage's output and produces new values.

use crate::app::config::Config;
use crate::fragment::builder::FragmentBuilder;
use crate::fragment::statistics::FragmentStatistics;
use crate::fragment::types::TrackFragment;
use crate::ingest::types::RawTrack;
use crate::matching::scorer::MatchScorer;
use crate::matching::types::FragmentMatch;
use crate::time::alignment::TimelineAligner;
use crate::time::timing::TimingSummary;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Output of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentAnalysis {
    /// Aligned fragments, in input order
    pub fragments: Vec<TrackFragment>,
    /// Ranked link suggestions
    pub matches: Vec<FragmentMatch>,
    pub statistics: FragmentStatistics,
    pub timing: TimingSummary,
    /// Alignment policy the fragments were placed with
    pub alignment_policy: String,
    pub pairs_evaluated: u64,
    /// The pair-evaluation cap was hit; `matches` is partial
    pub truncated: bool,
}

impl FragmentAnalysis {
    pub fn incomplete_fragments(&self) -> impl Iterator<Item = &TrackFragment> {
        self.fragments.iter().filter(|f| f.is_incomplete)
    }

    pub fn fragment(&self, track_id: &str) -> Option<&TrackFragment> {
        self.fragments.iter().find(|f| f.track_id == track_id)
    }
}

/// End-to-end fragment analysis
pub struct FragmentPipeline {
    builder: FragmentBuilder,
    aligner: TimelineAligner,
    scorer: MatchScorer,
}

impl FragmentPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            aligner: TimelineAligner::from_config(&config.alignment),
            builder: FragmentBuilder::with_config(config.fragment),
            scorer: MatchScorer::with_config(config.matching),
        }
    }

    /// Replace the alignment stage, e.g. with a custom policy
    pub fn with_aligner(mut self, aligner: TimelineAligner) -> Self {
        self.aligner = aligner;
        self
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    /// Build, align and score one experiment's tracks
    pub fn analyze(&self, tracks: &[RawTrack]) -> FragmentAnalysis {
        let built = self.builder.build_all(tracks);
        let fragments = self.aligner.align(&built);
        let scan = self.scorer.scan(&fragments);

        let statistics = FragmentStatistics::from_fragments(&fragments);
        let timing = TimingSummary::from_fragments(&fragments);

        info!(
            tracks = statistics.total_tracks,
            incomplete = statistics.incomplete_tracks,
            unaligned = statistics.unaligned_tracks,
            matches = scan.matches.len(),
            "Fragment analysis complete"
        );

        FragmentAnalysis {
            fragments,
            matches: scan.matches,
            statistics,
            timing,
            alignment_policy: self.aligner.policy_name().to_string(),
            pairs_evaluated: scan.pairs_evaluated,
            truncated: scan.truncated,
        }
    }

    /// Re-score an existing fragment set without rebuilding it
    pub fn rescore(&self, fragments: &[TrackFragment]) -> Vec<FragmentMatch> {
        self.scorer.find_matches(fragments)
    }
}

impl Default for FragmentPipeline {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
