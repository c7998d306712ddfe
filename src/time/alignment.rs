//! Timeline Aligner
//!
//! Source recordings do not store an absolute acquisition offset for every
//! fragment, so the experiment-clock position is an estimate. Estimates come
//! from an injected [`AlignmentPolicy`]; every policy is deterministic and
//! answers "unavailable" instead of inventing a time when it has no structural
//! hint to work from.

use crate::app::config::{AlignmentConfig, AlignmentPolicyKind};
use crate::fragment::types::TrackFragment;
use serde::{Deserialize, Serialize};

/// Alignment state of a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlignmentStatus {
    /// Not yet passed through an aligner
    Pending,
    /// Placed on the experiment clock by the named policy
    Aligned { policy: String },
    /// No estimate could be produced; excluded from matching
    Unavailable { reason: String },
}

impl AlignmentStatus {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AlignmentStatus::Unavailable { .. })
    }
}

/// Batch context handed to a policy
#[derive(Debug, Clone, Copy)]
pub struct AlignmentContext<'a> {
    /// Position of the fragment in its batch, when it is aligned as part of one
    pub index: Option<usize>,
    /// Number of fragments in the batch
    pub total: usize,
    /// Fragments that precede this one in the batch
    pub preceding: &'a [TrackFragment],
}

impl<'a> AlignmentContext<'a> {
    /// Context for a fragment aligned on its own
    pub fn standalone() -> Self {
        Self {
            index: None,
            total: 1,
            preceding: &[],
        }
    }
}

/// An experiment-clock start estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentEstimate {
    /// Estimated start on the experiment clock (seconds)
    pub start: f64,
    /// Policy that produced the estimate
    pub policy: &'static str,
}

/// Strategy placing a fragment on the experiment clock
pub trait AlignmentPolicy: Send + Sync {
    /// Policy name, recorded on aligned fragments
    fn name(&self) -> &'static str;

    /// Estimate the fragment's start, or `None` when no hint is available
    fn estimate(&self, fragment: &TrackFragment, context: &AlignmentContext<'_>) -> Option<AlignmentEstimate>;
}

/// Uses the acquisition offset declared by the raw track
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredOffsetPolicy;

impl AlignmentPolicy for DeclaredOffsetPolicy {
    fn name(&self) -> &'static str {
        "declared"
    }

    fn estimate(&self, fragment: &TrackFragment, _context: &AlignmentContext<'_>) -> Option<AlignmentEstimate> {
        fragment.declared_start_seconds.map(|start| AlignmentEstimate {
            start,
            policy: self.name(),
        })
    }
}

/// Rank-order placement: fragments are laid end to end in batch order,
/// separated by a fixed spacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPolicy {
    /// Spacing between consecutive fragments (seconds)
    pub spacing_s: f64,
}

impl SequentialPolicy {
    pub fn new(spacing_s: f64) -> Self {
        Self { spacing_s }
    }
}

impl AlignmentPolicy for SequentialPolicy {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn estimate(&self, _fragment: &TrackFragment, context: &AlignmentContext<'_>) -> Option<AlignmentEstimate> {
        let index = context.index?;
        let occupied: f64 = context
            .preceding
            .iter()
            .map(|f| f.duration_seconds.max(0.0))
            .sum();
        Some(AlignmentEstimate {
            start: occupied + index as f64 * self.spacing_s,
            policy: self.name(),
        })
    }
}

/// Never produces an estimate
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePolicy;

impl AlignmentPolicy for UnavailablePolicy {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn estimate(&self, _fragment: &TrackFragment, _context: &AlignmentContext<'_>) -> Option<AlignmentEstimate> {
        None
    }
}

/// Tries each policy in order; the first estimate wins
pub struct FallbackPolicy {
    policies: Vec<Box<dyn AlignmentPolicy>>,
}

impl FallbackPolicy {
    pub fn new(policies: Vec<Box<dyn AlignmentPolicy>>) -> Self {
        Self { policies }
    }
}

impl AlignmentPolicy for FallbackPolicy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn estimate(&self, fragment: &TrackFragment, context: &AlignmentContext<'_>) -> Option<AlignmentEstimate> {
        self.policies
            .iter()
            .find_map(|policy| policy.estimate(fragment, context))
    }
}

/// Timeline aligner
pub struct TimelineAligner {
    policy: Box<dyn AlignmentPolicy>,
}

impl TimelineAligner {
    /// Create an aligner around a policy
    pub fn new(policy: Box<dyn AlignmentPolicy>) -> Self {
        Self { policy }
    }

    /// Build the aligner selected by configuration
    pub fn from_config(config: &AlignmentConfig) -> Self {
        let policy: Box<dyn AlignmentPolicy> = match config.policy {
            AlignmentPolicyKind::Declared => Box::new(DeclaredOffsetPolicy),
            AlignmentPolicyKind::Sequential => Box::new(SequentialPolicy::new(config.spacing_s)),
            AlignmentPolicyKind::DeclaredOrSequential => Box::new(FallbackPolicy::new(vec![
                Box::new(DeclaredOffsetPolicy),
                Box::new(SequentialPolicy::new(config.spacing_s)),
            ])),
            AlignmentPolicyKind::Unavailable => Box::new(UnavailablePolicy),
        };
        Self::new(policy)
    }

    /// Name of the configured policy
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Align a batch, returning new fragment values in input order
    pub fn align(&self, fragments: &[TrackFragment]) -> Vec<TrackFragment> {
        let aligned: Vec<TrackFragment> = fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| {
                let context = AlignmentContext {
                    index: Some(index),
                    total: fragments.len(),
                    preceding: &fragments[..index],
                };
                self.align_with(fragment, &context)
            })
            .collect();

        let unavailable = aligned.iter().filter(|f| f.alignment.is_unavailable()).count();
        tracing::info!(
            policy = self.policy.name(),
            aligned = aligned.len() - unavailable,
            unavailable,
            "Timeline alignment complete"
        );
        aligned
    }

    /// Align a single fragment outside of any batch
    pub fn align_one(&self, fragment: &TrackFragment) -> TrackFragment {
        self.align_with(fragment, &AlignmentContext::standalone())
    }

    fn align_with(&self, fragment: &TrackFragment, context: &AlignmentContext<'_>) -> TrackFragment {
        match self.policy.estimate(fragment, context) {
            Some(estimate) if estimate.start.is_finite() && estimate.start >= 0.0 => {
                fragment.aligned_at(estimate.start, estimate.policy)
            }
            Some(estimate) => {
                tracing::debug!(
                    track = %fragment.track_id,
                    start = estimate.start,
                    "Discarding invalid alignment estimate"
                );
                fragment.unaligned(format!(
                    "{} policy produced invalid start {}",
                    estimate.policy, estimate.start
                ))
            }
            None => {
                tracing::debug!(track = %fragment.track_id, "No alignment hint available");
                fragment.unaligned(format!("no structural hint for {} policy", self.policy.name()))
            }
        }
    }
}

impl Default for TimelineAligner {
    fn default() -> Self {
        Self::from_config(&AlignmentConfig::default())
    }
}
