//! Start-time index over aligned fragments
//!
//! Lets the scorer visit only the successors whose experiment start lies in a
//! predecessor's admissible gap window instead of every fragment.

use crate::fragment::types::TrackFragment;

/// Aligned fragments sorted by experiment start time
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    /// (experiment start, index into the indexed slice)
    entries: Vec<(f64, usize)>,
}

impl CandidateIndex {
    /// Index every aligned fragment of `fragments`
    pub fn build(fragments: &[TrackFragment]) -> Self {
        let mut entries: Vec<(f64, usize)> = fragments
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match f.experiment_interval() {
                Some((start, _)) if start.is_finite() => Some((start, i)),
                _ => None,
            })
            .collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Self { entries }
    }

    /// Indices of fragments starting within `[from, to]`, in start order
    pub fn starting_between(&self, from: f64, to: f64) -> impl Iterator<Item = usize> + '_ {
        let lo = self.entries.partition_point(|(start, _)| *start < from);
        let hi = self.entries.partition_point(|(start, _)| *start <= to);
        self.entries[lo..hi.max(lo)].iter().map(|(_, i)| *i)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
