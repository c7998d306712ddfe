//! Experiment-clock alignment
//!
//! Fragments only carry track-local time. This module places them on the single
//! shared experiment clock through deterministic, pluggable policies, and
//! summarizes the resulting timeline.

pub mod alignment;
pub mod timing;

pub use alignment::{
    AlignmentContext, AlignmentEstimate, AlignmentPolicy, AlignmentStatus, DeclaredOffsetPolicy,
    FallbackPolicy, SequentialPolicy, TimelineAligner, UnavailablePolicy,
};
pub use timing::{TimingGap, TimingStatus, TimingSummary};
