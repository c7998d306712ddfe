//! Fragment building
//!
//! Turns raw per-track time series into fragment records:
//! - heuristic complete/incomplete classification
//! - behavioral summaries (mean response rate, stimulus-window responses)
//! - endpoint positions for spatial matching
//! - fragment-set statistics and data quality grading

pub mod types;
pub mod builder;
pub mod statistics;

pub use types::{InputIssue, Position, TrackFragment};
pub use builder::{classify_incomplete, FragmentBuilder};
pub use statistics::{DataQuality, FragmentStatistics};
