//! Workflow Module
//!
//! Orchestrates a full analysis run from raw tracks to ranked link suggestions.

pub mod pipeline;

pub use pipeline::{FragmentAnalysis, FragmentPipeline};
