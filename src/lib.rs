//! # Fragment Linker
//!
//! Track continuity reconstruction for behavioral-tracking experiments.
//!
//! ## Overview
//!
//! Motion tracking loses its target from time to time, and every loss splits one
//! organism's path into several disjoint tracks. This library turns those raw
//! tracks into fragment records, places them on a shared experiment clock,
//! proposes scored links between fragments that likely belong together, and
//! records a human's accept/reject decisions as an exportable audit trail.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fragment_linker::{CurationSession, ExportOutcome, FragmentPipeline, TrackSet};
//! use fragment_linker::app::config::Config;
//!
//! let tracks = TrackSet::load(std::path::Path::new("tracks.json")).expect("load tracks");
//! let pipeline = FragmentPipeline::new(Config::default());
//! let analysis = pipeline.analyze(&tracks.tracks);
//!
//! let mut session = CurationSession::new("exp-1", "0.1.0");
//! session.load_suggestions(analysis.matches.clone());
//! if let Some(best) = analysis.matches.first() {
//!     session.accept(best).expect("suggestion is active");
//! }
//!
//! if let ExportOutcome::Exported(payload) = session.export() {
//!     println!("{}", serde_json::to_string_pretty(&payload).unwrap());
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`ingest`]: raw track records and JSON track-set loading
//! - [`fragment`]: fragment building, incompleteness classification, statistics
//! - [`time`]: experiment-clock alignment policies and timing summaries
//! - [`matching`]: gated pairwise scoring and ranking of fragment links
//! - [`curation`]: accept/reject sessions and export payloads
//! - [`workflow`]: the end-to-end analysis pipeline
//! - [`app`]: CLI and configuration management
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Raw tracks  │───▶│  Fragment   │───▶│  Timeline   │───▶│    Match    │
//! │  (ingest)   │    │   Builder   │    │   Aligner   │    │   Scorer    │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//!                                       ┌─────────────┐    ┌─────────────┐
//!                                       │   Export    │◀───│   Linking   │
//!                                       │   payload   │    │   Curator   │
//!                                       └─────────────┘    └─────────────┘
//! ```

pub mod ingest;
pub mod fragment;
pub mod time;
pub mod matching;
pub mod curation;
pub mod workflow;
pub mod app;

// Re-export commonly used types
pub use ingest::{RawSample, RawTrack, TrackSet};
pub use fragment::{FragmentBuilder, Position, TrackFragment};
pub use time::{AlignmentPolicy, AlignmentStatus, TimelineAligner};
pub use matching::{FragmentMatch, MatchScorer, MatchType};
pub use curation::{CurationSession, ExportOutcome, ExportPayload, LinkingDecision};
pub use workflow::{FragmentAnalysis, FragmentPipeline};

/// Result type alias for the fragment linker
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the fragment linker
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Curation error: {0}")]
    Curation(String),

    #[error("No active suggestion for {predecessor} -> {successor}")]
    UnknownSuggestion {
        predecessor: String,
        successor: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
