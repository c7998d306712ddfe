//! Fragment matching
//!
//! Proposes directed predecessor → successor links between fragments:
//! - hard gates on temporal gap and endpoint distance
//! - weighted temporal, spatial, behavioral and stimulus-response scores
//! - ranking by confidence with a deterministic tie order

pub mod types;
pub mod candidate_index;
pub mod scorer;

pub use types::{ConfidenceTier, FragmentMatch, MatchType};
pub use candidate_index::CandidateIndex;
pub use scorer::{MatchScan, MatchScorer, Rejection};
