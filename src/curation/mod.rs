//! Linking curation
//!
//! Human accept/reject decisions over ranked match suggestions, accumulated
//! per experiment and exported as a replayable audit trail.

pub mod decision;
pub mod export;
pub mod registry;
pub mod session;

pub use decision::{DecisionAction, LinkingDecision, MatchEvidence};
pub use export::{ExportOutcome, ExportPayload, LinkConflict, LinkingGraph};
pub use registry::SessionRegistry;
pub use session::CurationSession;
