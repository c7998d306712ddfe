//! Raw track ingest
//!
//! Shapes of the per-track time series handed over by the tracking
//! collaborators, and loading of whole track sets from JSON.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::TrackSet;
