//! Track Set Loading
//!
//! Reads the raw track list of one experiment from JSON. Both a bare array of
//! tracks and an object with `experiment_id` and `tracks` are accepted. A
//! track entry that cannot be read at all is kept as an empty record so the
//! rest of the batch still loads.

use super::types::RawTrack;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// All raw tracks of one experiment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackSet {
    /// Experiment identifier, if the source file carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    /// Raw tracks in acquisition order
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
}

impl TrackSet {
    /// Create a track set from tracks
    pub fn new(experiment_id: Option<String>, tracks: Vec<RawTrack>) -> Self {
        Self {
            experiment_id,
            tracks,
        }
    }

    /// Parse a track set from a JSON string.
    ///
    /// Syntax errors propagate, as does a document of the wrong shape. Tracks
    /// missing summary fields are kept and repaired later by the fragment
    /// builder.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let (experiment_id, entries) = match serde_json::from_str::<Value>(json)? {
            Value::Array(entries) => (None, entries),
            Value::Object(mut root) => {
                let experiment_id = root
                    .remove("experiment_id")
                    .and_then(|id| id.as_str().map(str::to_string));
                let entries = match root.remove("tracks") {
                    Some(Value::Array(entries)) => entries,
                    None | Some(Value::Null) => Vec::new(),
                    Some(_) => {
                        return Err(crate::Error::Ingest("'tracks' must be an array".to_string()))
                    }
                };
                (experiment_id, entries)
            }
            _ => {
                return Err(crate::Error::Ingest(
                    "expected an array of tracks or an object with 'tracks'".to_string(),
                ))
            }
        };

        let tracks = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| read_track(index, entry))
            .collect();
        let set = TrackSet::new(experiment_id, tracks);
        set.check_unique_keys()?;
        Ok(set)
    }

    /// Load a track set from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            tracks = set.tracks.len(),
            experiment = set.experiment_id.as_deref().unwrap_or("-"),
            "Loaded track set"
        );
        Ok(set)
    }

    /// Save the track set as pretty JSON
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Track keys must identify tracks uniquely; two records sharing a key
    /// cannot be told apart as predecessor and successor. Keys are compared
    /// the way the fragment builder reads them: trimmed, blank meaning absent.
    fn check_unique_keys(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        let keys = self
            .tracks
            .iter()
            .filter_map(|t| t.track_key.as_deref())
            .map(str::trim)
            .filter(|key| !key.is_empty());
        for key in keys {
            if !seen.insert(key) {
                return Err(crate::Error::Ingest(format!(
                    "duplicate track_key '{}'",
                    key
                )));
            }
        }
        Ok(())
    }
}

/// Read one track entry, keeping an empty record when it is unreadable
fn read_track(index: usize, entry: Value) -> RawTrack {
    match serde_json::from_value(entry) {
        Ok(track) => track,
        Err(err) => {
            tracing::warn!(index, error = %err, "Unreadable track record, keeping it empty");
            RawTrack::default()
        }
    }
}
