//! Session registry
//!
//! Maps experiment ids to their curation session. Each session sits behind
//! its own mutex, so a single experiment has exactly one writer at a time
//! while different experiments proceed independently.

use super::session::CurationSession;
use crate::app::config::MatchingConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type SharedSession = Arc<Mutex<CurationSession>>;

pub struct SessionRegistry {
    pipeline_version: String,
    analysis_parameters: MatchingConfig,
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(pipeline_version: impl Into<String>, analysis_parameters: MatchingConfig) -> Self {
        Self {
            pipeline_version: pipeline_version.into(),
            analysis_parameters,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for an experiment, created on first use
    pub fn get_or_create(&self, experiment_id: &str) -> SharedSession {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(experiment_id.to_string()).or_insert_with(|| {
            tracing::debug!(experiment = %experiment_id, "Created curation session");
            Arc::new(Mutex::new(
                CurationSession::new(experiment_id, self.pipeline_version.clone())
                    .with_parameters(self.analysis_parameters.clone()),
            ))
        });
        Arc::clone(session)
    }

    /// Existing session for an experiment
    pub fn get(&self, experiment_id: &str) -> crate::Result<SharedSession> {
        self.sessions
            .lock()
            .get(experiment_id)
            .cloned()
            .ok_or_else(|| crate::Error::Curation(format!("no session for experiment '{}'", experiment_id)))
    }

    /// Drop a session; returns it if it existed
    pub fn remove(&self, experiment_id: &str) -> Option<SharedSession> {
        self.sessions.lock().remove(experiment_id)
    }

    /// Registered experiment ids, sorted
    pub fn experiment_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        let export = crate::app::config::ExportConfig::default();
        Self::new(export.pipeline_version, MatchingConfig::default())
    }
}
