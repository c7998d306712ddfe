//! Configuration Management
//!
//! Every heuristic threshold of the pipeline is a named policy constant here,
//! so callers and tests can exercise boundary behavior directly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(Default)]
pub struct Config {
    /// Fragment building and classification
    pub fragment: FragmentConfig,
    /// Experiment-clock alignment
    pub alignment: AlignmentConfig,
    /// Match gating and scoring
    pub matching: MatchingConfig,
    /// Export provenance
    #[serde(default)]
    pub export: ExportConfig,
}

/// Fragment builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentConfig {
    /// Shortest duration of a full recording (seconds)
    pub min_full_duration_s: f64,
    /// Fewest reorientations expected in a full recording
    pub min_reorientations: u32,
    /// Allowed gap between recorded and frame-implied duration (seconds)
    pub frame_mismatch_tolerance_s: f64,
    /// Frame rate assumed when a track does not declare one (frames/second)
    pub default_frame_rate: f64,
    /// Stimulus window start on the track-local clock (seconds)
    pub stimulus_window_start_s: f64,
    /// Stimulus window end on the track-local clock (seconds, inclusive)
    pub stimulus_window_end_s: f64,
    /// Select stimulus samples by their flag instead of the fixed window
    #[serde(default)]
    pub use_stimulus_flag: bool,
}

/// Which alignment policy the timeline aligner uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicyKind {
    /// Declared acquisition offsets only
    Declared,
    /// Rank-order placement by batch index
    Sequential,
    /// Declared offsets, falling back to rank-order placement
    DeclaredOrSequential,
    /// Never align; every fragment is excluded from matching
    Unavailable,
}

/// Timeline alignment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Policy used to place fragments on the experiment clock
    pub policy: AlignmentPolicyKind,
    /// Spacing inserted between consecutive fragments by rank-order placement (seconds)
    pub spacing_s: f64,
}

/// Match scorer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Hard gate on the temporal gap (seconds)
    pub max_gap_s: f64,
    /// Hard gate on the endpoint distance (pixels)
    pub max_distance_px: f64,
    /// Gap at which the temporal score reaches 0 (seconds)
    pub temporal_scale_s: f64,
    /// Distance at which the spatial score reaches 0 (pixels)
    pub spatial_scale_px: f64,
    /// Response-rate difference at which behavioral similarity reaches 0
    pub behavioral_scale: f64,
    /// Weight of the temporal score
    pub temporal_weight: f64,
    /// Weight of the spatial score
    pub spatial_weight: f64,
    /// Weight of behavioral consistency
    pub behavioral_weight: f64,
    /// Weight of stimulus-response alignment
    pub response_weight: f64,
    /// Matches at or below this confidence are discarded
    pub min_confidence: f64,
    /// Behavioral consistency above which a match is labelled behavioral
    pub behavioral_pattern_threshold: f64,
    /// Confidence above which a predecessor counts as high confidence
    pub high_confidence_threshold: f64,
    /// Cap on pair evaluations per scan (unbounded when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pair_evaluations: Option<u64>,
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Pipeline/version tag stamped on every export
    pub pipeline_version: String,
    /// Directory for exported payloads (defaults under the home directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports_dir: Option<PathBuf>,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            min_full_duration_s: 200.0,
            min_reorientations: 5,
            frame_mismatch_tolerance_s: 10.0,
            default_frame_rate: 20.0,
            stimulus_window_start_s: 10.0,
            stimulus_window_end_s: 20.0,
            use_stimulus_flag: false,
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            policy: AlignmentPolicyKind::DeclaredOrSequential,
            spacing_s: 0.0,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_gap_s: 60.0,
            max_distance_px: 100.0,
            temporal_scale_s: 30.0,
            spatial_scale_px: 50.0,
            behavioral_scale: 5.0,
            temporal_weight: 0.4,
            spatial_weight: 0.3,
            behavioral_weight: 0.2,
            response_weight: 0.1,
            min_confidence: 0.3,
            behavioral_pattern_threshold: 0.8,
            high_confidence_threshold: 0.7,
            max_pair_evaluations: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pipeline_version: format!("fragment-linker/{}", env!("CARGO_PKG_VERSION")),
            exports_dir: None,
        }
    }
}

impl MatchingConfig {
    /// Sum of the four scoring weights
    pub fn weight_sum(&self) -> f64 {
        self.temporal_weight + self.spatial_weight + self.behavioral_weight + self.response_weight
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let f = &self.fragment;
        if !(f.min_full_duration_s.is_finite() && f.min_full_duration_s > 0.0) {
            return Err(crate::Error::Config(format!(
                "min_full_duration_s must be finite and > 0, got {}", f.min_full_duration_s
            )));
        }
        if !(f.frame_mismatch_tolerance_s.is_finite() && f.frame_mismatch_tolerance_s >= 0.0) {
            return Err(crate::Error::Config(format!(
                "frame_mismatch_tolerance_s must be finite and >= 0, got {}", f.frame_mismatch_tolerance_s
            )));
        }
        if !(f.default_frame_rate.is_finite() && f.default_frame_rate > 0.0) {
            return Err(crate::Error::Config(format!(
                "default_frame_rate must be finite and > 0, got {}", f.default_frame_rate
            )));
        }
        if !(f.stimulus_window_start_s.is_finite() && f.stimulus_window_end_s.is_finite()) {
            return Err(crate::Error::Config(format!(
                "stimulus window [{}, {}] must be finite",
                f.stimulus_window_start_s, f.stimulus_window_end_s
            )));
        }
        if !(f.stimulus_window_start_s <= f.stimulus_window_end_s) {
            return Err(crate::Error::Config(format!(
                "stimulus window [{}, {}] is empty",
                f.stimulus_window_start_s, f.stimulus_window_end_s
            )));
        }

        if !(self.alignment.spacing_s.is_finite() && self.alignment.spacing_s >= 0.0) {
            return Err(crate::Error::Config(format!(
                "spacing_s must be finite and >= 0, got {}", self.alignment.spacing_s
            )));
        }

        let m = &self.matching;
        if !(m.max_gap_s.is_finite() && m.max_gap_s >= 0.0) {
            return Err(crate::Error::Config(format!(
                "max_gap_s must be finite and >= 0, got {}", m.max_gap_s
            )));
        }
        if !(m.max_distance_px.is_finite() && m.max_distance_px >= 0.0) {
            return Err(crate::Error::Config(format!(
                "max_distance_px must be finite and >= 0, got {}", m.max_distance_px
            )));
        }
        for (name, value) in [
            ("temporal_scale_s", m.temporal_scale_s),
            ("spatial_scale_px", m.spatial_scale_px),
            ("behavioral_scale", m.behavioral_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(crate::Error::Config(format!("{} must be finite and > 0, got {}", name, value)));
            }
        }
        for (name, value) in [
            ("temporal_weight", m.temporal_weight),
            ("spatial_weight", m.spatial_weight),
            ("behavioral_weight", m.behavioral_weight),
            ("response_weight", m.response_weight),
        ] {
            if !(value >= 0.0) {
                return Err(crate::Error::Config(format!("{} must be >= 0, got {}", name, value)));
            }
        }
        if (m.weight_sum() - 1.0).abs() > 1e-6 {
            return Err(crate::Error::Config(format!(
                "scoring weights must sum to 1, got {}", m.weight_sum()
            )));
        }
        for (name, value) in [
            ("min_confidence", m.min_confidence),
            ("behavioral_pattern_threshold", m.behavioral_pattern_threshold),
            ("high_confidence_threshold", m.high_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::Error::Config(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        if m.max_pair_evaluations == Some(0) {
            return Err(crate::Error::Config("max_pair_evaluations must be > 0".to_string()));
        }

        if self.export.pipeline_version.trim().is_empty() {
            return Err(crate::Error::Config("pipeline_version must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".fragment_linker").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
