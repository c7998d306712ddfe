//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Fragment Linker - Reconstruct trajectories from fragmented tracking data
#[derive(Parser, Debug)]
#[command(name = "fragment-link")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a track set: statistics, timing and ranked link suggestions
    Analyze {
        /// Input track-set JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the fragments built from a track set
    Fragments {
        /// Input track-set JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Only list fragments classified as incomplete
        #[arg(long)]
        incomplete_only: bool,
    },

    /// Apply link decisions to the suggestions for a track set and export them
    Curate {
        /// Input track-set JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Accept the suggested link PREDECESSOR:SUCCESSOR (split at the last ':')
        #[arg(short, long, value_name = "P:S")]
        accept: Vec<LinkPair>,

        /// Reject the suggested link PREDECESSOR:SUCCESSOR (split at the last ':')
        #[arg(short, long, value_name = "P:S")]
        reject: Vec<LinkPair>,

        /// Reason recorded on rejections
        #[arg(long)]
        reason: Option<String>,

        /// Experiment id (defaults to the track set's id, then the file stem)
        #[arg(short, long)]
        experiment: Option<String>,

        /// Output file for the export payload
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "matching.max_gap_s", "alignment.policy")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// A `PREDECESSOR:SUCCESSOR` fragment pair given on the command line.
///
/// The pair splits at the last `:`, so a predecessor id may itself contain
/// `:` while a successor id may not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPair {
    pub predecessor: String,
    pub successor: String,
}

impl FromStr for LinkPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (predecessor, successor) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected PREDECESSOR:SUCCESSOR, got '{}'", s))?;
        let (predecessor, successor) = (predecessor.trim(), successor.trim());
        if predecessor.is_empty() || successor.is_empty() {
            return Err(format!("empty track id in '{}'", s));
        }
        Ok(Self {
            predecessor: predecessor.to_string(),
            successor: successor.to_string(),
        })
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the exports directory
    pub fn exports_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".fragment_linker").join("exports"))
            .unwrap_or_else(|| PathBuf::from("exports"))
    }
}
