//! Fragment Linker - Track continuity reconstruction
//!
//! Builds fragments from raw tracking output, suggests links between them and
//! exports curated link decisions.

use fragment_linker::app::cli::{Cli, Commands, ConfigAction, LinkPair};
use fragment_linker::app::config::Config;
use fragment_linker::curation::{CurationSession, ExportOutcome};
use fragment_linker::fragment::statistics::DataQuality;
use fragment_linker::ingest::TrackSet;
use fragment_linker::workflow::{FragmentAnalysis, FragmentPipeline};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    // Execute command
    match cli.command {
        Commands::Analyze { input, json } => {
            run_analyze(&input, json, &config)?;
        }
        Commands::Fragments {
            input,
            incomplete_only,
        } => {
            run_fragments(&input, incomplete_only, &config)?;
        }
        Commands::Curate {
            input,
            accept,
            reject,
            reason,
            experiment,
            output,
        } => {
            run_curate(&input, &accept, &reject, reason, experiment, output, &config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn load_tracks(input: &Path) -> anyhow::Result<TrackSet> {
    if !input.exists() {
        anyhow::bail!("Track file not found: {:?}", input);
    }
    Ok(TrackSet::load(input)?)
}

fn run_analyze(input: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let tracks = load_tracks(input)?;
    let analysis = FragmentPipeline::new(config.clone()).analyze(&tracks.tracks);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    print_summary(&analysis);

    println!("\nLink suggestions ({}):", analysis.matches.len());
    if analysis.matches.is_empty() {
        println!("  (none)");
    }
    for m in &analysis.matches {
        let distance = m
            .spatial_distance
            .map(|d| format!("{:.1}px", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} -> {}  confidence {:.3} ({:?})  gap {:.1}s  distance {}  [{}]",
            m.predecessor_id,
            m.successor_id,
            m.confidence,
            m.tier(),
            m.temporal_gap,
            distance,
            m.match_type.as_str()
        );
    }

    if analysis.truncated {
        warn!(
            pairs = analysis.pairs_evaluated,
            "Suggestion list is partial; raise matching.max_pair_evaluations to see all"
        );
    }

    Ok(())
}

fn print_summary(analysis: &FragmentAnalysis) {
    let stats = &analysis.statistics;
    println!("Fragments: {}", stats.total_tracks);
    println!(
        "  Incomplete: {} ({:.1}%)",
        stats.incomplete_tracks, stats.incomplete_percentage
    );
    println!("  Complete: {}", stats.complete_tracks);
    if let (Some(shortest), Some(longest)) = (stats.shortest_track, stats.longest_track) {
        println!("  Duration range: {:.1}s - {:.1}s", shortest, longest);
    }
    if stats.unaligned_tracks > 0 {
        println!("  Without experiment timing: {}", stats.unaligned_tracks);
    }

    let timing = &analysis.timing;
    println!("\nTiming ({} policy):", analysis.alignment_policy);
    match (timing.earliest_track_start, timing.latest_track_end) {
        (Some(start), Some(end)) => {
            println!("  Span: {:.1}s - {:.1}s", start, end);
            println!("  Gaps: {}", timing.timing_gaps.len());
        }
        _ => println!("  No experimental timing available"),
    }
}

fn run_fragments(input: &Path, incomplete_only: bool, config: &Config) -> anyhow::Result<()> {
    let tracks = load_tracks(input)?;
    let analysis = FragmentPipeline::new(config.clone()).analyze(&tracks.tracks);

    let listed: Vec<_> = analysis
        .fragments
        .iter()
        .filter(|f| !incomplete_only || f.is_incomplete)
        .collect();

    println!("Fragments ({} of {}):", listed.len(), analysis.fragments.len());
    for f in listed {
        let span = f
            .experiment_interval()
            .map(|(start, end)| format!("{:.1}s-{:.1}s", start, end))
            .unwrap_or_else(|| "unaligned".to_string());
        println!(
            "  {}  {:.1}s  {} reorientations  {}  {}{}",
            f.track_id,
            f.duration_seconds,
            f.reorientation_count,
            span,
            DataQuality::of(f).as_str(),
            if f.is_incomplete { "  [incomplete]" } else { "" }
        );
        if !f.input_issues.is_empty() {
            println!("    input issues: {:?}", f.input_issues);
        }
    }

    Ok(())
}

fn run_curate(
    input: &Path,
    accept: &[LinkPair],
    reject: &[LinkPair],
    reason: Option<String>,
    experiment: Option<String>,
    output: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    let tracks = load_tracks(input)?;
    let analysis = FragmentPipeline::new(config.clone()).analyze(&tracks.tracks);

    let experiment_id = experiment
        .or_else(|| tracks.experiment_id.clone())
        .or_else(|| input.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "experiment".to_string());

    let mut session = CurationSession::new(&experiment_id, &config.export.pipeline_version)
        .with_parameters(config.matching.clone());
    session.load_suggestions(analysis.matches);

    for pair in accept {
        let suggestion = active_suggestion(&session, pair)?;
        let decision = session.accept(&suggestion)?;
        println!(
            "Accepted {} -> {} ({:.3})",
            decision.predecessor_id, decision.successor_id, decision.confidence_at_decision
        );
    }

    for pair in reject {
        let suggestion = active_suggestion(&session, pair)?;
        let decision = match &reason {
            Some(r) => session.reject_with_reason(&suggestion, r.clone())?,
            None => session.reject(&suggestion)?,
        };
        println!("Rejected {} -> {}", decision.predecessor_id, decision.successor_id);
    }

    match session.export() {
        ExportOutcome::NothingToExport => {
            println!("Nothing to export: no decisions were made");
        }
        ExportOutcome::Exported(payload) => {
            let path = match output {
                Some(path) => path,
                None => config
                    .export
                    .exports_dir
                    .clone()
                    .unwrap_or_else(Cli::exports_dir)
                    .join(payload.file_name()),
            };
            payload.save(&path)?;
            info!(export_id = %payload.export_id, "Export written");

            println!("\nExported {} decisions to {:?}", payload.decisions.len(), path);
            for chain in &payload.linking_graph.chains {
                println!("  chain: {}", chain.join(" -> "));
            }
            for conflict in &payload.linking_graph.conflicts {
                warn!(?conflict, "Conflicting links in export");
            }
        }
    }

    Ok(())
}

fn active_suggestion(
    session: &CurationSession,
    pair: &LinkPair,
) -> anyhow::Result<fragment_linker::FragmentMatch> {
    session
        .find_suggestion(&pair.predecessor, &pair.successor)
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No active suggestion {} -> {}; run 'fragment-link analyze' to list suggestions",
                pair.predecessor,
                pair.successor
            )
        })
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    let exports_dir = config.export.exports_dir.clone().unwrap_or_else(Cli::exports_dir);
    std::fs::create_dir_all(&exports_dir)?;
    println!("\nCreated directories:");
    println!("  Exports: {:?}", exports_dir);

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = config.to_toml()?;
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", toml_str);
        }
        ConfigAction::Get { key } => {
            let toml_str = config.to_toml()?;
            match find_toml_value(&toml_str, &key) {
                Some(v) => println!("{} = {}", key, v),
                None if OPTIONAL_KEYS.contains(&key.as_str()) => println!("{} is unset", key),
                None => {
                    anyhow::bail!("Configuration key '{}' not found", key);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let config_path = Config::default_path();
            if !config_path.exists() {
                anyhow::bail!("No config file found. Run 'fragment-link init' first.");
            }

            let mut toml_content = std::fs::read_to_string(&config_path)?;
            apply_config_set(&mut toml_content, &key, &value)?;
            std::fs::write(&config_path, &toml_content)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save_default()?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}

/// Keys written to the config file only when set
const OPTIONAL_KEYS: &[&str] = &["matching.max_pair_evaluations", "export.exports_dir"];

/// Set `key` in the config text, adding it when it is an optional key that is
/// not written yet. Fails without touching the text when the result would no
/// longer load.
fn apply_config_set(toml_content: &mut String, key: &str, value: &str) -> anyhow::Result<()> {
    let literal = toml_literal(value);
    let mut updated = toml_content.clone();
    let written = set_toml_value(&mut updated, key, &literal)
        || (OPTIONAL_KEYS.contains(&key) && insert_toml_value(&mut updated, key, &literal));
    if !written {
        anyhow::bail!("Failed to set '{}'. Key may not exist in config.", key);
    }

    let config: Config = toml::from_str(&updated)?;
    config.validate()?;

    *toml_content = updated;
    Ok(())
}

/// Quote bare strings; numbers, booleans and already-quoted values pass through
fn toml_literal(value: &str) -> String {
    let trimmed = value.trim();
    let is_plain = trimmed.parse::<f64>().is_ok()
        || trimmed == "true"
        || trimmed == "false"
        || (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2);
    if is_plain {
        trimmed.to_string()
    } else {
        format!("\"{}\"", trimmed.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Simple TOML value lookup by dotted key
fn find_toml_value<'a>(toml_str: &'a str, key: &str) -> Option<&'a str> {
    let (section_name, leaf_key) = split_key(key)?;
    let mut in_section = section_name.is_empty();

    for line in toml_str.lines() {
        let trimmed = line.trim();

        if let Some(section) = section_header(trimmed) {
            in_section = section == section_name;
            continue;
        }

        if in_section {
            if let Some((line_key, line_value)) = trimmed.split_once('=') {
                if line_key.trim() == leaf_key {
                    return Some(line_value.trim());
                }
            }
        }
    }

    None
}

/// Simple TOML value setter by dotted key
fn set_toml_value(toml_str: &mut String, key: &str, value: &str) -> bool {
    let Some((section_name, leaf_key)) = split_key(key) else {
        return false;
    };
    let mut in_section = section_name.is_empty();
    let mut found = false;

    let mut new_lines = Vec::new();
    for line in toml_str.lines() {
        let trimmed = line.trim();

        if let Some(section) = section_header(trimmed) {
            in_section = section == section_name;
        } else if in_section && !found {
            if let Some((line_key, _)) = trimmed.split_once('=') {
                if line_key.trim() == leaf_key {
                    new_lines.push(format!("{} = {}", leaf_key, value));
                    found = true;
                    continue;
                }
            }
        }

        new_lines.push(line.to_string());
    }

    if found {
        *toml_str = new_lines.join("\n");
        toml_str.push('\n');
    }

    found
}

/// Add `section.leaf = value` at the end of its section, appending the
/// section when the file has none
fn insert_toml_value(toml_str: &mut String, key: &str, value: &str) -> bool {
    let Some((section_name, leaf_key)) = split_key(key) else {
        return false;
    };
    if section_name.is_empty() {
        return false;
    }

    let mut lines: Vec<String> = toml_str.lines().map(str::to_string).collect();
    let entry = format!("{} = {}", leaf_key, value);
    let header = lines
        .iter()
        .position(|line| section_header(line.trim()) == Some(section_name));

    match header {
        Some(start) => {
            let end = lines[start + 1..]
                .iter()
                .position(|line| section_header(line.trim()).is_some())
                .map(|offset| start + 1 + offset)
                .unwrap_or(lines.len());
            let at = (start + 1..end)
                .rev()
                .find(|&i| !lines[i].trim().is_empty())
                .map(|i| i + 1)
                .unwrap_or(start + 1);
            lines.insert(at, entry);
        }
        None => {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{}]", section_name));
            lines.push(entry);
        }
    }

    *toml_str = lines.join("\n");
    toml_str.push('\n');
    true
}

/// `section.leaf` -> ("section", "leaf"); a bare key is top-level
fn split_key(key: &str) -> Option<(&str, &str)> {
    match key.rsplit_once('.') {
        Some((section, leaf)) if !leaf.is_empty() => Some((section, leaf)),
        Some(_) => None,
        None if !key.is_empty() => Some(("", key)),
        None => None,
    }
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}
