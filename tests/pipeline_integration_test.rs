//! Pipeline Integration Tests
//!
//! End-to-end runs of the fragment pipeline over realistic track sets:
//! - loading track sets from disk (bare and wrapped JSON)
//! - incompleteness classification and gating behavior
//! - recovery from malformed records
//! - determinism of the ranked suggestion list

use fragment_linker::app::config::{AlignmentPolicyKind, Config};
use fragment_linker::fragment::InputIssue;
use fragment_linker::time::TimingStatus;
use fragment_linker::{FragmentPipeline, MatchType, RawSample, RawTrack, TrackSet};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

const FPS: f64 = 20.0;

/// Raw track starting at `start_s` on the experiment clock, moving from
/// `first` to `last`, with one sample inside the stimulus window
fn raw_track(
    key: &str,
    start_s: f64,
    duration: f64,
    reorientations: u32,
    first: (f64, f64),
    last: (f64, f64),
) -> RawTrack {
    let mid = ((first.0 + last.0) / 2.0, (first.1 + last.1) / 2.0);
    RawTrack::new(key, duration, reorientations)
        .with_frames((duration * FPS) as u64, FPS)
        .with_start_frame((start_s * FPS) as u64)
        .with_samples(vec![
            RawSample::at(0.0, 2.0, first.0, first.1),
            RawSample::at(15.0, 2.0, mid.0, mid.1),
            RawSample::at(duration, 2.0, last.0, last.1),
        ])
}

/// A: 30-120 s, incomplete, ends at (50, 50)
fn fragment_a() -> RawTrack {
    raw_track("A", 30.0, 90.0, 5, (10.0, 10.0), (50.0, 50.0))
}

/// B: starts at 130 s at (60, 55)
fn fragment_b() -> RawTrack {
    raw_track("B", 130.0, 900.0, 60, (60.0, 55.0), (400.0, 300.0))
}

/// C: starts at 400 s
fn fragment_c() -> RawTrack {
    raw_track("C", 400.0, 900.0, 60, (50.0, 50.0), (200.0, 200.0))
}

/// D: starts at 125 s, far away
fn fragment_d() -> RawTrack {
    raw_track("D", 125.0, 900.0, 60, (500.0, 500.0), (600.0, 600.0))
}

fn scenario_tracks() -> Vec<RawTrack> {
    vec![fragment_a(), fragment_b(), fragment_c(), fragment_d()]
}

// ============================================================================
// Classification and gating
// ============================================================================

#[test]
fn test_short_fragment_incomplete_long_fragment_complete() {
    let analysis = FragmentPipeline::default().analyze(&scenario_tracks());

    assert!(analysis.fragment("A").unwrap().is_incomplete);
    assert!(!analysis.fragment("B").unwrap().is_incomplete);
    assert_eq!(analysis.statistics.incomplete_tracks, 1);
    assert_eq!(analysis.statistics.complete_tracks, 3);
}

#[test]
fn test_only_adjacent_nearby_successor_is_suggested() {
    let analysis = FragmentPipeline::default().analyze(&scenario_tracks());

    assert_eq!(analysis.matches.len(), 1);
    let m = &analysis.matches[0];
    assert_eq!(m.key(), ("A", "B"));
    assert!((m.temporal_gap - 10.0).abs() < 1e-9);

    let distance = m.spatial_distance.expect("both endpoints tracked");
    assert!((distance - 125f64.sqrt()).abs() < 1e-9);

    // 0.4 * (2/3) + 0.3 * (1 - sqrt(125)/50) + 0.2 + 0.1
    let expected = 0.4 * (2.0 / 3.0) + 0.3 * (1.0 - 125f64.sqrt() / 50.0) + 0.3;
    assert!((m.confidence - expected).abs() < 1e-9);
    assert_eq!(m.match_type, MatchType::SpatialProximity);
}

#[test]
fn test_distant_in_time_candidate_gated_out() {
    let analysis = FragmentPipeline::default().analyze(&[fragment_a(), fragment_c()]);
    assert!(analysis.matches.is_empty());
}

#[test]
fn test_distant_in_space_candidate_gated_out() {
    let analysis = FragmentPipeline::default().analyze(&[fragment_a(), fragment_d()]);
    assert!(analysis.matches.is_empty());
}

#[test]
fn test_match_bounds_hold_for_dense_set() {
    let mut tracks = Vec::new();
    for i in 0..30u32 {
        let start = (i as f64) * 23.0;
        let duration = if i % 4 == 0 { 600.0 } else { 20.0 + (i % 7) as f64 * 10.0 };
        let x = (i * 13 % 120) as f64;
        tracks.push(raw_track(
            &format!("t{:02}", i),
            start,
            duration,
            i % 8,
            (x, 40.0),
            (x + 5.0, 45.0),
        ));
    }

    let analysis = FragmentPipeline::default().analyze(&tracks);
    assert!(!analysis.matches.is_empty());

    for m in &analysis.matches {
        assert_ne!(m.predecessor_id, m.successor_id);
        assert!(m.temporal_gap >= 0.0 && m.temporal_gap <= 60.0);
        assert!(m.confidence > 0.3 && m.confidence <= 1.0);
        if let Some(d) = m.spatial_distance {
            assert!(d <= 100.0);
        }
        assert!(analysis.fragment(&m.predecessor_id).unwrap().is_incomplete);
    }
    for pair in analysis.matches.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
}

// ============================================================================
// Alignment
// ============================================================================

#[test]
fn test_sequential_policy_places_fragments_end_to_end() {
    let mut config = Config::default();
    config.alignment.policy = AlignmentPolicyKind::Sequential;
    config.alignment.spacing_s = 5.0;

    let tracks = vec![
        RawTrack::new("first", 100.0, 2).with_frames(2000, FPS),
        RawTrack::new("second", 300.0, 10).with_frames(6000, FPS),
    ];
    let analysis = FragmentPipeline::new(config).analyze(&tracks);

    assert_eq!(analysis.fragments[0].experiment_interval(), Some((0.0, 100.0)));
    assert_eq!(analysis.fragments[1].experiment_interval(), Some((105.0, 405.0)));
    assert_eq!(analysis.alignment_policy, "sequential");
}

#[test]
fn test_unavailable_alignment_excludes_fragments_from_matching() {
    let mut config = Config::default();
    config.alignment.policy = AlignmentPolicyKind::Unavailable;

    let analysis = FragmentPipeline::new(config).analyze(&scenario_tracks());

    assert!(analysis.matches.is_empty());
    assert_eq!(analysis.statistics.unaligned_tracks, 4);
    assert_eq!(analysis.timing.status, TimingStatus::NoExperimentalTiming);
    assert!(analysis.fragments.iter().all(|f| f.alignment.is_unavailable()));
}

#[test]
fn test_timing_summary_reports_gaps() {
    let analysis = FragmentPipeline::default().analyze(&[fragment_a(), fragment_c()]);
    let timing = &analysis.timing;

    assert_eq!(timing.status, TimingStatus::Available);
    assert_eq!(timing.earliest_track_start, Some(30.0));
    assert_eq!(timing.latest_track_end, Some(1300.0));
    assert_eq!(timing.timing_gaps.len(), 1);
    assert!((timing.timing_gaps[0].gap_duration_seconds - 280.0).abs() < 1e-9);
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_malformed_records_do_not_fail_the_batch() {
    let json = r#"{
        "experiment_id": "exp-malformed",
        "tracks": [
            {"track_key": "ok", "duration": 90.0, "reorientation_count": 2,
             "frame_count": 1800, "frame_rate": 20.0, "start_frame": 0,
             "samples": [{"time": 0.0, "turn_rate": 1.0, "x": 0.0, "y": 0.0},
                         {"time": 90.0, "turn_rate": 1.0, "x": 10.0, "y": 0.0}]},
            {"duration": 50.0},
            {"track_key": "no-samples", "duration": 400.0, "reorientation_count": 9,
             "frame_count": 8000, "frame_rate": 20.0}
        ]
    }"#;

    let set = TrackSet::from_json_str(json).unwrap();
    assert_eq!(set.experiment_id.as_deref(), Some("exp-malformed"));

    let analysis = FragmentPipeline::default().analyze(&set.tracks);
    assert_eq!(analysis.fragments.len(), 3);

    let unnamed = &analysis.fragments[1];
    assert_eq!(unnamed.track_id, "track-1");
    assert!(unnamed.input_issues.contains(&InputIssue::MissingTrackKey));
    assert!(unnamed.input_issues.contains(&InputIssue::MissingSamples));

    let no_samples = analysis.fragment("no-samples").unwrap();
    assert!(no_samples.input_issues.contains(&InputIssue::MissingSamples));
    assert!(no_samples.first_position.is_none());
}

#[test]
fn test_untimed_sample_and_float_counts_load() {
    let json = r#"[
        {"track_key": "good", "duration": 90.0, "reorientation_count": 2,
         "frame_count": 1800, "frame_rate": 20.0,
         "samples": [{"time": 0.0, "turn_rate": 1.0}]},
        {"track_key": "bad", "duration": 90.0, "reorientation_count": 5.0,
         "frame_count": 1800.0, "frame_rate": 20.0,
         "samples": [{"turn_rate": 1.0}, {"time": 2.0, "turn_rate": 3.0}]}
    ]"#;

    let set = TrackSet::from_json_str(json).unwrap();
    let analysis = FragmentPipeline::default().analyze(&set.tracks);
    assert_eq!(analysis.fragments.len(), 2);

    let good = analysis.fragment("good").unwrap();
    assert!(good.input_issues.is_empty());

    let bad = analysis.fragment("bad").unwrap();
    assert_eq!(bad.reorientation_count, 5);
    assert_eq!(bad.frame_count, 1800);
    assert_eq!(bad.mean_response_rate, 3.0);
    assert_eq!(bad.input_issues, vec![InputIssue::UntimedSamples { dropped: 1 }]);
}

#[test]
fn test_positional_id_collision_keeps_the_match() {
    let keyed = raw_track("track-1", 0.0, 90.0, 5, (10.0, 10.0), (50.0, 50.0));
    let mut keyless = raw_track("unused", 95.0, 90.0, 5, (50.0, 50.0), (80.0, 80.0));
    keyless.track_key = None;

    let analysis = FragmentPipeline::default().analyze(&[keyed, keyless]);
    let ids: Vec<&str> = analysis.fragments.iter().map(|f| f.track_id.as_str()).collect();
    assert_eq!(ids, vec!["track-1", "track-1-2"]);

    assert_eq!(analysis.matches.len(), 1);
    assert_eq!(analysis.matches[0].key(), ("track-1", "track-1-2"));
    assert!((analysis.matches[0].temporal_gap - 5.0).abs() < 1e-9);
}

#[test]
fn test_keys_differing_in_whitespace_keep_the_match() {
    let a = raw_track("A", 0.0, 90.0, 5, (10.0, 10.0), (50.0, 50.0));
    let b = raw_track(" A", 95.0, 90.0, 5, (50.0, 50.0), (80.0, 80.0));

    let analysis = FragmentPipeline::default().analyze(&[a, b]);
    assert_eq!(analysis.matches.len(), 1);
    assert_eq!(analysis.matches[0].key(), ("A", "A-2"));

    // Through the loader the same pair is a duplicate key
    let json = r#"[{"track_key": "A"}, {"track_key": " A"}]"#;
    assert!(TrackSet::from_json_str(json).is_err());
}

#[test]
fn test_corrupt_file_propagates_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(TrackSet::load(&path).is_err());
}

#[test]
fn test_missing_file_propagates_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = TrackSet::load(&temp_dir.path().join("absent.json"));
    assert!(matches!(result, Err(fragment_linker::Error::Io(_))));
}

// ============================================================================
// Persistence and determinism
// ============================================================================

#[test]
fn test_track_set_file_roundtrip_gives_same_analysis() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tracks.json");

    let set = TrackSet::new(Some("exp-42".to_string()), scenario_tracks());
    set.save(&path).unwrap();

    let loaded = TrackSet::load(&path).unwrap();
    assert_eq!(loaded.tracks, set.tracks);

    let pipeline = FragmentPipeline::default();
    assert_eq!(pipeline.analyze(&loaded.tracks), pipeline.analyze(&set.tracks));
}

#[test]
fn test_bare_array_file_loads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bare.json");
    std::fs::write(&path, serde_json::to_string(&scenario_tracks()).unwrap()).unwrap();

    let loaded = TrackSet::load(&path).unwrap();
    assert!(loaded.experiment_id.is_none());
    assert_eq!(loaded.len(), 4);
}

#[test]
fn test_repeated_analysis_is_identical() {
    let pipeline = FragmentPipeline::default();
    let first = pipeline.analyze(&scenario_tracks());
    for _ in 0..5 {
        assert_eq!(pipeline.analyze(&scenario_tracks()).matches, first.matches);
    }
}

#[test]
fn test_analysis_serializes_to_json() {
    let analysis = FragmentPipeline::default().analyze(&scenario_tracks());
    let json = serde_json::to_string_pretty(&analysis).unwrap();

    assert!(json.contains("\"matches\""));
    assert!(json.contains("\"spatial_proximity\""));
    assert!(json.contains("\"timing_gaps\""));
}
