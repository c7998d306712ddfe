//! Criterion benchmarks for the analysis hot paths
//!
//! Covers: fragment building, candidate-indexed match scanning and the full
//! pipeline over synthetic experiments of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fragment_linker::fragment::FragmentBuilder;
use fragment_linker::matching::MatchScorer;
use fragment_linker::time::TimelineAligner;
use fragment_linker::{FragmentPipeline, RawSample, RawTrack};

/// Synthetic experiment: every third track is a long complete run, the rest
/// are short fragments scattered over the clock
fn make_tracks(count: usize) -> Vec<RawTrack> {
    (0..count)
        .map(|i| {
            let duration = if i % 3 == 0 { 600.0 } else { 30.0 + (i % 11) as f64 * 8.0 };
            let start = (i as f64 * 17.0) % (count as f64 * 4.0);
            let x = (i * 37 % 640) as f64;
            let y = (i * 53 % 480) as f64;
            let samples = (0..=20)
                .map(|k| {
                    let t = duration * k as f64 / 20.0;
                    RawSample::at(t, (k % 5) as f64, x + k as f64, y + k as f64 * 0.5)
                })
                .collect();
            RawTrack::new(format!("track_{:05}", i), duration, (i % 9) as u32)
                .with_frames((duration * 20.0) as u64, 20.0)
                .with_start_frame((start * 20.0) as u64)
                .with_samples(samples)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stage benchmarks
// ---------------------------------------------------------------------------

fn bench_build_fragments(c: &mut Criterion) {
    let tracks = make_tracks(1000);
    let builder = FragmentBuilder::new();

    c.bench_function("build_fragments_1000", |b| {
        b.iter(|| builder.build_all(black_box(&tracks)))
    });
}

fn bench_match_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_scan");
    let builder = FragmentBuilder::new();
    let aligner = TimelineAligner::default();
    let scorer = MatchScorer::new();

    for size in [100usize, 1000, 5000] {
        let fragments = aligner.align(&builder.build_all(&make_tracks(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &fragments, |b, fragments| {
            b.iter(|| scorer.scan(black_box(fragments)))
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    let tracks = make_tracks(1000);
    let pipeline = FragmentPipeline::default();

    c.bench_function("pipeline_analyze_1000", |b| {
        b.iter(|| pipeline.analyze(black_box(&tracks)))
    });
}

criterion_group!(benches, bench_build_fragments, bench_match_scan, bench_pipeline);
criterion_main!(benches);
