//! # Attune Performance Benchmarks
//!
//! Benchmarks for the hot paths of the queue engine.
//!
//! ## Benchmark Categories
//!
//! - **Scoring**: Single track and whole-catalog scoring, ranking
//! - **Queue Generation**: Building the initial queue
//! - **Adaptation**: Reacting to skips and completions
//! - **Database Operations**: Catalog and event storage
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench scoring
//! cargo bench adaptation
//! ```

use attune::adapt::QueueAdapter;
use attune::algorithm::{self, ScoringWeights};
use attune::behavior::{Action, ListeningEvent};
use attune::context::{Activity, Context, TimeOfDay, Weather};
use attune::db::Store;
use attune::preference::PreferenceProfile;
use attune::queue::{build_queue, Queue, QueueEntry};
use attune::track::Track;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const GENRES: [&str; 6] = ["Rock", "Jazz", "Pop", "Electronic", "Classical", "Hip Hop"];

/// Helper function to create a catalog with varied audio features
fn create_test_tracks(count: usize) -> Vec<Track> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|i| Track {
            id: i.to_string(),
            title: format!("Track {i}"),
            artist: format!("Artist {}", i % 50),
            genre: GENRES[i % GENRES.len()].to_string(),
            tempo: rng.gen_range(60.0..180.0),
            energy: rng.gen(),
            valence: rng.gen(),
            acousticness: rng.gen(),
            duration: rng.gen_range(120.0..360.0),
            playback_ref: None,
        })
        .collect()
}

fn context() -> Context {
    Context::new(Weather::Rainy, Activity::Focusing, TimeOfDay::Evening)
}

/// Benchmark track scoring
fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let weights = ScoringWeights::default();
    let modifiers = context().modifiers();
    let keywords = algorithm::parse_keywords("jazz, rock");

    let tracks = create_test_tracks(1000);
    let profile = PreferenceProfile::learn(&tracks).expect("non-empty catalog");

    group.bench_function("single_track_score", |b| {
        b.iter(|| {
            algorithm::score_track(
                black_box(&tracks[0]),
                black_box(&profile),
                black_box(&modifiers),
                black_box(&keywords),
                black_box(&weights),
            )
        })
    });

    for size in [100, 1000, 10_000] {
        let tracks = create_test_tracks(size);
        let profile = PreferenceProfile::learn(&tracks).expect("non-empty catalog");

        group.bench_with_input(BenchmarkId::new("score_and_rank", size), &tracks, |b, tracks| {
            b.iter(|| {
                let mut scored: Vec<_> =
                    algorithm::score_tracks(black_box(tracks), &profile, &modifiers, &keywords, &weights)
                        .collect();
                algorithm::rank_by_score(&mut scored);
                black_box(scored.len())
            })
        });
    }

    group.bench_function("similarity", |b| {
        b.iter(|| algorithm::similarity(black_box(&tracks[0]), black_box(&tracks[1])))
    });

    group.finish();
}

/// Benchmark initial queue generation
fn benchmark_queue_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_generation");
    let context = context();

    for size in [20, 1000, 10_000] {
        let tracks = create_test_tracks(size);
        let profile = PreferenceProfile::learn(&tracks).expect("non-empty catalog");
        let mut rng = StdRng::seed_from_u64(7);

        group.bench_with_input(BenchmarkId::new("build_queue", size), &tracks, |b, tracks| {
            b.iter(|| build_queue(black_box(tracks), &profile, &context, "jazz", &mut rng))
        });
    }

    group.finish();
}

/// Benchmark adaptation after skips and completions
fn benchmark_adaptation(c: &mut Criterion) {
    let mut group = c.benchmark_group("adaptation");
    let adapter = QueueAdapter::default();
    let context = context();
    let tracks = create_test_tracks(1000);
    let queue: Queue = tracks
        .iter()
        .take(10)
        .map(|t| QueueEntry { track: t.clone(), score: 0.5 })
        .collect();
    let played = &tracks[0];
    let skip = ListeningEvent::new(played, played.duration * 0.1, Action::Skipped, &context);
    let complete = ListeningEvent::new(played, played.duration, Action::Completed, &context);
    let mut rng = StdRng::seed_from_u64(11);

    group.bench_function("early_skip", |b| {
        b.iter_batched(
            || queue.clone(),
            |mut q| adapter.adapt(black_box(&skip), 0.3, &mut q, &tracks, &mut rng),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("high_engagement", |b| {
        b.iter_batched(
            || queue.clone(),
            |mut q| adapter.adapt(black_box(&complete), 0.3, &mut q, &tracks, &mut rng),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

/// Benchmark database operations
fn benchmark_database_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("database_operations");
    let tracks = create_test_tracks(1000);
    let event = ListeningEvent::new(&tracks[0], 42.0, Action::Skipped, &context());

    group.bench_function("replace_catalog_1000", |b| {
        b.iter_batched(
            || Store::open_in_memory().expect("in-memory database"),
            |mut store| store.replace_catalog(black_box(&tracks)),
            BatchSize::SmallInput,
        )
    });

    let store = Store::open_in_memory().expect("in-memory database");
    group.bench_function("append_event", |b| b.iter(|| store.append_event(black_box(&event))));

    group.finish();
}

// Group all benchmarks
criterion_group!(
    benches,
    benchmark_scoring,
    benchmark_queue_generation,
    benchmark_adaptation,
    benchmark_database_operations
);

criterion_main!(benches);
