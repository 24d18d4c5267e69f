//! # dfmuse Performance Benchmarks
//!
//! Benchmarks for the per-line hot path of the watch loop.
//!
//! ## Benchmark Categories
//!
//! - **Rule Matching**: first-match search over a realistic rule file
//! - **Tailing**: incremental fetches from a growing gamelog
//! - **State Machine**: priority transitions
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench rules
//! cargo bench tailer
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use dfmuse::rules::{ParsePolicy, RuleSet};
use dfmuse::state::PlaybackState;
use dfmuse::tailer::LogTailer;
use std::fs;
use std::hint::black_box;
use std::io::Write;
use tempfile::TempDir;

/// Rule file with `count` bindings, the interesting ones at the end.
fn create_benchmark_rules(count: usize) -> RuleSet {
    let mut text = String::new();
    for i in 0..count {
        text.push_str(&format!("has been struck down by event {i}\\.;music/battle/{i}.ogg;{}\n", 2 + i % 4));
    }
    text.push_str("Spring has arrived!|Spring has arrived on the calendar;music/spring;0\n");
    text.push_str("It has started raining;sfx/rain.ogg;-1\n");
    RuleSet::parse(&text, ParsePolicy::Strict).expect("Benchmark rules should parse")
}

fn benchmark_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("rules");
    let miss = "Urist McMiner cancels Dig: Interrupted by Giant Cave Spider.";
    let hit = "Spring has arrived on the calendar.";

    for size in [10, 50, 200] {
        let rules = create_benchmark_rules(size);
        group.bench_with_input(BenchmarkId::new("miss", size), &rules, |b, rules| {
            b.iter(|| rules.find_match(black_box(miss)))
        });
        group.bench_with_input(BenchmarkId::new("late_hit", size), &rules, |b, rules| {
            b.iter(|| rules.find_match(black_box(hit)))
        });
    }
    group.finish();
}

fn benchmark_tailer(c: &mut Criterion) {
    let mut group = c.benchmark_group("tailer");
    let batch: String = (0..100).map(|i| format!("The dwarves were unable to complete job {i}.\n")).collect();

    // A large existing log must not slow down fetching a small append.
    for existing_mb in [1usize, 16] {
        group.bench_function(BenchmarkId::new("append_100_lines", existing_mb), |b| {
            b.iter_batched(
                || {
                    let temp_dir = TempDir::new().expect("Failed to create temp directory");
                    let path = temp_dir.path().join("gamelog.txt");
                    fs::write(&path, vec![b'x'; existing_mb * 1024 * 1024]).expect("Failed to write gamelog");
                    let tailer = LogTailer::open(&path, 0).expect("Failed to open gamelog");
                    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
                    file.write_all(batch.as_bytes()).unwrap();
                    (temp_dir, tailer)
                },
                |(_temp_dir, mut tailer)| black_box(tailer.fetch_new_lines().unwrap()),
                BatchSize::PerIteration,
            )
        });
    }
    group.finish();
}

fn benchmark_state(c: &mut Criterion) {
    let events = [("music/spring", 0), ("music/beast.ogg", 5), ("sfx/rain.ogg", -1), ("music/menu.ogg", 1), ("music/summer", 0)];

    c.bench_function("state/apply_mixed_events", |b| {
        b.iter(|| {
            let mut state = PlaybackState::new("music/explore");
            for (target, priority) in events {
                black_box(state.apply(target, priority));
            }
            state.on_main_idle()
        })
    });
}

criterion_group!(benches, benchmark_rules, benchmark_tailer, benchmark_state);
criterion_main!(benches);
