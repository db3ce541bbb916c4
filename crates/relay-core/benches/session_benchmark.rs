//! Session and prompt benchmarks
//!
//! Measures performance of the hot path of a relay call:
//! - Session creation
//! - Turn append and history read
//! - Prompt assembly for growing histories
//! - Expiry sweep

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};
use relay_core::relay::PromptBuilder;
use relay_core::session::{Session, SessionManager, SessionStore, Turn};

fn history(count: usize) -> Vec<Turn> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Turn::user(format!("Question {} about robotics kits", i))
            } else {
                Turn::assistant(format!("Answer {} with product details", i))
            }
        })
        .collect()
}

/// Benchmark session creation
fn bench_session_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_creation");

    group.bench_function("new_session", |b| {
        b.iter(|| black_box(Session::new()))
    });

    group.bench_function("manager_create_session", |b| {
        let manager = SessionManager::in_memory();
        b.iter(|| black_box(manager.create_session()))
    });

    group.finish();
}

/// Benchmark turn operations on the store
fn bench_turn_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("turn_operations");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("append", size), size, |b, &size| {
            let text = "x".repeat(size);
            b.iter_with_setup(
                || {
                    let store = SessionStore::new();
                    store.insert(Session::with_id("bench"));
                    store
                },
                |store| {
                    store.append("bench", Turn::user(&text)).unwrap();
                    store
                },
            )
        });
    }

    for count in [10, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::new("get_history", count), count, |b, &count| {
            let store = SessionStore::new();
            let mut session = Session::with_id("bench");
            for turn in history(count) {
                session.push(turn);
            }
            store.insert(session);

            b.iter(|| store.get(black_box("bench")).unwrap())
        });
    }

    group.finish();
}

/// Benchmark prompt assembly
fn bench_prompt_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("prompt_build");

    for count in [2, 40, 200].iter() {
        let turns = history(*count);

        group.bench_with_input(BenchmarkId::new("unbounded", count), &turns, |b, turns| {
            let builder = PromptBuilder::default();
            b.iter(|| builder.build(black_box(turns)))
        });

        group.bench_with_input(BenchmarkId::new("window_40", count), &turns, |b, turns| {
            let builder = PromptBuilder::default().with_max_turns(40);
            b.iter(|| builder.build(black_box(turns)))
        });
    }

    group.finish();
}

/// Benchmark the expiry sweep
fn bench_cleanup(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_cleanup");

    group.bench_function("remove_idle_1000", |b| {
        b.iter_with_setup(
            || {
                let store = SessionStore::new();
                for i in 0..1000 {
                    let mut session = Session::with_id(format!("session-{}", i));
                    if i % 2 == 0 {
                        session.last_active = Utc::now() - Duration::hours(2);
                    }
                    store.insert(session);
                }
                store
            },
            |store| store.remove_idle(Duration::hours(1)),
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_session_creation,
    bench_turn_operations,
    bench_prompt_build,
    bench_cleanup,
);

criterion_main!(benches);
