//! Benchmarks for OrderedSet under single-threaded and contended workloads.
//!
//! Run with: cargo bench --bench ordered_set_benchmark

use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use std::thread;

use lock_coupled_set::OrderedSet;

const KEYS: u64 = 1_000;

fn populated() -> OrderedSet<u64> {
    (0..KEYS).map(|k| k * 2).collect()
}

// ============================================================================
// Sequential
// ============================================================================

fn bench_contains(c: &mut Criterion) {
    let set = populated();
    c.bench_function("contains_hit_and_miss", |b| {
        b.iter(|| {
            for k in 0..KEYS {
                black_box(set.contains(&black_box(k)));
            }
        })
    });
}

fn bench_delete_insert(c: &mut Criterion) {
    let set = populated();
    c.bench_function("delete_insert", |b| {
        b.iter(|| {
            for k in (0..KEYS).step_by(7) {
                set.remove(&(k * 2));
                set.insert(k * 2);
            }
        })
    });
}

// ============================================================================
// Concurrent
// ============================================================================

fn concurrent_delete_insert(set: &OrderedSet<u64>, thread_count: u64, ops_per_thread: u64) {
    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let set = set.clone();
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let k = (t + i * thread_count) % KEYS * 2;
                    set.remove(&k);
                    set.insert(k);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn concurrent_range(set: &OrderedSet<u64>, thread_count: u64) {
    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let set = set.clone();
            thread::spawn(move || {
                let mut sum = 0;
                set.range(|k| {
                    sum += *k;
                    true
                });
                black_box(sum)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    for threads in [1u64, 2, 4, 8] {
        let set = populated();
        group.bench_with_input(BenchmarkId::new("delete_insert", threads), &threads, |b, &n| {
            b.iter(|| concurrent_delete_insert(&set, n, 500))
        });
        group.bench_with_input(BenchmarkId::new("range", threads), &threads, |b, &n| {
            b.iter(|| concurrent_range(&set, n))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_contains, bench_delete_insert, bench_concurrent);
criterion_main!(benches);
