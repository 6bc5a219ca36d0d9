//! # Registry Benchmarks
//!
//! | Path | Operation |
//! |------|-----------|
//! | call dispatch | `add` then `get_and_remove` |
//! | sweep | `sweep_expired` over a full registry |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_timeout::{TimeoutRegistry, WithTimeout};

fn bench_add_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry-correlation");
    let registry: TimeoutRegistry<u64, WithTimeout<u64>> = TimeoutRegistry::new();

    group.throughput(Throughput::Elements(1));
    group.bench_function("add_then_get_and_remove", |b| {
        let mut key = 0u64;
        b.iter(|| {
            key += 1;
            registry.add(key, WithTimeout::new(key, || {}), Duration::from_secs(80));
            black_box(registry.get_and_remove(&key));
        });
    });
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry-sweep");

    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let registry: TimeoutRegistry<u64, u64> = TimeoutRegistry::new();
                    for key in 0..size {
                        registry.add(key, key, Duration::from_nanos(1));
                    }
                    registry
                },
                |registry| {
                    std::thread::sleep(Duration::from_micros(1));
                    black_box(registry.sweep_expired())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_take, bench_sweep);
criterion_main!(benches);
