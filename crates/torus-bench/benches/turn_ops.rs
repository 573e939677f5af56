//! Criterion benchmarks for the Life rule and partitioned broker runs.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use torus_bench::{local_broker, reference_grid};
use torus_broker::RunRequest;
use torus_core::{next_rows, partition_rows, step, stitch, RowBlock};

/// Whole-grid step on the reference grid.
fn bench_step(c: &mut Criterion) {
    let grid = reference_grid();
    c.bench_function("step_128x128", |b| b.iter(|| black_box(step(&grid))));
}

/// Compute four row blocks then stitch them, without any threads.
fn bench_partition_and_stitch(c: &mut Criterion) {
    let grid = reference_grid();
    let parts = partition_rows(grid.height(), 4).unwrap();
    c.bench_function("partitioned_step_128x128_x4", |b| {
        b.iter(|| {
            let blocks: Vec<RowBlock> = parts
                .iter()
                .map(|p| RowBlock {
                    start: p.start,
                    end: p.end,
                    width: grid.width(),
                    cells: next_rows(&grid, p.start, p.end).unwrap(),
                })
                .collect();
            black_box(stitch(grid.width(), grid.height(), &parts, blocks).unwrap())
        })
    });
}

/// Ten turns through the broker for increasing worker counts.
fn bench_broker_run(c: &mut Criterion) {
    let grid = reference_grid();
    let mut group = c.benchmark_group("broker_10_turns_128x128");
    for workers in [1usize, 2, 4, 8] {
        let (broker, _handles) = local_broker(workers).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                broker
                    .submit_run(RunRequest::new(grid.clone(), 10))
                    .unwrap();
                black_box(broker.await_result().unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_step,
    bench_partition_and_stitch,
    bench_broker_run
);
criterion_main!(benches);
