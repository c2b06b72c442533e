//! Benchmarks for the HAC environments
//!
//! Run with: cargo bench -p hac_envs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hac_envs::kinematics::{forward_kinematics, is_reachable};
use hac_envs::{make, KinematicModels, ENVIRONMENT_IDS};

/// Benchmark episode resets (goal sampling plus start placement)
fn bench_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reset");

    for id in ENVIRONMENT_IDS {
        group.bench_with_input(BenchmarkId::from_parameter(id), &id, |b, id| {
            let mut env = make(id, &KinematicModels, Some(0)).unwrap();
            b.iter(|| black_box(env.reset().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark a single low-level step including frame skip
fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("Step");

    for id in ENVIRONMENT_IDS {
        group.bench_with_input(BenchmarkId::from_parameter(id), &id, |b, id| {
            let mut env = make(id, &KinematicModels, Some(0)).unwrap();
            let action = vec![0.1; env.action_space().dim()];
            b.iter(|| {
                let step = env.step(black_box(&action)).unwrap();
                if step.done {
                    env.reset().unwrap();
                }
                black_box(step.reward)
            });
        });
    }

    group.finish();
}

/// Benchmark the arm's transform chain
fn bench_kinematics(c: &mut Criterion) {
    let mut group = c.benchmark_group("UR5 Kinematics");

    group.bench_function("forward_kinematics", |b| {
        b.iter(|| black_box(forward_kinematics(black_box([1.2, -0.4, 0.3]))));
    });

    group.bench_function("is_reachable", |b| {
        b.iter(|| black_box(is_reachable(black_box([1.2, -0.4, 0.3]))));
    });

    group.finish();
}

criterion_group!(benches, bench_reset, bench_step, bench_kinematics);
criterion_main!(benches);
