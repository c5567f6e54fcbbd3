//! Cosine mean-shift benchmark suite.

use calo_cluster_core::{Embeddings, MeanShift, MeanShiftBackend, MeanShiftParams};
use candle_core::Device;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `clusters` noisy blobs around random unit directions.
fn blobs(clusters: usize, per_cluster: usize, dim: usize) -> Embeddings {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let centers: Vec<Vec<f32>> = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect();
    let rows: Vec<Vec<f32>> = (0..clusters * per_cluster)
        .map(|i| {
            centers[i % clusters]
                .iter()
                .map(|c| c + rng.gen_range(-0.02f32..0.02))
                .collect()
        })
        .collect();
    Embeddings::from_rows(&rows).expect("finite synthetic data")
}

fn meanshift_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("mean_shift");
    group.sample_size(10);

    for &hits in &[200usize, 1000] {
        let points = blobs(8, hits / 8, 16);

        let cpu = MeanShift::cpu(MeanShiftParams::default()).expect("valid params");
        group.bench_with_input(BenchmarkId::new("cpu", hits), &points, |b, p| {
            b.iter(|| cpu.fit(black_box(p)))
        });

        let binned = MeanShift::cpu(MeanShiftParams::default().with_bin_seeding(true))
            .expect("valid params");
        group.bench_with_input(BenchmarkId::new("cpu_bin_seeding", hits), &points, |b, p| {
            b.iter(|| binned.fit(black_box(p)))
        });

        let tensor = MeanShift::new(MeanShiftParams::default(), MeanShiftBackend::Tensor(Device::Cpu))
            .expect("valid params");
        group.bench_with_input(BenchmarkId::new("tensor_cpu", hits), &points, |b, p| {
            b.iter(|| tensor.fit(black_box(p)))
        });
    }

    group.finish();
}

criterion_group!(benches, meanshift_benchmarks);
criterion_main!(benches);
