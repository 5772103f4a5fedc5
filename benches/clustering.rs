use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kclust::{ClusterEvaluator, Dataset, Kmeans, Pca, Sweep};
use rand::prelude::*;

fn random_dataset(n: usize, d: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<f64> = (0..n * d).map(|_| rng.random::<f64>()).collect();
    Dataset::from_flat(values, d).unwrap()
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans");
    let data = random_dataset(1000, 16, 42);

    group.bench_function("fit_n1000_d16_k10", |b| {
        b.iter(|| {
            let model = Kmeans::new(10).with_max_iter(10).with_seed(42);
            model.fit(black_box(&data)).unwrap();
        })
    });

    group.finish();
}

fn bench_silhouette(c: &mut Criterion) {
    let mut group = c.benchmark_group("silhouette");
    let data = random_dataset(1000, 16, 7);
    let fit = Kmeans::new(5).with_seed(1).fit(&data).unwrap();

    group.bench_function("exact_n1000", |b| {
        let evaluator = ClusterEvaluator::new();
        b.iter(|| evaluator.silhouette(black_box(&data), &fit).unwrap())
    });
    group.bench_function("sampled_100_of_n1000", |b| {
        let evaluator = ClusterEvaluator::new().with_sample(100, 1);
        b.iter(|| evaluator.silhouette(black_box(&data), &fit).unwrap())
    });

    group.finish();
}

fn bench_pca(c: &mut Criterion) {
    let data = random_dataset(569, 30, 3);
    c.bench_function("pca_fit_transform_569x30_to_2", |b| {
        b.iter(|| {
            let model = Pca::new(2).fit(black_box(&data)).unwrap();
            model.transform(&data).unwrap()
        })
    });
}

fn bench_sweep(c: &mut Criterion) {
    let data = random_dataset(500, 8, 11);
    c.bench_function("sweep_k2_to_10_n500", |b| {
        b.iter(|| Sweep::new(2, 10).with_seed(1).run(black_box(&data)).unwrap())
    });
}

criterion_group!(benches, bench_kmeans, bench_silhouette, bench_pca, bench_sweep);
criterion_main!(benches);
