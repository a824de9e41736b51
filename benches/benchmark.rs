use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use ndarray_rand::{rand_distr::Uniform, RandomExt};
use photomatch::{Catalog, Detection, Matcher};

fn catalog(n: usize) -> Catalog<f64> {
    let positions = Array2::random((n, 2), Uniform::new(0., 4096.));
    let magnitudes = Array2::random((n, 1), Uniform::new(20., 30.));
    positions
        .rows()
        .into_iter()
        .zip(magnitudes.rows())
        .map(|(p, m)| Detection::new(p[0], p[1], m[0]))
        .collect()
}

fn matching_benchmark(c: &mut Criterion) {
    let mut matching = c.benchmark_group("matching");
    matching.sample_size(10);

    let a = catalog(5000);
    let b = catalog(5000);

    matching.bench_function("brute force", |bench| {
        bench.iter(|| Matcher::brute_force(&a, &b).with_max_dist(3.).pairs())
    });

    matching.bench_function("kd tree", |bench| {
        bench.iter(|| Matcher::kd_tree(&a, &b).with_max_dist(3.).pairs())
    });

    #[cfg(feature = "parallel")]
    matching.bench_function("kd tree parallel", |bench| {
        bench.iter(|| Matcher::kd_tree(&a, &b).with_max_dist(3.).pairs_par())
    });
}

criterion_group!(benches, matching_benchmark);
criterion_main!(benches);
