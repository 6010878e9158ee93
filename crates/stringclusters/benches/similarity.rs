use criterion::{
    AxisScale, BenchmarkId, Criterion, PlotConfiguration, criterion_group, criterion_main,
};
use rand::{RngExt, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;
use stringclusters::similarity::{
    EditDistance, EmbeddingSimilarity, SimilarityProvider, WordVectors,
};

const SIZES: &[(&str, usize)] = &[("100", 100), ("500", 500), ("1000", 1000)];
const DIMENSION: usize = 300;

fn generate_words(rng: &mut impl RngExt, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            let len = rng.random_range(3..12);
            (0..len)
                .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
                .collect()
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

    let words = generate_words(&mut rng, 1000);
    let vectors = WordVectors::from_entries(words.iter().map(|w| {
        let v: Vec<f32> = (0..DIMENSION).map(|_| rng.random::<f32>() - 0.5).collect();
        (w.clone(), v)
    }))
    .unwrap();
    let vectors = Arc::new(vectors);

    let mut group = c.benchmark_group("edit_distance");
    group.plot_config(plot_config.clone());
    for &(label, n) in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(label), &n, |b, &n| {
            b.iter_with_large_drop(|| EditDistance.matrix(&words[..n]).unwrap())
        });
    }
    group.finish();

    let mut group = c.benchmark_group("embedding");
    group.plot_config(plot_config);
    for &(label, n) in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(label), &n, |b, &n| {
            b.iter_with_large_drop(|| {
                // Fresh cache, so that embedding is part of the measurement
                let provider = EmbeddingSimilarity::new(vectors.clone());
                provider.matrix(&words[..n]).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
