//! Criterion benchmarks for grove-forest: training, prediction and streaming.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use grove_forest::{Dataset, ForestConfig};

fn make_classification(
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        rows.push(row);
    }
    (rows, labels)
}

fn bench_train(c: &mut Criterion) {
    let (rows, labels) = make_classification(500, 20, 5, 42);
    let dataset = Dataset::new(rows, labels).unwrap();
    let cfg = ForestConfig::new();

    c.bench_function("forest_train_500x20_5class_50trees", |b| {
        b.iter(|| cfg.fit(dataset.clone(), 50).unwrap());
    });
}

fn bench_train_sequential(c: &mut Criterion) {
    let (rows, labels) = make_classification(500, 20, 5, 42);
    let dataset = Dataset::new(rows, labels).unwrap();
    let cfg = ForestConfig::new().with_n_workers(1);

    c.bench_function("forest_train_500x20_5class_50trees_1worker", |b| {
        b.iter(|| cfg.fit(dataset.clone(), 50).unwrap());
    });
}

fn bench_predict(c: &mut Criterion) {
    let (rows, labels) = make_classification(500, 20, 5, 42);
    let forest = ForestConfig::new()
        .fit(Dataset::new(rows.clone(), labels).unwrap(), 50)
        .unwrap();

    c.bench_function("forest_predict_500x20_50trees", |b| {
        b.iter(|| forest.predict(&rows).unwrap());
    });
}

fn bench_add_data_row(c: &mut Criterion) {
    let (rows, labels) = make_classification(500, 20, 5, 42);
    let cfg = ForestConfig::new().with_max_rows(500).with_max_trees(50);
    let mut forest = cfg
        .fit(Dataset::new(rows.clone(), labels.clone()).unwrap(), 50)
        .unwrap();
    let mut next = rows.iter().zip(&labels).cycle();

    c.bench_function("forest_add_data_row_500x20_1tree", |b| {
        b.iter(|| {
            let (row, &label) = next.next().unwrap();
            forest.add_data_row(row.clone(), label, 1).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_train,
    bench_train_sequential,
    bench_predict,
    bench_add_data_row
);
criterion_main!(benches);
