use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use calluna_forest::{ForestConfig, ImportanceMode, Target};

/// 200 samples, 10 features, 2 classes; features 0-1 informative.
fn make_dataset() -> (Vec<Vec<f64>>, Target) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(200);
    let mut labels = Vec::with_capacity(200);
    for i in 0..200 {
        let class = i % 2;
        labels.push(class);
        let row: Vec<f64> = (0..10)
            .map(|f| {
                let base = if f < 2 { class as f64 * 2.0 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    (features, Target::Classes(labels))
}

fn bench_train(c: &mut Criterion) {
    let (features, target) = make_dataset();
    c.bench_function("train_100_trees", |b| {
        b.iter(|| {
            ForestConfig::new(100)
                .unwrap()
                .with_seed(42)
                .fit(&features, &target)
                .unwrap()
        })
    });
}

fn bench_train_with_importance(c: &mut Criterion) {
    let (features, target) = make_dataset();
    c.bench_function("train_100_trees_permutation_importance", |b| {
        b.iter(|| {
            ForestConfig::new(100)
                .unwrap()
                .with_importance(ImportanceMode::Permutation)
                .with_seed(42)
                .fit(&features, &target)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_train, bench_train_with_importance);
criterion_main!(benches);
