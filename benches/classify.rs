use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use vibesense::corpus::TrainingCorpus;
use vibesense::features::FeatureVector;
use vibesense::ml::{ClassifierKind, TrainOptions, train};

const FEATURE_LEN: usize = 512;
const EXAMPLES_PER_CLASS: usize = 100;
const CLASSES: [&str; 3] = ["neutral", "full", "empty"];

fn frame(seed: usize) -> Vec<f32> {
    (0..FEATURE_LEN)
        .map(|i| ((seed * 31 + i * 17) % 97) as f32 / 97.0)
        .collect()
}

fn setup_corpus() -> TrainingCorpus {
    let mut corpus = TrainingCorpus::new(&CLASSES, FEATURE_LEN).expect("corpus");
    for (class_idx, class) in CLASSES.iter().enumerate() {
        for i in 0..EXAMPLES_PER_CLASS {
            corpus
                .append(class, FeatureVector::from(frame(class_idx * 1_000 + i)))
                .expect("seed append");
        }
    }
    corpus
}

fn bench_classify(c: &mut Criterion) {
    let corpus = setup_corpus();
    let query = frame(12_345);
    for kind in [ClassifierKind::NearestNeighbor, ClassifierKind::NearestCentroid] {
        let model = train(&corpus, &TrainOptions::with_kind(kind)).expect("train");
        c.bench_with_input(
            BenchmarkId::new("classify", kind.as_str()),
            &query,
            |b, query| {
                b.iter(|| model.classify(black_box(query)).expect("classify"));
            },
        );
    }
}

fn bench_train(c: &mut Criterion) {
    let corpus = setup_corpus();
    c.bench_function("train_nearest_neighbor", |b| {
        b.iter(|| train(black_box(&corpus), &TrainOptions::default()).expect("train"));
    });
}

criterion_group!(benches, bench_classify, bench_train);
criterion_main!(benches);
