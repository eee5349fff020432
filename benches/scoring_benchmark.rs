//! Criterion benchmarks for the scoring path
//!
//! These benchmarks measure:
//! - Linear model inference over growing batches
//! - Score normalization under both policies
//! - Recommendation generation

use cgpa_forecast::ml::{
    LinearRegressor, NormalizationPolicy, Predictor, RecommendationEngine, ScoreNormalizer,
};
use cgpa_forecast::models::{feature_matrix, FeatureVector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn student(i: usize) -> FeatureVector {
    FeatureVector {
        repeated_course: (i % 2) as f64,
        attendance_level: 40.0 + (i % 60) as f64,
        part_time_job: ((i / 2) % 2) as f64,
        motivation_level: (i % 10) as f64,
        first_generation: ((i / 3) % 2) as f64,
        friend_academic_level: (i % 9) as f64,
    }
}

fn bench_linear_inference(c: &mut Criterion) {
    let model = LinearRegressor::new(vec![-0.35, 0.02, -0.25, 0.08, -0.1, 0.06], 1.2);
    let mut group = c.benchmark_group("linear_inference");

    for size in [1usize, 100, 1000] {
        let batch: Vec<FeatureVector> = (0..size).map(student).collect();
        let matrix = feature_matrix(&batch);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &matrix, |b, matrix| {
            b.iter(|| model.predict(black_box(matrix)))
        });
    }

    group.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let raw: Vec<f64> = (0..1000).map(|i| (i as f64) * 0.025 - 5.0).collect();
    let mut group = c.benchmark_group("normalization");
    group.throughput(Throughput::Elements(raw.len() as u64));

    for policy in [
        NormalizationPolicy::rescale_default(),
        NormalizationPolicy::clamp_default(),
    ] {
        if let Ok(normalizer) = ScoreNormalizer::new(policy) {
            group.bench_function(policy.name(), |b| {
                b.iter(|| normalizer.normalize_all(black_box(&raw)))
            });
        }
    }

    group.finish();
}

fn bench_recommendations(c: &mut Criterion) {
    let engine = RecommendationEngine::default();
    let everything_fires = FeatureVector {
        repeated_course: 1.0,
        attendance_level: 40.0,
        part_time_job: 1.0,
        motivation_level: 2.0,
        first_generation: 1.0,
        friend_academic_level: 1.0,
    };
    let nothing_fires = FeatureVector {
        repeated_course: 0.0,
        attendance_level: 95.0,
        part_time_job: 0.0,
        motivation_level: 9.0,
        first_generation: 0.0,
        friend_academic_level: 8.0,
    };

    c.bench_function("recommendations_all_rules", |b| {
        b.iter(|| engine.generate(black_box(&everything_fires), black_box(1.8)))
    });
    c.bench_function("recommendations_band_only", |b| {
        b.iter(|| engine.generate(black_box(&nothing_fires), black_box(3.7)))
    });
}

criterion_group!(
    benches,
    bench_linear_inference,
    bench_normalization,
    bench_recommendations
);

criterion_main!(benches);
