// Entitlement Policy Benchmarks
//
// Gate decisions run before every user-initiated action.
//
// Key metrics:
// - Typed gate decision across all features
// - String-keyed gate decision
// - Consume followed by rollover

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use ruby_ai::entitlements::{
    can_use_feature, can_use_feature_named, consume_quota, Feature, Tier, UsageSnapshot,
};

fn snapshot() -> UsageSnapshot {
    let mut snapshot = UsageSnapshot::new(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
    snapshot.reports_used = 3;
    snapshot.ai_questions_used = 7;
    snapshot
}

/// Benchmark: typed gate decision across all features
fn bench_can_use_feature(c: &mut Criterion) {
    let s = snapshot();
    c.bench_function("can_use_feature_all", |b| {
        b.iter(|| {
            for feature in Feature::ALL {
                black_box(can_use_feature(black_box(&s), Tier::Free, feature));
            }
        });
    });
}

/// Benchmark: string-keyed gate decision
fn bench_can_use_feature_named(c: &mut Criterion) {
    let s = snapshot();
    c.bench_function("can_use_feature_named", |b| {
        b.iter(|| black_box(can_use_feature_named(black_box(&s), Tier::Free, "ai_question")));
    });
}

/// Benchmark: consume plus rollover
fn bench_consume_and_rollover(c: &mut Criterion) {
    let s = snapshot();
    let today = NaiveDate::from_ymd_opt(2026, 11, 15).unwrap();
    c.bench_function("consume_then_rollover", |b| {
        b.iter(|| {
            let next = consume_quota(black_box(&s), Tier::Free, Feature::Report);
            black_box(next.map(|n| n.rollover_if_due(today)))
        });
    });
}

criterion_group!(
    benches,
    bench_can_use_feature,
    bench_can_use_feature_named,
    bench_consume_and_rollover
);
criterion_main!(benches);
