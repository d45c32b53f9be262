//! Benchmarks for individual filters

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use meshguard_core::{RiskLevel, SenderId, Timestamp};
use meshguard_filter::{
    fingerprint, Deduplicator, HistoryLimits, RateLimiter, ReputationTracker, SenderProfile,
};

fn profile() -> SenderProfile {
    SenderProfile::new(
        SenderId::new("farm_001"),
        0.5,
        HistoryLimits::default(),
        Timestamp::ZERO,
    )
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    for len in [32usize, 160, 1024] {
        let text = "Disponible maiz ".repeat(len / 16);
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| black_box(fingerprint(black_box(text))))
        });
    }
    group.finish();
}

fn bench_rate_limit_check(c: &mut Criterion) {
    let limiter = RateLimiter::default();
    let mut p = profile();
    let mut now = 0u64;

    c.bench_function("rate_limit_check", |b| {
        b.iter(|| {
            now += 3_100_000;
            black_box(limiter.check(&mut p, Timestamp::from_micros(now)))
        })
    });
}

fn bench_dedup_check(c: &mut Criterion) {
    let mut dedup = Deduplicator::default();
    let mut p = profile();
    let mut n = 0u64;

    c.bench_function("dedup_check_miss", |b| {
        b.iter(|| {
            n += 1;
            black_box(dedup.check(&format!("reporte {n}"), &mut p, Timestamp::from_millis(n)))
        })
    });
}

fn bench_reputation_update(c: &mut Criterion) {
    let tracker = ReputationTracker::default();
    let mut p = profile();
    let flags = vec!["urgency".to_string()];

    c.bench_function("reputation_update", |b| {
        b.iter(|| {
            black_box(tracker.update(&mut p, RiskLevel::Low, &flags, Timestamp::ZERO));
            p.set_reputation(0.5);
        })
    });
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_rate_limit_check,
    bench_dedup_check,
    bench_reputation_update,
);
criterion_main!(benches);
