//! Benchmarks for expression parsing and next-occurrence calculations.

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use minicron::Expression;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("five_field", |b| {
        b.iter(|| Expression::parse("*/5 * * * *").unwrap());
    });
    group.bench_function("six_field", |b| {
        b.iter(|| Expression::parse("30 */2 8-18 * * MON-FRI").unwrap());
    });
    group.bench_function("interval", |b| {
        b.iter(|| Expression::parse("@every 1h30m").unwrap());
    });

    group.finish();
}

fn bench_upcoming(c: &mut Criterion) {
    let mut group = c.benchmark_group("upcoming");

    let base_time = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let every_minute = Expression::parse("0 * * * * *").unwrap();
    let interval_5m = Expression::parse("@every 5m").unwrap();

    for n in [10, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::new("cron_minute", n), n, |b, &n| {
            b.iter(|| every_minute.upcoming(base_time, n));
        });

        group.bench_with_input(BenchmarkId::new("interval_5m", n), n, |b, &n| {
            b.iter(|| interval_5m.upcoming(base_time, n));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_upcoming);

criterion_main!(benches);
