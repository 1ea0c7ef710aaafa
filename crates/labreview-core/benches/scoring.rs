use criterion::{black_box, criterion_group, criterion_main, Criterion};

use labreview_core::catalog::builtin_catalog;
use labreview_core::model::ReportType;
use labreview_core::simulator::{score_for_report, score_slot, str_hash};

fn bench_str_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("str_hash");

    group.bench_function("short_key", |b| {
        b.iter(|| str_hash(black_box("hdfs_exp:word:7")))
    });

    group.bench_function("long_key", |b| {
        let key = "ds_exp2:dify:".repeat(64);
        b.iter(|| str_hash(black_box(&key)))
    });

    group.finish();
}

fn bench_score_for_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_for_report");

    group.bench_function("single", |b| {
        b.iter(|| score_for_report(black_box("mapreduce_exp"), ReportType::Word, black_box(44)))
    });

    group.bench_function("whole_catalog", |b| {
        let slots: Vec<_> = builtin_catalog()
            .courses
            .iter()
            .flat_map(|c| c.all_slots())
            .collect();
        b.iter(|| slots.iter().map(score_slot).sum::<u32>())
    });

    group.finish();
}

criterion_group!(benches, bench_str_hash, bench_score_for_report);
criterion_main!(benches);
