use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use sai_alpha::{
    generate_dataset,
    services::analytics::KpiAggregator,
    tables::{decode_table, encode_table, TableRecord},
    models::SaleLine,
    Currency, DateRange, GeneratorConfig, KpiFilter,
};

fn bench_config(months: u32) -> GeneratorConfig {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let end = start
        .checked_add_months(chrono::Months::new(months))
        .and_then(|d| d.pred_opt())
        .unwrap();
    GeneratorConfig {
        start_date: start,
        end_date: end,
        product_count: 300,
        client_count: 120,
        ..Default::default()
    }
}

// Generation cost grows with the window length
fn generation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_dataset");
    group.sample_size(10);

    for months in [1u32, 3, 12].iter() {
        let config = bench_config(*months);
        group.bench_with_input(BenchmarkId::from_parameter(months), &config, |b, config| {
            b.iter(|| generate_dataset(black_box(config)).unwrap());
        });
    }

    group.finish();
}

fn aggregation_benchmark(c: &mut Criterion) {
    let dataset = generate_dataset(&bench_config(12)).unwrap();
    let aggregator = KpiAggregator::new(&dataset);
    let june = DateRange::new(
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
    )
    .unwrap();

    let mut group = c.benchmark_group("aggregate");
    for (name, filter) in [("all", KpiFilter::new()), ("june", KpiFilter::new().with_range(june))] {
        for view in [Currency::MXN, Currency::USD] {
            group.bench_function(format!("{}_{}", name, view), |b| {
                b.iter(|| aggregator.aggregate(black_box(&filter), view));
            });
        }
    }
    group.finish();
}

// Encoding and decoding of the largest table
fn table_codec_benchmark(c: &mut Criterion) {
    let dataset = generate_dataset(&bench_config(3)).unwrap();
    let rows: Vec<_> = dataset.sales.iter().map(SaleLine::to_row).collect();
    let stamp = dataset.fx_rates.last_date().unwrap();
    let encoded = encode_table(&SaleLine::SCHEMA, &rows, stamp).unwrap();

    c.bench_function("encode_ventas", |b| {
        b.iter(|| encode_table(&SaleLine::SCHEMA, black_box(&rows), stamp).unwrap());
    });
    c.bench_function("decode_ventas", |b| {
        b.iter(|| decode_table(&SaleLine::SCHEMA, black_box(&encoded)).unwrap());
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = generation_benchmark, aggregation_benchmark, table_codec_benchmark
}
criterion_main!(benches);
