//! Benchmarks for the measurement archive
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use meridian::metadata::{checksum, EventTypeSpec, RegisterRequest, SubjectType};
use meridian::registry::SummaryKind;
use meridian::{Archive, RangeQuery, WriteRequest};
use serde_json::json;
use std::collections::BTreeMap;

fn throughput_registration() -> RegisterRequest {
    RegisterRequest {
        subject_type: SubjectType::PointToPoint,
        subject_fields: BTreeMap::from([
            ("source".to_string(), "10.0.0.1".to_string()),
            ("destination".to_string(), "10.0.0.2".to_string()),
            ("tool-name".to_string(), "pscheduler/iperf3".to_string()),
        ]),
        arbitrary_params: BTreeMap::from([(
            "ip-transport-protocol".to_string(),
            "tcp".to_string(),
        )]),
        event_types: vec![EventTypeSpec::new("throughput")
            .summary(SummaryKind::Average, 300)
            .summary(SummaryKind::Aggregation, 300)
            .summary(SummaryKind::Aggregation, 3600)],
    }
}

fn bench_checksum(c: &mut Criterion) {
    let request = throughput_registration();
    let rows = vec![
        ("throughput".to_string(), SummaryKind::Base, 0),
        ("throughput".to_string(), SummaryKind::Average, 300),
        ("throughput".to_string(), SummaryKind::Aggregation, 300),
        ("throughput".to_string(), SummaryKind::Aggregation, 3600),
    ];

    c.bench_function("checksum", |b| {
        b.iter(|| {
            checksum::checksum(
                black_box(request.subject_type),
                black_box(&request.subject_fields),
                black_box(&request.arbitrary_params),
                black_box(&rows),
            )
        })
    });
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(1));

    group.bench_function("base_only", |b| {
        let archive = Archive::new();
        let key = archive
            .register_metadata(&RegisterRequest {
                event_types: vec![EventTypeSpec::new("throughput")],
                ..throughput_registration()
            })
            .unwrap();

        let mut ts = 0i64;
        b.iter(|| {
            ts += 1;
            archive
                .ingest_point(&WriteRequest::new(&key, "throughput", ts, json!(1000)))
                .unwrap()
        });
    });

    group.bench_function("with_three_rollups", |b| {
        let archive = Archive::new();
        let key = archive.register_metadata(&throughput_registration()).unwrap();

        let mut ts = 0i64;
        b.iter(|| {
            ts += 1;
            archive
                .ingest_point(&WriteRequest::new(&key, "throughput", ts, json!(1000)))
                .unwrap()
        });
    });

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let archive = Archive::new();
    let key = archive.register_metadata(&throughput_registration()).unwrap();

    // a day of 30-second samples
    for i in 0..2880i64 {
        archive
            .ingest_point(&WriteRequest::new(&key, "throughput", i * 30, json!(i)))
            .unwrap();
    }

    let mut group = c.benchmark_group("query");

    group.bench_function("base_day", |b| {
        let query = RangeQuery::new(&key, "throughput").begin(0).end(86_400);
        b.iter(|| archive.query_range(black_box(&query)).unwrap());
    });

    group.bench_function("aggregation_day", |b| {
        let query = RangeQuery::new(&key, "throughput")
            .summary("aggregations", 300)
            .begin(0)
            .end(86_400);
        b.iter(|| archive.query_range(black_box(&query)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_checksum, bench_ingest, bench_query);
criterion_main!(benches);
