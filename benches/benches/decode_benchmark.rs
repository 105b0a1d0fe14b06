//! Decode benchmarks for the live and archive tick paths.
//!
//! Run with: `cargo bench --package sbpro-bench`

use chrono::NaiveDate;
use chrono_tz::America::Chicago;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sbpro_archive::read_archive;
use sbpro_bench::{archive_records, framed_stream, gzip, live_response};
use sbpro_types::{ArchiveRecord, Symbol};
use sbpro_wire::{
    StreamResponse, decode_archive_tick, decode_stream_response, scan_frame, trading_midnight,
};
use std::hint::black_box;
use tempfile::TempDir;

fn live_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("live");

    for count in [10u64, 100, 1_000] {
        let response = live_response("6E", "03-20", count);
        group.throughput(Throughput::Elements(count));
        let id = BenchmarkId::new("decode_response", count);
        group.bench_with_input(id, &response, |b, response| {
            b.iter(|| {
                let response = black_box(response.as_str());
                match decode_stream_response(response, "6E", "03-20", 100_000.0, Chicago).unwrap() {
                    StreamResponse::Ticks(batch) => black_box(batch.max_sequence),
                    StreamResponse::Shutdown => unreachable!(),
                }
            });
        });
    }

    let stream = framed_stream(&live_response("6E", "03-20", 10), 100);
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("scan_frames", |b| {
        b.iter(|| {
            let mut rest = black_box(stream.as_slice());
            let mut frames = 0;
            while let Some((advance, payload)) = scan_frame(rest, false).unwrap() {
                black_box(payload);
                rest = &rest[advance..];
                frames += 1;
            }
            frames
        });
    });

    group.finish();
}

fn archive_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive");
    let symbol = Symbol::new("GC", 10, vec!["04-20".parse().unwrap()]);
    let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let midnight = trading_midnight(date, Chicago).unwrap();

    let raw = archive_records(10_000);
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("decode_records", |b| {
        b.iter(|| {
            raw.chunks_exact(ArchiveRecord::SIZE)
                .zip(1u64..)
                .map(|(record, number)| {
                    decode_archive_tick(black_box(record), midnight, &symbol, "04-20", number)
                        .unwrap()
                })
                .count()
        });
    });

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("20200102.zip");
    std::fs::write(&path, gzip(&raw).unwrap()).unwrap();
    group.bench_function("read_cached_archive", |b| {
        b.iter(|| read_archive(black_box(&path), midnight, &symbol, "04-20").unwrap().len());
    });

    group.finish();
}

criterion_group!(benches, live_benchmark, archive_benchmark);
criterion_main!(benches);
