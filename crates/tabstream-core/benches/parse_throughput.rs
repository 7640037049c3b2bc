use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tempfile::TempDir;

use tabstream_core::columnar::build_row_batch;
use tabstream_core::{BatchResult, CsvOptions, RowStream, SliceParser};

fn synthetic_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("id,name,value,flag\n");
    for i in 0..rows {
        out.push_str(&format!("{i},row-{i},\"v,{i}\",{}\n", i % 2));
    }
    out.into_bytes()
}

fn bench_slice_parser(c: &mut Criterion) {
    let input = synthetic_csv(100_000);
    let options = CsvOptions {
        batch_size: 10_000,
        ..CsvOptions::default()
    };

    let mut group = c.benchmark_group("slice_parser");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("feed_100k_rows", |b| {
        b.iter(|| {
            let mut parser = SliceParser::new(&options);
            let mut remainder: Vec<u8> = Vec::new();
            let mut fed = false;
            let mut rows = 0usize;
            while !fed || !remainder.is_empty() {
                let seg2: &[u8] = if fed { &[] } else { &input };
                fed = true;
                parser.feed(&remainder, seg2);
                remainder = parser.take_remainder();
                while parser.has_batch() {
                    rows += parser.take_batch().row_count();
                }
            }
            parser.flush();
            while parser.has_batch() {
                rows += parser.take_batch().row_count();
            }
            black_box(rows)
        })
    });
    group.finish();
}

fn bench_row_builder(c: &mut Criterion) {
    let input = synthetic_csv(50_000);
    let options = CsvOptions {
        batch_size: 50_000,
        ..CsvOptions::default()
    };
    let mut parser = SliceParser::new(&options);
    parser.feed(&input, &[]);
    parser.flush();
    let batch = parser.take_batch();

    let mut group = c.benchmark_group("row_builder");
    group.throughput(Throughput::Elements(batch.row_count() as u64));
    group.bench_function("build_50k_rows", |b| {
        b.iter(|| black_box(build_row_batch(black_box(&batch))))
    });
    group.finish();
}

fn bench_row_stream(c: &mut Criterion) {
    let dir = TempDir::new().expect("tempdir");
    let input = synthetic_csv(200_000);
    let path = dir.path().join("bench.csv");
    std::fs::write(&path, &input).expect("write bench fixture");

    let mut group = c.benchmark_group("row_stream");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("end_to_end_200k_rows", |b| {
        b.iter(|| {
            let stream = RowStream::open(&path, CsvOptions::default());
            let mut rows = 0usize;
            loop {
                match stream.next_batch() {
                    BatchResult::Batch(batch) => rows += batch.len(),
                    _ => break,
                }
            }
            black_box(rows)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_slice_parser,
    bench_row_builder,
    bench_row_stream
);
criterion_main!(benches);
