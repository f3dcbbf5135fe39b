use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uffkit::file::{read_bytes, write_to, ReadOptions};
use uffkit::record::{Complex, Measurement, Record, Series};

fn measurements(count: usize, points: usize, binary: bool) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let data = Series::Complex(
                (0..points).map(|k| Complex::new(k as f64 * 1e-3, i as f64 - k as f64 * 2e-3)).collect(),
            );
            let mut m = Measurement::even(0.0, 0.5, data);
            m.ids[0] = format!("FRF {}", i);
            m.function_type = 4;
            m.binary = binary;
            Record::Measurement(m)
        })
        .collect()
}

fn encoded(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    write_to(&mut out, records).unwrap();
    out
}

fn bench_encode(c: &mut Criterion) {
    let ascii = measurements(16, 4096, false);
    let binary = measurements(16, 4096, true);

    c.bench_function("encode_16x4096_ascii", |b| b.iter(|| encoded(black_box(&ascii))));
    c.bench_function("encode_16x4096_binary", |b| b.iter(|| encoded(black_box(&binary))));
}

fn bench_decode(c: &mut Criterion) {
    let ascii = encoded(&measurements(16, 4096, false));
    let binary = encoded(&measurements(16, 4096, true));
    let opts = ReadOptions::default().quiet();

    c.bench_function("decode_16x4096_ascii", |b| b.iter(|| read_bytes(black_box(&ascii), &opts).unwrap()));
    c.bench_function("decode_16x4096_binary", |b| b.iter(|| read_bytes(black_box(&binary), &opts).unwrap()));
}

fn bench_scan(c: &mut Criterion) {
    let data = encoded(&measurements(256, 256, true));

    c.bench_function("info_256_blocks", |b| {
        b.iter(|| read_bytes(black_box(&data), &ReadOptions::info()).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_scan);
criterion_main!(benches);
