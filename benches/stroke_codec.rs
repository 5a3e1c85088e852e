//! Stroke Codec Benchmarks
//!
//! Throughput of the compact stroke codec, the indexed ink file format and
//! page bundle parsing.
//!
//! Run with: `cargo bench --bench stroke_codec`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::{Cursor, Write};
use std::time::Duration;

use talya_viewer::document::{encode_strokes, parse_page_bundle, parse_strokes, Stroke, StrokePoint};
use talya_viewer::ink::{decode_file, encode_file, BinaryInkStroke, Point2D};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A wavy pen stroke with `points` samples
fn create_ink_stroke(points: usize) -> BinaryInkStroke {
    BinaryInkStroke::new().with_points(
        (0..points)
            .map(|i| {
                let t = i as f32 * 0.05;
                Point2D::new(100.0 + t * 40.0, 300.0 + t.sin() * 25.0)
            })
            .collect(),
    )
}

fn create_page_strokes(count: usize, points: usize) -> Vec<Stroke> {
    (0..count)
        .map(|i| Stroke {
            id: format!("{:036}", i),
            kind: 0,
            color: [20, 20, 20, 255],
            width: 2.0,
            timestamp: 1_700_000_000.0,
            points: (0..points)
                .map(|j| StrokePoint {
                    x: (i * 3 + j) as f32 * 0.7,
                    y: 400.0 + (j as f32 * 0.1).cos() * 30.0,
                    pressure: 0.8,
                })
                .collect(),
        })
        .collect()
}

/// Page bundle with strokes, text and one image
fn create_page_bundle() -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut zip = ZipWriter::new(cursor);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("metadata.json", options).unwrap();
        zip.write_all(br#"{"dimensions": {"width": 612, "height": 792}, "original_page": 1}"#)
            .unwrap();

        zip.start_file("strokes.bin", options).unwrap();
        zip.write_all(&encode_strokes(&create_page_strokes(200, 120)))
            .unwrap();

        zip.start_file("text.json", options).unwrap();
        zip.write_all(
            br#"[{"id": "t0", "text": "Benchmark page", "position": [72, 72], "style": {"size": 14}}]"#,
        )
        .unwrap();

        zip.start_file("images/figure.webp", options).unwrap();
        zip.write_all(&[0u8; 16 * 1024]).unwrap();

        zip.finish().unwrap();
    }
    buffer
}

/// Benchmark compact stroke encoding in both point modes
fn bench_stroke_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("stroke_codec");

    for points in [16usize, 256, 4096] {
        let stroke = create_ink_stroke(points);
        group.throughput(Throughput::Elements(points as u64));

        for differential in [false, true] {
            let label = if differential { "differential" } else { "absolute" };
            let encoded = stroke.serialize(differential);

            group.bench_with_input(
                BenchmarkId::new(format!("serialize_{}", label), points),
                &stroke,
                |b, stroke| b.iter(|| black_box(stroke.serialize(black_box(differential)))),
            );

            group.bench_with_input(
                BenchmarkId::new(format!("deserialize_{}", label), points),
                &encoded,
                |b, data| {
                    b.iter(|| black_box(BinaryInkStroke::deserialize(black_box(data), differential)))
                },
            );
        }
    }

    group.finish();
}

/// Benchmark whole ink file encode/decode
fn bench_ink_file(c: &mut Criterion) {
    let strokes: Vec<_> = (0..500).map(|_| create_ink_stroke(200)).collect();

    let mut group = c.benchmark_group("ink_file");
    group.measurement_time(Duration::from_secs(10));

    for compressed in [false, true] {
        let label = if compressed { "compressed" } else { "raw" };
        let bytes = encode_file(&strokes, compressed).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_function(format!("encode_{}", label), |b| {
            b.iter(|| black_box(encode_file(black_box(&strokes), compressed).unwrap()))
        });

        group.bench_function(format!("decode_{}", label), |b| {
            b.iter(|| black_box(decode_file(black_box(&bytes)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark page bundle decoding
fn bench_page_bundle(c: &mut Criterion) {
    let strokes = encode_strokes(&create_page_strokes(200, 120));
    let bundle = create_page_bundle();

    let mut group = c.benchmark_group("page_bundle");

    group.throughput(Throughput::Bytes(strokes.len() as u64));
    group.bench_function("parse_strokes", |b| {
        b.iter(|| black_box(parse_strokes(black_box(&strokes))))
    });

    group.throughput(Throughput::Bytes(bundle.len() as u64));
    group.bench_function("parse_page_bundle", |b| {
        b.iter(|| black_box(parse_page_bundle(black_box(bundle.clone())).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_stroke_codec, bench_ink_file, bench_page_bundle);
criterion_main!(benches);
