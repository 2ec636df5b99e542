//! Per-frame filter benchmarks
//!
//! Run with: cargo bench --bench filters

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgb, RgbImage};

use sketch_video::filters::{ops, FilterId};

/// A 320x180 gradient with a few hard edges, roughly a downscaled video frame
fn test_frame() -> RgbImage {
    RgbImage::from_fn(320, 180, |x, y| {
        let band = if (x / 40 + y / 30) % 2 == 0 { 40 } else { 0 };
        Rgb([(x % 256) as u8, (y * 255 / 180) as u8, (128 + band) as u8])
    })
}

fn bench_catalog(c: &mut Criterion) {
    let frame = test_frame();
    let mut group = c.benchmark_group("filters");
    group.throughput(Throughput::Elements((frame.width() * frame.height()) as u64));

    for id in FilterId::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(id.as_str()), &frame, |b, frame| {
            b.iter(|| black_box(id.apply(black_box(frame))))
        });
    }

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let frame = test_frame();
    let gray = ops::gray(&frame);
    let mut group = c.benchmark_group("primitives");

    group.bench_function("blur", |b| b.iter(|| black_box(ops::blur(black_box(&gray), 3.5))));
    group.bench_function("adaptive_threshold", |b| {
        b.iter(|| black_box(ops::adaptive_threshold(black_box(&gray), 9, 2.0)))
    });
    group.bench_function("sobel_magnitude", |b| b.iter(|| black_box(ops::sobel_magnitude(black_box(&gray)))));

    group.finish();
}

criterion_group!(benches, bench_catalog, bench_primitives);
criterion_main!(benches);
