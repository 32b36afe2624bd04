use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stereo_depth_rs::depth_pipeline::{
    build_matcher, CorrespondenceMatcher, DepthConverter, DepthRefiner, DisparityRaster, MatcherConfig,
    MatcherKind, Raster,
};

fn generate_mock_pair(width: usize, height: usize, shift: usize) -> (Raster<u8>, Raster<u8>) {
    let texture = |x: usize, y: usize| ((x * 7919 + y * 104_729) % 251) as u8;
    let mut left = Raster::new(width, height, 1);
    let mut right = Raster::new(width, height, 1);
    for y in 0..height {
        for x in 0..width {
            left.set(x, y, texture(x, y));
            right.set(x, y, texture(x + shift, y));
        }
    }
    (left, right)
}

fn generate_mock_disparity(width: usize, height: usize) -> DisparityRaster {
    let data = (0..width * height)
        .map(|i| if i % width < width / 3 { 752 } else { 900 + (i % 64) as i16 })
        .collect();
    DisparityRaster::from_vec(width, height, data).unwrap()
}

fn benchmark_matchers(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    group.sample_size(10);
    let (left, right) = generate_mock_pair(240, 120, 52);

    let matchers = vec![
        (MatcherKind::Block, vec![33], "block_33"),
        (MatcherKind::Block, vec![9, 21, 33], "block_merge"),
        (MatcherKind::SemiGlobal, vec![3], "semi_global_3"),
    ];

    for (kind, block_sizes, label) in matchers {
        let matcher = build_matcher(&MatcherConfig {
            kind,
            block_sizes,
            ..MatcherConfig::default()
        });
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| matcher.compute(black_box(&left), black_box(&right)))
        });
    }

    group.finish();
}

fn benchmark_refine(c: &mut Criterion) {
    let mut group = c.benchmark_group("refine_by_size");

    for (width, height, label) in [(240, 120, "240x120"), (480, 240, "480x240")] {
        let disparity = generate_mock_disparity(width, height);
        let (color, _) = generate_mock_pair(width, height, 0);
        let refiner = DepthRefiner::default();
        group.bench_with_input(BenchmarkId::from_parameter(label), &disparity, |b, d| {
            b.iter(|| refiner.refine(black_box(d), &color))
        });
    }

    group.finish();
}

fn benchmark_convert(c: &mut Criterion) {
    let disparity = generate_mock_disparity(480, 240);
    let converter = DepthConverter::default();
    c.bench_function("convert_480x240", |b| {
        b.iter(|| converter.convert(black_box(&disparity)))
    });
}

criterion_group!(benches, benchmark_matchers, benchmark_refine, benchmark_convert);
criterion_main!(benches);
