use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use sonogram::audio::AudioInfo;
use sonogram::spectrogram::{self, HopPolicy, RenderConfig, SpectrogramConfig};
use std::hint::black_box;

fn test_signal(frames: usize) -> Array2<f64> {
    Array2::from_shape_fn((frames, 1), |(n, _)| (n as f64 * 0.05).sin() * 0.5)
}

fn bench_stft(c: &mut Criterion) {
    let info = AudioInfo { channels: 1, sample_rate: 44_100, bits_per_sample: 16 };
    let frames = test_signal(44_100 * 10);

    let mut group = c.benchmark_group("stft");
    for size in [256usize, 1024, 4096] {
        let config = SpectrogramConfig {
            transform_size: size,
            hop: HopPolicy::Overlap(size * 3 / 4),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            b.iter(|| black_box(spectrogram::generate_from_frames(&info, &frames, config).unwrap()));
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let info = AudioInfo { channels: 1, sample_rate: 44_100, bits_per_sample: 16 };
    let frames = test_signal(44_100 * 10);
    let spec = spectrogram::generate_from_frames(&info, &frames, &SpectrogramConfig::default()).unwrap();
    let config = RenderConfig::default();

    c.bench_function("render_default", |b| {
        b.iter(|| black_box(spectrogram::render(&spec, &config).unwrap()));
    });
}

criterion_group!(benches, bench_stft, bench_render);
criterion_main!(benches);
