//! Short-time Fourier transform engine
//!
//! Slides a window of `transform_size` frames over one channel, weights it
//! with a window function, runs a real FFT and keeps the non-redundant half of
//! the spectrum as decibel magnitudes. Columns are independent of each other
//! and are computed in parallel.

use ndarray::{Array2, ArrayView1, s};
use rayon::prelude::*;
use realfft::RealFftPlanner;

use crate::audio::{AudioInfo, AudioSource, Frames};
use crate::error::{Result, SonogramError};
use super::math::{is_power_of_two, magnitude_to_db};
use super::window::WindowFunction;

/// How far consecutive analysis windows advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HopPolicy {
    /// Windows touch end to end.
    #[default]
    Contiguous,
    /// Consecutive windows share this many frames.
    Overlap(usize),
    /// Spread this many windows across the signal.
    Segments(usize),
}

impl HopPolicy {
    /// Build from the two optional user settings, which may not both be set.
    pub fn from_options(overlap: Option<usize>, segments: Option<usize>) -> Result<Self> {
        match (overlap, segments) {
            (Some(_), Some(_)) => Err(SonogramError::exclusive("overlap", "segments")),
            (Some(overlap), None) => Ok(HopPolicy::Overlap(overlap)),
            (None, Some(segments)) => Ok(HopPolicy::Segments(segments)),
            (None, None) => Ok(HopPolicy::Contiguous),
        }
    }

    fn validate(&self, transform_size: usize) -> Result<()> {
        match *self {
            HopPolicy::Overlap(overlap) if overlap >= transform_size => Err(SonogramError::config(format!(
                "overlap ({}) must be less than transform size ({})", overlap, transform_size
            ))),
            HopPolicy::Segments(segments) if segments <= 1 => {
                Err(SonogramError::config(format!("segments must be greater than 1, got {}", segments)))
            }
            _ => Ok(()),
        }
    }

    /// Hop in frames for a signal of `frame_count` frames.
    pub fn hop(&self, transform_size: usize, frame_count: usize) -> Result<usize> {
        if transform_size == 0 {
            return Err(SonogramError::config("transform size must be greater than 0"));
        }
        self.validate(transform_size)?;

        Ok(match *self {
            HopPolicy::Contiguous => transform_size,
            HopPolicy::Overlap(overlap) => transform_size - overlap,
            HopPolicy::Segments(segments) => {
                let spread = frame_count.saturating_sub(transform_size) / (segments - 1);
                spread.clamp(1, transform_size)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramConfig {
    pub channel: usize,
    pub transform_size: usize,
    pub hop: HopPolicy,
    pub window: WindowFunction,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            transform_size: 1024,
            hop: HopPolicy::Contiguous,
            window: WindowFunction::Hann,
        }
    }
}

impl SpectrogramConfig {
    /// Checks that do not depend on the audio.
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.transform_size) {
            return Err(SonogramError::config(format!(
                "transform size must be a power of 2, got {}", self.transform_size
            )));
        }
        self.hop.validate(self.transform_size)
    }
}

/// Decibel magnitudes, one row per time column and one column per frequency bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    pub sample_rate: u32,
    pub channels: usize,
    pub transform_size: usize,
    pub hop: usize,
    data: Array2<f64>,
}

impl Spectrogram {
    /// Assemble a spectrogram from precomputed decibel columns.
    pub fn from_columns(sample_rate: u32, channels: usize, transform_size: usize, hop: usize, columns: Vec<Vec<f64>>) -> Result<Self> {
        let bins = transform_size / 2;
        let count = columns.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != bins) {
            return Err(SonogramError::processing(format!(
                "column has {} bins, expected {}", bad.len(), bins
            )));
        }
        let data = Array2::from_shape_vec((count, bins), columns.concat())
            .map_err(|e| SonogramError::processing(format!("Spectrogram matrix: {}", e)))?;
        Ok(Self { sample_rate, channels, transform_size, hop, data })
    }

    pub fn column_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn bin_count(&self) -> usize {
        self.transform_size / 2
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Frequency in Hz at the lower edge of `bin`.
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.nyquist() / self.bin_count() as f64
    }
}

/// Number of full windows of `transform_size` frames, `hop` apart.
pub fn column_count(frame_count: usize, transform_size: usize, hop: usize) -> usize {
    if frame_count < transform_size {
        0
    } else {
        (frame_count - transform_size) / hop + 1
    }
}

/// Generate a spectrogram for any [`AudioSource`].
pub fn generate<S: AudioSource + ?Sized>(source: &S, config: &SpectrogramConfig) -> Result<Spectrogram> {
    generate_from_frames(&source.info(), source.frames(), config)
}

pub fn generate_from_frames(info: &AudioInfo, frames: &Frames, config: &SpectrogramConfig) -> Result<Spectrogram> {
    if config.channel >= info.channels || config.channel >= frames.ncols() {
        return Err(SonogramError::InvalidChannel { channel: config.channel, channels: info.channels });
    }
    config.validate()?;

    let size = config.transform_size;
    let frame_count = frames.nrows();
    let hop = config.hop.hop(size, frame_count)?;
    let count = column_count(frame_count, size, hop);
    log::debug!(
        "STFT: {} frames, size {}, hop {} (overlap {}), {} window, {} column(s)",
        frame_count, size, hop, size - hop, config.window, count
    );

    let fft = RealFftPlanner::<f64>::new().plan_fft_forward(size);
    let window = config.window.coefficients(size);
    let signal = frames.column(config.channel);
    let scale = 2.0 / size as f64;
    let bins = size / 2;

    let columns = (0..count)
        .into_par_iter()
        .map_init(
            || (fft.make_input_vec(), fft.make_output_vec()),
            |(input, output), index| -> Result<Vec<f64>> {
                let start = index * hop;
                for ((dst, &src), &w) in input
                    .iter_mut()
                    .zip(signal.slice(s![start..start + size]))
                    .zip(window.iter())
                {
                    *dst = src * w;
                }
                fft.process(input, output)
                    .map_err(|e| SonogramError::processing(format!("FFT: {}", e)))?;

                Ok(output[..bins]
                    .iter()
                    .map(|c| magnitude_to_db(c.norm() * scale))
                    .collect())
            },
        )
        .collect::<Result<Vec<_>>>()?;

    Spectrogram::from_columns(info.sample_rate, info.channels, size, hop, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::math::DB_FLOOR;
    use std::f64::consts::PI;

    fn mono_info(sample_rate: u32) -> AudioInfo {
        AudioInfo { channels: 1, sample_rate, bits_per_sample: 16 }
    }

    fn sine(len: usize, sample_rate: u32, freq: f64, amplitude: f64) -> Frames {
        Array2::from_shape_fn((len, 1), |(i, _)| {
            amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()
        })
    }

    fn config(transform_size: usize, hop: HopPolicy) -> SpectrogramConfig {
        SpectrogramConfig { transform_size, hop, ..Default::default() }
    }

    #[test]
    fn test_silence_yields_floor() {
        let frames = Array2::zeros((1024, 1));
        let spec = generate_from_frames(&mono_info(8000), &frames, &config(1024, HopPolicy::Overlap(0))).unwrap();

        assert_eq!(spec.column_count(), 1);
        assert_eq!(spec.bin_count(), 512);
        assert!(spec.column(0).iter().all(|&db| db == DB_FLOOR));

        // windows at 0 and 1024 both fit
        let frames = Array2::zeros((2048, 1));
        let spec = generate_from_frames(&mono_info(8000), &frames, &config(1024, HopPolicy::Overlap(0))).unwrap();
        assert_eq!(spec.column_count(), 2);
        assert!(spec.data().iter().all(|&db| db == DB_FLOOR));
    }

    #[test]
    fn test_column_count_formula() {
        let frames = Array2::zeros((10_000, 1));
        for (size, overlap) in [(256usize, 0usize), (256, 128), (512, 511), (1024, 768)] {
            let spec = generate_from_frames(&mono_info(8000), &frames, &config(size, HopPolicy::Overlap(overlap))).unwrap();
            let hop = size - overlap;
            assert_eq!(spec.hop, hop);
            assert_eq!(spec.column_count(), (10_000 - size) / hop + 1);
            assert_eq!(spec.data().ncols(), size / 2);
        }
    }

    #[test]
    fn test_short_signal_has_no_columns() {
        let frames = Array2::zeros((100, 1));
        let spec = generate_from_frames(&mono_info(8000), &frames, &config(128, HopPolicy::Contiguous)).unwrap();
        assert_eq!(spec.column_count(), 0);
        assert_eq!(column_count(0, 128, 128), 0);
    }

    #[test]
    fn test_sine_peak_bin() {
        // 1000 Hz at 8000 Hz with 256 bins of 15.625 Hz -> bin 64
        let frames = sine(4096, 8000, 1000.0, 0.5);
        let spec = generate_from_frames(&mono_info(8000), &frames, &config(512, HopPolicy::Overlap(256))).unwrap();

        for t in 0..spec.column_count() {
            let column = spec.column(t);
            let peak = column
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            assert_eq!(peak, 64);
            // rectangular amplitude 0.5 -> about -6 dB, minus 6 dB of Hann coherent gain
            assert!((column[64] + 12.0).abs() < 0.5, "peak {} dB", column[64]);
        }
        assert!((spec.bin_frequency(64) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_rectangular_full_scale_is_zero_db() {
        let frames = sine(1024, 8000, 1000.0, 1.0);
        let cfg = SpectrogramConfig { window: WindowFunction::Rectangular, ..config(256, HopPolicy::Contiguous) };
        let spec = generate_from_frames(&mono_info(8000), &frames, &cfg).unwrap();
        assert!(spec.column(0)[32].abs() < 1e-6);
    }

    #[test]
    fn test_selects_channel() {
        let mut frames = Array2::zeros((1024, 2));
        frames.column_mut(1).assign(&sine(1024, 8000, 2000.0, 1.0).column(0));
        let info = AudioInfo { channels: 2, sample_rate: 8000, bits_per_sample: 16 };

        let left = generate_from_frames(&info, &frames, &config(1024, HopPolicy::Contiguous)).unwrap();
        let right = generate_from_frames(&info, &frames, &SpectrogramConfig { channel: 1, ..config(1024, HopPolicy::Contiguous) }).unwrap();
        assert!(left.column(0).iter().all(|&db| db == DB_FLOOR));
        assert!(right.column(0)[256] > -10.0);
    }

    #[test]
    fn test_invalid_channel() {
        let frames = Array2::zeros((4096, 2));
        let info = AudioInfo { channels: 2, sample_rate: 8000, bits_per_sample: 16 };
        let cfg = SpectrogramConfig { channel: 2, ..Default::default() };
        assert!(matches!(
            generate_from_frames(&info, &frames, &cfg),
            Err(SonogramError::InvalidChannel { channel: 2, channels: 2 })
        ));
    }

    #[test]
    fn test_transform_size_must_be_power_of_two() {
        let frames = Array2::zeros((4096, 1));
        for size in [0usize, 3, 1000, 1536] {
            for hop in [HopPolicy::Contiguous, HopPolicy::Overlap(1), HopPolicy::Segments(4)] {
                assert!(matches!(
                    generate_from_frames(&mono_info(8000), &frames, &config(size, hop)),
                    Err(SonogramError::InvalidConfig { .. })
                ));
            }
        }
    }

    #[test]
    fn test_overlap_and_segments_are_exclusive() {
        assert!(matches!(
            HopPolicy::from_options(Some(0), Some(2)),
            Err(SonogramError::MutuallyExclusive { .. })
        ));
        assert_eq!(HopPolicy::from_options(None, None).unwrap(), HopPolicy::Contiguous);
        assert_eq!(HopPolicy::from_options(Some(5), None).unwrap(), HopPolicy::Overlap(5));
    }

    #[test]
    fn test_invalid_overlap_and_segments() {
        let frames = Array2::zeros((4096, 1));
        assert!(matches!(
            generate_from_frames(&mono_info(8000), &frames, &config(256, HopPolicy::Overlap(256))),
            Err(SonogramError::InvalidConfig { .. })
        ));
        assert!(matches!(
            generate_from_frames(&mono_info(8000), &frames, &config(256, HopPolicy::Segments(1))),
            Err(SonogramError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_segments_hop() {
        // (4096 - 256) / 9 = 426 -> clamped to 256
        assert_eq!(HopPolicy::Segments(10).hop(256, 4096).unwrap(), 256);
        // (4096 - 256) / 59 = 65
        assert_eq!(HopPolicy::Segments(60).hop(256, 4096).unwrap(), 65);
        // too short a signal clamps to 1
        assert_eq!(HopPolicy::Segments(60).hop(256, 100).unwrap(), 1);

        let frames = Array2::zeros((4096, 1));
        let spec = generate_from_frames(&mono_info(8000), &frames, &config(256, HopPolicy::Segments(60))).unwrap();
        assert_eq!(spec.column_count(), (4096 - 256) / 65 + 1);
    }

    #[test]
    fn test_hop_rejects_invalid_policy() {
        assert_eq!(HopPolicy::Contiguous.hop(256, 4096).unwrap(), 256);
        assert_eq!(HopPolicy::Overlap(192).hop(256, 4096).unwrap(), 64);

        for policy in [HopPolicy::Segments(0), HopPolicy::Segments(1), HopPolicy::Overlap(256), HopPolicy::Overlap(300)] {
            assert!(matches!(policy.hop(256, 4096), Err(SonogramError::InvalidConfig { .. })), "{:?}", policy);
        }
        assert!(HopPolicy::Contiguous.hop(0, 4096).is_err());
    }

    #[test]
    fn test_from_columns_checks_length() {
        let result = Spectrogram::from_columns(8000, 1, 8, 8, vec![vec![0.0; 4], vec![0.0; 3]]);
        assert!(result.is_err());
    }
}
