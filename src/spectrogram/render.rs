//! Spectrogram rendering
//!
//! Resolves the frequency band and decibel window, then maps every cell of the
//! band to a palette color. Time runs left to right, frequency bottom to top.

use image::RgbImage;
use rayon::prelude::*;

use crate::error::{Result, SonogramError};
use super::math::{median, min_max};
use super::palette::{Color, ColorMap};
use super::stft::Spectrogram;

/// One end of the frequency band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FrequencyBound {
    /// Band edge (0 Hz or Nyquist).
    #[default]
    Unset,
    /// Hz, within [0, Nyquist].
    Absolute(f64),
    /// Fraction of Nyquist, within [0, 1].
    Relative(f64),
}

impl FrequencyBound {
    pub fn from_options(
        absolute: Option<f64>,
        relative: Option<f64>,
        names: (&'static str, &'static str),
    ) -> Result<Self> {
        match (absolute, relative) {
            (Some(_), Some(_)) => Err(SonogramError::exclusive(names.0, names.1)),
            (Some(hz), None) => Ok(FrequencyBound::Absolute(hz)),
            (None, Some(ratio)) => Ok(FrequencyBound::Relative(ratio)),
            (None, None) => Ok(FrequencyBound::Unset),
        }
    }

    fn resolve(&self, nyquist: f64, unset: f64, name: &str) -> Result<f64> {
        match *self {
            FrequencyBound::Unset => Ok(unset),
            FrequencyBound::Absolute(hz) => {
                if !(0.0..=nyquist).contains(&hz) {
                    return Err(SonogramError::range(format!(
                        "{} frequency {} Hz outside [0, {}]", name, hz, nyquist
                    )));
                }
                Ok(hz)
            }
            FrequencyBound::Relative(ratio) => {
                if !(0.0..=1.0).contains(&ratio) {
                    return Err(SonogramError::range(format!(
                        "relative {} frequency {} outside [0, 1]", name, ratio
                    )));
                }
                Ok(ratio * nyquist)
            }
        }
    }
}

/// One end of the decibel window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DecibelBound {
    /// The minimum or maximum of the selected cells.
    #[default]
    Extremum,
    /// Offset in dB from the median of the selected cells.
    RelativeToMedian(f64),
}

impl DecibelBound {
    pub fn from_option(offset: Option<f64>) -> Self {
        offset.map_or(DecibelBound::Extremum, DecibelBound::RelativeToMedian)
    }

    fn is_relative(&self) -> bool {
        matches!(self, DecibelBound::RelativeToMedian(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub min_frequency: FrequencyBound,
    pub max_frequency: FrequencyBound,
    pub min_db: DecibelBound,
    pub max_db: DecibelBound,
    pub palette: Vec<Color>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_frequency: FrequencyBound::Unset,
            max_frequency: FrequencyBound::Unset,
            min_db: DecibelBound::Extremum,
            max_db: DecibelBound::Extremum,
            palette: ColorMap::default().palette(),
        }
    }
}

/// Bounds the image was rendered with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInfo {
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub min_db: f64,
    pub max_db: f64,
    /// Inclusive range of frequency bins shown.
    pub min_bin: usize,
    pub max_bin: usize,
}

impl std::fmt::Display for RenderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.0}-{:.0} Hz (bins {}-{}), {:.1} to {:.1} dB",
            self.min_frequency, self.max_frequency, self.min_bin, self.max_bin, self.min_db, self.max_db
        )
    }
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub info: RenderInfo,
    pub image: RgbImage,
}

/// Map a decibel value to a palette index.
///
/// The value is clamped into the window first. An empty window maps to the
/// first color; an inverted one (`min_db > max_db`) to the last.
pub fn palette_index(db: f64, min_db: f64, max_db: f64, palette_len: usize) -> usize {
    let range = max_db - min_db;
    let normalized = if range != 0.0 {
        (db.max(min_db).min(max_db) - min_db) / range
    } else {
        0.0
    };
    let last = palette_len.saturating_sub(1);
    ((normalized * last as f64).round().max(0.0) as usize).min(last)
}

/// Inclusive bin range covering `[min_frequency, max_frequency]`.
pub fn bin_range(min_frequency: f64, max_frequency: f64, nyquist: f64, bin_count: usize) -> (usize, usize) {
    let bins = bin_count as f64;
    let min_index = ((min_frequency / nyquist) * bins).floor() as usize;
    let max_index = (((max_frequency / nyquist) * bins).ceil() as usize).min(bin_count - 1);
    (min_index, max_index)
}

pub fn render(spectrogram: &Spectrogram, config: &RenderConfig) -> Result<RenderResult> {
    if config.palette.is_empty() {
        return Err(SonogramError::config("color palette must not be empty"));
    }

    let nyquist = spectrogram.nyquist();
    let min_frequency = config.min_frequency.resolve(nyquist, 0.0, "min")?;
    let max_frequency = config.max_frequency.resolve(nyquist, nyquist, "max")?;
    if min_frequency >= max_frequency {
        return Err(SonogramError::range(format!(
            "min frequency ({} Hz) must be less than max frequency ({} Hz)", min_frequency, max_frequency
        )));
    }

    let bin_count = spectrogram.bin_count();
    if bin_count == 0 {
        return Err(SonogramError::range("spectrogram has no frequency bins"));
    }
    let (min_bin, max_bin) = bin_range(min_frequency, max_frequency, nyquist, bin_count);
    if min_bin > max_bin {
        return Err(SonogramError::range(format!(
            "frequency band {}-{} Hz selects no bins", min_frequency, max_frequency
        )));
    }

    let band = spectrogram.data().slice(ndarray::s![.., min_bin..=max_bin]);
    let population: Vec<f64> = band.iter().copied().collect();
    let (lowest, highest) = min_max(&population)
        .ok_or_else(|| SonogramError::range("spectrogram has no columns to render"))?;

    let centre = if config.min_db.is_relative() || config.max_db.is_relative() {
        median(&population).unwrap_or(lowest)
    } else {
        0.0
    };
    let min_db = match config.min_db {
        DecibelBound::Extremum => lowest,
        DecibelBound::RelativeToMedian(offset) => centre + offset,
    };
    let max_db = match config.max_db {
        DecibelBound::Extremum => highest,
        DecibelBound::RelativeToMedian(offset) => centre + offset,
    };
    if max_db == min_db {
        log::warn!("Decibel range is empty ({:.1} dB), using the first palette color", min_db);
    }

    let width = spectrogram.column_count();
    let height = max_bin - min_bin + 1;
    let mut pixels = vec![0u8; width * height * 3];

    pixels
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            // top row holds the highest frequency
            let bin = max_bin - min_bin - y;
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let db = band[[x, bin]];
                let color = config.palette[palette_index(db, min_db, max_db, config.palette.len())];
                px.copy_from_slice(&color.0);
            }
        });

    let image = RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| SonogramError::processing("pixel buffer does not match image size"))?;

    let info = RenderInfo { min_frequency, max_frequency, min_db, max_db, min_bin, max_bin };
    log::debug!("Rendered {}x{}: {}", width, height, info);

    Ok(RenderResult { info, image })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Cell value = column * 100 + bin, so every cell is distinct.
    fn ramp(columns: usize, transform_size: usize) -> Spectrogram {
        let bins = transform_size / 2;
        let data = (0..columns)
            .map(|c| (0..bins).map(|b| (c * 100 + b) as f64).collect())
            .collect();
        Spectrogram::from_columns(8000, 1, transform_size, transform_size, data).unwrap()
    }

    fn grey_palette(n: usize) -> Vec<Color> {
        (0..n).map(|i| Rgb([i as u8, i as u8, i as u8])).collect()
    }

    #[test]
    fn test_default_bounds_cover_everything() {
        let spec = ramp(3, 16);
        let result = render(&spec, &RenderConfig::default()).unwrap();

        assert_eq!(result.info.min_frequency, 0.0);
        assert_eq!(result.info.max_frequency, 4000.0);
        assert_eq!((result.info.min_bin, result.info.max_bin), (0, 7));
        assert_eq!(result.info.min_db, 0.0);
        assert_eq!(result.info.max_db, 207.0);
        assert_eq!(result.image.dimensions(), (3, 8));
    }

    #[test]
    fn test_orientation_and_mapping() {
        let spec = Spectrogram::from_columns(8000, 1, 4, 4, vec![vec![0.0, 10.0], vec![10.0, 0.0]]).unwrap();
        let config = RenderConfig { palette: vec![Rgb([0, 0, 0]), Rgb([255, 255, 255])], ..Default::default() };
        let img = render(&spec, &config).unwrap().image;

        // lowest bin at the bottom row
        assert_eq!(*img.get_pixel(0, 1), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*img.get_pixel(1, 1), Rgb([255, 255, 255]));
        assert_eq!(*img.get_pixel(1, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_relative_decibels_around_median() {
        // population 0..=8, median 4
        let spec = Spectrogram::from_columns(8000, 1, 6, 6, vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0], vec![6.0, 7.0, 8.0]]).unwrap();
        let config = RenderConfig {
            min_db: DecibelBound::RelativeToMedian(-20.0),
            max_db: DecibelBound::RelativeToMedian(10.0),
            ..Default::default()
        };
        let info = render(&spec, &config).unwrap().info;
        assert_eq!(info.min_db, 4.0 - 20.0);
        assert_eq!(info.max_db, 4.0 + 10.0);

        let config = RenderConfig { max_db: DecibelBound::RelativeToMedian(1.0), ..Default::default() };
        let info = render(&spec, &config).unwrap().info;
        assert_eq!((info.min_db, info.max_db), (0.0, 5.0));
    }

    #[test]
    fn test_frequency_band_selection() {
        let spec = ramp(2, 16);
        let config = RenderConfig {
            min_frequency: FrequencyBound::Absolute(1000.0),
            max_frequency: FrequencyBound::Relative(0.5),
            ..Default::default()
        };
        let result = render(&spec, &config).unwrap();

        // 1000/4000*8 = 2, ceil(0.5*8) = 4
        assert_eq!((result.info.min_bin, result.info.max_bin), (2, 4));
        assert_eq!(result.info.max_frequency, 2000.0);
        assert_eq!(result.image.height(), 3);
        assert_eq!(result.info.min_db, 2.0);
        assert_eq!(result.info.max_db, 104.0);
    }

    #[test]
    fn test_max_bin_is_clamped() {
        assert_eq!(bin_range(0.0, 4000.0, 4000.0, 8), (0, 7));
        assert_eq!(bin_range(3999.0, 4000.0, 4000.0, 8), (7, 7));
    }

    #[test]
    fn test_invalid_frequency_bounds() {
        let spec = ramp(2, 16);
        let cases = [
            (FrequencyBound::Absolute(2000.0), FrequencyBound::Absolute(2000.0)),
            (FrequencyBound::Relative(0.8), FrequencyBound::Relative(0.2)),
            (FrequencyBound::Absolute(-1.0), FrequencyBound::Unset),
            (FrequencyBound::Unset, FrequencyBound::Absolute(4001.0)),
            (FrequencyBound::Relative(1.5), FrequencyBound::Unset),
            (FrequencyBound::Absolute(4000.0), FrequencyBound::Unset),
        ];
        for (min_frequency, max_frequency) in cases {
            let config = RenderConfig { min_frequency, max_frequency, ..Default::default() };
            assert!(
                matches!(render(&spec, &config), Err(SonogramError::InvalidRange { .. })),
                "{:?} / {:?}", min_frequency, max_frequency
            );
        }
    }

    #[test]
    fn test_exclusive_frequency_options() {
        assert!(matches!(
            FrequencyBound::from_options(Some(100.0), Some(0.1), ("min-freq", "relative-min-freq")),
            Err(SonogramError::MutuallyExclusive { first: "min-freq", .. })
        ));
        assert_eq!(
            FrequencyBound::from_options(None, Some(0.1), ("a", "b")).unwrap(),
            FrequencyBound::Relative(0.1)
        );
    }

    #[test]
    fn test_degenerate_decibel_range_uses_first_color() {
        let spec = Spectrogram::from_columns(8000, 1, 4, 4, vec![vec![-50.0, -50.0]]).unwrap();
        let config = RenderConfig { palette: grey_palette(16), ..Default::default() };
        let result = render(&spec, &config).unwrap();
        assert_eq!(result.info.min_db, result.info.max_db);
        assert!(result.image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_palette_index() {
        assert_eq!(palette_index(-100.0, -80.0, 0.0, 256), 0);
        assert_eq!(palette_index(10.0, -80.0, 0.0, 256), 255);
        assert_eq!(palette_index(-40.0, -80.0, 0.0, 256), 128);
        assert_eq!(palette_index(5.0, 5.0, 5.0, 256), 0);
        assert_eq!(palette_index(3.0, 0.0, 10.0, 1), 0);
    }

    #[test]
    fn test_inverted_decibel_window_clamps() {
        let spec = ramp(2, 8);
        let config = RenderConfig {
            min_db: DecibelBound::RelativeToMedian(10.0),
            max_db: DecibelBound::RelativeToMedian(-10.0),
            palette: grey_palette(4),
            ..Default::default()
        };
        let result = render(&spec, &config).unwrap();
        assert!(result.info.min_db > result.info.max_db);
        assert!(result.image.pixels().all(|p| *p == Rgb([3, 3, 3])));
    }

    #[test]
    fn test_empty_spectrogram() {
        let spec = Spectrogram::from_columns(8000, 1, 16, 16, Vec::new()).unwrap();
        assert!(matches!(render(&spec, &RenderConfig::default()), Err(SonogramError::InvalidRange { .. })));
    }

    #[test]
    fn test_empty_palette() {
        let config = RenderConfig { palette: Vec::new(), ..Default::default() };
        assert!(matches!(render(&ramp(1, 8), &config), Err(SonogramError::InvalidConfig { .. })));
    }
}
