//! Configuration management for spectrogram rendering

use crate::error::{Result, SonogramError};
use crate::spectrogram::{
    ColorMap, DecibelBound, FrequencyBound, HopPolicy, RenderConfig, SpectrogramConfig, WindowFunction,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overlap used when neither `overlap` nor `segments` is configured.
pub const DEFAULT_OVERLAP: usize = 768;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spectrogram: AnalysisSettings,
    pub render: RenderSettings,
    pub processing: ProcessingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub channel: usize,
    pub fft_samples: usize,
    /// Unset with `segments` also unset means [`DEFAULT_OVERLAP`].
    pub overlap: Option<usize>,
    pub segments: Option<usize>,
    pub window: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub min_freq: Option<f64>,
    pub max_freq: Option<f64>,
    pub relative_min_freq: Option<f64>,
    pub relative_max_freq: Option<f64>,
    pub relative_min_db: Option<f64>,
    pub relative_max_db: Option<f64>,
    pub color_map: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    pub threads: usize,
    pub verbose: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            channel: 0,
            fft_samples: 1024,
            overlap: None,
            segments: None,
            window: WindowFunction::default().name().to_string(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            min_freq: None,
            max_freq: None,
            relative_min_freq: None,
            relative_max_freq: None,
            relative_min_db: None,
            relative_max_db: None,
            color_map: ColorMap::default().name().to_string(),
        }
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            verbose: false,
        }
    }
}

impl Config {
    /// Get worker thread count (convenience method)
    pub fn threads(&self) -> usize {
        self.processing.threads
    }

    /// Get verbose mode (convenience method)
    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }

    pub fn window(&self) -> Result<WindowFunction> {
        self.spectrogram.window.parse()
    }

    pub fn color_map(&self) -> Result<ColorMap> {
        self.render.color_map.parse()
    }

    /// Overlap after applying the default.
    pub fn effective_overlap(&self) -> Option<usize> {
        let s = &self.spectrogram;
        match (s.overlap, s.segments) {
            (None, None) => Some(DEFAULT_OVERLAP),
            (overlap, _) => overlap,
        }
    }

    /// Analysis settings for the STFT engine.
    pub fn to_spectrogram_config(&self) -> Result<SpectrogramConfig> {
        let s = &self.spectrogram;
        Ok(SpectrogramConfig {
            channel: s.channel,
            transform_size: s.fft_samples,
            hop: HopPolicy::from_options(self.effective_overlap(), s.segments)?,
            window: self.window()?,
        })
    }

    /// Band, decibel window and palette for the renderer.
    pub fn to_render_config(&self) -> Result<RenderConfig> {
        let r = &self.render;
        Ok(RenderConfig {
            min_frequency: FrequencyBound::from_options(
                r.min_freq,
                r.relative_min_freq,
                ("min-freq", "relative-min-freq"),
            )?,
            max_frequency: FrequencyBound::from_options(
                r.max_freq,
                r.relative_max_freq,
                ("max-freq", "relative-max-freq"),
            )?,
            min_db: DecibelBound::from_option(r.relative_min_db),
            max_db: DecibelBound::from_option(r.relative_max_db),
            palette: self.color_map()?.palette(),
        })
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sonogram", about = "Render audio files as spectrogram images", version, author)]
pub struct Args {
    #[arg(value_name = "INPUT", required_unless_present = "list", help = "Input audio file (WAV or FLAC)")]
    pub input: Option<PathBuf>,

    #[arg(value_name = "OUTPUT", help = "Output image file (.png, .jpg, .jpeg)")]
    pub output: Option<PathBuf>,

    #[arg(long = "channel", help = "Channel to analyse (0-based)")]
    pub channel: Option<usize>,

    #[arg(long = "fft-samples", help = "Transform size in frames (power of 2)")]
    pub fft_samples: Option<usize>,

    #[arg(long = "overlap", help = "Frames shared by consecutive windows")]
    pub overlap: Option<usize>,

    #[arg(long = "segments", help = "Number of windows spread across the signal")]
    pub segments: Option<usize>,

    #[arg(long = "window-func", help = "Window function name (see --list)")]
    pub window_func: Option<String>,

    #[arg(long = "min-freq", help = "Lowest rendered frequency (Hz)")]
    pub min_freq: Option<f64>,

    #[arg(long = "max-freq", help = "Highest rendered frequency (Hz)")]
    pub max_freq: Option<f64>,

    #[arg(long = "relative-min-freq", help = "Lowest rendered frequency as a fraction of Nyquist")]
    pub relative_min_freq: Option<f64>,

    #[arg(long = "relative-max-freq", help = "Highest rendered frequency as a fraction of Nyquist")]
    pub relative_max_freq: Option<f64>,

    #[arg(long = "relative-min-db", allow_negative_numbers = true, help = "Lower dB bound as an offset from the median")]
    pub relative_min_db: Option<f64>,

    #[arg(long = "relative-max-db", allow_negative_numbers = true, help = "Upper dB bound as an offset from the median")]
    pub relative_max_db: Option<f64>,

    #[arg(long = "color-map", help = "Color map name (see --list)")]
    pub color_map: Option<String>,

    #[arg(long = "threads", help = "Worker thread count")]
    pub threads: Option<usize>,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "probe", help = "Print the audio format and exit")]
    pub probe: bool,

    #[arg(long = "list", help = "List window functions and color maps")]
    pub list: bool,
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_args_and_config(&args)
    }

    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: &Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        let s = &mut config.spectrogram;
        if let Some(channel) = args.channel {
            s.channel = channel;
        }
        if let Some(fft_samples) = args.fft_samples {
            s.fft_samples = fft_samples;
        }
        if args.overlap.is_some() {
            s.overlap = args.overlap;
        }
        if args.segments.is_some() {
            s.segments = args.segments;
            // a file overlap gives way to segments from the command line
            if args.overlap.is_none() {
                s.overlap = None;
            }
        }
        if let Some(window) = &args.window_func {
            s.window = window.clone();
        }

        let r = &mut config.render;
        if args.min_freq.is_some() {
            r.min_freq = args.min_freq;
        }
        if args.max_freq.is_some() {
            r.max_freq = args.max_freq;
        }
        if args.relative_min_freq.is_some() {
            r.relative_min_freq = args.relative_min_freq;
        }
        if args.relative_max_freq.is_some() {
            r.relative_max_freq = args.relative_max_freq;
        }
        if args.relative_min_db.is_some() {
            r.relative_min_db = args.relative_min_db;
        }
        if args.relative_max_db.is_some() {
            r.relative_max_db = args.relative_max_db;
        }
        if let Some(color_map) = &args.color_map {
            r.color_map = color_map.clone();
        }

        if let Some(threads) = args.threads {
            config.processing.threads = threads;
        }
        config.processing.verbose |= args.verbose;

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SonogramError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SonogramError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        self.to_spectrogram_config()?.validate()?;
        self.to_render_config()?;

        if self.processing.threads == 0 {
            return Err(SonogramError::config("Thread count must be greater than 0"));
        }
        if self.processing.threads > num_cpus::get() * 2 {
            return Err(SonogramError::config("Thread count cannot exceed 2x logical CPU cores"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SonogramError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SonogramError::config(format!("Failed to write config file: {}", e)))
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}
