//! File-to-image pipeline: decode, analyse, render, save

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::audio::{self, AudioInfo};
use crate::config::Config;
use crate::error::{Result, SonogramError};
use crate::output;
use crate::spectrogram::{self, RenderConfig, RenderInfo, SpectrogramConfig};

pub struct SpectrogramPipeline {
    config: Config,
    analysis: SpectrogramConfig,
    render: RenderConfig,
    pool: ThreadPool,
}

impl SpectrogramPipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let analysis = config.to_spectrogram_config()?;
        let render = config.to_render_config()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads())
            .build()
            .map_err(|e| SonogramError::processing(format!("Failed to build thread pool: {}", e)))?;

        log::debug!(
            "Pipeline ready: fft {} ({:?}, {}), {} threads",
            analysis.transform_size, analysis.hop, analysis.window, config.threads()
        );

        Ok(Self { config, analysis, render, pool })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn process_file(&self, input_path: &Path, output_path: &Path) -> Result<ProcessingResult> {
        let start_time = Instant::now();

        output::image_format_for(output_path)?;

        log::info!("Processing: {}", input_path.display());
        let source = audio::open(input_path)?;
        let audio_info = source.info();
        let frame_count = source.frame_count();
        log::info!("Audio: {:.2}s, {}", source.duration(), audio_info);

        let (spectrogram, rendered) = self.pool.install(|| -> Result<_> {
            let spectrogram = spectrogram::generate(&*source, &self.analysis)?;
            log::debug!(
                "Spectrogram: {} columns x {} bins, hop {}",
                spectrogram.column_count(), spectrogram.bin_count(), spectrogram.hop
            );
            let rendered = spectrogram::render(&spectrogram, &self.render)?;
            Ok((spectrogram, rendered))
        })?;
        log::debug!("Rendered: {}", rendered.info);

        output::save_image(&rendered.image, output_path)?;
        log::info!("Saved: {}", output_path.display());

        Ok(ProcessingResult {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            audio_info,
            frame_count,
            column_count: spectrogram.column_count(),
            image_size: rendered.image.dimensions(),
            render_info: rendered.info,
            processing_time: start_time.elapsed(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub audio_info: AudioInfo,
    pub frame_count: usize,
    pub column_count: usize,
    /// (width, height) in pixels.
    pub image_size: (u32, u32),
    pub render_info: RenderInfo,
    pub processing_time: Duration,
}

impl ProcessingResult {
    /// Processing time divided by audio duration.
    pub fn real_time_factor(&self) -> f64 {
        let duration = self.audio_info.duration(self.frame_count);
        if duration > 0.0 {
            self.processing_time.as_secs_f64() / duration
        } else {
            0.0
        }
    }
}
