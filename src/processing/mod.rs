//! Spectrogram Processing Pipeline

pub mod processor;

pub use processor::{ProcessingResult, SpectrogramPipeline};
