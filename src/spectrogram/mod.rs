//! Spectrogram Module
//!
//! STFT analysis of decoded frames and color-mapped rendering of the result.

pub mod math;
pub mod palette;
pub mod render;
pub mod stft;
pub mod window;

pub use palette::{Color, ColorMap};
pub use render::{render, DecibelBound, FrequencyBound, RenderConfig, RenderInfo, RenderResult};
pub use stft::{generate, generate_from_frames, HopPolicy, Spectrogram, SpectrogramConfig};
pub use window::WindowFunction;
