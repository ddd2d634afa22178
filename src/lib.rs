//! Sonogram - Audio Spectrogram Rendering Library
//!
//! Decodes WAV and FLAC audio, computes a short-time Fourier transform and
//! renders the decibel magnitudes as a color-mapped image.

pub mod audio;
pub mod config;
pub mod error;
pub mod output;
pub mod processing;
pub mod spectrogram;

pub use config::{Args, Config};
pub use error::{Result, SonogramError};
pub use processing::{ProcessingResult, SpectrogramPipeline};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const GIT_COMMIT: Option<&str> = option_env!("SONOGRAM_GIT_COMMIT");

/// Initialise `env_logger`; `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .parse_default_env()
        .try_init()
        .ok();
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        name: NAME,
        version: VERSION,
        description: DESCRIPTION,
        commit: GIT_COMMIT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub commit: Option<&'static str>,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{}", self.name, self.version)?;
        if let Some(commit) = self.commit {
            write!(f, " ({})", commit)?;
        }
        write!(f, " - {}", self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.name, "sonogram");
        assert_eq!(info.version, VERSION);
        assert!(info.to_string().starts_with("sonogram v"));
    }
}
