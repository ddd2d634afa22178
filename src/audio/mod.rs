//! Audio Decoding Module
//!
//! Decodes audio containers into a uniform frame model: a `frames x channels`
//! matrix of normalized amplitudes plus the format metadata shared by all frames.
//! WAV (RIFF/RIFX) is decoded natively, FLAC through `claxon`.

pub mod flac;
pub mod wav;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::error::{Result, SonogramError};

pub use flac::FlacSource;
pub use wav::{ByteOrder, Wave, WaveFact, WaveFmt, WavSource};

/// Decoded samples, one row per frame and one column per channel.
pub type Frames = Array2<f64>;

/// Format metadata shared by every frame of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub channels: usize,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioInfo {
    /// Duration in seconds of `frame_count` frames.
    pub fn duration(&self, frame_count: usize) -> f64 {
        frame_count as f64 / self.sample_rate as f64
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }
}

impl std::fmt::Display for AudioInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz, {} ch, {} bit", self.sample_rate, self.channels, self.bits_per_sample)
    }
}

/// Anything that can feed the spectrogram engine.
pub trait AudioSource {
    fn info(&self) -> AudioInfo;
    fn frames(&self) -> &Frames;

    fn frame_count(&self) -> usize {
        self.frames().nrows()
    }

    fn duration(&self) -> f64 {
        self.info().duration(self.frame_count())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Wav,
    Flac,
}

impl ContainerKind {
    /// Identify a container from its leading magic bytes.
    pub fn sniff(magic: &[u8]) -> Option<Self> {
        match magic {
            [b'R', b'I', b'F', b'F', ..] | [b'R', b'I', b'F', b'X', ..] => Some(Self::Wav),
            [b'f', b'L', b'a', b'C', ..] => Some(Self::Flac),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Wav => "wav",
            ContainerKind::Flac => "flac",
        }
    }
}

fn sniff_file(path: &Path) -> Result<ContainerKind> {
    let mut file = File::open(path)
        .map_err(|e| SonogramError::io(format!("Cannot open audio file {}: {}", path.display(), e)))?;
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    ContainerKind::sniff(&magic[..filled]).ok_or_else(|| {
        SonogramError::unsupported(format!("Unrecognized audio container: {}", path.display()))
    })
}

/// Open and fully decode an audio file, picking the decoder from its magic bytes.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn AudioSource + Send + Sync>> {
    let path = path.as_ref();
    let kind = sniff_file(path)?;
    log::debug!("Detected {} container: {}", kind.name(), path.display());

    Ok(match kind {
        ContainerKind::Wav => Box::new(WavSource::from_file(path)?),
        ContainerKind::Flac => Box::new(FlacSource::from_file(path)?),
    })
}

/// Read only the format metadata of an audio file.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<AudioInfo> {
    let path = path.as_ref();
    match sniff_file(path)? {
        ContainerKind::Wav => Ok(wav::read_header_from_file(path)?.info()),
        ContainerKind::Flac => flac::probe_file(path),
    }
}
