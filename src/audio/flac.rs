//! FLAC decoding through claxon

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use claxon::FlacReader;
use ndarray::Array2;

use crate::audio::{AudioInfo, AudioSource, Frames};
use crate::error::{Result, SonogramError};

#[derive(Debug, Clone)]
pub struct FlacSource {
    info: AudioInfo,
    frames: Frames,
}

fn stream_info<R: Read>(reader: &FlacReader<R>) -> AudioInfo {
    let streaminfo = reader.streaminfo();
    AudioInfo {
        channels: streaminfo.channels as usize,
        sample_rate: streaminfo.sample_rate,
        bits_per_sample: streaminfo.bits_per_sample as u16,
    }
}

impl FlacSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SonogramError::io(format!("Cannot open audio file {}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = FlacReader::new(reader)?;
        let info = stream_info(&reader);
        if info.channels == 0 || info.sample_rate == 0 {
            return Err(SonogramError::format(format!("invalid FLAC stream info: {}", info)));
        }

        let scale = 1.0 / (1u64 << (info.bits_per_sample - 1)) as f64;
        let samples = reader
            .samples()
            .map(|s| s.map(|v| v as f64 * scale))
            .collect::<std::result::Result<Vec<f64>, claxon::Error>>()?;

        let frame_count = samples.len() / info.channels;
        let mut samples = samples;
        samples.truncate(frame_count * info.channels);
        let frames = Array2::from_shape_vec((frame_count, info.channels), samples)
            .map_err(|e| SonogramError::processing(format!("Frame matrix: {}", e)))?;

        log::debug!("Decoded {} FLAC frame(s): {}", frame_count, info);
        Ok(Self { info, frames })
    }
}

impl AudioSource for FlacSource {
    fn info(&self) -> AudioInfo {
        self.info
    }

    fn frames(&self) -> &Frames {
        &self.frames
    }
}

/// Read STREAMINFO without decoding any audio.
pub fn probe_file<P: AsRef<Path>>(path: P) -> Result<AudioInfo> {
    let reader = FlacReader::open(path.as_ref())?;
    Ok(stream_info(&reader))
}
