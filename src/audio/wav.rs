//! WAV (RIFF / RIFX) container decoding

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use ndarray::Array2;

use crate::audio::{AudioInfo, AudioSource, Frames};
use crate::error::{Result, SonogramError};

pub const FORMAT_PCM: u16 = 0x0001;
pub const FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const FORMAT_ALAW: u16 = 0x0006;
pub const FORMAT_MULAW: u16 = 0x0007;
pub const FORMAT_EXTENSIBLE: u16 = 0xfffe;

const RIFF_CHUNK_ID: &[u8; 4] = b"RIFF";
const RIFX_CHUNK_ID: &[u8; 4] = b"RIFX";
const WAVE_FORMAT_ID: &[u8; 4] = b"WAVE";
const FMT_SUB_CHUNK_ID: &[u8; 4] = b"fmt ";
const FACT_SUB_CHUNK_ID: &[u8; 4] = b"fact";
const DATA_SUB_CHUNK_ID: &[u8; 4] = b"data";

/// Byte order declared by the container tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    pub fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    fn i16(self, b: [u8; 2]) -> i16 {
        self.u16(b) as i16
    }

    fn i32(self, b: [u8; 4]) -> i32 {
        self.u32(b) as i32
    }

    fn i64(self, b: [u8; 8]) -> i64 {
        match self {
            ByteOrder::Little => i64::from_le_bytes(b),
            ByteOrder::Big => i64::from_be_bytes(b),
        }
    }

    fn f32(self, b: [u8; 4]) -> f32 {
        f32::from_bits(self.u32(b))
    }

    fn f64(self, b: [u8; 8]) -> f64 {
        f64::from_bits(self.i64(b) as u64)
    }
}

/// Contents of the `fmt ` sub-chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveFmt {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// `None` when the chunk ends right after `bits_per_sample`.
    pub extra_params: Option<Vec<u8>>,
}

impl WaveFmt {
    pub fn info(&self) -> AudioInfo {
        AudioInfo {
            channels: self.channels as usize,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Format code carried in the sub-format GUID of a WAVE_FORMAT_EXTENSIBLE header.
    pub fn sub_format(&self, order: ByteOrder) -> Option<u16> {
        if self.audio_format != FORMAT_EXTENSIBLE {
            return None;
        }
        // valid bits (2) + channel mask (4), then the GUID whose first field holds the code
        let extra = self.extra_params.as_deref()?;
        let code = extra.get(6..8)?;
        Some(order.u16([code[0], code[1]]))
    }

    fn validate(&self) -> Result<()> {
        match self.audio_format {
            FORMAT_PCM | FORMAT_IEEE_FLOAT | FORMAT_ALAW | FORMAT_MULAW | FORMAT_EXTENSIBLE => {}
            other => {
                return Err(SonogramError::format(format!("unsupported audio format: 0x{:04x}", other)));
            }
        }

        if self.bits_per_sample < 8 || self.bits_per_sample > 64 || self.bits_per_sample % 8 != 0 {
            return Err(SonogramError::format(format!(
                "unsupported bits per sample: {}", self.bits_per_sample
            )));
        }

        if self.channels == 0 {
            return Err(SonogramError::format("channel count cannot be 0"));
        }
        if self.sample_rate == 0 {
            return Err(SonogramError::format("sample rate cannot be 0"));
        }

        let group = self.channels as usize * self.bytes_per_sample();
        if (self.block_align as usize) < group {
            return Err(SonogramError::format(format!(
                "block align {} too small for {} channel(s) of {} bits",
                self.block_align, self.channels, self.bits_per_sample
            )));
        }

        Ok(())
    }
}

/// Contents of the optional `fact` sub-chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFact {
    pub sample_length: u32,
}

/// How the bytes of one sample are turned into an amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Unsigned for 8 bits, two's complement otherwise.
    Integer,
    Float,
    ALaw,
    MuLaw,
}

impl SampleEncoding {
    fn resolve(fmt: &WaveFmt, order: ByteOrder) -> Result<Self> {
        let code = match fmt.sub_format(order) {
            Some(code) => code,
            None => fmt.audio_format,
        };

        let encoding = match code {
            FORMAT_IEEE_FLOAT => SampleEncoding::Float,
            FORMAT_ALAW => SampleEncoding::ALaw,
            FORMAT_MULAW => SampleEncoding::MuLaw,
            _ => SampleEncoding::Integer,
        };

        match (encoding, fmt.bits_per_sample) {
            (SampleEncoding::Float, 32 | 64) => Ok(encoding),
            (SampleEncoding::ALaw | SampleEncoding::MuLaw, 8) => Ok(encoding),
            (SampleEncoding::Integer, _) => Ok(encoding),
            (_, bits) => Err(SonogramError::format(format!(
                "unsupported bits per sample for {:?} data: {}", encoding, bits
            ))),
        }
    }

    fn decode(self, chunk: &[u8], order: ByteOrder) -> Result<f64> {
        match self {
            SampleEncoding::Integer => decode_sample(chunk, order),
            SampleEncoding::Float => decode_float_sample(chunk, order),
            SampleEncoding::ALaw => Ok(alaw_to_linear(chunk[0]) as f64 / i16::MAX as f64),
            SampleEncoding::MuLaw => Ok(mulaw_to_linear(chunk[0]) as f64 / i16::MAX as f64),
        }
    }
}

/// Normalize one integer sample to an amplitude in [-1, 1].
///
/// 8-bit samples are unsigned around a midpoint of 128. Wider samples are
/// two's complement; widths with no native integer type (3, 5, 6, 7 bytes)
/// are sign-extended to the next of 4 or 8 bytes before interpretation.
pub fn decode_sample(chunk: &[u8], order: ByteOrder) -> Result<f64> {
    let width = chunk.len();
    if width == 1 {
        return Ok((chunk[0] as f64 - 128.0) / u8::MAX as f64);
    }

    let padded_width = match width {
        2 => 2,
        3 | 4 => 4,
        5..=8 => 8,
        _ => {
            return Err(SonogramError::format(format!("unsupported bits per sample: {}", width * 8)));
        }
    };

    let most_significant = match order {
        ByteOrder::Big => chunk[0],
        ByteOrder::Little => chunk[width - 1],
    };
    let fill = if most_significant & 0x80 == 0x80 { 0xff } else { 0x00 };

    let mut padded = [fill; 8];
    match order {
        ByteOrder::Little => padded[..width].copy_from_slice(chunk),
        ByteOrder::Big => padded[padded_width - width..padded_width].copy_from_slice(chunk),
    }

    let value = match padded_width {
        2 => order.i16([padded[0], padded[1]]) as f64,
        4 => order.i32([padded[0], padded[1], padded[2], padded[3]]) as f64,
        _ => order.i64(padded) as f64,
    };

    let divisor = 2f64.powi(width as i32 * 8 - 1) - 1.0;
    // the most negative code lands just below -1.0
    Ok((value / divisor).clamp(-1.0, 1.0))
}

fn decode_float_sample(chunk: &[u8], order: ByteOrder) -> Result<f64> {
    match *chunk {
        [a, b, c, d] => Ok(order.f32([a, b, c, d]) as f64),
        [a, b, c, d, e, f, g, h] => Ok(order.f64([a, b, c, d, e, f, g, h])),
        _ => Err(SonogramError::format(format!("unsupported float width: {} bits", chunk.len() * 8))),
    }
}

/// ITU-T G.711 A-law expansion to 16-bit linear.
pub fn alaw_to_linear(value: u8) -> i16 {
    let a = value ^ 0x55;
    let exponent = (a >> 4) & 0x07;
    let mut sample = (((a & 0x0f) as i32) << 4) + 8;
    if exponent != 0 {
        sample = (sample + 0x100) << (exponent - 1);
    }
    if a & 0x80 != 0 { sample as i16 } else { -sample as i16 }
}

/// ITU-T G.711 µ-law expansion to 16-bit linear.
pub fn mulaw_to_linear(value: u8) -> i16 {
    let u = !value;
    let exponent = (u >> 4) & 0x07;
    let sample = (((((u & 0x0f) as i32) << 3) + 0x84) << exponent) - 0x84;
    if u & 0x80 != 0 { -sample as i16 } else { sample as i16 }
}

/// Header of a WAV container: everything up to and including `fmt `.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveHeader {
    pub byte_order: ByteOrder,
    pub fmt: WaveFmt,
}

impl WaveHeader {
    pub fn info(&self) -> AudioInfo {
        self.fmt.info()
    }
}

/// A fully decoded WAV container.
#[derive(Debug, Clone)]
pub struct Wave {
    pub byte_order: ByteOrder,
    pub fmt: WaveFmt,
    pub fact: Option<WaveFact>,
    pub frames: Frames,
}

struct ChunkReader<R> {
    reader: R,
    byte_order: ByteOrder,
}

impl<R: Read> ChunkReader<R> {
    fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        read_exact(&mut self.reader, &mut buf, what)?;
        Ok(buf)
    }

    fn read_u16(&mut self, what: &str) -> Result<u16> {
        Ok(self.byte_order.u16(self.read_array(what)?))
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        Ok(self.byte_order.u32(self.read_array(what)?))
    }

    fn read_sub_chunk_id_and_size(&mut self) -> Result<([u8; 4], u32)> {
        let id: [u8; 4] = self.read_array("sub-chunk ID")?;
        let size = self.read_u32("sub-chunk size")?;
        if size > i32::MAX as u32 {
            return Err(SonogramError::format(format!("{} sub-chunk size too big", tag(&id))));
        }
        Ok((id, size))
    }

    /// A reader bounded by the declared size of the current sub-chunk.
    fn sub_chunk(&mut self, size: u32) -> ChunkReader<io::Take<&mut R>> {
        ChunkReader {
            reader: self.reader.by_ref().take(size as u64),
            byte_order: self.byte_order,
        }
    }

    fn read_fmt_sub_chunk(&mut self, size: u32) -> Result<WaveFmt> {
        let mut body = self.sub_chunk(size);

        let audio_format = body.read_u16("audio format")?;
        let channels = body.read_u16("channel count")?;
        let sample_rate = body.read_u32("sample rate")?;
        let byte_rate = body.read_u32("byte rate")?;
        let block_align = body.read_u16("block align")?;
        let bits_per_sample = body.read_u16("bits per sample")?;

        let extra_params = if body.reader.limit() >= 2 {
            let extra_size = body.read_u16("extra param size")?;
            let mut extra = vec![0u8; extra_size as usize];
            read_exact(&mut body.reader, &mut extra, "extra params")?;
            Some(extra)
        } else {
            None
        };

        let skipped = body.skip_rest()?;
        if skipped > 0 {
            log::debug!("Skipped {} trailing byte(s) of fmt sub-chunk", skipped);
        }

        Ok(WaveFmt {
            audio_format,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
            extra_params,
        })
    }

    fn read_fact_sub_chunk(&mut self, size: u32) -> Result<WaveFact> {
        let mut body = self.sub_chunk(size);
        let sample_length = body.read_u32("fact sample length")?;
        body.skip_rest()?;
        Ok(WaveFact { sample_length })
    }

    fn read_data_sub_chunk(&mut self, size: u32, fmt: &WaveFmt, encoding: SampleEncoding) -> Result<Frames> {
        let mut payload = Vec::with_capacity((size as usize).min(1 << 26));
        self.reader
            .by_ref()
            .take(size as u64)
            .read_to_end(&mut payload)?;

        let block_align = fmt.block_align as usize;
        let channels = fmt.channels as usize;
        let bytes_per_sample = fmt.bytes_per_sample();

        let groups = payload.chunks_exact(block_align);
        let dropped = groups.remainder().len();
        if dropped > 0 {
            log::warn!("Dropped {} byte(s) of incomplete trailing sample group", dropped);
        }

        let frame_count = groups.len();
        let mut samples = Vec::with_capacity(frame_count * channels);
        for group in groups {
            for chunk in group.chunks_exact(bytes_per_sample).take(channels) {
                samples.push(encoding.decode(chunk, self.byte_order)?);
            }
        }

        Array2::from_shape_vec((frame_count, channels), samples)
            .map_err(|e| SonogramError::processing(format!("Frame matrix: {}", e)))
    }
}

impl<R: Read> ChunkReader<io::Take<R>> {
    fn skip_rest(&mut self) -> Result<u64> {
        Ok(io::copy(&mut self.reader, &mut io::sink())?)
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            SonogramError::format(format!("unexpected end of stream while reading {}", what))
        }
        _ => SonogramError::from(e),
    })
}

fn tag(id: &[u8]) -> String {
    String::from_utf8_lossy(id).into_owned()
}

/// Parse the container up to the `fmt ` sub-chunk, returning a reader
/// positioned right after it.
fn read_container_header<R: Read>(mut reader: R) -> Result<(ChunkReader<io::Take<R>>, WaveFmt)> {
    let mut chunk_id = [0u8; 4];
    read_exact(&mut reader, &mut chunk_id, "chunk ID")?;

    let byte_order = if &chunk_id == RIFF_CHUNK_ID {
        ByteOrder::Little
    } else if &chunk_id == RIFX_CHUNK_ID {
        ByteOrder::Big
    } else {
        return Err(SonogramError::format(format!("unknown chunk ID: {}", tag(&chunk_id))));
    };

    let mut size = [0u8; 4];
    read_exact(&mut reader, &mut size, "chunk size")?;
    let chunk_size = byte_order.u32(size);
    if chunk_size > i32::MAX as u32 {
        return Err(SonogramError::format(format!("{} chunk size too big", tag(&chunk_id))));
    }

    let mut riff = ChunkReader {
        reader: reader.take(chunk_size as u64),
        byte_order,
    };

    let format_id: [u8; 4] = riff.read_array("format ID")?;
    if &format_id != WAVE_FORMAT_ID {
        return Err(SonogramError::format(format!("unknown format ID: {}", tag(&format_id))));
    }

    let (id, size) = riff.read_sub_chunk_id_and_size()?;
    if &id != FMT_SUB_CHUNK_ID {
        return Err(SonogramError::format(format!(
            "expected sub-chunk {}, found sub-chunk {}", tag(FMT_SUB_CHUNK_ID), tag(&id)
        )));
    }
    let fmt = riff.read_fmt_sub_chunk(size)?;

    Ok((riff, fmt))
}

/// Read only the container header and format description.
pub fn read_header<R: Read>(reader: R) -> Result<WaveHeader> {
    let (riff, fmt) = read_container_header(reader)?;
    Ok(WaveHeader { byte_order: riff.byte_order, fmt })
}

/// Decode a complete WAV container.
pub fn read_wave<R: Read>(reader: R) -> Result<Wave> {
    let (mut riff, fmt) = read_container_header(reader)?;
    fmt.validate()?;
    let encoding = SampleEncoding::resolve(&fmt, riff.byte_order)?;

    let (mut id, mut size) = riff.read_sub_chunk_id_and_size()?;
    let mut fact = None;
    if &id == FACT_SUB_CHUNK_ID {
        fact = Some(riff.read_fact_sub_chunk(size)?);
        (id, size) = riff.read_sub_chunk_id_and_size()?;
    }

    if &id != DATA_SUB_CHUNK_ID {
        return Err(SonogramError::format(format!(
            "expected sub-chunk {}, found sub-chunk {}", tag(DATA_SUB_CHUNK_ID), tag(&id)
        )));
    }

    let frames = riff.read_data_sub_chunk(size, &fmt, encoding)?;
    log::debug!(
        "Decoded {} frame(s), format 0x{:04x} as {:?}, {:?} endian",
        frames.nrows(), fmt.audio_format, encoding, riff.byte_order
    );

    Ok(Wave { byte_order: riff.byte_order, fmt, fact, frames })
}

pub fn read_header_from_file<P: AsRef<Path>>(path: P) -> Result<WaveHeader> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| SonogramError::io(format!("Cannot open audio file {}: {}", path.display(), e)))?;
    read_header(BufReader::new(file))
}

/// WAV file as an [`AudioSource`].
#[derive(Debug, Clone)]
pub struct WavSource {
    wave: Wave,
}

impl WavSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SonogramError::io(format!("Cannot open audio file {}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self { wave: read_wave(reader)? })
    }

    pub fn wave(&self) -> &Wave {
        &self.wave
    }
}

impl AudioSource for WavSource {
    fn info(&self) -> AudioInfo {
        self.wave.fmt.info()
    }

    fn frames(&self) -> &Frames {
        &self.wave.frames
    }
}
