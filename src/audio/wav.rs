//! WAV decoding
//!
//! Decodes RIFF/WAVE files through `hound` into raw interleaved PCM bytes in
//! the layout an audio buffer upload expects:
//! - 8-bit samples as unsigned bytes (silence = 128)
//! - wider integer and float samples as little-endian words
//!
//! Decoding never rejects a sample format the container can describe; format
//! policy lives in [`crate::audio::format`].

use std::io::{Cursor, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SoundError;

/// Numeric representation of the stored samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    Int,
    Float,
}

/// Header information of a decoded WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub sample_format: SampleEncoding,
}

impl WavInfo {
    /// Bytes one sample occupies in the decoded data
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }
}

/// Decoded PCM data plus its header
#[derive(Debug, Clone)]
pub struct DecodedWav {
    pub info: WavInfo,
    pub data: Vec<u8>,
}

impl DecodedWav {
    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        let frame_size = self.info.bytes_per_sample() * self.info.channels as usize;
        if frame_size == 0 {
            return 0;
        }
        self.data.len() / frame_size
    }

    /// Playback length at the declared sample rate
    pub fn duration_ms(&self) -> u64 {
        if self.info.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1_000 / self.info.sample_rate as u64
    }
}

/// Decode a WAV file from disk.
///
/// # Errors
/// `SoundError::LoadFailed` if the file is missing, unreadable or malformed.
pub fn decode_wav<P: AsRef<Path>>(path: P) -> Result<DecodedWav, SoundError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let reader = hound::WavReader::open(path).map_err(|err| load_failed(&origin, err))?;
    read_samples(reader, &origin)
}

/// Decode a WAV image held in memory.
///
/// # Errors
/// `SoundError::LoadFailed` if the bytes are not a readable WAV image.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<DecodedWav, SoundError> {
    let origin = "<memory>";
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|err| load_failed(origin, err))?;
    read_samples(reader, origin)
}

fn load_failed(origin: &str, err: hound::Error) -> SoundError {
    SoundError::LoadFailed {
        path: origin.to_string(),
        reason: err.to_string(),
    }
}

fn read_samples<R: Read>(
    mut reader: hound::WavReader<R>,
    origin: &str,
) -> Result<DecodedWav, SoundError> {
    let spec = reader.spec();
    let info = WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        sample_format: match spec.sample_format {
            hound::SampleFormat::Int => SampleEncoding::Int,
            hound::SampleFormat::Float => SampleEncoding::Float,
        },
    };
    if info.channels == 0 {
        return Err(SoundError::LoadFailed {
            path: origin.to_string(),
            reason: "zero channels".to_string(),
        });
    }

    let capacity = reader.len() as usize * info.bytes_per_sample();
    let mut data = Vec::with_capacity(capacity);

    match (info.sample_format, info.bits_per_sample) {
        // hound hands 8-bit samples back signed; buffers take them unsigned
        (SampleEncoding::Int, 8) => {
            collect(&mut reader, origin, &mut data, |v: i8, out| {
                out.push((v as i16 + 128) as u8)
            })?
        }
        (SampleEncoding::Int, 16) => collect(&mut reader, origin, &mut data, |v: i16, out| {
            out.extend_from_slice(&v.to_le_bytes())
        })?,
        (SampleEncoding::Int, 24) => collect(&mut reader, origin, &mut data, |v: i32, out| {
            out.extend_from_slice(&v.to_le_bytes()[..3])
        })?,
        (SampleEncoding::Int, _) => collect(&mut reader, origin, &mut data, |v: i32, out| {
            out.extend_from_slice(&v.to_le_bytes())
        })?,
        (SampleEncoding::Float, _) => collect(&mut reader, origin, &mut data, |v: f32, out| {
            out.extend_from_slice(&v.to_le_bytes())
        })?,
    }

    log::debug!(
        "[Wav] Decoded {}: {} ch, {} Hz, {}-bit {:?}, {} bytes",
        origin,
        info.channels,
        info.sample_rate,
        info.bits_per_sample,
        info.sample_format,
        data.len()
    );

    Ok(DecodedWav { info, data })
}

fn collect<R, S, F>(
    reader: &mut hound::WavReader<R>,
    origin: &str,
    data: &mut Vec<u8>,
    mut push: F,
) -> Result<(), SoundError>
where
    R: Read,
    S: hound::Sample,
    F: FnMut(S, &mut Vec<u8>),
{
    for sample in reader.samples::<S>() {
        let sample = sample.map_err(|err| SoundError::LoadFailed {
            path: origin.to_string(),
            reason: format!("error reading samples: {err}"),
        })?;
        push(sample, data);
    }
    Ok(())
}
