//! Mapping from decoded WAV layouts to backend buffer formats

use serde::{Deserialize, Serialize};

use super::wav::{SampleEncoding, WavInfo};
use crate::error::SoundError;

/// Sample layouts a backend buffer accepts.
///
/// 8-bit data is unsigned, 16-bit data is signed little-endian, channels are
/// interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferFormat {
    Mono8,
    Stereo8,
    Mono16,
    Stereo16,
}

impl BufferFormat {
    pub const ALL: [BufferFormat; 4] = [
        BufferFormat::Mono8,
        BufferFormat::Stereo8,
        BufferFormat::Mono16,
        BufferFormat::Stereo16,
    ];

    pub fn channels(self) -> u16 {
        match self {
            BufferFormat::Mono8 | BufferFormat::Mono16 => 1,
            BufferFormat::Stereo8 | BufferFormat::Stereo16 => 2,
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        match self {
            BufferFormat::Mono8 | BufferFormat::Stereo8 => 8,
            BufferFormat::Mono16 | BufferFormat::Stereo16 => 16,
        }
    }

    /// Bytes per interleaved frame
    pub fn frame_size(self) -> usize {
        self.channels() as usize * self.bits_per_sample() as usize / 8
    }

    /// Buffer format for a decoded WAV header.
    ///
    /// # Errors
    /// `SoundError::UnsupportedFormat` for anything other than 8/16-bit
    /// integer samples with one or two channels.
    pub fn from_wav(info: &WavInfo) -> Result<Self, SoundError> {
        map_format(info.sample_format, info.bits_per_sample, info.channels)
    }
}

/// Pure mapping of (encoding, bit depth, channel count) to a buffer format.
pub fn map_format(
    encoding: SampleEncoding,
    bits_per_sample: u16,
    channels: u16,
) -> Result<BufferFormat, SoundError> {
    let format = match (encoding, bits_per_sample, channels) {
        (SampleEncoding::Int, 8, 1) => Some(BufferFormat::Mono8),
        (SampleEncoding::Int, 8, 2) => Some(BufferFormat::Stereo8),
        (SampleEncoding::Int, 16, 1) => Some(BufferFormat::Mono16),
        (SampleEncoding::Int, 16, 2) => Some(BufferFormat::Stereo16),
        _ => None,
    };

    format.ok_or(SoundError::UnsupportedFormat {
        bits_per_sample,
        channels,
        float: encoding == SampleEncoding::Float,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_valid_combinations() {
        let mut valid = Vec::new();
        for encoding in [SampleEncoding::Int, SampleEncoding::Float] {
            for bits in [8u16, 16, 24, 32, 64] {
                for channels in 0u16..=8 {
                    if let Ok(format) = map_format(encoding, bits, channels) {
                        assert_eq!(format.bits_per_sample(), bits);
                        assert_eq!(format.channels(), channels);
                        valid.push(format);
                    }
                }
            }
        }
        assert_eq!(valid, BufferFormat::ALL.to_vec());
    }

    #[test]
    fn test_stereo8_mapping() {
        assert_eq!(
            map_format(SampleEncoding::Int, 8, 2),
            Ok(BufferFormat::Stereo8)
        );
    }

    #[test]
    fn test_float_is_unsupported() {
        assert_eq!(
            map_format(SampleEncoding::Float, 32, 1),
            Err(SoundError::UnsupportedFormat {
                bits_per_sample: 32,
                channels: 1,
                float: true
            })
        );
    }

    #[test]
    fn test_surround_is_unsupported() {
        assert!(map_format(SampleEncoding::Int, 16, 6).is_err());
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(BufferFormat::Mono8.frame_size(), 1);
        assert_eq!(BufferFormat::Stereo8.frame_size(), 2);
        assert_eq!(BufferFormat::Mono16.frame_size(), 2);
        assert_eq!(BufferFormat::Stereo16.frame_size(), 4);
    }

    #[test]
    fn test_from_wav_header() {
        let info = WavInfo {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleEncoding::Int,
        };
        assert_eq!(BufferFormat::from_wav(&info), Ok(BufferFormat::Mono16));
    }
}
