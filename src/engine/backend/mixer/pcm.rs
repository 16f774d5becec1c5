//! Normalized sample storage for uploaded buffers

use crate::audio::BufferFormat;

/// Uploaded buffer converted to interleaved `f32` in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub format: BufferFormat,
    pub frequency: u32,
    samples: Vec<f32>,
}

impl PcmBuffer {
    /// Convert raw upload bytes. `data` must hold whole frames.
    pub fn from_bytes(format: BufferFormat, data: &[u8], frequency: u32) -> Self {
        let samples = match format.bits_per_sample() {
            8 => data.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
            _ => data
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
                .collect(),
        };

        Self {
            format,
            frequency,
            samples,
        }
    }

    pub fn channels(&self) -> usize {
        self.format.channels() as usize
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels()
    }

    fn frame(&self, index: usize) -> (f32, f32) {
        match self.channels() {
            1 => {
                let s = self.samples[index];
                (s, s)
            }
            _ => (self.samples[index * 2], self.samples[index * 2 + 1]),
        }
    }

    /// Left/right sample at a fractional frame position, linearly
    /// interpolated. Past the last frame the next frame is the first one when
    /// looping and the last one otherwise.
    ///
    /// `position` must be below `frames()`.
    pub fn sample_at(&self, position: f64, looping: bool) -> (f32, f32) {
        let frames = self.frames();
        let index = position.floor() as usize;
        let frac = (position - index as f64) as f32;

        let current = self.frame(index);
        if frac == 0.0 {
            return current;
        }

        let next_index = if index + 1 < frames {
            index + 1
        } else if looping {
            0
        } else {
            index
        };
        let next = self.frame(next_index);

        (
            current.0 + (next.0 - current.0) * frac,
            current.1 + (next.1 - current.1) * frac,
        )
    }
}
