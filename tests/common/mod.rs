//! WAV fixtures written with hound into temporary directories.
#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// A WAV file that lives as long as its directory.
pub struct WavFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

fn write_wav<F>(spec: hound::WavSpec, write: F) -> WavFixture
where
    F: FnOnce(&mut hound::WavWriter<std::io::BufWriter<std::fs::File>>),
{
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("fixture.wav");
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    write(&mut writer);
    writer.finalize().expect("finalize wav");
    WavFixture { _dir: dir, path }
}

/// 16-bit integer samples, `frames` per channel, all channels identical.
pub fn int16_wav(channels: u16, sample_rate: u32, frames: usize) -> WavFixture {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    write_wav(spec, |writer| {
        for i in 0..frames {
            let value = ((i % 32) as i16 - 16) * 512;
            for _ in 0..channels {
                writer.write_sample(value).expect("write sample");
            }
        }
    })
}

pub fn int8_wav(channels: u16, sample_rate: u32, frames: usize) -> WavFixture {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    write_wav(spec, |writer| {
        for i in 0..frames {
            let value = (i % 64) as i8 - 32;
            for _ in 0..channels {
                writer.write_sample(value).expect("write sample");
            }
        }
    })
}

pub fn float32_wav(channels: u16, sample_rate: u32, frames: usize) -> WavFixture {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    write_wav(spec, |writer| {
        for i in 0..frames {
            let value = (i as f32 * 0.01).sin();
            for _ in 0..channels {
                writer.write_sample(value).expect("write sample");
            }
        }
    })
}

/// A file that is not a WAV at all.
pub fn garbage_file() -> WavFixture {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("garbage.wav");
    std::fs::write(&path, b"definitely not RIFF data").expect("write garbage");
    WavFixture { _dir: dir, path }
}
