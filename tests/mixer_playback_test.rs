//! Sounds rendered through the software mixer, without an output device

mod common;

use std::sync::Arc;

use spatial_sound::config::MixerConfig;
use spatial_sound::engine::{AudioBackend, Mixer, MixerBackend, OutputFormat, SourceState};
use spatial_sound::sound::Sound;
use spatial_sound::Vec3;

const RATE: u32 = 8000;

fn format() -> OutputFormat {
    OutputFormat {
        channels: 2,
        sample_rate: RATE,
    }
}

fn mixer() -> (Arc<dyn AudioBackend>, Mixer) {
    let (backend, mixer) = MixerBackend::new(&MixerConfig::default());
    (Arc::new(backend), mixer)
}

/// Value `common::int16_wav` writes for frame `i`, as a float sample.
fn fixture_sample(i: usize) -> f32 {
    (((i % 32) as i16 - 16) * 512) as f32 / 32768.0
}

fn render_frames(mixer: &mut Mixer, frames: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; frames * 2];
    mixer.render(&mut out, format());
    out.chunks(2).map(|frame| frame[0]).collect()
}

#[test]
fn test_play_runs_to_end_and_stops() {
    let (backend, mut mixer) = mixer();
    let fixture = common::int16_wav(2, RATE, 4);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    sound.play();
    let left = render_frames(&mut mixer, 8);

    for (i, sample) in left.iter().take(4).enumerate() {
        assert!((sample - fixture_sample(i)).abs() < 1e-6, "frame {i}");
    }
    assert_eq!(left[4], 0.0);
    assert_eq!(sound.state(), SourceState::Stopped);
}

#[test]
fn test_play_looping_wraps_until_stopped() {
    let (backend, mut mixer) = mixer();
    let fixture = common::int16_wav(2, RATE, 4);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    sound.play_looping();
    let left = render_frames(&mut mixer, 10);
    assert!((left[4] - fixture_sample(0)).abs() < 1e-6);
    assert!((left[9] - fixture_sample(1)).abs() < 1e-6);
    assert!(sound.is_playing());

    sound.stop();
    let left = render_frames(&mut mixer, 4);
    assert!(left.iter().all(|&s| s == 0.0));
    assert_eq!(sound.state(), SourceState::Stopped);
}

#[test]
fn test_play_after_stop_starts_from_beginning() {
    let (backend, mut mixer) = mixer();
    let fixture = common::int16_wav(2, RATE, 16);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    sound.play_looping();
    render_frames(&mut mixer, 5);
    sound.stop();
    sound.play();

    let left = render_frames(&mut mixer, 1);
    assert!((left[0] - fixture_sample(0)).abs() < 1e-6);
    assert!(!sound.is_looping());
}

#[test]
fn test_repeated_play_restarts_single_voice() {
    let (backend, mut mixer) = mixer();
    let fixture = common::int16_wav(2, RATE, 16);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    sound.play();
    render_frames(&mut mixer, 6);
    sound.play();

    let left = render_frames(&mut mixer, 1);
    assert!((left[0] - fixture_sample(0)).abs() < 1e-6);
    assert_eq!(mixer.active_voices(), 1);
}

#[test]
fn test_pause_holds_then_play_looping_resumes() {
    let (backend, mut mixer) = mixer();
    let fixture = common::int16_wav(2, RATE, 16);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    sound.play();
    render_frames(&mut mixer, 3);
    sound.pause();
    let silent = render_frames(&mut mixer, 3);
    assert!(silent.iter().all(|&s| s == 0.0));
    assert_eq!(sound.state(), SourceState::Paused);

    sound.play_looping();
    let left = render_frames(&mut mixer, 1);
    assert!((left[0] - fixture_sample(3)).abs() < 1e-6);
}

#[test]
fn test_spatial_sources_share_buffer_and_pan() {
    let (backend, mut mixer) = mixer();
    let fixture = common::int16_wav(1, RATE, 64);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    let right = sound.spatial(Vec3::new(1.0, 0.0, 0.0)).unwrap();
    right.play_looping();

    let mut out = vec![0.0f32; 8];
    mixer.render(&mut out, format());
    let (l, r) = (out[0].abs(), out[1].abs());
    assert!(r > l, "source on +x should be louder on the right ({l} vs {r})");

    drop(sound);
    mixer.render(&mut out, format());
    assert!(right.is_playing());
    assert!(out.iter().any(|&s| s != 0.0));
}

#[test]
fn test_dropping_looping_sound_under_back_pressure_silences_it() {
    let config = MixerConfig {
        command_queue_size: 16,
        ..MixerConfig::default()
    };
    let (backend, mut mixer) = MixerBackend::new(&config);
    let backend: Arc<dyn AudioBackend> = Arc::new(backend);
    let fixture = common::int16_wav(2, RATE, 64);
    let sound = Sound::load(backend, &fixture.path).unwrap();

    sound.play_looping();
    for _ in 0..32 {
        sound.set_gain(0.5);
    }
    drop(sound);

    let mut out = vec![0.0f32; 16];
    for _ in 0..5 {
        mixer.render(&mut out, format());
    }
    assert_eq!(mixer.active_voices(), 0);
    assert!(out.iter().all(|&s| s == 0.0));
}
