//! Mixer - render side of the software backend
//!
//! Owned by whichever thread produces output (the cpal callback on desktop,
//! the test itself in unit tests). Each `render` call:
//! 1. drains pending commands from the control side
//! 2. mixes every playing voice into the interleaved output block
//! 3. applies master gain and clamps to [-1.0, 1.0]
//!
//! Real-time notes:
//! - No locks; all communication goes through rtrb queues
//! - Buffers the renderer lets go of are sent back to the control thread
//!   instead of being freed here
//! - The voice map is sized up front from `MixerConfig::max_voices`

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

use glam::Vec3;
use rtrb::{Consumer, Producer};

use super::pcm::PcmBuffer;
use super::queue::{MixerCommand, MixerEvent, VoiceParams};
use crate::config::MixerConfig;
use crate::engine::backend::{SourceId, SourceState};

/// Layout of the output block handed to [`Mixer::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

struct Voice {
    buffer: Option<Arc<PcmBuffer>>,
    params: VoiceParams,
    state: SourceState,
    /// Fractional read position in buffer frames
    cursor: f64,
    generation: u64,
}

impl Voice {
    fn new() -> Self {
        Self {
            buffer: None,
            params: VoiceParams::default(),
            state: SourceState::Initial,
            cursor: 0.0,
            generation: 0,
        }
    }
}

/// Distance attenuation and panning for mono voices, listener at the origin
/// facing -Z.
#[derive(Debug, Clone, Copy)]
struct Spatializer {
    reference_distance: f32,
    rolloff_factor: f32,
}

impl Spatializer {
    /// Inverse distance clamped attenuation plus equal-power pan on x.
    fn gains(&self, position: Vec3) -> (f32, f32) {
        let distance = position.length();
        let reference = self.reference_distance.max(f32::EPSILON);
        let attenuation = if distance <= reference {
            1.0
        } else {
            reference / (reference + self.rolloff_factor * (distance - reference))
        };

        let pan = if distance > f32::EPSILON {
            (position.x / distance).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let angle = (pan + 1.0) * FRAC_PI_4;

        (angle.cos() * attenuation, angle.sin() * attenuation)
    }
}

/// Render side of [`super::MixerBackend`]
pub struct Mixer {
    commands: Consumer<MixerCommand>,
    events: Producer<MixerEvent>,
    voices: HashMap<SourceId, Voice>,
    spatializer: Spatializer,
    master_gain: f32,
}

impl Mixer {
    pub(crate) fn new(
        commands: Consumer<MixerCommand>,
        events: Producer<MixerEvent>,
        config: &MixerConfig,
    ) -> Self {
        Self {
            commands,
            events,
            voices: HashMap::with_capacity(config.max_voices),
            spatializer: Spatializer {
                reference_distance: config.reference_distance,
                rolloff_factor: config.rolloff_factor,
            },
            master_gain: config.master_gain,
        }
    }

    /// Number of voices currently playing
    pub fn active_voices(&self) -> usize {
        self.voices
            .values()
            .filter(|v| v.state == SourceState::Playing)
            .count()
    }

    /// Mix all playing voices into `out` (interleaved, `format.channels` per
    /// frame). `out` is overwritten.
    pub fn render(&mut self, out: &mut [f32], format: OutputFormat) {
        self.apply_commands();
        out.fill(0.0);

        let channels = format.channels.max(1) as usize;
        let sample_rate = format.sample_rate.max(1);

        for (&source, voice) in self.voices.iter_mut() {
            if voice.state != SourceState::Playing {
                continue;
            }
            let Some(buffer) = voice.buffer.clone() else {
                continue;
            };

            if mix_voice(voice, &buffer, out, channels, sample_rate, &self.spatializer) {
                let _ = self.events.push(MixerEvent::Finished {
                    source,
                    generation: voice.generation,
                });
            }
        }

        for sample in out.iter_mut() {
            *sample = (*sample * self.master_gain).clamp(-1.0, 1.0);
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                MixerCommand::AddVoice { source } => {
                    self.voices.insert(source, Voice::new());
                }
                MixerCommand::RemoveVoice { source } => {
                    if let Some(mut voice) = self.voices.remove(&source) {
                        self.retire(voice.buffer.take());
                    }
                }
                MixerCommand::SetBuffer { source, buffer } => {
                    let Some(voice) = self.voices.get_mut(&source) else {
                        self.retire(buffer);
                        continue;
                    };
                    let previous = std::mem::replace(&mut voice.buffer, buffer);
                    voice.state = SourceState::Initial;
                    voice.cursor = 0.0;
                    self.retire(previous);
                }
                MixerCommand::SetParams { source, params } => {
                    if let Some(voice) = self.voices.get_mut(&source) {
                        voice.params = params;
                    }
                }
                MixerCommand::Play { source, generation } => {
                    let Some(voice) = self.voices.get_mut(&source) else {
                        continue;
                    };
                    voice.generation = generation;
                    if voice.buffer.is_none() {
                        voice.state = SourceState::Stopped;
                        let _ = self.events.push(MixerEvent::Finished { source, generation });
                        continue;
                    }
                    if voice.state != SourceState::Paused {
                        voice.cursor = 0.0;
                    }
                    voice.state = SourceState::Playing;
                }
                MixerCommand::Pause { source } => {
                    if let Some(voice) = self.voices.get_mut(&source) {
                        if voice.state == SourceState::Playing {
                            voice.state = SourceState::Paused;
                        }
                    }
                }
                MixerCommand::Stop { source } => {
                    if let Some(voice) = self.voices.get_mut(&source) {
                        voice.state = SourceState::Stopped;
                        voice.cursor = 0.0;
                    }
                }
            }
        }
    }

    fn retire(&mut self, buffer: Option<Arc<PcmBuffer>>) {
        if let Some(buffer) = buffer {
            // Falls back to freeing here when the event queue is full
            let _ = self.events.push(MixerEvent::Retired(buffer));
        }
    }
}

/// Mix one voice into `out`. Returns true when a non-looping voice reached
/// the end of its buffer during this block.
fn mix_voice(
    voice: &mut Voice,
    buffer: &PcmBuffer,
    out: &mut [f32],
    channels: usize,
    sample_rate: u32,
    spatializer: &Spatializer,
) -> bool {
    let frames = buffer.frames();
    if frames == 0 {
        voice.state = SourceState::Stopped;
        voice.cursor = 0.0;
        return true;
    }

    let step = buffer.frequency as f64 / sample_rate as f64 * voice.params.pitch.max(0.0) as f64;
    // Stereo buffers play as-is; only mono is positioned
    let (pan_left, pan_right) = if buffer.channels() == 1 {
        spatializer.gains(voice.params.position)
    } else {
        (1.0, 1.0)
    };
    let left_gain = voice.params.gain * pan_left;
    let right_gain = voice.params.gain * pan_right;
    let end = frames as f64;

    for frame in out.chunks_exact_mut(channels) {
        let (left, right) = buffer.sample_at(voice.cursor, voice.params.looping);
        let (left, right) = (left * left_gain, right * right_gain);

        if channels == 1 {
            frame[0] += (left + right) * 0.5;
        } else {
            frame[0] += left;
            frame[1] += right;
        }

        voice.cursor += step;
        if voice.cursor >= end {
            if voice.params.looping {
                voice.cursor %= end;
            } else {
                voice.state = SourceState::Stopped;
                voice.cursor = 0.0;
                return true;
            }
        }
    }

    false
}
