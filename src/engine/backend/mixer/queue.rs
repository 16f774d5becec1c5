// Mixer queues - lock-free SPSC channels between control and render threads
//
// Two rtrb ring buffers connect the control side (MixerBackend) with the
// renderer (Mixer):
// - COMMAND_QUEUE: control thread pushes source changes, renderer applies them
// - EVENT_QUEUE: renderer reports finished voices and hands back buffers it
//   no longer references, so their memory is freed off the render thread
//
// The renderer never blocks: it drains whatever commands are queued at the
// start of each block and drops events if the control side is not keeping up.

use std::sync::Arc;

use glam::Vec3;
use rtrb::{Consumer, Producer};

use super::pcm::PcmBuffer;
use crate::engine::backend::SourceId;

/// Per-voice parameters the renderer mixes with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub pitch: f32,
    pub gain: f32,
    pub position: Vec3,
    pub looping: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            gain: 1.0,
            position: Vec3::ZERO,
            looping: false,
        }
    }
}

/// Control → render messages
pub(crate) enum MixerCommand {
    AddVoice {
        source: SourceId,
    },
    RemoveVoice {
        source: SourceId,
    },
    SetBuffer {
        source: SourceId,
        buffer: Option<Arc<PcmBuffer>>,
    },
    SetParams {
        source: SourceId,
        params: VoiceParams,
    },
    /// `generation` tags this playback so stale finish events can be told apart
    Play {
        source: SourceId,
        generation: u64,
    },
    Pause {
        source: SourceId,
    },
    Stop {
        source: SourceId,
    },
}

impl MixerCommand {
    pub fn source(&self) -> SourceId {
        match *self {
            MixerCommand::AddVoice { source }
            | MixerCommand::RemoveVoice { source }
            | MixerCommand::SetBuffer { source, .. }
            | MixerCommand::SetParams { source, .. }
            | MixerCommand::Play { source, .. }
            | MixerCommand::Pause { source }
            | MixerCommand::Stop { source } => source,
        }
    }
}

/// Render → control messages
pub(crate) enum MixerEvent {
    Finished { source: SourceId, generation: u64 },
    Retired(Arc<PcmBuffer>),
}

/// Split queue endpoints, one pair per direction
pub(crate) struct MixerChannels {
    pub command_producer: Producer<MixerCommand>,
    pub command_consumer: Consumer<MixerCommand>,
    pub event_producer: Producer<MixerEvent>,
    pub event_consumer: Consumer<MixerEvent>,
}

impl MixerChannels {
    /// # Panics
    /// Panics if either capacity is 0
    pub fn new(command_capacity: usize, event_capacity: usize) -> Self {
        assert!(command_capacity > 0, "command_capacity must be greater than 0");
        assert!(event_capacity > 0, "event_capacity must be greater than 0");

        let (command_producer, command_consumer) = rtrb::RingBuffer::new(command_capacity);
        let (event_producer, event_consumer) = rtrb::RingBuffer::new(event_capacity);

        Self {
            command_producer,
            command_consumer,
            event_producer,
            event_consumer,
        }
    }
}
