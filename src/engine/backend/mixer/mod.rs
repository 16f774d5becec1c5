//! Software mixer backend.
//!
//! [`MixerBackend`] is the control side: it validates calls, keeps the
//! authoritative view of every buffer and source, and forwards changes to the
//! render side ([`Mixer`]) through a lock-free command queue. The renderer
//! reports voices that ran out of samples through the event queue; the
//! control side folds those reports in before answering any query.
//!
//! Queue discipline:
//! - one command slot stays reserved for every live source so its
//!   `RemoveVoice` always fits
//! - transport commands that find no room wait in a control-side backlog and
//!   are replayed, in order, on the next call into the backend
//! - parameter and buffer changes are dropped with `QueueFull` instead

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec3;
use rtrb::{Consumer, Producer};

use crate::audio::BufferFormat;
use crate::config::MixerConfig;
use crate::error::{log_sound_error, BackendErrorCode, SoundError};

use super::{validate_upload, AudioBackend, BufferId, SourceId, SourceSnapshot, SourceState};

mod pcm;
mod queue;
mod render;

pub use pcm::PcmBuffer;
pub use queue::VoiceParams;
pub use render::{Mixer, OutputFormat};

use queue::{MixerChannels, MixerCommand, MixerEvent};

/// One slot for a source's `AddVoice` plus the one reserved for its removal
const MIN_COMMAND_QUEUE_SIZE: usize = 2;

struct SourceEntry {
    snapshot: SourceSnapshot,
    /// Bumped on every play so finish events from earlier playbacks are ignored
    generation: u64,
}

impl SourceEntry {
    fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            pitch: self.snapshot.pitch,
            gain: self.snapshot.gain,
            position: self.snapshot.position,
            looping: self.snapshot.looping,
        }
    }
}

struct ControlState {
    next_id: u32,
    buffers: HashMap<BufferId, Option<Arc<PcmBuffer>>>,
    sources: HashMap<SourceId, SourceEntry>,
    commands: Producer<MixerCommand>,
    events: Consumer<MixerEvent>,
    command_capacity: usize,
    /// Transport commands waiting for queue room
    backlog: VecDeque<MixerCommand>,
}

impl ControlState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Fold renderer reports into the source table.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.pop() {
            match event {
                MixerEvent::Finished { source, generation } => {
                    if let Some(entry) = self.sources.get_mut(&source) {
                        if entry.generation == generation
                            && entry.snapshot.state == SourceState::Playing
                        {
                            entry.snapshot.state = SourceState::Stopped;
                        }
                    }
                }
                // Dropping here releases the samples on the control thread
                MixerEvent::Retired(buffer) => drop(buffer),
            }
        }
    }

    /// Free command slots beyond the ones reserved for removing live sources.
    fn spare_slots(&self) -> usize {
        self.commands.slots().saturating_sub(self.sources.len())
    }

    fn flush_backlog(&mut self) {
        while self.spare_slots() > 0 {
            let Some(command) = self.backlog.pop_front() else {
                break;
            };
            if let Err(rtrb::PushError::Full(command)) = self.commands.push(command) {
                self.backlog.push_front(command);
                break;
            }
        }
    }

    /// Push `command` if it fits while keeping `reserve` extra slots free.
    /// Never overtakes the backlog.
    fn try_push(&mut self, command: MixerCommand, reserve: usize) -> Result<(), MixerCommand> {
        self.flush_backlog();
        if !self.backlog.is_empty() || self.spare_slots() <= reserve {
            return Err(command);
        }
        self.commands.push(command).map_err(|rtrb::PushError::Full(c)| c)
    }

    fn send(&mut self, command: MixerCommand) -> Result<(), SoundError> {
        self.try_push(command, 0).map_err(|_| self.queue_full())
    }

    /// Like `send`, keeping room for the removal of a source about to be added.
    fn send_add_voice(&mut self, source: SourceId) -> Result<(), SoundError> {
        self.try_push(MixerCommand::AddVoice { source }, 1)
            .map_err(|_| self.queue_full())
    }

    /// Transport commands are never dropped; they wait in the backlog.
    fn send_transport(&mut self, command: MixerCommand) {
        if let Err(command) = self.try_push(command, 0) {
            log::debug!(
                "[Mixer] Deferring command for {} ({} waiting)",
                command.source(),
                self.backlog.len() + 1
            );
            self.backlog.push_back(command);
        }
    }

    /// Push the removal of a source already taken out of `sources`.
    fn send_remove_voice(&mut self, source: SourceId) {
        self.backlog.retain(|command| command.source() != source);
        // The slot reserved for this source guarantees room
        if self
            .commands
            .push(MixerCommand::RemoveVoice { source })
            .is_err()
        {
            log::error!("[Mixer] No room to remove {}", source);
        }
    }

    fn queue_full(&self) -> SoundError {
        let err = SoundError::QueueFull {
            capacity: self.command_capacity,
        };
        log_sound_error(&err, "mixer command");
        err
    }

    fn source_mut(&mut self, source: SourceId) -> Option<&mut SourceEntry> {
        let entry = self.sources.get_mut(&source);
        if entry.is_none() {
            log::warn!("[Mixer] Ignoring call on unknown {}", source);
        }
        entry
    }

    /// Apply `update` to a source and push its parameters to the renderer.
    fn update_params(&mut self, source: SourceId, update: impl FnOnce(&mut SourceSnapshot)) {
        let Some(entry) = self.source_mut(source) else {
            return;
        };
        update(&mut entry.snapshot);
        let params = entry.voice_params();
        let _ = self.send(MixerCommand::SetParams { source, params });
    }
}

/// Control side of the software mixer.
///
/// # Example
/// ```ignore
/// let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
/// let backend: Arc<dyn AudioBackend> = Arc::new(backend);
/// // hand `mixer` to the output thread, use `backend` for sounds
/// ```
pub struct MixerBackend {
    state: Mutex<ControlState>,
}

impl MixerBackend {
    /// Create the control side and its renderer.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(config: &MixerConfig) -> (MixerBackend, Mixer) {
        let command_capacity = config.command_queue_size.max(MIN_COMMAND_QUEUE_SIZE);
        let event_capacity = config.event_queue_size.max(1);
        if command_capacity != config.command_queue_size
            || event_capacity != config.event_queue_size
        {
            log::warn!(
                "[Mixer] Queue sizes {}/{} too small, using {}/{}",
                config.command_queue_size,
                config.event_queue_size,
                command_capacity,
                event_capacity
            );
        }
        let channels = MixerChannels::new(command_capacity, event_capacity);

        let backend = MixerBackend {
            state: Mutex::new(ControlState {
                next_id: 0,
                buffers: HashMap::new(),
                sources: HashMap::new(),
                commands: channels.command_producer,
                events: channels.event_consumer,
                command_capacity,
                backlog: VecDeque::new(),
            }),
        };
        let mixer = Mixer::new(channels.command_consumer, channels.event_producer, config);

        (backend, mixer)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ControlState>, SoundError> {
        let mut guard = self.state.lock().map_err(|_| {
            let err = SoundError::LockPoisoned {
                component: "MixerBackend".to_string(),
            };
            log_sound_error(&err, "mixer lock");
            err
        })?;
        guard.drain_events();
        guard.flush_backlog();
        Ok(guard)
    }

    fn with_source(&self, source: SourceId, update: impl FnOnce(&mut SourceSnapshot)) {
        if let Ok(mut state) = self.lock() {
            state.update_params(source, update);
        }
    }
}

impl AudioBackend for MixerBackend {
    fn gen_buffer(&self) -> Result<BufferId, SoundError> {
        let mut state = self.lock()?;
        let id = BufferId(state.next_id());
        state.buffers.insert(id, None);
        Ok(id)
    }

    fn buffer_data(
        &self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[u8],
        frequency: u32,
    ) -> Result<(), SoundError> {
        let backend_error = |code| SoundError::Backend {
            operation: "buffer_data".to_string(),
            code,
        };

        let mut state = self.lock()?;
        if !state.buffers.contains_key(&buffer) {
            return Err(backend_error(BackendErrorCode::INVALID_NAME));
        }
        if state
            .sources
            .values()
            .any(|entry| entry.snapshot.buffer == Some(buffer))
        {
            return Err(backend_error(BackendErrorCode::INVALID_OPERATION));
        }
        validate_upload(format, data, frequency).map_err(backend_error)?;

        let pcm = Arc::new(PcmBuffer::from_bytes(format, data, frequency));
        state.buffers.insert(buffer, Some(pcm));
        log::debug!(
            "[Mixer] Uploaded {} ({:?}, {} bytes, {} Hz)",
            buffer,
            format,
            data.len(),
            frequency
        );
        Ok(())
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        if state
            .sources
            .values()
            .any(|entry| entry.snapshot.buffer == Some(buffer))
        {
            log::warn!(
                "[Mixer] Cannot delete {} while attached: {}",
                buffer,
                BackendErrorCode::name(BackendErrorCode::INVALID_OPERATION)
            );
            return;
        }
        if state.buffers.remove(&buffer).is_none() {
            log::warn!("[Mixer] Deleting unknown {}", buffer);
        }
    }

    fn gen_source(&self) -> Result<SourceId, SoundError> {
        let mut state = self.lock()?;
        let id = SourceId(state.next_id());
        state.send_add_voice(id)?;
        state.sources.insert(
            id,
            SourceEntry {
                snapshot: SourceSnapshot::default(),
                generation: 0,
            },
        );
        Ok(id)
    }

    fn delete_source(&self, source: SourceId) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        if state.sources.remove(&source).is_none() {
            log::warn!("[Mixer] Deleting unknown {}", source);
            return;
        }
        state.send_remove_voice(source);
    }

    fn set_source_buffer(&self, source: SourceId, buffer: Option<BufferId>) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        let pcm = match buffer {
            Some(id) => match state.buffers.get(&id) {
                Some(pcm) => pcm.clone(),
                None => {
                    log::warn!("[Mixer] Cannot bind unknown {} to {}", id, source);
                    return;
                }
            },
            None => None,
        };
        let Some(entry) = state.source_mut(source) else {
            return;
        };
        entry.snapshot.buffer = buffer;
        entry.snapshot.state = SourceState::Initial;
        let _ = state.send(MixerCommand::SetBuffer {
            source,
            buffer: pcm,
        });
    }

    fn set_pitch(&self, source: SourceId, pitch: f32) {
        self.with_source(source, |s| s.pitch = pitch);
    }

    fn set_gain(&self, source: SourceId, gain: f32) {
        self.with_source(source, |s| s.gain = gain);
    }

    fn set_position(&self, source: SourceId, position: Vec3) {
        self.with_source(source, |s| s.position = position);
    }

    fn set_velocity(&self, source: SourceId, velocity: Vec3) {
        // Velocity is kept for queries only; the renderer has no doppler
        if let Ok(mut state) = self.lock() {
            if let Some(entry) = state.source_mut(source) {
                entry.snapshot.velocity = velocity;
            }
        }
    }

    fn set_looping(&self, source: SourceId, looping: bool) {
        self.with_source(source, |s| s.looping = looping);
    }

    fn play(&self, source: SourceId) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        let Some(entry) = state.source_mut(source) else {
            return;
        };
        entry.generation += 1;
        let generation = entry.generation;
        entry.snapshot.state = if entry.snapshot.buffer.is_some() {
            SourceState::Playing
        } else {
            SourceState::Stopped
        };
        state.send_transport(MixerCommand::Play { source, generation });
    }

    fn pause(&self, source: SourceId) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        let Some(entry) = state.source_mut(source) else {
            return;
        };
        if entry.snapshot.state == SourceState::Playing {
            entry.snapshot.state = SourceState::Paused;
        }
        state.send_transport(MixerCommand::Pause { source });
    }

    fn stop(&self, source: SourceId) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        let Some(entry) = state.source_mut(source) else {
            return;
        };
        entry.snapshot.state = SourceState::Stopped;
        state.send_transport(MixerCommand::Stop { source });
    }

    fn source_state(&self, source: SourceId) -> SourceState {
        self.source_snapshot(source)
            .map(|s| s.state)
            .unwrap_or(SourceState::Initial)
    }

    fn source_snapshot(&self, source: SourceId) -> Option<SourceSnapshot> {
        let state = self.lock().ok()?;
        state.sources.get(&source).map(|entry| entry.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn format() -> OutputFormat {
        OutputFormat {
            channels: 2,
            sample_rate: RATE,
        }
    }

    fn ramp_bytes(frames: usize) -> Vec<u8> {
        (0..frames)
            .flat_map(|i| ((i as i16 + 1) * 1000).to_le_bytes())
            .collect()
    }

    /// Stereo buffer bypasses spatialization so output equals the samples.
    fn stereo_source(backend: &MixerBackend, frames: usize) -> SourceId {
        let mut bytes = Vec::new();
        for i in 0..frames {
            let v = (i as i16 + 1) * 1000;
            bytes.extend_from_slice(&v.to_le_bytes());
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let buffer = backend.gen_buffer().unwrap();
        backend
            .buffer_data(buffer, BufferFormat::Stereo16, &bytes, RATE)
            .unwrap();
        let source = backend.gen_source().unwrap();
        backend.set_source_buffer(source, Some(buffer));
        source
    }

    fn left_channel(block: &[f32]) -> Vec<f32> {
        block.chunks(2).map(|f| f[0]).collect()
    }

    fn expected(i: usize) -> f32 {
        ((i as i16 + 1) * 1000) as f32 / 32768.0
    }

    #[test]
    fn test_plays_samples_in_order() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 4);
        backend.play(source);

        let mut out = vec![0.0f32; 4];
        mixer.render(&mut out, format());
        let left = left_channel(&out);
        assert!((left[0] - expected(0)).abs() < 1e-6);
        assert!((left[1] - expected(1)).abs() < 1e-6);
    }

    #[test]
    fn test_non_looping_voice_stops_at_end() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 3);
        backend.play(source);

        let mut out = vec![0.0f32; 10];
        mixer.render(&mut out, format());

        let left = left_channel(&out);
        assert_eq!(left[3], 0.0, "Output after the last frame should be silent");
        assert_eq!(backend.source_state(source), SourceState::Stopped);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_looping_voice_wraps() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 3);
        backend.set_looping(source, true);
        backend.play(source);

        let mut out = vec![0.0f32; 10];
        mixer.render(&mut out, format());

        let left = left_channel(&out);
        assert!((left[3] - expected(0)).abs() < 1e-6);
        assert!((left[4] - expected(1)).abs() < 1e-6);
        assert_eq!(backend.source_state(source), SourceState::Playing);
    }

    #[test]
    fn test_pause_holds_position_and_play_resumes() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 8);
        backend.play(source);

        let mut out = vec![0.0f32; 4];
        mixer.render(&mut out, format());
        backend.pause(source);
        mixer.render(&mut out, format());
        assert!(out.iter().all(|&s| s == 0.0), "Paused voice must be silent");

        backend.play(source);
        mixer.render(&mut out, format());
        assert!((left_channel(&out)[0] - expected(2)).abs() < 1e-6);
    }

    #[test]
    fn test_stop_rewinds() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 8);
        backend.play(source);

        let mut out = vec![0.0f32; 6];
        mixer.render(&mut out, format());
        backend.stop(source);
        backend.play(source);
        mixer.render(&mut out, format());

        assert!((left_channel(&out)[0] - expected(0)).abs() < 1e-6);
    }

    #[test]
    fn test_restart_after_finish_reports_playing() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 1);
        backend.play(source);

        let mut out = vec![0.0f32; 4];
        mixer.render(&mut out, format()); // finishes, event queued

        backend.play(source);
        assert_eq!(backend.source_state(source), SourceState::Playing);
    }

    #[test]
    fn test_pitch_doubles_step() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 8);
        backend.set_pitch(source, 2.0);
        backend.play(source);

        let mut out = vec![0.0f32; 4];
        mixer.render(&mut out, format());
        assert!((left_channel(&out)[1] - expected(2)).abs() < 1e-6);
    }

    #[test]
    fn test_gain_scales_output() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 4);
        backend.set_gain(source, 0.5);
        backend.play(source);

        let mut out = vec![0.0f32; 2];
        mixer.render(&mut out, format());
        assert!((out[0] - expected(0) * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mono_source_is_panned() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let buffer = backend.gen_buffer().unwrap();
        backend
            .buffer_data(buffer, BufferFormat::Mono16, &ramp_bytes(4), RATE)
            .unwrap();
        let source = backend.gen_source().unwrap();
        backend.set_source_buffer(source, Some(buffer));
        backend.set_position(source, Vec3::new(1.0, 0.0, 0.0));
        backend.play(source);

        let mut out = vec![0.0f32; 2];
        mixer.render(&mut out, format());
        assert!(out[0].abs() < 1e-6, "Left channel should be silent");
        assert!(out[1] > 0.0);
    }

    #[test]
    fn test_upload_rejects_attached_buffer() {
        let (backend, _mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 2);
        let buffer = backend.source_snapshot(source).unwrap().buffer.unwrap();

        let result = backend.buffer_data(buffer, BufferFormat::Stereo16, &[0u8; 4], RATE);
        assert!(matches!(
            result,
            Err(SoundError::Backend { code, .. }) if code == BackendErrorCode::INVALID_OPERATION
        ));
    }

    #[test]
    fn test_upload_rejects_partial_frame() {
        let (backend, _mixer) = MixerBackend::new(&MixerConfig::default());
        let buffer = backend.gen_buffer().unwrap();
        let result = backend.buffer_data(buffer, BufferFormat::Mono16, &[0u8; 3], RATE);
        assert!(matches!(
            result,
            Err(SoundError::Backend { code, .. }) if code == BackendErrorCode::INVALID_VALUE
        ));
    }

    #[test]
    fn test_full_command_queue_rejects_new_source() {
        let config = MixerConfig {
            command_queue_size: 2,
            ..MixerConfig::default()
        };
        let (backend, _mixer) = MixerBackend::new(&config);
        assert!(backend.gen_source().is_ok());
        assert!(matches!(
            backend.gen_source(),
            Err(SoundError::QueueFull { capacity: 2 })
        ));
    }

    #[test]
    fn test_zero_queue_sizes_are_clamped() {
        let config = MixerConfig {
            command_queue_size: 0,
            event_queue_size: 0,
            ..MixerConfig::default()
        };
        let (backend, mut mixer) = MixerBackend::new(&config);
        let source = backend.gen_source().unwrap();
        backend.delete_source(source);

        let mut out = vec![0.0f32; 4];
        mixer.render(&mut out, format());
        assert!(backend.gen_source().is_ok());
    }

    #[test]
    fn test_delete_under_back_pressure_removes_voice() {
        let config = MixerConfig {
            command_queue_size: 8,
            ..MixerConfig::default()
        };
        let (backend, mut mixer) = MixerBackend::new(&config);
        let source = stereo_source(&backend, 4);
        backend.set_looping(source, true);
        backend.play(source);
        for _ in 0..16 {
            backend.set_gain(source, 0.5);
        }

        backend.stop(source);
        backend.delete_source(source);

        let mut out = vec![0.0f32; 8];
        mixer.render(&mut out, format());
        assert_eq!(mixer.active_voices(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_deferred_stop_reaches_renderer() {
        let config = MixerConfig {
            command_queue_size: 6,
            ..MixerConfig::default()
        };
        let (backend, mut mixer) = MixerBackend::new(&config);
        let source = stereo_source(&backend, 4);
        backend.set_looping(source, true);
        backend.play(source);
        while backend.lock().unwrap().spare_slots() > 0 {
            backend.set_gain(source, 1.0);
        }

        backend.stop(source);
        assert_eq!(backend.source_state(source), SourceState::Stopped);

        let mut out = vec![0.0f32; 8];
        mixer.render(&mut out, format());
        assert_eq!(mixer.active_voices(), 1, "Stop is still waiting for room");

        // Any call into the backend replays the backlog
        backend.source_state(source);
        mixer.render(&mut out, format());
        assert_eq!(mixer.active_voices(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_delete_source_then_buffer() {
        let (backend, mut mixer) = MixerBackend::new(&MixerConfig::default());
        let source = stereo_source(&backend, 2);
        let buffer = backend.source_snapshot(source).unwrap().buffer.unwrap();
        backend.play(source);

        backend.delete_source(source);
        backend.delete_buffer(buffer);

        let mut out = vec![0.0f32; 4];
        mixer.render(&mut out, format());
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(backend.source_snapshot(source).is_none());
    }
}
