use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use glam::Vec3;

use crate::audio::BufferFormat;
use crate::error::{BackendErrorCode, SoundError};

use super::{validate_upload, AudioBackend, BufferId, SourceId, SourceSnapshot, SourceState};

/// Backend call recorded by [`StubBackend`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StubCall {
    Play(SourceId),
    Pause(SourceId),
    Stop(SourceId),
    SetLooping(SourceId, bool),
}

/// Transport calls kept by the call log; older ones are discarded
pub const CALL_LOG_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct StubBuffer {
    upload: Option<(BufferFormat, usize, u32)>,
}

#[derive(Default)]
struct StubState {
    next_id: u32,
    buffers: HashMap<BufferId, StubBuffer>,
    sources: HashMap<SourceId, SourceSnapshot>,
    buffer_releases: HashMap<BufferId, u32>,
    source_releases: HashMap<SourceId, u32>,
    fail_next_upload: Option<i32>,
    calls: VecDeque<StubCall>,
}

impl StubState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, call: StubCall) {
        if self.calls.len() == CALL_LOG_CAPACITY {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }

    fn source_mut(&mut self, source: SourceId) -> Option<&mut SourceSnapshot> {
        let entry = self.sources.get_mut(&source);
        if entry.is_none() {
            log::warn!("[StubBackend] Ignoring call on unknown {}", source);
        }
        entry
    }
}

/// Backend without audio I/O used for deterministic testing and tooling.
///
/// Buffers and sources live in memory; transport only moves the source
/// state. Every release is counted so tests can assert that each handle is
/// freed exactly once.
pub struct StubBackend {
    state: Mutex<StubState>,
    device_id: Option<u32>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            device_id: None,
        }
    }

    /// Stub that reports the given device id.
    pub fn with_device_id(device_id: u32) -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            device_id: Some(device_id),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `buffer_data` call fail with `code`.
    pub fn fail_next_upload(&self, code: i32) {
        self.lock().fail_next_upload = Some(code);
    }

    /// Number of times `delete_buffer` was called for `buffer`.
    pub fn buffer_releases(&self, buffer: BufferId) -> u32 {
        self.lock().buffer_releases.get(&buffer).copied().unwrap_or(0)
    }

    /// Number of times `delete_source` was called for `source`.
    pub fn source_releases(&self, source: SourceId) -> u32 {
        self.lock().source_releases.get(&source).copied().unwrap_or(0)
    }

    pub fn live_buffers(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn live_sources(&self) -> usize {
        self.lock().sources.len()
    }

    /// Uploaded format, byte length and frequency of a buffer.
    pub fn buffer_upload(&self, buffer: BufferId) -> Option<(BufferFormat, usize, u32)> {
        self.lock().buffers.get(&buffer).and_then(|b| b.upload)
    }

    /// Most recent transport calls (up to [`CALL_LOG_CAPACITY`]) in the
    /// order they were made.
    pub fn calls(&self) -> Vec<StubCall> {
        self.lock().calls.iter().copied().collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for StubBackend {
    fn gen_buffer(&self) -> Result<BufferId, SoundError> {
        let mut state = self.lock();
        let id = BufferId(state.next_id());
        state.buffers.insert(id, StubBuffer { upload: None });
        Ok(id)
    }

    fn buffer_data(
        &self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[u8],
        frequency: u32,
    ) -> Result<(), SoundError> {
        let mut state = self.lock();
        let operation = "buffer_data".to_string();

        if let Some(code) = state.fail_next_upload.take() {
            return Err(SoundError::Backend { operation, code });
        }
        if !state.buffers.contains_key(&buffer) {
            return Err(SoundError::Backend {
                operation,
                code: BackendErrorCode::INVALID_NAME,
            });
        }
        if state.sources.values().any(|s| s.buffer == Some(buffer)) {
            return Err(SoundError::Backend {
                operation,
                code: BackendErrorCode::INVALID_OPERATION,
            });
        }
        validate_upload(format, data, frequency)
            .map_err(|code| SoundError::Backend { operation, code })?;

        if let Some(entry) = state.buffers.get_mut(&buffer) {
            entry.upload = Some((format, data.len(), frequency));
        }
        Ok(())
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.lock();
        *state.buffer_releases.entry(buffer).or_insert(0) += 1;

        if state.sources.values().any(|s| s.buffer == Some(buffer)) {
            log::warn!(
                "[StubBackend] Refusing to delete {} while a source uses it",
                buffer
            );
            return;
        }
        if state.buffers.remove(&buffer).is_none() {
            log::warn!("[StubBackend] Deleting unknown {}", buffer);
        }
    }

    fn gen_source(&self) -> Result<SourceId, SoundError> {
        let mut state = self.lock();
        let id = SourceId(state.next_id());
        state.sources.insert(id, SourceSnapshot::default());
        Ok(id)
    }

    fn delete_source(&self, source: SourceId) {
        let mut state = self.lock();
        *state.source_releases.entry(source).or_insert(0) += 1;
        if state.sources.remove(&source).is_none() {
            log::warn!("[StubBackend] Deleting unknown {}", source);
        }
    }

    fn set_source_buffer(&self, source: SourceId, buffer: Option<BufferId>) {
        let mut state = self.lock();
        if let Some(id) = buffer {
            if !state.buffers.contains_key(&id) {
                log::warn!("[StubBackend] Cannot bind unknown {} to {}", id, source);
                return;
            }
        }
        if let Some(entry) = state.source_mut(source) {
            entry.buffer = buffer;
            entry.state = SourceState::Initial;
        }
    }

    fn set_pitch(&self, source: SourceId, pitch: f32) {
        if let Some(entry) = self.lock().source_mut(source) {
            entry.pitch = pitch;
        }
    }

    fn set_gain(&self, source: SourceId, gain: f32) {
        if let Some(entry) = self.lock().source_mut(source) {
            entry.gain = gain;
        }
    }

    fn set_position(&self, source: SourceId, position: Vec3) {
        if let Some(entry) = self.lock().source_mut(source) {
            entry.position = position;
        }
    }

    fn set_velocity(&self, source: SourceId, velocity: Vec3) {
        if let Some(entry) = self.lock().source_mut(source) {
            entry.velocity = velocity;
        }
    }

    fn set_looping(&self, source: SourceId, looping: bool) {
        let mut state = self.lock();
        state.record(StubCall::SetLooping(source, looping));
        if let Some(entry) = state.source_mut(source) {
            entry.looping = looping;
        }
    }

    fn play(&self, source: SourceId) {
        let mut state = self.lock();
        state.record(StubCall::Play(source));
        if let Some(entry) = state.source_mut(source) {
            entry.state = if entry.buffer.is_some() {
                SourceState::Playing
            } else {
                SourceState::Stopped
            };
        }
    }

    fn pause(&self, source: SourceId) {
        let mut state = self.lock();
        state.record(StubCall::Pause(source));
        if let Some(entry) = state.source_mut(source) {
            if entry.state == SourceState::Playing {
                entry.state = SourceState::Paused;
            }
        }
    }

    fn stop(&self, source: SourceId) {
        let mut state = self.lock();
        state.record(StubCall::Stop(source));
        if let Some(entry) = state.source_mut(source) {
            entry.state = SourceState::Stopped;
        }
    }

    fn source_state(&self, source: SourceId) -> SourceState {
        self.lock()
            .sources
            .get(&source)
            .map(|s| s.state)
            .unwrap_or(SourceState::Initial)
    }

    fn source_snapshot(&self, source: SourceId) -> Option<SourceSnapshot> {
        self.lock().sources.get(&source).copied()
    }

    fn device_id(&self) -> Option<u32> {
        self.device_id
    }
}
