// Sound error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Sound error code constants
///
/// Error code range: 2001-2007
pub struct SoundErrorCodes {}

impl SoundErrorCodes {
    /// WAV file could not be opened or decoded
    pub const LOAD_FAILED: i32 = 2001;

    /// Sample format is not 8/16-bit mono or stereo
    pub const UNSUPPORTED_FORMAT: i32 = 2002;

    /// Backend rejected an operation
    pub const BACKEND_ERROR: i32 = 2003;

    /// Buffer or source handle is unknown to the backend
    pub const INVALID_HANDLE: i32 = 2004;

    /// Mixer command queue is full
    pub const QUEUE_FULL: i32 = 2005;

    /// Failed to open the output device or stream
    pub const STREAM_OPEN_FAILED: i32 = 2006;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 2007;
}

/// Error codes reported by audio backends.
///
/// Values follow the OpenAL error enumeration so codes logged by the
/// software mixer read the same as ones from a native driver.
pub struct BackendErrorCode {}

impl BackendErrorCode {
    pub const INVALID_NAME: i32 = 0xA001;
    pub const INVALID_ENUM: i32 = 0xA002;
    pub const INVALID_VALUE: i32 = 0xA003;
    pub const INVALID_OPERATION: i32 = 0xA004;
    pub const OUT_OF_MEMORY: i32 = 0xA005;

    /// Symbolic name for a backend code, used in log lines.
    pub fn name(code: i32) -> &'static str {
        match code {
            Self::INVALID_NAME => "INVALID_NAME",
            Self::INVALID_ENUM => "INVALID_ENUM",
            Self::INVALID_VALUE => "INVALID_VALUE",
            Self::INVALID_OPERATION => "INVALID_OPERATION",
            Self::OUT_OF_MEMORY => "OUT_OF_MEMORY",
            _ => "UNKNOWN",
        }
    }
}

/// Log a sound error with structured context
///
/// Emits the numeric code, the component and the human-readable message
/// through the `log` facade.
pub fn log_sound_error(err: &SoundError, context: &str) {
    error!(
        "Sound error in {}: code={}, component=Sound, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Sound-related errors
///
/// These cover WAV loading, format mapping, backend buffer/source operations
/// and output stream management.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundError {
    /// File missing, unreadable or not a valid WAV
    LoadFailed { path: String, reason: String },

    /// Decoded sample format has no matching buffer format
    UnsupportedFormat {
        bits_per_sample: u16,
        channels: u16,
        float: bool,
    },

    /// Backend reported an error code for an operation
    Backend { operation: String, code: i32 },

    /// Handle is not known to the backend
    InvalidHandle { kind: &'static str, id: u32 },

    /// Mixer command queue had no room for a command
    QueueFull { capacity: usize },

    /// Failed to open output device or stream
    StreamOpenFailed { reason: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for SoundError {
    fn code(&self) -> i32 {
        match self {
            SoundError::LoadFailed { .. } => SoundErrorCodes::LOAD_FAILED,
            SoundError::UnsupportedFormat { .. } => SoundErrorCodes::UNSUPPORTED_FORMAT,
            SoundError::Backend { .. } => SoundErrorCodes::BACKEND_ERROR,
            SoundError::InvalidHandle { .. } => SoundErrorCodes::INVALID_HANDLE,
            SoundError::QueueFull { .. } => SoundErrorCodes::QUEUE_FULL,
            SoundError::StreamOpenFailed { .. } => SoundErrorCodes::STREAM_OPEN_FAILED,
            SoundError::LockPoisoned { .. } => SoundErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            SoundError::LoadFailed { path, reason } => {
                format!("Can't load sound {}: {}", path, reason)
            }
            SoundError::UnsupportedFormat {
                bits_per_sample,
                channels,
                float,
            } => {
                let kind = if *float { "float" } else { "integer" };
                format!(
                    "Unsupported sample format: {}-bit {} with {} channel(s)",
                    bits_per_sample, kind, channels
                )
            }
            SoundError::Backend { operation, code } => {
                format!(
                    "Backend error during {}: {} (0x{:X})",
                    operation,
                    BackendErrorCode::name(*code),
                    code
                )
            }
            SoundError::InvalidHandle { kind, id } => {
                format!("Unknown {} handle {}", kind, id)
            }
            SoundError::QueueFull { capacity } => {
                format!("Mixer command queue full (capacity {})", capacity)
            }
            SoundError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            SoundError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for SoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SoundError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SoundError {}
