// Error types for the sound layer
//
// This module defines the error type shared by decoding, backend and output
// operations, with numeric codes so callers across an FFI or CLI boundary
// can branch on them.

mod sound;

pub use sound::{log_sound_error, BackendErrorCode, SoundError, SoundErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
