//! Error types shared across the crate.

use thiserror::Error;

use crate::types::AttributeSemantic;

/// Errors produced by buffer initialization, rotation and readback.
///
/// All variants report local, synchronous, non-retryable conditions at the
/// call that triggered them. Initialization failures are fatal to the owning
/// geometry resource; per-frame failures indicate a caller bug (wrong
/// attribute name) and leave rotation state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    /// A rotator was queried before its device buffers were allocated.
    #[error("Attribute {0:?} has no allocated buffers")]
    NotInitialized(AttributeSemantic),

    /// The backend could not reserve device memory.
    #[error("Failed to allocate '{label}' ({size} bytes): {reason}")]
    AllocationFailed {
        label: String,
        size: u64,
        reason: String,
    },

    /// Authored attribute sources disagree on element count, or the same
    /// attribute was supplied more than once.
    #[error("Attribute {semantic:?} supplies {actual} elements, expected {expected}")]
    ShapeMismatch {
        semantic: AttributeSemantic,
        expected: u32,
        actual: u32,
    },

    /// The named attribute is not registered in the buffer set.
    #[error("Attribute {0:?} is not registered in this buffer set")]
    UnknownAttribute(AttributeSemantic),

    /// The readback destination cannot hold the requested byte range.
    #[error("Readback requires {required} bytes but the destination holds {capacity}")]
    BufferTooSmall { required: u64, capacity: u64 },

    /// The device transfer path is gone (backend dropped while requests
    /// were still being issued).
    #[error("Transfer unavailable, the backend was dropped")]
    TransferUnavailable,

    /// No usable backend could be brought up.
    #[error("Failed to initialize backend: {0}")]
    BackendUnavailable(String),
}

pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::NotInitialized(AttributeSemantic::Position);
        assert_eq!(err.to_string(), "Attribute Position has no allocated buffers");

        let err = StreamError::BufferTooSmall {
            required: 128,
            capacity: 64,
        };
        assert_eq!(
            err.to_string(),
            "Readback requires 128 bytes but the destination holds 64"
        );

        let err = StreamError::ShapeMismatch {
            semantic: AttributeSemantic::Normal,
            expected: 8,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "Attribute Normal supplies 4 elements, expected 8"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            StreamError::TransferUnavailable,
            StreamError::TransferUnavailable
        );
        assert_ne!(
            StreamError::UnknownAttribute(AttributeSemantic::Color),
            StreamError::UnknownAttribute(AttributeSemantic::TexCoord)
        );
    }
}
