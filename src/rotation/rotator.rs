//! Per-attribute buffer rotation.
//!
//! An [`AttributeBufferRotator`] owns the four physical buffers behind one
//! logical geometry attribute and resolves a [`Rank`] (the role a caller
//! needs) to a physical buffer index:
//!
//! - indices 0 and 1 form a ping-pong pair alternating Write/Read roles
//!   across frames,
//! - index 2 holds the immutable authored baseline, populated once,
//! - index 3 is the host-readable staging buffer for asynchronous export.
//!
//! Rotation state is two fields: `current_index` selects the ping-pong half
//! that Write resolves to, and `reset_pending` redirects Read to the
//! baseline until the next [`swap`]. A freshly initialized rotator starts
//! with `reset_pending = true`, so consumers see authored data before the
//! first completed write.
//!
//! # Usage
//!
//! ```ignore
//! let mut rotator = AttributeBufferRotator::new(
//!     AttributeSemantic::Position,
//!     AttributeFormat::Float4,
//! );
//! rotator.initialize(&backend, bytemuck::cast_slice(&positions), count, "line")?;
//!
//! // Each frame: compute writes Write, render reads Read, then rotate.
//! let write = rotator.buffer(Rank::Write)?;
//! let read = rotator.buffer(Rank::Read)?;
//! rotator.swap();
//! ```
//!
//! [`swap`]: AttributeBufferRotator::swap

use std::sync::Arc;

use crate::backend::{GpuBackend, GpuBuffer};
use crate::error::{StreamError, StreamResult};
use crate::types::{AttributeFormat, AttributeSemantic, BufferDescriptor, UsageHint};

/// Physical index of the immutable baseline buffer.
pub const ORIGINAL_INDEX: usize = 2;

/// Physical index of the host-readable staging buffer.
pub const READBACK_INDEX: usize = 3;

/// Number of physical buffers per attribute.
pub const BUFFER_COUNT: usize = 4;

/// Logical role resolved to a physical buffer index at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    /// The most recently completed write (or the baseline while a reset
    /// is pending).
    Read,
    /// The ping-pong half that is safe to overwrite this frame.
    Write,
    /// The immutable authored snapshot.
    Original,
    /// The host-readable staging buffer.
    Readback,
}

/// The other half of a ping-pong pair.
#[inline]
pub fn opposite(index: usize) -> usize {
    (index + 1) % 2
}

/// Resolve a rank to a physical buffer index.
///
/// Pure function of rotation state, shared by [`AttributeBufferRotator`]
/// and directly testable without device buffers. `Read` resolves to the
/// baseline while a reset is pending, otherwise to the half most recently
/// released by [`AttributeBufferRotator::swap`].
#[inline]
pub fn resolve_rank(rank: Rank, current_index: usize, reset_pending: bool) -> usize {
    match rank {
        Rank::Write => current_index,
        Rank::Read => {
            if reset_pending {
                ORIGINAL_INDEX
            } else {
                opposite(current_index)
            }
        }
        Rank::Original => ORIGINAL_INDEX,
        Rank::Readback => READBACK_INDEX,
    }
}

/// Owns the physical buffers for one geometry attribute and resolves
/// ranks against its rotation state.
///
/// Construction is two-phase: [`new`] records the attribute identity,
/// [`initialize`] allocates the four device buffers and uploads the
/// authored source into both ping-pong halves and the baseline. Rank
/// resolution before `initialize` reports
/// [`StreamError::NotInitialized`]; `swap`/`reset` are plain state
/// transitions and never fail.
///
/// # Thread Safety
///
/// Rotation state has a single mutator by contract (the owner calling
/// `swap`/`reset` once per frame), so no internal locking is used.
///
/// [`new`]: Self::new
/// [`initialize`]: Self::initialize
pub struct AttributeBufferRotator {
    semantic: AttributeSemantic,
    format: AttributeFormat,
    buffers: Vec<GpuBuffer>,
    current_index: usize,
    reset_pending: bool,
}

impl AttributeBufferRotator {
    /// Create a rotator with no device buffers.
    ///
    /// Starts in the baseline state (`reset_pending = true`), so the first
    /// resolved Read after initialization is the authored snapshot.
    pub fn new(semantic: AttributeSemantic, format: AttributeFormat) -> Self {
        Self {
            semantic,
            format,
            buffers: Vec::new(),
            current_index: 0,
            reset_pending: true,
        }
    }

    /// Allocate the four physical buffers and upload the authored source.
    ///
    /// `source` must hold exactly `element_count` elements of this
    /// rotator's format. The bytes land identically in ping-pong indices
    /// 0 and 1 and in the baseline; the staging buffer is left zeroed.
    /// `label_prefix` namespaces the buffer debug labels.
    pub fn initialize(
        &mut self,
        backend: &Arc<dyn GpuBackend>,
        source: &[u8],
        element_count: u32,
        label_prefix: &str,
    ) -> StreamResult<()> {
        let byte_size = element_count as u64 * self.format.size() as u64;
        debug_assert_eq!(source.len() as u64, byte_size);

        let name = self.semantic.name();
        let hints = [
            UsageHint::DynamicReadWrite,
            UsageHint::DynamicReadWrite,
            UsageHint::StaticWriteOnce,
            UsageHint::HostReadable,
        ];
        let labels = [
            format!("{label_prefix}.{name}[0]"),
            format!("{label_prefix}.{name}[1]"),
            format!("{label_prefix}.{name}.original"),
            format!("{label_prefix}.{name}.readback"),
        ];

        let mut buffers = Vec::with_capacity(BUFFER_COUNT);
        for (hint, label) in hints.iter().zip(labels) {
            let descriptor = BufferDescriptor::new(byte_size, hint.usage()).with_label(label);
            buffers.push(backend.create_buffer(&descriptor)?);
        }

        for buffer in &buffers[..=ORIGINAL_INDEX] {
            backend.write_buffer(buffer, 0, source);
        }

        log::trace!(
            "Initialized {} rotation: {} buffers, {} elements",
            name,
            BUFFER_COUNT,
            element_count
        );

        self.buffers = buffers;
        Ok(())
    }

    /// Attribute this rotator manages.
    pub fn semantic(&self) -> AttributeSemantic {
        self.semantic
    }

    /// Element format of the managed buffers.
    pub fn format(&self) -> AttributeFormat {
        self.format
    }

    /// Bytes per element.
    pub fn stride(&self) -> usize {
        self.format.size()
    }

    /// Ping-pong half that Write currently resolves to.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Whether Read is redirected to the baseline.
    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Whether device buffers have been allocated.
    pub fn is_initialized(&self) -> bool {
        !self.buffers.is_empty()
    }

    /// Resolve a rank to a physical buffer index.
    pub fn resolve(&self, rank: Rank) -> StreamResult<usize> {
        if !self.is_initialized() {
            return Err(StreamError::NotInitialized(self.semantic));
        }
        Ok(resolve_rank(rank, self.current_index, self.reset_pending))
    }

    /// Resolve a rank to its physical buffer.
    pub fn buffer(&self, rank: Rank) -> StreamResult<&GpuBuffer> {
        let index = self.resolve(rank)?;
        Ok(&self.buffers[index])
    }

    /// Advance the rotation: the half just written becomes readable and
    /// any pending reset is consumed.
    pub fn swap(&mut self) {
        self.reset_pending = false;
        self.current_index = opposite(self.current_index);
    }

    /// Redirect Read to the baseline starting now.
    ///
    /// Leaves `current_index` untouched, so the write side continues its
    /// ping-pong cadence undisturbed.
    pub fn reset(&mut self) {
        self.reset_pending = true;
    }
}

impl std::fmt::Debug for AttributeBufferRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeBufferRotator")
            .field("semantic", &self.semantic)
            .field("format", &self.format)
            .field("current_index", &self.current_index)
            .field("reset_pending", &self.reset_pending)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    fn create_test_backend() -> Arc<dyn GpuBackend> {
        Arc::new(DummyBackend::new())
    }

    fn initialized_rotator(backend: &Arc<dyn GpuBackend>) -> AttributeBufferRotator {
        let mut rotator =
            AttributeBufferRotator::new(AttributeSemantic::Position, AttributeFormat::Float4);
        let source = vec![0u8; 8 * 16];
        rotator.initialize(backend, &source, 8, "test").unwrap();
        rotator
    }

    #[test]
    fn test_resolve_rank_table() {
        // Write follows current_index regardless of reset state.
        assert_eq!(resolve_rank(Rank::Write, 0, false), 0);
        assert_eq!(resolve_rank(Rank::Write, 1, false), 1);
        assert_eq!(resolve_rank(Rank::Write, 0, true), 0);
        assert_eq!(resolve_rank(Rank::Write, 1, true), 1);

        // Read is the opposite half, unless a reset redirects it.
        assert_eq!(resolve_rank(Rank::Read, 0, false), 1);
        assert_eq!(resolve_rank(Rank::Read, 1, false), 0);
        assert_eq!(resolve_rank(Rank::Read, 0, true), ORIGINAL_INDEX);
        assert_eq!(resolve_rank(Rank::Read, 1, true), ORIGINAL_INDEX);

        // Fixed roles.
        for &(index, pending) in &[(0, false), (0, true), (1, false), (1, true)] {
            assert_eq!(resolve_rank(Rank::Original, index, pending), ORIGINAL_INDEX);
            assert_eq!(resolve_rank(Rank::Readback, index, pending), READBACK_INDEX);
        }
    }

    #[test]
    fn test_read_never_aliases_write_while_rotating() {
        for current in 0..2 {
            let read = resolve_rank(Rank::Read, current, false);
            let write = resolve_rank(Rank::Write, current, false);
            assert_ne!(read, write);
            assert_eq!(read, opposite(write));
        }
    }

    #[test]
    fn test_uninitialized_rotator_reports_error() {
        let rotator =
            AttributeBufferRotator::new(AttributeSemantic::Normal, AttributeFormat::Float4);
        assert!(!rotator.is_initialized());
        match rotator.resolve(Rank::Read) {
            Err(StreamError::NotInitialized(semantic)) => {
                assert_eq!(semantic, AttributeSemantic::Normal)
            }
            other => panic!("expected NotInitialized, got {:?}", other),
        }
        assert!(rotator.buffer(Rank::Write).is_err());
    }

    #[test]
    fn test_initial_read_is_baseline() {
        let backend = create_test_backend();
        let rotator = initialized_rotator(&backend);

        assert!(rotator.reset_pending());
        assert_eq!(rotator.resolve(Rank::Read).unwrap(), ORIGINAL_INDEX);
        assert_eq!(rotator.resolve(Rank::Write).unwrap(), 0);
    }

    #[test]
    fn test_swap_rotation_period_two() {
        let backend = create_test_backend();
        let mut rotator = initialized_rotator(&backend);

        let before = rotator.current_index();
        rotator.swap();
        assert_eq!(rotator.current_index(), opposite(before));
        assert!(!rotator.reset_pending());
        rotator.swap();
        assert_eq!(rotator.current_index(), before);
    }

    #[test]
    fn test_swap_makes_previous_write_readable() {
        let backend = create_test_backend();
        let mut rotator = initialized_rotator(&backend);

        let written = rotator.resolve(Rank::Write).unwrap();
        rotator.swap();
        assert_eq!(rotator.resolve(Rank::Read).unwrap(), written);
        assert_eq!(rotator.resolve(Rank::Write).unwrap(), opposite(written));
    }

    #[test]
    fn test_reset_redirects_read_only() {
        let backend = create_test_backend();
        let mut rotator = initialized_rotator(&backend);
        rotator.swap();

        let write_before = rotator.resolve(Rank::Write).unwrap();
        rotator.reset();
        assert_eq!(rotator.resolve(Rank::Read).unwrap(), ORIGINAL_INDEX);
        assert_eq!(rotator.resolve(Rank::Write).unwrap(), write_before);
    }

    #[test]
    fn test_baseline_stable_under_reset_swap_cycles() {
        let backend = create_test_backend();
        let mut rotator = initialized_rotator(&backend);

        rotator.reset();
        let first = rotator.resolve(Rank::Read).unwrap();

        rotator.swap();
        rotator.reset();
        assert_eq!(rotator.resolve(Rank::Read).unwrap(), first);

        for _ in 0..5 {
            rotator.swap();
            rotator.swap();
            rotator.reset();
            assert_eq!(rotator.resolve(Rank::Read).unwrap(), first);
        }
    }

    #[test]
    fn test_initialize_uploads_source_to_three_buffers() {
        let backend = create_test_backend();
        let mut rotator =
            AttributeBufferRotator::new(AttributeSemantic::Color, AttributeFormat::Float4);
        let source: Vec<u8> = (0u8..64).collect();
        rotator.initialize(&backend, &source, 4, "test").unwrap();

        for rank in [Rank::Write, Rank::Original] {
            let buffer = rotator.buffer(rank).unwrap();
            assert_eq!(backend.read_buffer(buffer, 0, 64), source);
        }

        // The other ping-pong half got the same upload.
        rotator.swap();
        let other_half = rotator.buffer(Rank::Write).unwrap();
        assert_eq!(backend.read_buffer(other_half, 0, 64), source);

        // Staging starts zeroed.
        let staging = rotator.buffer(Rank::Readback).unwrap();
        assert_eq!(backend.read_buffer(staging, 0, 64), vec![0u8; 64]);
    }

    #[test]
    fn test_buffer_labels_follow_prefix() {
        let backend = create_test_backend();
        let rotator = initialized_rotator(&backend);

        let GpuBuffer::Dummy(original) = rotator.buffer(Rank::Original).unwrap().clone() else {
            panic!("expected dummy buffer");
        };
        assert_eq!(original.label(), Some("test.position.original"));

        let GpuBuffer::Dummy(staging) = rotator.buffer(Rank::Readback).unwrap().clone() else {
            panic!("expected dummy buffer");
        };
        assert_eq!(staging.label(), Some("test.position.readback"));
    }
}
