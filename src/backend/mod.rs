//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction over the device operations
//! the streaming core needs: buffer creation, host uploads, buffer-to-buffer
//! copies and asynchronous device-to-host readback.
//!
//! # Available Backends
//!
//! - `dummy` (default): CPU-resident backend for tests and development
//! - `wgpu-backend`: cross-platform GPU backend using wgpu
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait. Rotation and readback
//! components hold the backend behind `Arc<dyn GpuBackend>` (weakly, where
//! the component must not keep the device alive) and treat buffer handles
//! as opaque identities to bind into command streams.

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub mod dummy;

pub use dummy::DummyBackend;
#[cfg(feature = "wgpu-backend")]
pub use wgpu_backend::WgpuBackend;

use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::types::BufferDescriptor;

use dummy::DummyBuffer;

/// Handle to a GPU buffer resource.
///
/// Handles are cheap to clone; the underlying device resource lives until
/// the last clone drops, so an in-flight readback keeps its staging buffer
/// alive even if the owning set is torn down first.
#[derive(Debug, Clone)]
pub enum GpuBuffer {
    /// Dummy backend buffer (CPU-resident byte store)
    Dummy(Arc<DummyBuffer>),
    /// wgpu backend buffer
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Buffer>),
}

impl GpuBuffer {
    /// Allocated size of the underlying resource in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Self::Dummy(buffer) => buffer.size(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(buffer) => buffer.size(),
        }
    }
}

/// Byte range of a buffer-to-buffer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferCopyRegion {
    /// Offset into the source buffer in bytes.
    pub src_offset: u64,
    /// Offset into the destination buffer in bytes.
    pub dst_offset: u64,
    /// Number of bytes to copy.
    pub size: u64,
}

impl BufferCopyRegion {
    /// Create a copy region with explicit offsets.
    pub fn new(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        Self {
            src_offset,
            dst_offset,
            size,
        }
    }

    /// Create a copy region covering `size` bytes from the start of both buffers.
    pub fn whole(size: u64) -> Self {
        Self {
            src_offset: 0,
            dst_offset: 0,
            size,
        }
    }
}

/// In-flight device-to-host transfer returned by [`GpuBackend::begin_readback`].
///
/// Resolved by [`GpuBackend::poll_readback`]; the ticket owns whatever the
/// backend needs to finish the transfer, including a handle that keeps the
/// staging buffer alive.
pub enum ReadbackTicket {
    /// Transfer already captured (dummy backend, and zero-byte transfers
    /// on any backend).
    Ready { data: Option<Vec<u8>> },
    /// wgpu map operation in flight, resolved by polling the device.
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        buffer: Arc<wgpu::Buffer>,
        receiver: std::sync::mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
        offset: u64,
        size: u64,
    },
}

impl std::fmt::Debug for ReadbackTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready { data } => f
                .debug_struct("ReadbackTicket::Ready")
                .field("bytes", &data.as_ref().map(Vec::len))
                .finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu { offset, size, .. } => f
                .debug_struct("ReadbackTicket::Wgpu")
                .field("offset", offset)
                .field("size", size)
                .finish_non_exhaustive(),
        }
    }
}

/// Outcome of polling a [`ReadbackTicket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadbackStatus {
    /// Transfer still in flight.
    Pending,
    /// Transfer landed; the captured byte range.
    Ready(Vec<u8>),
    /// Transfer failed (map error or lost device). The ticket is dead.
    Failed(String),
}

/// GPU backend trait for abstracting different GPU APIs.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> StreamResult<GpuBuffer>;

    /// Write data to a buffer at the given byte offset.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Enqueue a buffer-to-buffer copy on the transfer queue.
    fn copy_buffer(&self, src: &GpuBuffer, dst: &GpuBuffer, region: BufferCopyRegion);

    /// Read data from a buffer.
    ///
    /// This is a blocking operation that waits for the GPU to finish.
    fn read_buffer(&self, buffer: &GpuBuffer, offset: u64, size: u64) -> Vec<u8>;

    /// Copy `region` from `src` into the mappable `dst`, then start an
    /// asynchronous map of the copied range.
    ///
    /// Never blocks. Failures surface when the returned ticket is polled.
    fn begin_readback(
        &self,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        region: BufferCopyRegion,
    ) -> ReadbackTicket;

    /// Drive a pending readback forward.
    ///
    /// With `block = false` this performs a single non-blocking device poll;
    /// with `block = true` it waits until the transfer resolves. A ticket
    /// that returned [`ReadbackStatus::Ready`] or [`ReadbackStatus::Failed`]
    /// must not be polled again.
    fn poll_readback(&self, ticket: &mut ReadbackTicket, block: bool) -> ReadbackStatus;
}

/// Selects and creates the appropriate backend based on available features.
pub fn create_backend() -> Result<Arc<dyn GpuBackend>, StreamError> {
    // Try wgpu backend if available
    #[cfg(feature = "wgpu-backend")]
    {
        match wgpu_backend::WgpuBackend::new() {
            Ok(backend) => {
                log::info!("Using wgpu backend");
                return Ok(Arc::new(backend));
            }
            Err(e) => {
                log::warn!("Failed to create wgpu backend: {}", e);
            }
        }
    }

    // Fall back to dummy backend
    log::info!("Using dummy backend");
    Ok(Arc::new(dummy::DummyBackend::new()))
}

/// Check if a real GPU backend is available.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "wgpu-backend")
}
