//! Dummy GPU backend for testing and development.
//!
//! Buffers are CPU-resident byte stores, so uploads, copies and readbacks
//! round-trip real data without GPU hardware. Transfers complete
//! immediately; a readback ticket from this backend is ready as soon as it
//! is issued.

use std::sync::{Arc, Mutex};

use crate::error::{StreamError, StreamResult};
use crate::types::{BufferDescriptor, BufferUsage};

use super::{BufferCopyRegion, GpuBackend, GpuBuffer, ReadbackStatus, ReadbackTicket};

/// Largest allocation the dummy backend will accept, in bytes.
pub const MAX_BUFFER_SIZE: u64 = 1 << 30;

/// CPU-resident buffer backing the dummy backend.
pub struct DummyBuffer {
    label: Option<String>,
    size: u64,
    usage: BufferUsage,
    data: Mutex<Vec<u8>>,
}

impl DummyBuffer {
    fn new(descriptor: &BufferDescriptor) -> Self {
        Self {
            label: descriptor.label.clone(),
            size: descriptor.size,
            usage: descriptor.usage,
            data: Mutex::new(vec![0u8; descriptor.size as usize]),
        }
    }

    /// Debug label supplied at creation.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Allocated size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Usage flags supplied at creation.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn write(&self, offset: u64, bytes: &[u8]) {
        let end = offset + bytes.len() as u64;
        assert!(
            end <= self.size,
            "write of {} bytes at offset {} exceeds buffer size {}",
            bytes.len(),
            offset,
            self.size
        );
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data[offset as usize..end as usize].copy_from_slice(bytes);
    }

    fn read(&self, offset: u64, size: u64) -> Vec<u8> {
        let end = offset + size;
        assert!(
            end <= self.size,
            "read of {} bytes at offset {} exceeds buffer size {}",
            size,
            offset,
            self.size
        );
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data[offset as usize..end as usize].to_vec()
    }
}

impl std::fmt::Debug for DummyBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyBuffer")
            .field("label", &self.label)
            .field("size", &self.size)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend;

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> StreamResult<GpuBuffer> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        if descriptor.size > MAX_BUFFER_SIZE {
            return Err(StreamError::AllocationFailed {
                label: descriptor.label.clone().unwrap_or_default(),
                size: descriptor.size,
                reason: format!("exceeds dummy backend limit of {} bytes", MAX_BUFFER_SIZE),
            });
        }
        Ok(GpuBuffer::Dummy(Arc::new(DummyBuffer::new(descriptor))))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        log::trace!(
            "DummyBackend: write_buffer offset={} len={}",
            offset,
            data.len()
        );
        match buffer {
            GpuBuffer::Dummy(buffer) => buffer.write(offset, data),
            #[cfg(feature = "wgpu-backend")]
            GpuBuffer::Wgpu(_) => {}
        }
    }

    fn copy_buffer(&self, src: &GpuBuffer, dst: &GpuBuffer, region: BufferCopyRegion) {
        log::trace!("DummyBackend: copy_buffer {:?}", region);
        match (src, dst) {
            (GpuBuffer::Dummy(src), GpuBuffer::Dummy(dst)) => {
                // Staging through a temporary keeps the two locks sequential,
                // so copying a buffer onto itself cannot deadlock.
                let bytes = src.read(region.src_offset, region.size);
                dst.write(region.dst_offset, &bytes);
            }
            #[cfg(feature = "wgpu-backend")]
            _ => {}
        }
    }

    fn read_buffer(&self, buffer: &GpuBuffer, offset: u64, size: u64) -> Vec<u8> {
        log::trace!("DummyBackend: read_buffer offset={} size={}", offset, size);
        match buffer {
            GpuBuffer::Dummy(buffer) => buffer.read(offset, size),
            #[cfg(feature = "wgpu-backend")]
            GpuBuffer::Wgpu(_) => vec![0u8; size as usize],
        }
    }

    fn begin_readback(
        &self,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        region: BufferCopyRegion,
    ) -> ReadbackTicket {
        log::trace!("DummyBackend: begin_readback {:?}", region);
        self.copy_buffer(src, dst, region);
        let bytes = self.read_buffer(dst, region.dst_offset, region.size);
        ReadbackTicket::Ready { data: Some(bytes) }
    }

    fn poll_readback(&self, ticket: &mut ReadbackTicket, _block: bool) -> ReadbackStatus {
        match ticket {
            ReadbackTicket::Ready { data } => match data.take() {
                Some(bytes) => ReadbackStatus::Ready(bytes),
                None => ReadbackStatus::Failed("readback ticket has no pending data".into()),
            },
            #[cfg(feature = "wgpu-backend")]
            ReadbackTicket::Wgpu { .. } => {
                ReadbackStatus::Failed("wgpu ticket polled on dummy backend".into())
            }
        }
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);
