//! Asynchronous device-to-host export of attribute data.
//!
//! A [`ReadbackChannel`] copies an attribute's current Read-rank buffer
//! into that attribute's staging buffer, then resolves the device-to-host
//! transfer over subsequent [`poll`] calls without ever blocking the frame
//! loop. Completion callbacks receive a [`ReadbackSnapshot`] that owns its
//! bytes, so the snapshot's lifetime is independent of any GPU resource.
//!
//! The channel holds its backend weakly and each pending request keeps the
//! staging buffer handle alive, so tearing down the owning geometry while
//! an export is in flight cannot leave the transfer reading freed memory.
//!
//! Failed transfers are logged and their callbacks dropped; a failed
//! export never affects rotation state or rendering.
//!
//! [`poll`]: ReadbackChannel::poll

use std::sync::{Arc, Weak};

use crate::backend::{BufferCopyRegion, GpuBackend, GpuBuffer, ReadbackStatus, ReadbackTicket};
use crate::error::{StreamError, StreamResult};
use crate::rotation::{GeometryBufferSet, Rank};
use crate::types::AttributeSemantic;

/// Host-resident copy of one attribute's data at capture time.
#[derive(Debug, Clone)]
pub struct ReadbackSnapshot {
    bytes: Vec<u8>,
    element_count: u32,
}

impl ReadbackSnapshot {
    /// Create a snapshot from captured bytes.
    pub fn new(bytes: Vec<u8>, element_count: u32) -> Self {
        Self {
            bytes,
            element_count,
        }
    }

    /// Captured bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Element count at capture time.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// Whether the snapshot captured no elements.
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Copy the bytes out as typed elements.
    ///
    /// Allocates a fresh vector, so the result never depends on the byte
    /// buffer's alignment.
    pub fn to_elements<T: bytemuck::Pod>(&self) -> Vec<T> {
        bytemuck::pod_collect_to_vec(&self.bytes)
    }

    /// Consume the snapshot, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

type ReadbackCallback = Box<dyn FnOnce(ReadbackSnapshot) + Send + 'static>;

struct PendingReadback {
    ticket: ReadbackTicket,
    semantic: AttributeSemantic,
    element_count: u32,
    // Keeps the staging buffer alive until the transfer lands, even if the
    // owning set is dropped first.
    #[allow(dead_code)]
    staging: GpuBuffer,
    callback: ReadbackCallback,
}

/// Issues asynchronous exports and pumps their completions.
///
/// Completions are delivered from [`poll`] and [`wait_idle`] on the
/// calling thread, strictly after the device copy that captured the data
/// is visible.
///
/// [`poll`]: Self::poll
/// [`wait_idle`]: Self::wait_idle
pub struct ReadbackChannel {
    backend: Weak<dyn GpuBackend>,
    pending: Vec<PendingReadback>,
}

impl ReadbackChannel {
    /// Create a channel against a backend.
    pub fn new(backend: &Arc<dyn GpuBackend>) -> Self {
        Self {
            backend: Arc::downgrade(backend),
            pending: Vec::new(),
        }
    }

    /// Number of transfers still in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether no transfer is in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Start an asynchronous export of `element_count` elements from the
    /// attribute's current Read-rank buffer.
    ///
    /// Never blocks; `on_complete` fires from a later [`poll`] or
    /// [`wait_idle`]. Fails fast, before any device work, with
    /// [`StreamError::BufferTooSmall`] if the staging buffer cannot hold
    /// the requested range, or [`StreamError::TransferUnavailable`] if the
    /// backend is gone. A zero-element request succeeds and delivers an
    /// empty snapshot.
    ///
    /// The capture races with subsequent writes to the source buffer:
    /// callers wanting a consistent snapshot must not advance rotation
    /// between the request and its completion, or must accept a torn read.
    ///
    /// [`poll`]: Self::poll
    /// [`wait_idle`]: Self::wait_idle
    pub fn request_readback(
        &mut self,
        set: &GeometryBufferSet,
        semantic: AttributeSemantic,
        element_count: u32,
        on_complete: impl FnOnce(ReadbackSnapshot) + Send + 'static,
    ) -> StreamResult<()> {
        let rotator = set.rotator(semantic)?;
        let source = rotator.buffer(Rank::Read)?.clone();
        let staging = rotator.buffer(Rank::Readback)?.clone();

        let required = element_count as u64 * rotator.stride() as u64;
        let capacity = staging.size();
        if required > capacity {
            return Err(StreamError::BufferTooSmall { required, capacity });
        }

        if element_count == 0 {
            // Degenerate export: complete through the normal pump so
            // delivery context is uniform.
            self.pending.push(PendingReadback {
                ticket: ReadbackTicket::Ready {
                    data: Some(Vec::new()),
                },
                semantic,
                element_count: 0,
                staging,
                callback: Box::new(on_complete),
            });
            return Ok(());
        }

        let backend = self.backend.upgrade().ok_or(StreamError::TransferUnavailable)?;

        log::trace!(
            "Readback requested: {} elements of {:?} from '{}'",
            element_count,
            semantic,
            set.label()
        );

        let ticket = backend.begin_readback(&source, &staging, BufferCopyRegion::whole(required));
        self.pending.push(PendingReadback {
            ticket,
            semantic,
            element_count,
            staging,
            callback: Box::new(on_complete),
        });
        Ok(())
    }

    /// Non-blocking pump: drive pending transfers forward and deliver any
    /// that completed. Returns the number of callbacks invoked.
    pub fn poll(&mut self) -> usize {
        self.pump(false)
    }

    /// Block until every pending transfer has resolved and its callback
    /// (or failure log) has been delivered.
    pub fn wait_idle(&mut self) {
        while !self.pending.is_empty() {
            self.pump(true);
        }
    }

    fn pump(&mut self, block: bool) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let backend = self.backend.upgrade();
        let mut delivered = 0;
        let mut index = 0;
        while index < self.pending.len() {
            let entry = &mut self.pending[index];
            let status = match &backend {
                Some(backend) => backend.poll_readback(&mut entry.ticket, block),
                // The backend is gone; already-captured data can still be
                // delivered, anything in flight is lost.
                None => match &mut entry.ticket {
                    ReadbackTicket::Ready { data } => match data.take() {
                        Some(bytes) => ReadbackStatus::Ready(bytes),
                        None => {
                            ReadbackStatus::Failed("readback ticket has no pending data".into())
                        }
                    },
                    #[cfg(feature = "wgpu-backend")]
                    ReadbackTicket::Wgpu { .. } => {
                        ReadbackStatus::Failed("backend dropped with readback in flight".into())
                    }
                },
            };

            match status {
                ReadbackStatus::Pending => {
                    index += 1;
                }
                ReadbackStatus::Ready(bytes) => {
                    let entry = self.pending.remove(index);
                    let snapshot = ReadbackSnapshot::new(bytes, entry.element_count);
                    (entry.callback)(snapshot);
                    delivered += 1;
                }
                ReadbackStatus::Failed(reason) => {
                    let entry = self.pending.remove(index);
                    log::warn!("Readback of {:?} failed: {}", entry.semantic, reason);
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for ReadbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadbackChannel")
            .field("pending", &self.pending.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(ReadbackChannel: Send);
