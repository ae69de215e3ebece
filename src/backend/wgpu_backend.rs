//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU.

use std::sync::{mpsc, Arc};

use crate::error::{StreamError, StreamResult};
use crate::types::{BufferDescriptor, BufferUsage};

use super::{BufferCopyRegion, GpuBackend, GpuBuffer, ReadbackStatus, ReadbackTicket};

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend.
    pub fn new() -> StreamResult<Self> {
        // Create instance with all backends
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        // Request adapter
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| StreamError::BackendUnavailable(format!("No compatible GPU adapter: {e}")))?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        // Request device
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Geometry Stream Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| StreamError::BackendUnavailable(format!("Device creation failed: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    fn read_mapped(buffer: &wgpu::Buffer, offset: u64, size: u64) -> Vec<u8> {
        let slice = buffer.slice(offset..offset + size);
        let data = slice.get_mapped_range().to_vec();
        let _ = slice;
        buffer.unmap();
        data
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> StreamResult<GpuBuffer> {
        let limit = self.device.limits().max_buffer_size;
        if descriptor.size > limit {
            return Err(StreamError::AllocationFailed {
                label: descriptor.label.clone().unwrap_or_default(),
                size: descriptor.size,
                reason: format!("exceeds device limit of {} bytes", limit),
            });
        }

        let usage = convert_buffer_usage(descriptor.usage);

        // Zero-size allocations (degenerate empty geometry) are rounded up
        // to copy alignment so the handle stays copyable.
        let size = descriptor.size.max(wgpu::COPY_BUFFER_ALIGNMENT);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size,
            usage,
            mapped_at_creation: false,
        });

        Ok(GpuBuffer::Wgpu(Arc::new(buffer)))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let GpuBuffer::Wgpu(wgpu_buffer) = buffer {
            self.queue.write_buffer(wgpu_buffer, offset, data);
        }
    }

    fn copy_buffer(&self, src: &GpuBuffer, dst: &GpuBuffer, region: BufferCopyRegion) {
        if region.size == 0 {
            return;
        }
        if let (GpuBuffer::Wgpu(src_buffer), GpuBuffer::Wgpu(dst_buffer)) = (src, dst) {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Buffer Copy Encoder"),
                });
            encoder.copy_buffer_to_buffer(
                src_buffer,
                region.src_offset,
                dst_buffer,
                region.dst_offset,
                region.size,
            );
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn read_buffer(&self, buffer: &GpuBuffer, offset: u64, size: u64) -> Vec<u8> {
        if size == 0 {
            return Vec::new();
        }
        if let GpuBuffer::Wgpu(wgpu_buffer) = buffer {
            // Try to map the buffer directly first (works if buffer has MAP_READ)
            let slice = wgpu_buffer.slice(offset..offset + size);
            let (tx, rx) = mpsc::channel();
            slice.map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });

            let _ = self.device.poll(wgpu::PollType::wait_indefinitely());

            if let Ok(Ok(())) = rx.recv() {
                return Self::read_mapped(wgpu_buffer, offset, size);
            }

            // Direct mapping failed - use staging buffer approach
            // This requires the source buffer to have COPY_SRC
            let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Read Staging Buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });

            // Copy from source to staging
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Read Buffer Encoder"),
                });
            encoder.copy_buffer_to_buffer(wgpu_buffer, offset, &staging, 0, size);

            let idx = self.queue.submit(std::iter::once(encoder.finish()));

            // Wait for copy to complete
            let _ = self.device.poll(wgpu::PollType::Wait {
                submission_index: Some(idx),
                timeout: Some(std::time::Duration::from_secs(10)),
            });

            // Map and read
            let slice = staging.slice(..);
            let (tx, rx) = mpsc::channel();
            slice.map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });

            let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
            let _ = rx.recv();

            let data = slice.get_mapped_range().to_vec();
            let _ = slice;
            staging.unmap();

            data
        } else {
            vec![0u8; size as usize]
        }
    }

    fn begin_readback(
        &self,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        region: BufferCopyRegion,
    ) -> ReadbackTicket {
        if region.size == 0 {
            return ReadbackTicket::Ready {
                data: Some(Vec::new()),
            };
        }
        match (src, dst) {
            (GpuBuffer::Wgpu(src_buffer), GpuBuffer::Wgpu(dst_buffer)) => {
                let mut encoder =
                    self.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Readback Encoder"),
                        });
                encoder.copy_buffer_to_buffer(
                    src_buffer,
                    region.src_offset,
                    dst_buffer,
                    region.dst_offset,
                    region.size,
                );
                self.queue.submit(std::iter::once(encoder.finish()));

                // Map after submission; the callback fires during a later
                // device poll once the copy has landed.
                let slice = dst_buffer.slice(region.dst_offset..region.dst_offset + region.size);
                let (tx, rx) = mpsc::channel();
                slice.map_async(wgpu::MapMode::Read, move |result| {
                    let _ = tx.send(result);
                });

                ReadbackTicket::Wgpu {
                    buffer: dst_buffer.clone(),
                    receiver: rx,
                    offset: region.dst_offset,
                    size: region.size,
                }
            }
            _ => ReadbackTicket::Ready { data: None },
        }
    }

    fn poll_readback(&self, ticket: &mut ReadbackTicket, block: bool) -> ReadbackStatus {
        match ticket {
            ReadbackTicket::Ready { data } => match data.take() {
                Some(bytes) => ReadbackStatus::Ready(bytes),
                None => ReadbackStatus::Failed("readback ticket has no pending data".into()),
            },
            ReadbackTicket::Wgpu {
                buffer,
                receiver,
                offset,
                size,
            } => {
                if block {
                    let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
                    match receiver.recv() {
                        Ok(Ok(())) => {
                            ReadbackStatus::Ready(Self::read_mapped(buffer, *offset, *size))
                        }
                        Ok(Err(e)) => ReadbackStatus::Failed(e.to_string()),
                        Err(_) => {
                            ReadbackStatus::Failed("map callback dropped without result".into())
                        }
                    }
                } else {
                    let _ = self.device.poll(wgpu::PollType::Poll);
                    match receiver.try_recv() {
                        Ok(Ok(())) => {
                            ReadbackStatus::Ready(Self::read_mapped(buffer, *offset, *size))
                        }
                        Ok(Err(e)) => ReadbackStatus::Failed(e.to_string()),
                        Err(mpsc::TryRecvError::Empty) => ReadbackStatus::Pending,
                        Err(mpsc::TryRecvError::Disconnected) => {
                            ReadbackStatus::Failed("map callback dropped without result".into())
                        }
                    }
                }
            }
        }
    }
}

static_assertions::assert_impl_all!(WgpuBackend: Send, Sync);

fn convert_buffer_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut result = wgpu::BufferUsages::empty();

    if usage.contains(BufferUsage::VERTEX) {
        result |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        result |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        result |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::STORAGE) {
        result |= wgpu::BufferUsages::STORAGE;
    }
    if usage.contains(BufferUsage::COPY_SRC) {
        result |= wgpu::BufferUsages::COPY_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        result |= wgpu::BufferUsages::COPY_DST;
    }
    if usage.contains(BufferUsage::MAP_READ) {
        result |= wgpu::BufferUsages::MAP_READ;
    }
    if usage.contains(BufferUsage::MAP_WRITE) {
        result |= wgpu::BufferUsages::MAP_WRITE;
    }

    result
}
