//! # Geometry Stream
//!
//! Multi-buffered geometry streaming between a per-frame compute stage and
//! a render stage, with on-demand baseline reset and asynchronous readback.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`AttributeBufferRotator`] - Rank resolution over one attribute's ping-pong pair, baseline and staging buffers
//! - [`GeometryBufferSet`] - Lockstep rotation across the attributes of one geometry
//! - [`ReadbackChannel`] - Asynchronous device-to-host export of current geometry
//! - [`FrameCycle`] - The produce, swap, consume ordering of a frame
//! - Multiple backend support: wgpu and Dummy (for testing)
//!
//! ## Example
//!
//! ```ignore
//! use geometry_stream::{AttributeSemantic, FrameCycle, GeometryBufferSet, LineGeometry};
//!
//! let backend = geometry_stream::backend::create_backend()?;
//! let line = LineGeometry::strip(start, end, 64);
//! let mut set = GeometryBufferSet::init(&backend, &line.sources(), 64, "line")?;
//! let mut cycle = FrameCycle::new(&[AttributeSemantic::Position, AttributeSemantic::Normal]);
//!
//! // Each frame: compute writes, rotation advances, render reads.
//! cycle.advance(&mut set, &mut compute, &mut render)?;
//! ```

pub mod backend;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod readback;
pub mod rotation;
pub mod smoothing;
pub mod types;

// Re-export main types for convenience
pub use backend::{create_backend, DummyBackend, GpuBackend, GpuBuffer};
pub use error::{StreamError, StreamResult};
pub use frame::{
    ComputeStage, FrameCycle, RenderStage, StageBinding, StageSeed, WaveDriver, WaveParams,
    WaveUniforms,
};
pub use mesh::LineGeometry;
pub use readback::{ReadbackChannel, ReadbackSnapshot};
pub use rotation::{AttributeBufferRotator, AttributeSource, GeometryBufferSet, Rank};
pub use smoothing::{Smoothable, SmoothedParameter};
pub use types::{AttributeFormat, AttributeSemantic, BufferDescriptor, BufferUsage, UsageHint};

/// Streaming library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the streaming subsystem.
///
/// This should be called before using any streaming functionality.
pub fn init() {
    log::info!("Geometry Stream v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert!(backend.name() == "Dummy Backend");
    }

    #[test]
    fn test_rank_resolution_needs_no_device() {
        assert_eq!(rotation::resolve_rank(Rank::Original, 0, false), 2);
        assert_eq!(rotation::resolve_rank(Rank::Readback, 1, true), 3);
    }
}
