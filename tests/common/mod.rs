//! Common utilities for streaming integration tests.
//!
//! Provides the backend parameterization and context setup shared by the
//! integration suites, so each test body only deals with geometry and
//! rotation semantics.

use std::sync::Arc;

use glam::Vec4;

use geometry_stream::backend::DummyBackend;
use geometry_stream::{AttributeSemantic, AttributeSource, GeometryBufferSet, GpuBackend};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (CPU byte store, always available).
    Dummy,
    /// wgpu backend (real device, feature- and hardware-dependent).
    Wgpu,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::Wgpu => true,
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::Wgpu => false,
        }
    }

    /// Get the backend name for display.
    #[allow(dead_code)]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Dummy => "dummy",
            Backend::Wgpu => "wgpu",
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context owning the backend under test.
pub struct TestContext {
    /// The backend being tested.
    #[allow(dead_code)]
    pub backend: Backend,
    /// Device abstraction for resource operations.
    pub gpu: Arc<dyn GpuBackend>,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not compiled in or (for wgpu) no
    /// adapter can be acquired on this machine.
    pub fn new(backend: Backend) -> Option<Self> {
        if !backend.is_available() {
            return None;
        }
        let _ = env_logger::builder().is_test(true).try_init();

        let gpu: Arc<dyn GpuBackend> = match backend {
            Backend::Dummy => Arc::new(DummyBackend::new()),
            #[cfg(feature = "wgpu-backend")]
            Backend::Wgpu => {
                Arc::new(geometry_stream::backend::WgpuBackend::new().ok()?)
            }
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::Wgpu => return None,
        };

        Some(Self { backend, gpu })
    }

    /// Build a position-only set with the standard test pattern.
    pub fn create_position_set(&self, element_count: u32, label: &str) -> GeometryBufferSet {
        let positions = position_pattern(element_count);
        let sources = [AttributeSource::from_vec4s(
            AttributeSemantic::Position,
            &positions,
        )];
        GeometryBufferSet::init(&self.gpu, &sources, element_count, label)
            .expect("Failed to create geometry buffer set")
    }
}

// ============================================================================
// Test Data Generators
// ============================================================================

/// Deterministic per-element vec4 pattern for position sources.
pub fn position_pattern(element_count: u32) -> Vec<Vec4> {
    (0..element_count)
        .map(|i| {
            let f = i as f32;
            Vec4::new(f, f * 2.0, f * 3.0, 1.0)
        })
        .collect()
}

/// Generate a byte pattern for buffer writes.
#[allow(dead_code)]
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
