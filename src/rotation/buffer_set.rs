//! Coordinated buffer rotation across a set of geometry attributes.
//!
//! A [`GeometryBufferSet`] owns one [`AttributeBufferRotator`] per managed
//! attribute and keeps the attributes that rotate together in lockstep: one
//! [`swap`] call advances every named attribute, one [`reset`] call marks
//! them all. Attributes omitted from a swap stay static, which is how UV
//! and color streams remain single-buffered baselines while position and
//! normal ping-pong every frame.
//!
//! The set never submits device commands; it validates, allocates at
//! initialization, and afterwards only hands out buffer identities for the
//! caller to bind into compute and render command streams.
//!
//! [`swap`]: GeometryBufferSet::swap
//! [`reset`]: GeometryBufferSet::reset

use std::sync::{Arc, Weak};

use crate::backend::{GpuBackend, GpuBuffer};
use crate::error::{StreamError, StreamResult};
use crate::rotation::rotator::{AttributeBufferRotator, Rank};
use crate::types::{AttributeFormat, AttributeSemantic};

/// Authored data for one attribute, consumed by [`GeometryBufferSet::init`].
#[derive(Debug, Clone, Copy)]
pub struct AttributeSource<'a> {
    /// Attribute this data belongs to.
    pub semantic: AttributeSemantic,
    /// Element format of `data`.
    pub format: AttributeFormat,
    /// Raw element bytes, `element_count * format.size()` long.
    pub data: &'a [u8],
}

impl<'a> AttributeSource<'a> {
    /// Create a source from raw bytes.
    pub fn new(semantic: AttributeSemantic, format: AttributeFormat, data: &'a [u8]) -> Self {
        Self {
            semantic,
            format,
            data,
        }
    }

    /// Create a float4 source from a vec4 slice.
    pub fn from_vec4s(semantic: AttributeSemantic, elements: &'a [glam::Vec4]) -> Self {
        Self {
            semantic,
            format: AttributeFormat::Float4,
            data: bytemuck::cast_slice(elements),
        }
    }

    /// Number of whole elements in `data`.
    pub fn element_count(&self) -> u32 {
        (self.data.len() / self.format.size()) as u32
    }
}

/// One rotator per attribute plus the shared element count.
///
/// Holds the backend weakly: buffers keep their device resources alive
/// through their own handles, and a set outliving its backend degrades to
/// rank bookkeeping rather than keeping the device pinned.
pub struct GeometryBufferSet {
    backend: Weak<dyn GpuBackend>,
    rotators: [Option<AttributeBufferRotator>; AttributeSemantic::COUNT],
    element_count: u32,
    label: String,
}

impl GeometryBufferSet {
    /// Allocate and upload all physical buffers for the supplied sources.
    ///
    /// Every source must hold exactly `element_count` elements and each
    /// attribute may appear at most once; violations report
    /// [`StreamError::ShapeMismatch`] before any allocation happens.
    /// Allocation failures are fatal to the set (it is never observable
    /// half-initialized). `element_count == 0` is accepted and produces
    /// empty, fully functional buffers.
    pub fn init(
        backend: &Arc<dyn GpuBackend>,
        sources: &[AttributeSource<'_>],
        element_count: u32,
        label: &str,
    ) -> StreamResult<Self> {
        // Validate shapes before touching the device.
        let mut seen = [false; AttributeSemantic::COUNT];
        for source in sources {
            let index = source.semantic.index();
            if seen[index] {
                return Err(StreamError::ShapeMismatch {
                    semantic: source.semantic,
                    expected: element_count,
                    actual: source.element_count(),
                });
            }
            seen[index] = true;

            let expected_bytes = element_count as u64 * source.format.size() as u64;
            if source.data.len() as u64 != expected_bytes {
                return Err(StreamError::ShapeMismatch {
                    semantic: source.semantic,
                    expected: element_count,
                    actual: source.element_count(),
                });
            }
        }

        let mut rotators: [Option<AttributeBufferRotator>; AttributeSemantic::COUNT] =
            Default::default();
        for source in sources {
            let mut rotator = AttributeBufferRotator::new(source.semantic, source.format);
            rotator.initialize(backend, source.data, element_count, label)?;
            rotators[source.semantic.index()] = Some(rotator);
        }

        log::trace!(
            "Created geometry buffer set '{}': {} attributes, {} elements",
            label,
            sources.len(),
            element_count
        );

        Ok(Self {
            backend: Arc::downgrade(backend),
            rotators,
            element_count,
            label: label.to_owned(),
        })
    }

    /// Debug label supplied at initialization.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shared element count across all attributes.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// Upgrade the backend reference, if the backend is still alive.
    pub fn backend(&self) -> Option<Arc<dyn GpuBackend>> {
        self.backend.upgrade()
    }

    /// Whether the set manages the given attribute.
    pub fn has_attribute(&self, semantic: AttributeSemantic) -> bool {
        self.rotators[semantic.index()].is_some()
    }

    /// Registered attributes in storage order.
    pub fn attributes(&self) -> impl Iterator<Item = AttributeSemantic> + '_ {
        self.rotators
            .iter()
            .filter_map(|slot| slot.as_ref().map(AttributeBufferRotator::semantic))
    }

    /// Access the rotator for an attribute.
    pub fn rotator(&self, semantic: AttributeSemantic) -> StreamResult<&AttributeBufferRotator> {
        self.rotators[semantic.index()]
            .as_ref()
            .ok_or(StreamError::UnknownAttribute(semantic))
    }

    /// Resolve an attribute's rank to a physical buffer index.
    pub fn resolve(&self, semantic: AttributeSemantic, rank: Rank) -> StreamResult<usize> {
        self.rotator(semantic)?.resolve(rank)
    }

    /// Resolve an attribute's rank to its physical buffer.
    pub fn buffer(&self, semantic: AttributeSemantic, rank: Rank) -> StreamResult<&GpuBuffer> {
        self.rotator(semantic)?.buffer(rank)
    }

    /// Advance rotation for the named attributes in lockstep.
    ///
    /// Validates every name first: an unknown attribute fails the whole
    /// call with no rotator advanced, so a swap group can never end up
    /// half rotated.
    pub fn swap(&mut self, attributes: &[AttributeSemantic]) -> StreamResult<()> {
        self.validate_subset(attributes)?;
        for semantic in attributes {
            if let Some(rotator) = self.rotators[semantic.index()].as_mut() {
                rotator.swap();
            }
        }
        log::trace!("Swapped {} attributes in '{}'", attributes.len(), self.label);
        Ok(())
    }

    /// Mark a pending reset on the named attributes.
    ///
    /// Their next resolved Read is the baseline until a later [`swap`]
    /// consumes the mark. Attributes not named keep whatever state they
    /// had, so geometry can revert while color animation keeps running.
    ///
    /// [`swap`]: Self::swap
    pub fn reset(&mut self, attributes: &[AttributeSemantic]) -> StreamResult<()> {
        self.validate_subset(attributes)?;
        for semantic in attributes {
            if let Some(rotator) = self.rotators[semantic.index()].as_mut() {
                rotator.reset();
            }
        }
        log::trace!("Reset {} attributes in '{}'", attributes.len(), self.label);
        Ok(())
    }

    fn validate_subset(&self, attributes: &[AttributeSemantic]) -> StreamResult<()> {
        for semantic in attributes {
            if !self.has_attribute(*semantic) {
                return Err(StreamError::UnknownAttribute(*semantic));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for GeometryBufferSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBufferSet")
            .field("label", &self.label)
            .field("element_count", &self.element_count)
            .field("attributes", &self.attributes().collect::<Vec<_>>())
            .finish()
    }
}

static_assertions::assert_impl_all!(GeometryBufferSet: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::rotation::rotator::ORIGINAL_INDEX;

    fn create_test_backend() -> Arc<dyn GpuBackend> {
        Arc::new(DummyBackend::new())
    }

    fn vec4_data(count: usize, fill: f32) -> Vec<glam::Vec4> {
        vec![glam::Vec4::splat(fill); count]
    }

    fn create_test_set(backend: &Arc<dyn GpuBackend>, count: usize) -> GeometryBufferSet {
        let positions = vec4_data(count, 1.0);
        let normals = vec4_data(count, 2.0);
        let uvs = vec4_data(count, 3.0);
        let colors = vec4_data(count, 4.0);
        let sources = [
            AttributeSource::from_vec4s(AttributeSemantic::Position, &positions),
            AttributeSource::from_vec4s(AttributeSemantic::Normal, &normals),
            AttributeSource::from_vec4s(AttributeSemantic::TexCoord, &uvs),
            AttributeSource::from_vec4s(AttributeSemantic::Color, &colors),
        ];
        GeometryBufferSet::init(backend, &sources, count as u32, "test").unwrap()
    }

    #[test]
    fn test_init_registers_all_attributes() {
        let backend = create_test_backend();
        let set = create_test_set(&backend, 8);

        assert_eq!(set.element_count(), 8);
        assert_eq!(set.attributes().count(), 4);
        for semantic in AttributeSemantic::all() {
            assert!(set.has_attribute(semantic));
            assert_eq!(set.resolve(semantic, Rank::Read).unwrap(), ORIGINAL_INDEX);
        }
    }

    #[test]
    fn test_init_rejects_mismatched_counts() {
        let backend = create_test_backend();
        let positions = vec4_data(8, 1.0);
        let normals = vec4_data(4, 2.0);
        let sources = [
            AttributeSource::from_vec4s(AttributeSemantic::Position, &positions),
            AttributeSource::from_vec4s(AttributeSemantic::Normal, &normals),
        ];

        match GeometryBufferSet::init(&backend, &sources, 8, "test") {
            Err(StreamError::ShapeMismatch {
                semantic,
                expected,
                actual,
            }) => {
                assert_eq!(semantic, AttributeSemantic::Normal);
                assert_eq!(expected, 8);
                assert_eq!(actual, 4);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_init_rejects_duplicate_attribute() {
        let backend = create_test_backend();
        let positions = vec4_data(8, 1.0);
        let sources = [
            AttributeSource::from_vec4s(AttributeSemantic::Position, &positions),
            AttributeSource::from_vec4s(AttributeSemantic::Position, &positions),
        ];

        match GeometryBufferSet::init(&backend, &sources, 8, "test") {
            Err(StreamError::ShapeMismatch { semantic, .. }) => {
                assert_eq!(semantic, AttributeSemantic::Position)
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unregistered_attribute_is_unknown() {
        let backend = create_test_backend();
        let positions = vec4_data(8, 1.0);
        let sources = [AttributeSource::from_vec4s(
            AttributeSemantic::Position,
            &positions,
        )];
        let set = GeometryBufferSet::init(&backend, &sources, 8, "test").unwrap();

        match set.buffer(AttributeSemantic::Color, Rank::Read) {
            Err(StreamError::UnknownAttribute(semantic)) => {
                assert_eq!(semantic, AttributeSemantic::Color)
            }
            other => panic!("expected unknown attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_lockstep_swap_advances_named_attributes_only() {
        let backend = create_test_backend();
        let mut set = create_test_set(&backend, 8);
        let rotating = [AttributeSemantic::Position, AttributeSemantic::Normal];

        set.swap(&rotating).unwrap();

        for semantic in rotating {
            let rotator = set.rotator(semantic).unwrap();
            assert!(!rotator.reset_pending());
            assert_eq!(rotator.current_index(), 1);
        }
        // Untouched attributes never left the baseline.
        for semantic in [AttributeSemantic::TexCoord, AttributeSemantic::Color] {
            assert_eq!(set.resolve(semantic, Rank::Read).unwrap(), ORIGINAL_INDEX);
            assert_eq!(set.rotator(semantic).unwrap().current_index(), 0);
        }
    }

    #[test]
    fn test_failed_swap_leaves_state_untouched() {
        let backend = create_test_backend();
        let positions = vec4_data(8, 1.0);
        let sources = [AttributeSource::from_vec4s(
            AttributeSemantic::Position,
            &positions,
        )];
        let mut set = GeometryBufferSet::init(&backend, &sources, 8, "test").unwrap();

        let before = set.resolve(AttributeSemantic::Position, Rank::Write).unwrap();
        let result = set.swap(&[AttributeSemantic::Position, AttributeSemantic::Normal]);
        assert!(matches!(
            result,
            Err(StreamError::UnknownAttribute(AttributeSemantic::Normal))
        ));

        // Two-phase validation: position did not advance.
        assert_eq!(
            set.resolve(AttributeSemantic::Position, Rank::Write).unwrap(),
            before
        );
        assert!(set.rotator(AttributeSemantic::Position).unwrap().reset_pending());
    }

    #[test]
    fn test_reset_subset_keeps_others_rotating() {
        let backend = create_test_backend();
        let mut set = create_test_set(&backend, 8);
        let all = [
            AttributeSemantic::Position,
            AttributeSemantic::Normal,
            AttributeSemantic::Color,
        ];
        set.swap(&all).unwrap();

        set.reset(&[AttributeSemantic::Position, AttributeSemantic::Normal])
            .unwrap();

        assert_eq!(
            set.resolve(AttributeSemantic::Position, Rank::Read).unwrap(),
            ORIGINAL_INDEX
        );
        assert_eq!(
            set.resolve(AttributeSemantic::Normal, Rank::Read).unwrap(),
            ORIGINAL_INDEX
        );
        // Color stays on the ping-pong pair.
        assert_ne!(
            set.resolve(AttributeSemantic::Color, Rank::Read).unwrap(),
            ORIGINAL_INDEX
        );
    }

    #[test]
    fn test_zero_element_set() {
        let backend = create_test_backend();
        let sources = [AttributeSource::new(
            AttributeSemantic::Position,
            AttributeFormat::Float4,
            &[],
        )];
        let mut set = GeometryBufferSet::init(&backend, &sources, 0, "empty").unwrap();

        assert_eq!(set.element_count(), 0);
        assert!(set.resolve(AttributeSemantic::Position, Rank::Read).is_ok());
        set.swap(&[AttributeSemantic::Position]).unwrap();
        assert!(set.buffer(AttributeSemantic::Position, Rank::Read).is_ok());
    }

    #[test]
    fn test_backend_reference_is_weak() {
        let backend = create_test_backend();
        let set = create_test_set(&backend, 4);

        assert!(set.backend().is_some());
        drop(backend);
        assert!(set.backend().is_none());

        // Buffers stay alive through their own handles.
        assert!(set.buffer(AttributeSemantic::Position, Rank::Read).is_ok());
    }
}
