//! Per-frame glue between rotation state and the compute/render stages.
//!
//! The stages themselves are opaque: [`FrameCycle::advance`] resolves
//! which physical buffers play which role this frame, hands them to the
//! producer as named bindings, advances rotation, then hands the settled
//! read-side to the consumer. The cycle never records device commands
//! itself.
//!
//! [`WaveDriver`] and [`StageSeed`] carry the animation parameters the
//! compute collaborator consumes: a smoothed uniform block and a fixed
//! per-instance random offset.

use glam::Vec3;

use crate::backend::GpuBuffer;
use crate::error::StreamResult;
use crate::rotation::{GeometryBufferSet, Rank};
use crate::smoothing::SmoothedParameter;
use crate::types::AttributeSemantic;

/// Shader-facing binding names shared by producers and consumers.
pub mod binding {
    use crate::types::AttributeSemantic;

    pub const IN_POSITIONS: &str = "InPositions";
    pub const IN_NORMALS: &str = "InNormals";
    pub const IN_UVS: &str = "InUVs";
    pub const IN_COLORS: &str = "InColors";
    pub const OUT_POSITIONS: &str = "OutPositions";
    pub const OUT_NORMALS: &str = "OutNormals";
    pub const OUT_UVS: &str = "OutUVs";
    pub const OUT_COLORS: &str = "OutColors";

    /// Name under which an attribute's read-side buffer is bound.
    pub fn input_name(semantic: AttributeSemantic) -> &'static str {
        match semantic {
            AttributeSemantic::Position => IN_POSITIONS,
            AttributeSemantic::Normal => IN_NORMALS,
            AttributeSemantic::TexCoord => IN_UVS,
            AttributeSemantic::Color => IN_COLORS,
        }
    }

    /// Name under which an attribute's write-side buffer is bound.
    pub fn output_name(semantic: AttributeSemantic) -> &'static str {
        match semantic {
            AttributeSemantic::Position => OUT_POSITIONS,
            AttributeSemantic::Normal => OUT_NORMALS,
            AttributeSemantic::TexCoord => OUT_UVS,
            AttributeSemantic::Color => OUT_COLORS,
        }
    }
}

/// One resolved buffer handed to a stage under its contract name.
#[derive(Debug, Clone)]
pub struct StageBinding {
    pub name: &'static str,
    pub semantic: AttributeSemantic,
    pub rank: Rank,
    pub buffer: GpuBuffer,
}

/// Records the frame's geometry-producing work against resolved bindings.
///
/// Receives every registered attribute at Read rank plus, for attributes
/// in the rotating subset, a Write-rank output binding.
pub trait ComputeStage {
    fn encode(&mut self, bindings: &[StageBinding]);
}

/// Records the frame's drawing work against resolved bindings.
///
/// Receives every registered attribute at Read rank, resolved after the
/// frame's swap, so the bindings are exactly what the producer finished
/// writing (or the baseline while a reset is pending).
pub trait RenderStage {
    fn encode(&mut self, bindings: &[StageBinding]);
}

/// Drives the produce, swap, consume sequence once per frame.
///
/// Holds the subset of attributes that rotate and a deferred reset flag;
/// rotation state itself lives in the [`GeometryBufferSet`].
#[derive(Debug, Clone)]
pub struct FrameCycle {
    rotating: Vec<AttributeSemantic>,
    reset_requested: bool,
}

impl FrameCycle {
    /// Create a cycle rotating the given attributes each frame.
    ///
    /// Attributes left out stay on their baseline: their Read keeps
    /// resolving to the authored snapshot.
    pub fn new(rotating: &[AttributeSemantic]) -> Self {
        Self {
            rotating: rotating.to_vec(),
            reset_requested: false,
        }
    }

    /// Attributes advanced by each frame's swap.
    pub fn rotating(&self) -> &[AttributeSemantic] {
        &self.rotating
    }

    /// Ask for the rotating attributes to revert to their baseline at the
    /// start of the next frame. Idempotent until the frame consumes it.
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    /// Whether a reset is queued for the next frame.
    pub fn reset_requested(&self) -> bool {
        self.reset_requested
    }

    /// Run one frame: apply a queued reset, bind and invoke the producer,
    /// swap the rotating subset, then bind and invoke the consumer.
    ///
    /// The producer's outputs become the consumer's inputs within the
    /// same frame; the consumer never sees a buffer the producer is still
    /// targeting.
    pub fn advance(
        &mut self,
        set: &mut GeometryBufferSet,
        producer: &mut dyn ComputeStage,
        consumer: &mut dyn RenderStage,
    ) -> StreamResult<()> {
        if self.reset_requested {
            set.reset(&self.rotating)?;
            self.reset_requested = false;
        }

        let registered: Vec<AttributeSemantic> = set.attributes().collect();

        let mut bindings = Vec::with_capacity(registered.len() + self.rotating.len());
        for &semantic in &registered {
            bindings.push(StageBinding {
                name: binding::input_name(semantic),
                semantic,
                rank: Rank::Read,
                buffer: set.buffer(semantic, Rank::Read)?.clone(),
            });
            if self.rotating.contains(&semantic) {
                bindings.push(StageBinding {
                    name: binding::output_name(semantic),
                    semantic,
                    rank: Rank::Write,
                    buffer: set.buffer(semantic, Rank::Write)?.clone(),
                });
            }
        }
        producer.encode(&bindings);

        set.swap(&self.rotating)?;

        let mut bindings = Vec::with_capacity(registered.len());
        for &semantic in &registered {
            bindings.push(StageBinding {
                name: binding::input_name(semantic),
                semantic,
                rank: Rank::Read,
                buffer: set.buffer(semantic, Rank::Read)?.clone(),
            });
        }
        consumer.encode(&bindings);

        Ok(())
    }
}

/// Uniform block consumed by the wave compute stage.
///
/// Layout is the shader contract: six floats, the element count, and
/// explicit padding to a 32-byte block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaveUniforms {
    pub elapsed_time: f32,
    pub wavelength: f32,
    pub amplitude: f32,
    pub offset: f32,
    pub shift: f32,
    pub peak: f32,
    pub count: u32,
    pub _padding: u32,
}

/// Raw wave targets before smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub clock_speed: f32,
    pub wavelength: f32,
    pub amplitude: f32,
    pub offset: f32,
    pub shift: f32,
    pub peak: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            clock_speed: 1.0,
            wavelength: 1.0,
            amplitude: 1.0,
            offset: 0.0,
            shift: 0.0,
            peak: 1.0,
        }
    }
}

/// Smooths wave targets frame to frame and accumulates animation time.
///
/// Time advances at the smoothed clock speed, so slowing the animation
/// down eases in instead of stuttering. The accumulator is f64: per-frame
/// increments stay precise over long sessions even though the uniform
/// block truncates to f32.
#[derive(Debug, Clone)]
pub struct WaveDriver {
    clock_speed: SmoothedParameter<f32>,
    wavelength: SmoothedParameter<f32>,
    amplitude: SmoothedParameter<f32>,
    offset: SmoothedParameter<f32>,
    shift: SmoothedParameter<f32>,
    peak: SmoothedParameter<f32>,
    clock_multiplier: f32,
    elapsed: f64,
}

impl WaveDriver {
    /// Create a driver settled at `initial`, smoothing every parameter
    /// over `smooth_time` seconds.
    pub fn new(initial: WaveParams, smooth_time: f32) -> Self {
        Self {
            clock_speed: SmoothedParameter::new(initial.clock_speed, smooth_time),
            wavelength: SmoothedParameter::new(initial.wavelength, smooth_time),
            amplitude: SmoothedParameter::new(initial.amplitude, smooth_time),
            offset: SmoothedParameter::new(initial.offset, smooth_time),
            shift: SmoothedParameter::new(initial.shift, smooth_time),
            peak: SmoothedParameter::new(initial.peak, smooth_time),
            clock_multiplier: 1.0,
            elapsed: 0.0,
        }
    }

    /// Scale how fast animation time accumulates relative to wall time.
    pub fn with_clock_multiplier(mut self, multiplier: f32) -> Self {
        self.clock_multiplier = multiplier;
        self
    }

    /// Accumulated animation time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Retarget every parameter and advance the smoothers by `dt` seconds.
    pub fn update(&mut self, targets: &WaveParams, dt: f32) {
        self.clock_speed.set_target(targets.clock_speed);
        self.wavelength.set_target(targets.wavelength);
        self.amplitude.set_target(targets.amplitude);
        self.offset.set_target(targets.offset);
        self.shift.set_target(targets.shift);
        self.peak.set_target(targets.peak);

        let speed = self.clock_speed.update(dt);
        self.wavelength.update(dt);
        self.amplitude.update(dt);
        self.offset.update(dt);
        self.shift.update(dt);
        self.peak.update(dt);

        self.elapsed += (dt * speed * self.clock_multiplier) as f64;
    }

    /// Snapshot the current smoothed state as a uniform block.
    pub fn uniforms(&self, element_count: u32) -> WaveUniforms {
        WaveUniforms {
            elapsed_time: self.elapsed as f32,
            wavelength: self.wavelength.value(),
            amplitude: self.amplitude.value(),
            offset: self.offset.value(),
            shift: self.shift.value(),
            peak: self.peak.value(),
            count: element_count,
            _padding: 0,
        }
    }
}

/// Per-instance random offsets for the procedural stage.
///
/// Generated once at initialization and threaded as plain configuration,
/// so two instances animate differently while each stays deterministic
/// after setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSeed(pub Vec3);

impl StageSeed {
    /// Three uniform offsets in `0..1000`.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self(Vec3::new(
            rng.gen_range(0.0..1000.0),
            rng.gen_range(0.0..1000.0),
            rng.gen_range(0.0..1000.0),
        ))
    }

    /// Fixed seed for reproducible setups.
    pub fn from_value(seed: Vec3) -> Self {
        Self(seed)
    }
}
