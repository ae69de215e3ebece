//! Buffer rotation: rank resolution, per-attribute rotators and the
//! coordinated attribute set.

mod buffer_set;
mod rotator;

pub use buffer_set::{AttributeSource, GeometryBufferSet};
pub use rotator::{
    opposite, resolve_rank, AttributeBufferRotator, Rank, BUFFER_COUNT, ORIGINAL_INDEX,
    READBACK_INDEX,
};
