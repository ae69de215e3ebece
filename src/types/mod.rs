//! Common types and descriptors for geometry streaming.
//!
//! This module contains the attribute vocabulary, buffer usage flags and
//! descriptor structs used throughout the crate.

mod attribute;
mod buffer;

pub use attribute::{AttributeFormat, AttributeSemantic};
pub use buffer::{BufferDescriptor, BufferUsage, UsageHint};
