//! Host-side geometry builders.

mod line;

pub use line::LineGeometry;
