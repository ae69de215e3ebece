use glam::{Vec3, Vec4};

use crate::rotation::AttributeSource;
use crate::types::AttributeSemantic;

/// Facet normals are computed in the XY plane; this is the axis the
/// tangent is crossed with.
const NORMAL_AXIS: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// CPU-side vertex data for a line strip.
///
/// All attributes are stored as four-component vectors so they can be
/// uploaded without repacking: positions carry `w == 1.0`, normals and
/// texture coordinates carry `w == 0.0`, colors are RGBA.
#[derive(Debug, Clone)]
pub struct LineGeometry {
    positions: Vec<Vec4>,
    normals: Vec<Vec4>,
    uvs: Vec<Vec4>,
    colors: Vec<Vec4>,
}

impl LineGeometry {
    /// Build an evenly subdivided segment from `start` to `end`.
    ///
    /// A strip needs at least two vertices, so `count` is clamped to 2.
    /// Texture coordinates run 0 to 1 along the strip and colors default
    /// to opaque white.
    pub fn strip(start: Vec3, end: Vec3, count: u32) -> Self {
        let count = count.max(2) as usize;
        let step = 1.0 / (count - 1) as f32;

        let mut positions = Vec::with_capacity(count);
        let mut uvs = Vec::with_capacity(count);
        for i in 0..count {
            let t = i as f32 * step;
            positions.push(start.lerp(end, t).extend(1.0));
            uvs.push(Vec4::new(t, 0.0, 0.0, 0.0));
        }

        let mut geometry = Self {
            positions,
            normals: vec![Vec4::ZERO; count],
            uvs,
            colors: vec![Vec4::ONE; count],
        };
        geometry.recompute_normals();
        geometry
    }

    /// Build a strip from explicit points.
    ///
    /// Texture coordinates are spread by vertex index, not arc length.
    pub fn from_polyline(points: &[Vec3]) -> Self {
        let count = points.len();
        let step = if count > 1 {
            1.0 / (count - 1) as f32
        } else {
            0.0
        };

        let positions = points.iter().map(|p| p.extend(1.0)).collect();
        let uvs = (0..count)
            .map(|i| Vec4::new(i as f32 * step, 0.0, 0.0, 0.0))
            .collect();

        let mut geometry = Self {
            positions,
            normals: vec![Vec4::ZERO; count],
            uvs,
            colors: vec![Vec4::ONE; count],
        };
        geometry.recompute_normals();
        geometry
    }

    /// Number of vertices in the strip.
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn positions(&self) -> &[Vec4] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec4] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec4] {
        &self.uvs
    }

    pub fn colors(&self) -> &[Vec4] {
        &self.colors
    }

    /// Fill every vertex with one color.
    pub fn set_color(&mut self, color: Vec4) {
        self.colors.fill(color);
    }

    /// Recompute per-vertex normals from the current positions.
    ///
    /// Interior vertices blend the directions of their two adjacent
    /// segments; the first vertex uses its outgoing segment and the last
    /// vertex copies its predecessor. Degenerate segments produce zero
    /// normals instead of NaNs.
    pub fn recompute_normals(&mut self) {
        let count = self.positions.len();
        if count < 2 {
            return;
        }

        let position = |i: usize| self.positions[i].truncate();

        for i in 1..count - 1 {
            let outgoing = (position(i + 1) - position(i)).normalize_or_zero();
            let incoming = (position(i) - position(i - 1)).normalize_or_zero();
            let tangent = outgoing.lerp(incoming, 0.5).normalize_or_zero();
            self.normals[i] = tangent.cross(NORMAL_AXIS).extend(0.0);
        }

        let first = (position(1) - position(0)).normalize_or_zero();
        self.normals[0] = first.cross(NORMAL_AXIS).extend(0.0);
        self.normals[count - 1] = self.normals[count - 2];
    }

    /// Borrow the vertex data as upload sources, one per attribute.
    pub fn sources(&self) -> [AttributeSource<'_>; 4] {
        [
            AttributeSource::from_vec4s(AttributeSemantic::Position, &self.positions),
            AttributeSource::from_vec4s(AttributeSemantic::Normal, &self.normals),
            AttributeSource::from_vec4s(AttributeSemantic::TexCoord, &self.uvs),
            AttributeSource::from_vec4s(AttributeSemantic::Color, &self.colors),
        ]
    }
}
