//! Attribute vocabulary shared by buffer sets, stages and readback.

/// Semantic meaning of a geometry attribute.
///
/// Semantics identify a logical vertex stream independent of where its
/// physical buffers currently sit in the rotation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSemantic {
    /// Vertex position (float4, w = 1).
    Position,
    /// Vertex normal (float4, w = 0).
    Normal,
    /// Texture coordinates (float4, zw unused).
    TexCoord,
    /// Vertex color (float4).
    Color,
}

impl AttributeSemantic {
    /// Number of distinct semantics.
    pub const COUNT: usize = 4;

    /// Get a unique index for this semantic (used for array storage).
    pub fn index(&self) -> usize {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::TexCoord => 2,
            Self::Color => 3,
        }
    }

    /// Lowercase name used in buffer labels and log output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::TexCoord => "uv",
            Self::Color => "color",
        }
    }

    /// All semantics in storage-index order.
    pub fn all() -> [AttributeSemantic; Self::COUNT] {
        [
            Self::Position,
            Self::Normal,
            Self::TexCoord,
            Self::Color,
        ]
    }
}

/// Data format of one attribute element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
}

impl AttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> usize {
        match self {
            Self::Float => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_indices_are_unique() {
        let mut seen = [false; AttributeSemantic::COUNT];
        for semantic in AttributeSemantic::all() {
            let index = semantic.index();
            assert!(!seen[index], "duplicate index for {:?}", semantic);
            seen[index] = true;
        }
    }

    #[test]
    fn test_all_matches_index_order() {
        for (position, semantic) in AttributeSemantic::all().iter().enumerate() {
            assert_eq!(semantic.index(), position);
        }
    }

    #[test]
    fn test_format_sizes() {
        assert_eq!(AttributeFormat::Float.size(), 4);
        assert_eq!(AttributeFormat::Float2.size(), 8);
        assert_eq!(AttributeFormat::Float3.size(), 12);
        assert_eq!(AttributeFormat::Float4.size(), 16);
    }
}
