use fnv::FnvHasher;
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Scalar/vector type of one vertex attribute
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum VertexElementType {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    UByte4,
    UByte4Norm,
}

impl VertexElementType {
    pub fn size_in_bytes(self) -> u32 {
        match self {
            VertexElementType::Int => 4,
            VertexElementType::Float => 4,
            VertexElementType::Vec2 => 8,
            VertexElementType::Vec3 => 12,
            VertexElementType::Vec4 => 16,
            VertexElementType::UByte4 => 4,
            VertexElementType::UByte4Norm => 4,
        }
    }
}

/// What a vertex attribute feeds in the shader. A (semantic, semantic_index) pair
/// identifies one attribute; shaders request inputs by the same pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum VertexElementSemantic {
    Position,
    Normal,
    Binormal,
    Tangent,
    Color,
    TexCoord,
    BlendWeights,
    BlendIndices,
    ObjectIndex,
}

/// One attribute as declared when creating a vertex buffer. Offsets within the interleaved
/// layout are derived, not declared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct VertexElement {
    pub semantic: VertexElementSemantic,
    pub semantic_index: u8,
    pub element_type: VertexElementType,
    pub per_instance: bool,
}

impl VertexElement {
    pub fn new(
        semantic: VertexElementSemantic,
        element_type: VertexElementType,
    ) -> Self {
        VertexElement {
            semantic,
            semantic_index: 0,
            element_type,
            per_instance: false,
        }
    }

    pub fn with_index(
        semantic: VertexElementSemantic,
        semantic_index: u8,
        element_type: VertexElementType,
    ) -> Self {
        VertexElement {
            semantic,
            semantic_index,
            element_type,
            per_instance: false,
        }
    }
}

// Hash of a vertex buffer's interleaved layout
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayoutHash(u64);

impl VertexLayoutHash {
    fn new(
        stride: u32,
        elements: &[VertexLayoutElementMeta],
    ) -> VertexLayoutHash {
        let mut hasher = FnvHasher::default();
        stride.hash(&mut hasher);
        elements.hash(&mut hasher);
        VertexLayoutHash(hasher.finish())
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// One attribute with its derived byte offset within the interleaved vertex
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayoutElementMeta {
    pub semantic: VertexElementSemantic,
    pub semantic_index: u8,
    pub element_type: VertexElementType,
    pub byte_offset: u32,
    pub per_instance: bool,
}

#[derive(Debug, PartialEq)]
struct VertexLayoutInner {
    elements: Vec<VertexLayoutElementMeta>,
    stride: u32,
    hash: VertexLayoutHash,
}

/// Interleaved layout of one vertex buffer: the ordered attributes, their byte offsets, the
/// total stride, and a memoized content hash used by the vertex-declaration cache.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    inner: Arc<VertexLayoutInner>,
}

impl VertexLayout {
    pub fn new(elements: &[VertexElement]) -> Self {
        let mut metas = Vec::with_capacity(elements.len());
        let mut offset = 0u32;
        for element in elements {
            metas.push(VertexLayoutElementMeta {
                semantic: element.semantic,
                semantic_index: element.semantic_index,
                element_type: element.element_type,
                byte_offset: offset,
                per_instance: element.per_instance,
            });
            offset += element.element_type.size_in_bytes();
        }

        let hash = VertexLayoutHash::new(offset, &metas);

        VertexLayout {
            inner: Arc::new(VertexLayoutInner {
                elements: metas,
                stride: offset,
                hash,
            }),
        }
    }

    pub fn elements(&self) -> &[VertexLayoutElementMeta] {
        &self.inner.elements
    }

    pub fn stride(&self) -> u32 {
        self.inner.stride
    }

    pub fn hash(&self) -> VertexLayoutHash {
        self.inner.hash
    }

    /// Locate the attribute matching a shader input's (semantic, semantic_index)
    pub fn find(
        &self,
        semantic: VertexElementSemantic,
        semantic_index: u8,
    ) -> Option<&VertexLayoutElementMeta> {
        self.inner
            .elements
            .iter()
            .find(|x| x.semantic == semantic && x.semantic_index == semantic_index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn position_normal_uv() -> VertexLayout {
        VertexLayout::new(&[
            VertexElement::new(VertexElementSemantic::Position, VertexElementType::Vec3),
            VertexElement::new(VertexElementSemantic::Normal, VertexElementType::Vec3),
            VertexElement::new(VertexElementSemantic::TexCoord, VertexElementType::Vec2),
        ])
    }

    #[test]
    fn offsets_and_stride_accumulate() {
        let layout = position_normal_uv();
        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.elements()[0].byte_offset, 0);
        assert_eq!(layout.elements()[1].byte_offset, 12);
        assert_eq!(layout.elements()[2].byte_offset, 24);
    }

    #[test]
    fn identical_layouts_hash_identically() {
        assert_eq!(position_normal_uv().hash(), position_normal_uv().hash());
    }

    #[test]
    fn differing_layouts_hash_differently() {
        let a = position_normal_uv();
        let b = VertexLayout::new(&[VertexElement::new(
            VertexElementSemantic::Position,
            VertexElementType::Vec3,
        )]);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn find_matches_semantic_and_index() {
        let layout = VertexLayout::new(&[
            VertexElement::with_index(VertexElementSemantic::TexCoord, 0, VertexElementType::Vec2),
            VertexElement::with_index(VertexElementSemantic::TexCoord, 1, VertexElementType::Vec2),
        ]);
        assert_eq!(
            layout
                .find(VertexElementSemantic::TexCoord, 1)
                .unwrap()
                .byte_offset,
            8
        );
        assert!(layout.find(VertexElementSemantic::Normal, 0).is_none());
    }
}
