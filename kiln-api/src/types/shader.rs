use crate::{KilnBackendKind, ShaderParameterGroup, ShaderStage, VertexElementSemantic};
use fnv::FnvHasher;
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A uniform value within one of the per-group constant buffers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ShaderParameterReflection {
    pub name: String,
    pub group: ShaderParameterGroup,
    pub byte_offset: u32,
    pub size: u32,
}

/// A texture sampled by the stage, addressed by name and bound to a fixed unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ShaderTextureReflection {
    pub name: String,
    pub unit: u32,
}

/// A vertex attribute the vertex stage consumes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct VertexInputReflection {
    pub semantic: VertexElementSemantic,
    pub semantic_index: u8,
}

/// Everything a single compiled stage exposes to the binding model
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ShaderReflection {
    pub parameters: Vec<ShaderParameterReflection>,
    pub textures: Vec<ShaderTextureReflection>,
    pub vertex_inputs: Vec<VertexInputReflection>,
    /// Hash over the vertex inputs only. Two variations with the same element hash accept
    /// the same vertex declarations.
    pub element_hash: u64,
}

impl ShaderReflection {
    pub fn compute_element_hash(vertex_inputs: &[VertexInputReflection]) -> u64 {
        let mut hasher = FnvHasher::default();
        vertex_inputs.hash(&mut hasher);
        hasher.finish()
    }
}

/// Source-level description of a shader variation, hashed into a [`ShaderVariationHash`]
/// before any backend object is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ShaderVariationDef {
    pub stage: ShaderStage,
    pub name: String,
    pub source: String,
    pub defines: Vec<String>,
    pub reflection: ShaderReflection,
}

// Content hash of one shader variation. Identifies the variation across the program
// registry and the pipeline cache, so it must cover everything that affects compilation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderVariationHash(u64);

impl ShaderVariationHash {
    pub fn new(
        def: &ShaderVariationDef,
        backend_kind: KilnBackendKind,
    ) -> ShaderVariationHash {
        let mut hasher = FnvHasher::default();
        def.stage.hash(&mut hasher);
        def.source.hash(&mut hasher);
        def.defines.hash(&mut hasher);
        backend_kind.hash(&mut hasher);
        ShaderVariationHash(hasher.finish())
    }

    pub fn from_raw(hash: u64) -> ShaderVariationHash {
        ShaderVariationHash(hash)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn variation_def(source: &str, defines: &[&str]) -> ShaderVariationDef {
        ShaderVariationDef {
            stage: ShaderStage::Vertex,
            name: "Basic".to_string(),
            source: source.to_string(),
            defines: defines.iter().map(|x| x.to_string()).collect(),
            reflection: Default::default(),
        }
    }

    #[test]
    fn variation_hash_covers_defines() {
        let a = ShaderVariationHash::new(&variation_def("void main() {}", &[]), KilnBackendKind::Null);
        let b = ShaderVariationHash::new(
            &variation_def("void main() {}", &["SKINNED"]),
            KilnBackendKind::Null,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn variation_hash_is_deterministic() {
        let a = ShaderVariationHash::new(
            &variation_def("void main() {}", &["SKINNED"]),
            KilnBackendKind::Null,
        );
        let b = ShaderVariationHash::new(
            &variation_def("void main() {}", &["SKINNED"]),
            KilnBackendKind::Null,
        );
        assert_eq!(a, b);
    }
}
