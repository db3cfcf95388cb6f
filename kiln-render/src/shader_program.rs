use crate::{ResourceCache, ResourceHash};
use fnv::{FnvHashMap, FnvHasher};
use kiln_api::{
    KilnDeviceContext, KilnError, KilnResult, ShaderParameterGroup, ShaderReflection,
    ShaderStage, ShaderStageFlags, ShaderVariation, VertexInputReflection,
};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Where a named uniform lives once the stages are linked
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParameterBinding {
    pub group: ShaderParameterGroup,
    pub byte_offset: u32,
    pub size: u32,
    pub stages: ShaderStageFlags,
}

/// Which unit a named texture occupies and which stages sample it
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub unit: u32,
    pub stages: ShaderStageFlags,
}

/// The linked contract between one vertex and one pixel shader variation: flat
/// name-to-binding maps merged across the stages, plus the vertex inputs the linked
/// pair actually consumes. Immutable after construction.
pub struct ShaderProgram {
    hash: ResourceHash,
    parameters: FnvHashMap<String, ShaderParameterBinding>,
    textures: FnvHashMap<String, TextureBinding>,
    vertex_inputs: Vec<VertexInputReflection>,
    element_hash: u64,
    constant_buffer_sizes: FnvHashMap<(ShaderStage, ShaderParameterGroup), u32>,
}

impl ShaderProgram {
    pub fn hash(&self) -> ResourceHash {
        self.hash
    }

    pub fn parameter(
        &self,
        name: &str,
    ) -> Option<&ShaderParameterBinding> {
        self.parameters.get(name)
    }

    pub fn texture(
        &self,
        name: &str,
    ) -> Option<&TextureBinding> {
        self.textures.get(name)
    }

    pub fn textures(&self) -> impl Iterator<Item = (&String, &TextureBinding)> {
        self.textures.iter()
    }

    /// The attributes the linked pair consumes, not the vertex stage's declared superset
    pub fn vertex_inputs(&self) -> &[VertexInputReflection] {
        &self.vertex_inputs
    }

    /// Hash over the consumed vertex inputs, feeds the vertex-declaration cache key
    pub fn element_hash(&self) -> u64 {
        self.element_hash
    }

    /// Bytes a (stage, group) constant buffer must hold to back every parameter the
    /// stage declares in that group. Absent means the stage never touches the group.
    pub fn constant_buffer_size(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
    ) -> Option<u32> {
        self.constant_buffer_sizes.get(&(stage, group)).copied()
    }

    fn merge_stage(
        &mut self,
        stage: ShaderStage,
        reflection: &ShaderReflection,
    ) -> KilnResult<()> {
        for parameter in &reflection.parameters {
            match self.parameters.get_mut(&parameter.name) {
                Some(existing) => {
                    if existing.group != parameter.group
                        || existing.byte_offset != parameter.byte_offset
                        || existing.size != parameter.size
                    {
                        return Err(KilnError::ConfigurationError(format!(
                            "Shader parameter '{}' is declared incompatibly across stages",
                            parameter.name
                        )));
                    }

                    existing.stages |= stage.flag();
                }
                None => {
                    self.parameters.insert(
                        parameter.name.clone(),
                        ShaderParameterBinding {
                            group: parameter.group,
                            byte_offset: parameter.byte_offset,
                            size: parameter.size,
                            stages: stage.flag(),
                        },
                    );
                }
            }

            let required = parameter.byte_offset + parameter.size;
            let size = self
                .constant_buffer_sizes
                .entry((stage, parameter.group))
                .or_insert(0);
            *size = (*size).max(required);
        }

        for texture in &reflection.textures {
            match self.textures.get_mut(&texture.name) {
                Some(existing) => {
                    if existing.unit != texture.unit {
                        return Err(KilnError::ConfigurationError(format!(
                            "Texture '{}' is assigned to different units across stages",
                            texture.name
                        )));
                    }

                    existing.stages |= stage.flag();
                }
                None => {
                    self.textures.insert(
                        texture.name.clone(),
                        TextureBinding {
                            unit: texture.unit,
                            stages: stage.flag(),
                        },
                    );
                }
            }
        }

        Ok(())
    }
}

fn shader_pair_hash(
    vertex_shader: &ShaderVariation,
    pixel_shader: &ShaderVariation,
) -> ResourceHash {
    let mut hasher = FnvHasher::default();
    vertex_shader.content_hash().as_u64().hash(&mut hasher);
    pixel_shader.content_hash().as_u64().hash(&mut hasher);
    ResourceHash::from_raw(hasher.finish().max(1))
}

/// Owns every linked [`ShaderProgram`], keyed by the pair hash of the two variations'
/// content hashes
pub struct ShaderProgramRegistry {
    device_context: KilnDeviceContext,
    programs: ResourceCache<ShaderProgram>,
}

impl ShaderProgramRegistry {
    pub fn new(device_context: &KilnDeviceContext) -> Self {
        ShaderProgramRegistry {
            device_context: device_context.clone(),
            programs: ResourceCache::new("shader program"),
        }
    }

    #[profiling::function]
    pub fn get_or_create(
        &self,
        vertex_shader: &Arc<ShaderVariation>,
        pixel_shader: &Arc<ShaderVariation>,
    ) -> KilnResult<Arc<ShaderProgram>> {
        if vertex_shader.stage() != ShaderStage::Vertex
            || pixel_shader.stage() != ShaderStage::Pixel
        {
            return Err(KilnError::ConfigurationError(format!(
                "Program requested from stages {:?}/{:?}, expected vertex/pixel",
                vertex_shader.stage(),
                pixel_shader.stage()
            )));
        }

        let hash = shader_pair_hash(vertex_shader, pixel_shader);
        self.programs.get_or_create(hash, || {
            // On link-introspecting backends the GPU may strip unused attributes, so the
            // linked result is authoritative. Everywhere else the declared list is exact.
            let vertex_inputs = self
                .device_context
                .link_and_introspect(vertex_shader, pixel_shader)
                .unwrap_or_else(|| vertex_shader.reflection().vertex_inputs.clone());
            let element_hash = ShaderReflection::compute_element_hash(&vertex_inputs);

            let mut program = ShaderProgram {
                hash,
                parameters: Default::default(),
                textures: Default::default(),
                vertex_inputs,
                element_hash,
                constant_buffer_sizes: Default::default(),
            };
            program.merge_stage(ShaderStage::Vertex, vertex_shader.reflection())?;
            program.merge_stage(ShaderStage::Pixel, pixel_shader.reflection())?;
            Ok(program)
        })
    }

    pub fn clear(&self) {
        self.programs.clear();
    }

    pub fn create_count(&self) -> u64 {
        self.programs.create_count()
    }
}
