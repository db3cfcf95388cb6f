use crate::{ResourceCache, ResourceHash, ShaderProgram};
use fnv::FnvHasher;
use kiln_api::{
    InputLayoutDesc, InputLayoutElement, KilnBuffer, KilnError, KilnResult, VertexElementType,
    VertexLayout, MAX_INPUT_LAYOUT_ELEMENTS, MAX_VERTEX_STREAMS,
};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// What to do when a shader consumes a vertex attribute no bound buffer provides.
/// Lenient emits a degenerate slot-0 element so partially-bound geometry still draws,
/// which is the classic engine behavior during content development. Strict fails the
/// declaration build so the missing data surfaces immediately.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexLayoutFallback {
    Lenient,
    Strict,
}

impl Default for VertexLayoutFallback {
    fn default() -> Self {
        VertexLayoutFallback::Lenient
    }
}

/// A resolved input layout for one (program, bound buffers) combination
pub struct VertexDeclaration {
    hash: ResourceHash,
    input_layout: InputLayoutDesc,
}

impl VertexDeclaration {
    pub fn hash(&self) -> ResourceHash {
        self.hash
    }

    pub fn input_layout(&self) -> &InputLayoutDesc {
        &self.input_layout
    }
}

fn declaration_hash(
    program: &ShaderProgram,
    bound_layouts: &[Option<&VertexLayout>],
) -> ResourceHash {
    let mut hasher = FnvHasher::default();
    program.hash().as_u64().hash(&mut hasher);
    program.element_hash().hash(&mut hasher);
    for layout in bound_layouts {
        match layout {
            Some(layout) => layout.hash().as_u64().hash(&mut hasher),
            None => 0u64.hash(&mut hasher),
        }
    }
    ResourceHash::from_raw(hasher.finish().max(1))
}

/// Caches derived input layouts keyed by the program hash plus the per-slot layout
/// hashes of the bound vertex buffers
pub struct VertexDeclarationCache {
    declarations: ResourceCache<VertexDeclaration>,
    fallback: VertexLayoutFallback,
}

impl VertexDeclarationCache {
    pub fn new(fallback: VertexLayoutFallback) -> Self {
        VertexDeclarationCache {
            declarations: ResourceCache::new("vertex declaration"),
            fallback,
        }
    }

    #[profiling::function]
    pub fn get_or_create(
        &self,
        program: &ShaderProgram,
        bound_buffers: &[Option<KilnBuffer>; MAX_VERTEX_STREAMS],
    ) -> KilnResult<Arc<VertexDeclaration>> {
        let mut bound_layouts: [Option<&VertexLayout>; MAX_VERTEX_STREAMS] =
            [None; MAX_VERTEX_STREAMS];
        for (slot, buffer) in bound_buffers.iter().enumerate() {
            bound_layouts[slot] = buffer
                .as_ref()
                .and_then(|x| x.buffer_def().vertex_layout.as_ref());
        }

        let hash = declaration_hash(program, &bound_layouts);
        self.declarations
            .get_or_create(hash, || self.build(program, &bound_layouts, hash))
    }

    fn build(
        &self,
        program: &ShaderProgram,
        bound_layouts: &[Option<&VertexLayout>; MAX_VERTEX_STREAMS],
        hash: ResourceHash,
    ) -> KilnResult<VertexDeclaration> {
        if program.vertex_inputs().len() > MAX_INPUT_LAYOUT_ELEMENTS {
            return Err(KilnError::ConfigurationError(format!(
                "Shader program requires {} vertex inputs, the layout limit is {}",
                program.vertex_inputs().len(),
                MAX_INPUT_LAYOUT_ELEMENTS
            )));
        }

        let mut elements = Vec::with_capacity(program.vertex_inputs().len());
        for (input_index, input) in program.vertex_inputs().iter().enumerate() {
            let matched = bound_layouts.iter().enumerate().find_map(|(slot, layout)| {
                let layout = layout.as_ref()?;
                let element = layout.find(input.semantic, input.semantic_index)?;
                Some((slot, layout.stride(), element))
            });

            match matched {
                Some((slot, stride, element)) => {
                    elements.push(InputLayoutElement {
                        input_index: input_index as u32,
                        buffer_slot: slot as u32,
                        buffer_stride: stride,
                        byte_offset: element.byte_offset,
                        element_type: element.element_type,
                        instance_step_rate: if element.per_instance { 1 } else { 0 },
                    });
                }
                None => {
                    if self.fallback == VertexLayoutFallback::Strict {
                        return Err(KilnError::ConfigurationError(format!(
                            "No bound vertex buffer provides {:?}[{}]",
                            input.semantic, input.semantic_index
                        )));
                    }

                    log::warn!(
                        "No bound vertex buffer provides {:?}[{}], emitting a degenerate \
                         slot-0 element",
                        input.semantic,
                        input.semantic_index
                    );
                    elements.push(InputLayoutElement {
                        input_index: input_index as u32,
                        buffer_slot: 0,
                        buffer_stride: bound_layouts[0].map(|x| x.stride()).unwrap_or(0),
                        byte_offset: 0,
                        element_type: VertexElementType::Vec4,
                        instance_step_rate: 0,
                    });
                }
            }
        }

        Ok(VertexDeclaration {
            hash,
            input_layout: InputLayoutDesc { elements },
        })
    }

    pub fn clear(&self) {
        self.declarations.clear();
    }

    pub fn create_count(&self) -> u64 {
        self.declarations.create_count()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ShaderProgramRegistry;
    use kiln_api::backends::null::KilnDeviceContextNull;
    use kiln_api::{
        KilnBufferDef, KilnDeviceContext, KilnDeviceInfo, KilnMemoryUsage, KilnResourceType,
        ShaderReflection, ShaderStage, ShaderVariationDef, VertexElement, VertexElementSemantic,
        VertexInputReflection,
    };

    fn null_device() -> KilnDeviceContext {
        KilnDeviceContext::Null(KilnDeviceContextNull::new(KilnDeviceInfo::default()))
    }

    fn program_with_inputs(
        device_context: &KilnDeviceContext,
        semantics: &[VertexElementSemantic],
    ) -> Arc<ShaderProgram> {
        let vertex_inputs: Vec<_> = semantics
            .iter()
            .map(|semantic| VertexInputReflection {
                semantic: *semantic,
                semantic_index: 0,
            })
            .collect();
        let vertex_shader = device_context
            .create_shader_variation(&ShaderVariationDef {
                stage: ShaderStage::Vertex,
                name: "Test".to_string(),
                source: "vs".to_string(),
                defines: Vec::new(),
                reflection: ShaderReflection {
                    parameters: Vec::new(),
                    textures: Vec::new(),
                    element_hash: ShaderReflection::compute_element_hash(&vertex_inputs),
                    vertex_inputs,
                },
            })
            .unwrap();
        let pixel_shader = device_context
            .create_shader_variation(&ShaderVariationDef {
                stage: ShaderStage::Pixel,
                name: "Test".to_string(),
                source: "ps".to_string(),
                defines: Vec::new(),
                reflection: Default::default(),
            })
            .unwrap();

        ShaderProgramRegistry::new(device_context)
            .get_or_create(&vertex_shader, &pixel_shader)
            .unwrap()
    }

    fn bound_position_buffer(
        device_context: &KilnDeviceContext
    ) -> [Option<KilnBuffer>; MAX_VERTEX_STREAMS] {
        let layout = VertexLayout::new(&[VertexElement::new(
            VertexElementSemantic::Position,
            VertexElementType::Vec3,
        )]);
        let buffer = device_context
            .create_buffer(&KilnBufferDef {
                size: layout.stride() as u64,
                memory_usage: KilnMemoryUsage::GpuOnly,
                resource_type: KilnResourceType::VERTEX_BUFFER,
                vertex_layout: Some(layout),
                index_type: None,
                debug_name: "verts".to_string(),
            })
            .unwrap();

        let mut bound: [Option<KilnBuffer>; MAX_VERTEX_STREAMS] = Default::default();
        bound[0] = Some(buffer);
        bound
    }

    #[test]
    fn matched_elements_take_offsets_from_the_buffer_layout() {
        let device_context = null_device();
        let program = program_with_inputs(&device_context, &[VertexElementSemantic::Position]);
        let cache = VertexDeclarationCache::new(VertexLayoutFallback::Strict);

        let declaration = cache
            .get_or_create(&program, &bound_position_buffer(&device_context))
            .unwrap();
        let elements = &declaration.input_layout().elements;
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].buffer_slot, 0);
        assert_eq!(elements[0].byte_offset, 0);
        assert_eq!(elements[0].buffer_stride, 12);
    }

    #[test]
    fn lenient_fallback_emits_a_degenerate_element_for_missing_inputs() {
        let device_context = null_device();
        let program = program_with_inputs(
            &device_context,
            &[VertexElementSemantic::Position, VertexElementSemantic::Normal],
        );
        let cache = VertexDeclarationCache::new(VertexLayoutFallback::Lenient);

        let declaration = cache
            .get_or_create(&program, &bound_position_buffer(&device_context))
            .unwrap();
        let elements = &declaration.input_layout().elements;
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].buffer_slot, 0);
        assert_eq!(elements[1].byte_offset, 0);
    }

    #[test]
    fn strict_fallback_rejects_missing_inputs() {
        let device_context = null_device();
        let program = program_with_inputs(
            &device_context,
            &[VertexElementSemantic::Position, VertexElementSemantic::Normal],
        );
        let cache = VertexDeclarationCache::new(VertexLayoutFallback::Strict);

        let result = cache.get_or_create(&program, &bound_position_buffer(&device_context));
        assert!(matches!(result, Err(KilnError::ConfigurationError(_))));
    }
}
