use crate::{
    ConstantBuffer, ConstantBufferCache, PipelineStateCache, ResourceCache, ResourceHash,
    ShaderProgram, DEFAULT_CONSTANT_BUFFER_SIZE,
};
use fnv::FnvHasher;
use kiln_api::{
    KilnDeviceContext, KilnError, KilnResult, KilnShaderResourceBinding, KilnTexture,
    ShaderParameterGroup, ShaderStage, ALL_SHADER_PARAMETER_GROUPS, MAX_TEXTURE_UNITS,
};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// Defaults are bound for these stages whether or not a shader uses them, so dynamic
// shader variants never need a different binding path
const DEFAULT_BOUND_STAGES: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Pixel];

fn srb_hash(
    pipeline_hash: ResourceHash,
    bound_textures: &[Option<KilnTexture>; MAX_TEXTURE_UNITS],
) -> ResourceHash {
    let mut hasher = FnvHasher::default();
    pipeline_hash.as_u64().hash(&mut hasher);
    for texture in bound_textures {
        // Generations, not pointers. A freed texture's address can be reused; its
        // generation cannot.
        match texture {
            Some(texture) => texture.generation().hash(&mut hasher),
            None => 0u64.hash(&mut hasher),
        }
    }
    ResourceHash::from_raw(hasher.finish().max(1))
}

/// Cache of shader-resource-binding objects keyed by pipeline hash plus the identity of
/// every bound texture. Rebinding a texture produces a new SRB; changing texture
/// contents does not.
pub struct SrbCache {
    device_context: KilnDeviceContext,
    srbs: ResourceCache<KilnShaderResourceBinding>,
}

impl SrbCache {
    pub fn new(device_context: &KilnDeviceContext) -> Self {
        SrbCache {
            device_context: device_context.clone(),
            srbs: ResourceCache::new("shader resource binding"),
        }
    }

    #[profiling::function]
    pub fn get_or_create(
        &self,
        pipelines: &PipelineStateCache,
        pipeline_hash: ResourceHash,
        program: &ShaderProgram,
        bound_textures: &[Option<KilnTexture>; MAX_TEXTURE_UNITS],
        constant_buffers: &ConstantBufferCache,
    ) -> KilnResult<Arc<KilnShaderResourceBinding>> {
        let hash = srb_hash(pipeline_hash, bound_textures);
        if let Some(srb) = self.srbs.get(hash) {
            return Ok(srb);
        }

        let pipeline_state = pipelines.get(pipeline_hash).ok_or_else(|| {
            let error = KilnError::ConfigurationError(format!(
                "SRB requested for pipeline hash {:x} which does not exist in the cache",
                pipeline_hash.as_u64()
            ));
            log::error!("{:?}", error);
            error
        })?;

        // Resolve the default buffers before creating this SRB. A slot that had to grow
        // must be rebound into every SRB created so far.
        let mut defaults = Vec::with_capacity(
            DEFAULT_BOUND_STAGES.len() * ALL_SHADER_PARAMETER_GROUPS.len(),
        );
        for stage in DEFAULT_BOUND_STAGES {
            for group in ALL_SHADER_PARAMETER_GROUPS {
                let min_size = program
                    .constant_buffer_size(stage, group)
                    .map(u64::from)
                    .unwrap_or(DEFAULT_CONSTANT_BUFFER_SIZE);
                let (buffer, replaced) = constant_buffers.get_or_create(stage, group, min_size)?;
                if replaced {
                    self.update_default_constant_buffers(stage, group, &buffer)?;
                }

                defaults.push((stage, group, buffer));
            }
        }

        self.srbs.get_or_create(hash, || {
            let srb = self
                .device_context
                .create_shader_resource_binding(pipeline_state.pipeline())?;

            for (stage, group, buffer) in &defaults {
                srb.bind_constant_buffer(*stage, *group, buffer.buffer())?;
            }

            for (name, binding) in program.textures() {
                // A stage not sampling this name is not an error, just a skipped bind
                if let Some(texture) = &bound_textures[binding.unit as usize] {
                    srb.bind_texture(name, texture)?;
                }
            }

            Ok(srb)
        })
    }

    /// Rebind a replaced default constant buffer into every cached SRB. This is the one
    /// documented exception to caches never being partially mutated.
    pub fn update_default_constant_buffers(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
        buffer: &ConstantBuffer,
    ) -> KilnResult<()> {
        let mut result = Ok(());
        self.srbs.for_each(|srb| {
            if result.is_ok() {
                result = srb.bind_constant_buffer(stage, group, buffer.buffer());
            }
        });
        result
    }

    /// Visit every cached SRB
    pub fn for_each<F: FnMut(&Arc<KilnShaderResourceBinding>)>(
        &self,
        f: F,
    ) {
        self.srbs.for_each(f);
    }

    pub fn clear(&self) {
        self.srbs.clear();
    }

    pub fn create_count(&self) -> u64 {
        self.srbs.create_count()
    }
}
