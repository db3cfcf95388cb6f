use crate::backends::null::KilnDeviceContextNull;
use crate::*;
use std::sync::Arc;

/// The one true GPU entry point. Every native object is created through here, and
/// higher layers hold a clone per cache so caches never outlive the device.
#[derive(Clone)]
pub enum KilnDeviceContext {
    Null(KilnDeviceContextNull),
}

impl KilnDeviceContext {
    pub fn backend_kind(&self) -> KilnBackendKind {
        match self {
            KilnDeviceContext::Null(_) => KilnBackendKind::Null,
        }
    }

    pub fn device_info(&self) -> &KilnDeviceInfo {
        match self {
            KilnDeviceContext::Null(inner) => inner.device_info(),
        }
    }

    pub fn create_buffer(
        &self,
        buffer_def: &KilnBufferDef,
    ) -> KilnResult<KilnBuffer> {
        match self {
            KilnDeviceContext::Null(inner) => {
                Ok(KilnBuffer::Null(inner.create_buffer(buffer_def)?))
            }
        }
    }

    pub fn create_texture(
        &self,
        texture_def: &KilnTextureDef,
    ) -> KilnResult<KilnTexture> {
        match self {
            KilnDeviceContext::Null(inner) => {
                Ok(KilnTexture::Null(inner.create_texture(texture_def)?))
            }
        }
    }

    pub fn create_sampler(
        &self,
        sampler_def: &SamplerDesc,
    ) -> KilnResult<KilnSampler> {
        match self {
            KilnDeviceContext::Null(inner) => {
                Ok(KilnSampler::Null(inner.create_sampler(sampler_def)?))
            }
        }
    }

    /// Compile a shader stage and wrap it with its content hash and reflection
    pub fn create_shader_variation(
        &self,
        variation_def: &ShaderVariationDef,
    ) -> KilnResult<Arc<ShaderVariation>> {
        let content_hash = ShaderVariationHash::new(variation_def, self.backend_kind());
        let module = match self {
            KilnDeviceContext::Null(inner) => KilnShaderModule::Null(
                inner.create_shader_module(variation_def.stage, &variation_def.name)?,
            ),
        };

        Ok(Arc::new(ShaderVariation::new(
            variation_def.stage,
            variation_def.name.clone(),
            variation_def.defines.clone(),
            content_hash,
            variation_def.reflection.clone(),
            module,
        )))
    }

    pub fn create_graphics_pipeline(
        &self,
        pipeline_def: &KilnGraphicsPipelineDef,
    ) -> KilnResult<KilnPipeline> {
        match self {
            KilnDeviceContext::Null(inner) => Ok(KilnPipeline::Null(
                inner.create_graphics_pipeline(pipeline_def)?,
            )),
        }
    }

    pub fn create_shader_resource_binding(
        &self,
        pipeline: &KilnPipeline,
    ) -> KilnResult<KilnShaderResourceBinding> {
        match (self, pipeline) {
            (KilnDeviceContext::Null(inner), KilnPipeline::Null(pipeline)) => {
                Ok(KilnShaderResourceBinding::Null(
                    inner.create_shader_resource_binding(pipeline)?,
                ))
            }
        }
    }

    pub fn create_command_buffer(&self) -> KilnResult<KilnCommandBuffer> {
        match self {
            KilnDeviceContext::Null(inner) => {
                Ok(KilnCommandBuffer::Null(inner.create_command_buffer()?))
            }
        }
    }

    /// On backends where the GPU link step can strip unused vertex attributes, link the
    /// pair and report which attributes survived. Backends with explicit input layouts
    /// return `None`; callers then trust the vertex stage's declared inputs.
    pub fn link_and_introspect(
        &self,
        vertex_shader: &ShaderVariation,
        _pixel_shader: &ShaderVariation,
    ) -> Option<Vec<VertexInputReflection>> {
        if !self.device_info().supports_link_introspection {
            return None;
        }

        match self {
            // No real linker, so the declared inputs are exactly what survives
            KilnDeviceContext::Null(_) => {
                Some(vertex_shader.reflection().vertex_inputs.clone())
            }
        }
    }

    pub fn null_device_context(&self) -> Option<&KilnDeviceContextNull> {
        match self {
            KilnDeviceContext::Null(inner) => Some(inner),
        }
    }
}
