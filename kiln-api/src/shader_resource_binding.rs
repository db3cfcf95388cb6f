use crate::backends::null::KilnShaderResourceBindingNull;
use crate::{KilnBuffer, KilnResult, KilnTexture, ShaderParameterGroup, ShaderStage};

/// A backend object binding concrete buffers and textures to a pipeline's declared
/// shader slots. Bindings mutate through `&self`; backends serialize internally.
#[derive(Clone)]
pub enum KilnShaderResourceBinding {
    Null(KilnShaderResourceBindingNull),
}

impl KilnShaderResourceBinding {
    pub fn pipeline_hash(&self) -> u64 {
        match self {
            KilnShaderResourceBinding::Null(inner) => inner.pipeline_hash(),
        }
    }

    pub fn bind_constant_buffer(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
        buffer: &KilnBuffer,
    ) -> KilnResult<()> {
        match (self, buffer) {
            (KilnShaderResourceBinding::Null(inner), KilnBuffer::Null(buffer)) => {
                inner.bind_constant_buffer(stage, group, buffer)
            }
        }
    }

    pub fn bind_texture(
        &self,
        name: &str,
        texture: &KilnTexture,
    ) -> KilnResult<()> {
        match (self, texture) {
            (KilnShaderResourceBinding::Null(inner), KilnTexture::Null(texture)) => {
                inner.bind_texture(name, texture)
            }
        }
    }

    pub fn null_srb(&self) -> Option<&KilnShaderResourceBindingNull> {
        match self {
            KilnShaderResourceBinding::Null(inner) => Some(inner),
        }
    }
}
