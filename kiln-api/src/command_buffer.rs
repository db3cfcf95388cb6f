use crate::backends::null::KilnCommandBufferNull;
use crate::{
    ClearFlags, IndexType, KilnBuffer, KilnPipeline, KilnResult, KilnScissor,
    KilnShaderResourceBinding, KilnTexture, KilnViewport,
};

/// One vertex buffer bound to a stream slot
#[derive(Clone, Debug)]
pub struct KilnVertexBufferBinding {
    pub buffer: KilnBuffer,
    pub byte_offset: u64,
}

/// Records binding and draw commands against the backend's immediate context
#[derive(Clone)]
pub enum KilnCommandBuffer {
    Null(KilnCommandBufferNull),
}

impl KilnCommandBuffer {
    pub fn cmd_bind_render_targets(
        &self,
        color_targets: &[&KilnTexture],
        depth_stencil_target: Option<&KilnTexture>,
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => {
                let color_targets: Vec<_> = color_targets
                    .iter()
                    .filter_map(|x| x.null_texture())
                    .collect();
                inner.cmd_bind_render_targets(
                    &color_targets,
                    depth_stencil_target.and_then(|x| x.null_texture()),
                )
            }
        }
    }

    pub fn cmd_set_viewport(
        &self,
        viewport: KilnViewport,
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => inner.cmd_set_viewport(viewport),
        }
    }

    pub fn cmd_set_scissor(
        &self,
        scissor: KilnScissor,
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => inner.cmd_set_scissor(scissor),
        }
    }

    pub fn cmd_bind_pipeline(
        &self,
        pipeline: &KilnPipeline,
    ) -> KilnResult<()> {
        match (self, pipeline) {
            (KilnCommandBuffer::Null(inner), KilnPipeline::Null(pipeline)) => {
                inner.cmd_bind_pipeline(pipeline)
            }
        }
    }

    pub fn cmd_bind_shader_resource_binding(
        &self,
        srb: &KilnShaderResourceBinding,
    ) -> KilnResult<()> {
        match (self, srb) {
            (KilnCommandBuffer::Null(inner), KilnShaderResourceBinding::Null(srb)) => {
                inner.cmd_bind_shader_resource_binding(srb)
            }
        }
    }

    pub fn cmd_bind_vertex_buffers(
        &self,
        first_binding: u32,
        bindings: &[KilnVertexBufferBinding],
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => {
                for (i, binding) in bindings.iter().enumerate() {
                    match &binding.buffer {
                        KilnBuffer::Null(buffer) => inner.cmd_bind_vertex_buffer(
                            first_binding + i as u32,
                            buffer,
                            binding.byte_offset,
                        )?,
                    }
                }

                Ok(())
            }
        }
    }

    pub fn cmd_bind_index_buffer(
        &self,
        buffer: &KilnBuffer,
        index_type: IndexType,
    ) -> KilnResult<()> {
        match (self, buffer) {
            (KilnCommandBuffer::Null(inner), KilnBuffer::Null(buffer)) => {
                inner.cmd_bind_index_buffer(buffer, index_type)
            }
        }
    }

    pub fn cmd_clear(
        &self,
        flags: ClearFlags,
        color: [f32; 4],
        depth: f32,
        stencil: u8,
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => inner.cmd_clear(flags, color, depth, stencil),
        }
    }

    pub fn cmd_draw(
        &self,
        vertex_count: u32,
        first_vertex: u32,
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => inner.cmd_draw(vertex_count, first_vertex),
        }
    }

    pub fn cmd_draw_indexed(
        &self,
        index_count: u32,
        first_index: u32,
        base_vertex: i32,
    ) -> KilnResult<()> {
        match self {
            KilnCommandBuffer::Null(inner) => {
                inner.cmd_draw_indexed(index_count, first_index, base_vertex)
            }
        }
    }
}
