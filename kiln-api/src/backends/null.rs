//! A backend that implements the full device API without a GPU. Object creation and
//! draw submission are recorded in atomic counters so higher layers can assert on
//! exactly how many native calls a code path performed.

use crate::*;
use fnv::FnvHashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Counts of native calls made against a null device since creation
#[derive(Default, Debug)]
pub struct NullCallCounters {
    pub buffers_created: AtomicU64,
    pub textures_created: AtomicU64,
    pub samplers_created: AtomicU64,
    pub shader_modules_created: AtomicU64,
    pub pipelines_created: AtomicU64,
    pub srbs_created: AtomicU64,
    pub draw_calls: AtomicU64,
    pub hardware_clears: AtomicU64,
}

struct KilnDeviceContextNullInner {
    device_info: KilnDeviceInfo,
    counters: NullCallCounters,
    next_texture_generation: AtomicU64,
    next_buffer_id: AtomicU64,
    fail_pipeline_creation: AtomicBool,
}

#[derive(Clone)]
pub struct KilnDeviceContextNull {
    inner: Arc<KilnDeviceContextNullInner>,
}

impl KilnDeviceContextNull {
    pub fn new(device_info: KilnDeviceInfo) -> Self {
        KilnDeviceContextNull {
            inner: Arc::new(KilnDeviceContextNullInner {
                device_info,
                counters: Default::default(),
                // Generation 0 is never handed out so it can mean "no texture bound"
                next_texture_generation: AtomicU64::new(1),
                next_buffer_id: AtomicU64::new(1),
                fail_pipeline_creation: AtomicBool::new(false),
            }),
        }
    }

    pub fn device_info(&self) -> &KilnDeviceInfo {
        &self.inner.device_info
    }

    pub fn call_counters(&self) -> &NullCallCounters {
        &self.inner.counters
    }

    /// Force subsequent pipeline creation calls to fail, for exercising failure paths
    pub fn set_fail_pipeline_creation(
        &self,
        fail: bool,
    ) {
        self.inner
            .fail_pipeline_creation
            .store(fail, Ordering::Relaxed);
    }

    pub fn create_buffer(
        &self,
        buffer_def: &KilnBufferDef,
    ) -> KilnResult<KilnBufferNull> {
        buffer_def.verify()?;
        self.inner
            .counters
            .buffers_created
            .fetch_add(1, Ordering::Relaxed);
        let buffer_id = self.inner.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        Ok(KilnBufferNull {
            inner: Arc::new(KilnBufferNullInner {
                buffer_def: buffer_def.clone(),
                buffer_id,
                storage: Mutex::new(vec![0; buffer_def.size as usize]),
            }),
        })
    }

    pub fn create_texture(
        &self,
        texture_def: &KilnTextureDef,
    ) -> KilnResult<KilnTextureNull> {
        texture_def.verify()?;
        self.inner
            .counters
            .textures_created
            .fetch_add(1, Ordering::Relaxed);
        let generation = self
            .inner
            .next_texture_generation
            .fetch_add(1, Ordering::Relaxed);
        Ok(KilnTextureNull {
            inner: Arc::new(KilnTextureNullInner {
                texture_def: texture_def.clone(),
                generation,
            }),
        })
    }

    pub fn create_sampler(
        &self,
        sampler_def: &SamplerDesc,
    ) -> KilnResult<KilnSamplerNull> {
        self.inner
            .counters
            .samplers_created
            .fetch_add(1, Ordering::Relaxed);
        Ok(KilnSamplerNull {
            inner: Arc::new(KilnSamplerNullInner {
                sampler_def: sampler_def.clone(),
            }),
        })
    }

    pub fn create_shader_module(
        &self,
        stage: ShaderStage,
        debug_name: &str,
    ) -> KilnResult<KilnShaderModuleNull> {
        self.inner
            .counters
            .shader_modules_created
            .fetch_add(1, Ordering::Relaxed);
        Ok(KilnShaderModuleNull {
            inner: Arc::new(KilnShaderModuleNullInner {
                stage,
                debug_name: debug_name.to_string(),
            }),
        })
    }

    pub fn create_graphics_pipeline(
        &self,
        pipeline_def: &KilnGraphicsPipelineDef,
    ) -> KilnResult<KilnPipelineNull> {
        if self.inner.fail_pipeline_creation.load(Ordering::Relaxed) {
            return Err(KilnError::BackendObjectCreationFailed {
                object_kind: "pipeline",
                debug_name: pipeline_def.desc.debug_name.clone(),
                hash: pipeline_def.hash,
            });
        }

        if pipeline_def.desc.input_layout.elements.len() > MAX_INPUT_LAYOUT_ELEMENTS {
            return Err(KilnError::ConfigurationError(format!(
                "Pipeline '{}' declares {} input layout elements, the device limit is {}",
                pipeline_def.desc.debug_name,
                pipeline_def.desc.input_layout.elements.len(),
                MAX_INPUT_LAYOUT_ELEMENTS
            )));
        }

        self.inner
            .counters
            .pipelines_created
            .fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "Null backend created pipeline '{}' (hash {:x})",
            pipeline_def.desc.debug_name,
            pipeline_def.hash
        );
        Ok(KilnPipelineNull {
            inner: Arc::new(KilnPipelineNullInner {
                hash: pipeline_def.hash,
                debug_name: pipeline_def.desc.debug_name.clone(),
            }),
        })
    }

    pub fn create_shader_resource_binding(
        &self,
        pipeline: &KilnPipelineNull,
    ) -> KilnResult<KilnShaderResourceBindingNull> {
        self.inner
            .counters
            .srbs_created
            .fetch_add(1, Ordering::Relaxed);
        Ok(KilnShaderResourceBindingNull {
            inner: Arc::new(KilnShaderResourceBindingNullInner {
                pipeline_hash: pipeline.hash(),
                bound_constant_buffers: Default::default(),
                bound_textures: Default::default(),
            }),
        })
    }

    pub fn create_command_buffer(&self) -> KilnResult<KilnCommandBufferNull> {
        Ok(KilnCommandBufferNull {
            device_context: self.clone(),
        })
    }
}

struct KilnBufferNullInner {
    buffer_def: KilnBufferDef,
    buffer_id: u64,
    storage: Mutex<Vec<u8>>,
}

#[derive(Clone)]
pub struct KilnBufferNull {
    inner: Arc<KilnBufferNullInner>,
}

impl KilnBufferNull {
    pub fn buffer_def(&self) -> &KilnBufferDef {
        &self.inner.buffer_def
    }

    pub fn buffer_id(&self) -> u64 {
        self.inner.buffer_id
    }

    pub fn copy_to_host_visible_buffer(
        &self,
        data: &[u8],
        buffer_byte_offset: u64,
    ) -> KilnResult<()> {
        let mut storage = self.inner.storage.lock().unwrap();
        let begin = buffer_byte_offset as usize;
        let end = begin + data.len();
        if end > storage.len() {
            return Err(KilnError::ConfigurationError(format!(
                "Write of {} bytes at offset {} overflows buffer '{}' of size {}",
                data.len(),
                buffer_byte_offset,
                self.inner.buffer_def.debug_name,
                storage.len()
            )));
        }

        storage[begin..end].copy_from_slice(data);
        Ok(())
    }

    /// Test hook, reads back what was uploaded
    pub fn read_contents(&self) -> Vec<u8> {
        self.inner.storage.lock().unwrap().clone()
    }
}

struct KilnTextureNullInner {
    texture_def: KilnTextureDef,
    generation: u64,
}

#[derive(Clone)]
pub struct KilnTextureNull {
    inner: Arc<KilnTextureNullInner>,
}

impl KilnTextureNull {
    pub fn texture_def(&self) -> &KilnTextureDef {
        &self.inner.texture_def
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }
}

struct KilnSamplerNullInner {
    sampler_def: SamplerDesc,
}

#[derive(Clone)]
pub struct KilnSamplerNull {
    inner: Arc<KilnSamplerNullInner>,
}

impl KilnSamplerNull {
    pub fn sampler_def(&self) -> &SamplerDesc {
        &self.inner.sampler_def
    }
}

struct KilnShaderModuleNullInner {
    stage: ShaderStage,
    debug_name: String,
}

#[derive(Clone)]
pub struct KilnShaderModuleNull {
    inner: Arc<KilnShaderModuleNullInner>,
}

impl KilnShaderModuleNull {
    pub fn stage(&self) -> ShaderStage {
        self.inner.stage
    }

    pub fn debug_name(&self) -> &str {
        &self.inner.debug_name
    }
}

struct KilnPipelineNullInner {
    hash: u64,
    debug_name: String,
}

#[derive(Clone)]
pub struct KilnPipelineNull {
    inner: Arc<KilnPipelineNullInner>,
}

impl KilnPipelineNull {
    pub fn hash(&self) -> u64 {
        self.inner.hash
    }

    pub fn debug_name(&self) -> &str {
        &self.inner.debug_name
    }
}

struct KilnShaderResourceBindingNullInner {
    pipeline_hash: u64,
    bound_constant_buffers: Mutex<FnvHashMap<(ShaderStage, ShaderParameterGroup), u64>>,
    bound_textures: Mutex<FnvHashMap<String, u64>>,
}

#[derive(Clone)]
pub struct KilnShaderResourceBindingNull {
    inner: Arc<KilnShaderResourceBindingNullInner>,
}

impl KilnShaderResourceBindingNull {
    pub fn pipeline_hash(&self) -> u64 {
        self.inner.pipeline_hash
    }

    pub fn bind_constant_buffer(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
        buffer: &KilnBufferNull,
    ) -> KilnResult<()> {
        self.inner
            .bound_constant_buffers
            .lock()
            .unwrap()
            .insert((stage, group), buffer.buffer_id());
        Ok(())
    }

    pub fn bind_texture(
        &self,
        name: &str,
        texture: &KilnTextureNull,
    ) -> KilnResult<()> {
        self.inner
            .bound_textures
            .lock()
            .unwrap()
            .insert(name.to_string(), texture.generation());
        Ok(())
    }

    /// Test hook, the buffer id currently bound at a (stage, group) slot
    pub fn bound_constant_buffer_id(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
    ) -> Option<u64> {
        self.inner
            .bound_constant_buffers
            .lock()
            .unwrap()
            .get(&(stage, group))
            .copied()
    }

    /// Test hook, the texture generation currently bound under a name
    pub fn bound_texture_generation(
        &self,
        name: &str,
    ) -> Option<u64> {
        self.inner.bound_textures.lock().unwrap().get(name).copied()
    }
}

#[derive(Clone)]
pub struct KilnCommandBufferNull {
    device_context: KilnDeviceContextNull,
}

impl KilnCommandBufferNull {
    pub fn cmd_bind_render_targets(
        &self,
        _color_targets: &[&KilnTextureNull],
        _depth_stencil_target: Option<&KilnTextureNull>,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_set_viewport(
        &self,
        _viewport: KilnViewport,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_set_scissor(
        &self,
        _scissor: KilnScissor,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_bind_pipeline(
        &self,
        _pipeline: &KilnPipelineNull,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_bind_shader_resource_binding(
        &self,
        _srb: &KilnShaderResourceBindingNull,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_bind_vertex_buffer(
        &self,
        _binding: u32,
        _buffer: &KilnBufferNull,
        _byte_offset: u64,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_bind_index_buffer(
        &self,
        _buffer: &KilnBufferNull,
        _index_type: IndexType,
    ) -> KilnResult<()> {
        Ok(())
    }

    pub fn cmd_clear(
        &self,
        _flags: ClearFlags,
        _color: [f32; 4],
        _depth: f32,
        _stencil: u8,
    ) -> KilnResult<()> {
        self.device_context
            .call_counters()
            .hardware_clears
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn cmd_draw(
        &self,
        _vertex_count: u32,
        _first_vertex: u32,
    ) -> KilnResult<()> {
        self.device_context
            .call_counters()
            .draw_calls
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn cmd_draw_indexed(
        &self,
        _index_count: u32,
        _first_index: u32,
        _base_vertex: i32,
    ) -> KilnResult<()> {
        self.device_context
            .call_counters()
            .draw_calls
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_calls_are_counted() {
        let device = KilnDeviceContextNull::new(KilnDeviceInfo::default());
        device
            .create_sampler(&SamplerDesc::default())
            .unwrap();
        device
            .create_texture(&KilnTextureDef {
                extents: KilnExtents2D {
                    width: 4,
                    height: 4,
                },
                format: KilnFormat::R8G8B8A8_UNORM,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(device.call_counters().samplers_created.load(Ordering::Relaxed), 1);
        assert_eq!(device.call_counters().textures_created.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn texture_generations_are_unique() {
        let device = KilnDeviceContextNull::new(KilnDeviceInfo::default());
        let texture_def = KilnTextureDef {
            extents: KilnExtents2D {
                width: 4,
                height: 4,
            },
            format: KilnFormat::R8G8B8A8_UNORM,
            ..Default::default()
        };
        let first = device.create_texture(&texture_def).unwrap();
        let second = device.create_texture(&texture_def).unwrap();
        assert_ne!(first.generation(), 0);
        assert_ne!(first.generation(), second.generation());
    }
}
