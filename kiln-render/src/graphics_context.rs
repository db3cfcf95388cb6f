use crate::{
    ClearResources, ConstantBufferCache, DrawCommand, DrawCommandCaches, DrawCommandQueue,
    PipelineStateCache, ShaderProgramRegistry, SrbCache, VertexDeclarationCache,
    VertexLayoutFallback,
};
use kiln_api::{
    KilnBufferDef, KilnDeviceContext, KilnMemoryUsage, KilnResourceType, KilnResult,
    ShaderParameterGroup, ShaderParameterReflection, ShaderReflection, ShaderStage,
    ShaderVariationDef, VertexElement, VertexElementSemantic, VertexElementType, VertexLayout,
    VertexInputReflection,
};
use std::sync::{Arc, Mutex};

// Fullscreen quad in normalized device coordinates, drawn as a triangle strip
const CLEAR_QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

const CLEAR_VERTEX_SOURCE: &str = include_str!("shaders/clear.vert");
const CLEAR_PIXEL_SOURCE: &str = include_str!("shaders/clear.frag");

/// Summary of cache sizes and build counts, read by stats displays and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsContextMetrics {
    pub pipeline_create_count: u64,
    pub srb_create_count: u64,
    pub program_create_count: u64,
    pub vertex_declaration_create_count: u64,
}

struct GraphicsContextInner {
    device_context: KilnDeviceContext,
    caches: DrawCommandCaches,
    queue: DrawCommandQueue,
    previous_metrics: Mutex<GraphicsContextMetrics>,
}

/// Owns the device and every cache the draw commands consult. Caches are fields, not
/// globals, so separate contexts never share state and teardown order is explicit.
#[derive(Clone)]
pub struct GraphicsContext {
    inner: Arc<GraphicsContextInner>,
}

impl GraphicsContext {
    pub fn new(
        device_context: &KilnDeviceContext,
        vertex_layout_fallback: VertexLayoutFallback,
    ) -> KilnResult<Self> {
        let clear_resources = Arc::new(Self::create_clear_resources(device_context)?);
        let caches = DrawCommandCaches {
            programs: Arc::new(ShaderProgramRegistry::new(device_context)),
            vertex_declarations: Arc::new(VertexDeclarationCache::new(vertex_layout_fallback)),
            pipelines: Arc::new(PipelineStateCache::new(device_context)),
            srbs: Arc::new(SrbCache::new(device_context)),
            constant_buffers: Arc::new(ConstantBufferCache::new(device_context)),
            clear_resources,
        };

        Ok(GraphicsContext {
            inner: Arc::new(GraphicsContextInner {
                device_context: device_context.clone(),
                caches,
                queue: DrawCommandQueue::new(),
                previous_metrics: Mutex::new(GraphicsContextMetrics {
                    pipeline_create_count: 0,
                    srb_create_count: 0,
                    program_create_count: 0,
                    vertex_declaration_create_count: 0,
                }),
            }),
        })
    }

    fn create_clear_resources(
        device_context: &KilnDeviceContext
    ) -> KilnResult<ClearResources> {
        let vertex_shader = device_context.create_shader_variation(&ShaderVariationDef {
            stage: ShaderStage::Vertex,
            name: "Clear".to_string(),
            source: CLEAR_VERTEX_SOURCE.to_string(),
            defines: Vec::new(),
            reflection: ShaderReflection {
                parameters: vec![ShaderParameterReflection {
                    name: "ClearDepth".to_string(),
                    group: ShaderParameterGroup::Custom,
                    byte_offset: 16,
                    size: 4,
                }],
                textures: Vec::new(),
                vertex_inputs: vec![VertexInputReflection {
                    semantic: VertexElementSemantic::Position,
                    semantic_index: 0,
                }],
                element_hash: ShaderReflection::compute_element_hash(&[VertexInputReflection {
                    semantic: VertexElementSemantic::Position,
                    semantic_index: 0,
                }]),
            },
        })?;

        let pixel_shader = device_context.create_shader_variation(&ShaderVariationDef {
            stage: ShaderStage::Pixel,
            name: "Clear".to_string(),
            source: CLEAR_PIXEL_SOURCE.to_string(),
            defines: Vec::new(),
            reflection: ShaderReflection {
                parameters: vec![ShaderParameterReflection {
                    name: "ClearColor".to_string(),
                    group: ShaderParameterGroup::Custom,
                    byte_offset: 0,
                    size: 16,
                }],
                textures: Vec::new(),
                vertex_inputs: Vec::new(),
                element_hash: 0,
            },
        })?;

        let quad_layout = VertexLayout::new(&[VertexElement::new(
            VertexElementSemantic::Position,
            VertexElementType::Vec2,
        )]);
        let quad_buffer = device_context.create_buffer(&KilnBufferDef {
            size: kiln_base::memory::slice_size_in_bytes(&CLEAR_QUAD_VERTICES) as u64,
            memory_usage: KilnMemoryUsage::CpuToGpu,
            resource_type: KilnResourceType::VERTEX_BUFFER,
            vertex_layout: Some(quad_layout),
            index_type: None,
            debug_name: "Clear quad".to_string(),
        })?;
        quad_buffer
            .copy_to_host_visible_buffer(kiln_base::memory::any_as_bytes(&CLEAR_QUAD_VERTICES), 0)?;

        Ok(ClearResources {
            vertex_shader,
            pixel_shader,
            quad_buffer,
        })
    }

    pub fn device_context(&self) -> &KilnDeviceContext {
        &self.inner.device_context
    }

    pub fn programs(&self) -> &Arc<ShaderProgramRegistry> {
        &self.inner.caches.programs
    }

    pub fn vertex_declarations(&self) -> &Arc<VertexDeclarationCache> {
        &self.inner.caches.vertex_declarations
    }

    pub fn pipelines(&self) -> &Arc<PipelineStateCache> {
        &self.inner.caches.pipelines
    }

    pub fn srbs(&self) -> &Arc<SrbCache> {
        &self.inner.caches.srbs
    }

    pub fn constant_buffers(&self) -> &Arc<ConstantBufferCache> {
        &self.inner.caches.constant_buffers
    }

    /// Create a draw command and register it for lifecycle bookkeeping
    pub fn create_draw_command(&self) -> KilnResult<Arc<Mutex<DrawCommand>>> {
        let command = Arc::new(Mutex::new(DrawCommand::new(
            &self.inner.device_context,
            self.inner.caches.clone(),
        )?));
        self.inner.queue.add_command(command.clone());
        Ok(command)
    }

    pub fn command_queue(&self) -> &DrawCommandQueue {
        &self.inner.queue
    }

    /// Bulk-clear every cache and reset every live draw command. SRBs hold bindings
    /// against pipelines, so they are dropped first.
    pub fn release_gpu_objects(&self) {
        let caches = &self.inner.caches;
        caches.pipelines.release_all(&caches.srbs);
        caches.vertex_declarations.clear();
        caches.programs.clear();
        caches.constant_buffers.clear();
        self.inner.queue.reset_all();
    }

    pub fn metrics(&self) -> GraphicsContextMetrics {
        let caches = &self.inner.caches;
        GraphicsContextMetrics {
            pipeline_create_count: caches.pipelines.create_count(),
            srb_create_count: caches.srbs.create_count(),
            program_create_count: caches.programs.create_count(),
            vertex_declaration_create_count: caches.vertex_declarations.create_count(),
        }
    }

    /// Frame rollover. Logs the cache builds that happened during the frame (a steady
    /// state frame builds nothing) and resets every live draw command so the next frame
    /// starts with all state marked dirty.
    pub fn on_frame_complete(&self) {
        let metrics = self.metrics();
        let previous = {
            let mut guard = self.inner.previous_metrics.lock().unwrap();
            std::mem::replace(&mut *guard, metrics.clone())
        };
        if metrics != previous {
            log::debug!(
                "frame built {} pipelines, {} srbs, {} programs, {} vertex declarations",
                metrics.pipeline_create_count - previous.pipeline_create_count,
                metrics.srb_create_count - previous.srb_create_count,
                metrics.program_create_count - previous.program_create_count,
                metrics.vertex_declaration_create_count
                    - previous.vertex_declaration_create_count,
            );
        }

        self.inner.queue.reset_all();
    }
}
