use crate::{
    ConstantBufferCache, PipelineState, PipelineStateCache, ShaderProgram, ShaderProgramRegistry,
    SrbCache, VertexDeclaration, VertexDeclarationCache,
};
use kiln_api::{
    BlendMode, ClearFlags, ColorWriteFlags, CompareFunc, CullMode, FillMode, IndexType, KilnBuffer,
    KilnCommandBuffer, KilnDeviceContext, KilnError, KilnExtents2D, KilnResult, KilnScissor,
    KilnShaderResourceBinding, KilnTexture, KilnVertexBufferBinding, KilnViewport,
    PipelineStateDesc, PrimitiveTopology, ShaderStage, ShaderVariation, StencilOp,
    ALL_SHADER_PARAMETER_GROUPS, MAX_RENDER_TARGETS, MAX_TEXTURE_UNITS, MAX_VERTEX_STREAMS,
};
use std::sync::Arc;

/// One mutable state category tracked by a draw command. Categories are dirtied
/// independently by setters and resolved in a fixed dependency order before each draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateCategory {
    RenderTargets,
    DepthStencil,
    Pipeline,
    VertexBuffers,
    IndexBuffer,
    VertexDeclaration,
    ShaderResources,
    Viewport,
    Scissor,
}

pub const ALL_STATE_CATEGORIES: [StateCategory; 9] = [
    StateCategory::RenderTargets,
    StateCategory::DepthStencil,
    StateCategory::Pipeline,
    StateCategory::VertexBuffers,
    StateCategory::IndexBuffer,
    StateCategory::VertexDeclaration,
    StateCategory::ShaderResources,
    StateCategory::Viewport,
    StateCategory::Scissor,
];

impl StateCategory {
    fn mask(self) -> u16 {
        match self {
            StateCategory::RenderTargets => 1 << 0,
            StateCategory::DepthStencil => 1 << 1,
            StateCategory::Pipeline => 1 << 2,
            StateCategory::VertexBuffers => 1 << 3,
            StateCategory::IndexBuffer => 1 << 4,
            StateCategory::VertexDeclaration => 1 << 5,
            StateCategory::ShaderResources => 1 << 6,
            StateCategory::Viewport => 1 << 7,
            StateCategory::Scissor => 1 << 8,
        }
    }
}

/// Set of dirty state categories
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct DirtySet(u16);

impl DirtySet {
    pub fn all() -> Self {
        let mut set = DirtySet::default();
        for category in ALL_STATE_CATEGORIES {
            set.mark(category);
        }
        set
    }

    pub fn mark(
        &mut self,
        category: StateCategory,
    ) {
        self.0 |= category.mask();
    }

    pub fn unmark(
        &mut self,
        category: StateCategory,
    ) {
        self.0 &= !category.mask();
    }

    pub fn contains(
        &self,
        category: StateCategory,
    ) -> bool {
        self.0 & category.mask() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// A value queued by `set_shader_parameter`, written into constant buffers right before
/// the next draw
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ShaderParameterValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Matrix4([f32; 16]),
}

impl ShaderParameterValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ShaderParameterValue::Float(v) => kiln_base::memory::any_as_bytes(v),
            ShaderParameterValue::Int(v) => kiln_base::memory::any_as_bytes(v),
            ShaderParameterValue::Vec2(v) => kiln_base::memory::any_as_bytes(v),
            ShaderParameterValue::Vec3(v) => kiln_base::memory::any_as_bytes(v),
            ShaderParameterValue::Vec4(v) => kiln_base::memory::any_as_bytes(v),
            ShaderParameterValue::Matrix4(v) => kiln_base::memory::any_as_bytes(v),
        }
    }
}

/// Shaders and geometry the clear fallback path draws with when a hardware clear
/// cannot express a sub-rectangle clear
pub struct ClearResources {
    pub vertex_shader: Arc<ShaderVariation>,
    pub pixel_shader: Arc<ShaderVariation>,
    pub quad_buffer: KilnBuffer,
}

/// Shared caches a draw command consults while resolving dirty state
#[derive(Clone)]
pub struct DrawCommandCaches {
    pub programs: Arc<ShaderProgramRegistry>,
    pub vertex_declarations: Arc<VertexDeclarationCache>,
    pub pipelines: Arc<PipelineStateCache>,
    pub srbs: Arc<SrbCache>,
    pub constant_buffers: Arc<ConstantBufferCache>,
    pub clear_resources: Arc<ClearResources>,
}

/// Per-context draw orchestrator. Tracks every piece of mutable GPU state, marks dirty
/// categories on mutation, and resolves them in dependency order when `draw`,
/// `draw_indexed`, or `clear` is called. Failed resolution drops the draw rather than
/// issuing it against stale bindings.
pub struct DrawCommand {
    device_context: KilnDeviceContext,
    command_buffer: KilnCommandBuffer,
    caches: DrawCommandCaches,

    desc: PipelineStateDesc,
    render_targets: [Option<KilnTexture>; MAX_RENDER_TARGETS],
    depth_stencil: Option<KilnTexture>,
    viewport: KilnViewport,
    scissor: KilnScissor,
    vertex_buffers: [Option<KilnBuffer>; MAX_VERTEX_STREAMS],
    vertex_buffer_offsets: [u64; MAX_VERTEX_STREAMS],
    index_buffer: Option<KilnBuffer>,
    index_type: IndexType,
    textures: [Option<KilnTexture>; MAX_TEXTURE_UNITS],
    pending_parameters: Vec<(String, ShaderParameterValue)>,

    current_program: Option<Arc<ShaderProgram>>,
    current_declaration: Option<Arc<VertexDeclaration>>,
    current_pipeline: Option<Arc<PipelineState>>,
    current_srb: Option<Arc<KilnShaderResourceBinding>>,

    dirty: DirtySet,
    num_primitives: u32,
    num_batches: u32,
}

fn texture_eq(
    a: &Option<KilnTexture>,
    b: &Option<KilnTexture>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.generation() == b.generation(),
        _ => false,
    }
}

fn buffer_eq(
    a: &Option<KilnBuffer>,
    b: &Option<KilnBuffer>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.buffer_id() == b.buffer_id(),
        _ => false,
    }
}

impl DrawCommand {
    pub fn new(
        device_context: &KilnDeviceContext,
        caches: DrawCommandCaches,
    ) -> KilnResult<Self> {
        let command_buffer = device_context.create_command_buffer()?;
        Ok(DrawCommand {
            device_context: device_context.clone(),
            command_buffer,
            caches,
            desc: Default::default(),
            render_targets: Default::default(),
            depth_stencil: None,
            viewport: Default::default(),
            scissor: Default::default(),
            vertex_buffers: Default::default(),
            vertex_buffer_offsets: Default::default(),
            index_buffer: None,
            index_type: Default::default(),
            textures: Default::default(),
            pending_parameters: Default::default(),
            current_program: None,
            current_declaration: None,
            current_pipeline: None,
            current_srb: None,
            dirty: DirtySet::all(),
            num_primitives: 0,
            num_batches: 0,
        })
    }

    pub fn device_context(&self) -> &KilnDeviceContext {
        &self.device_context
    }

    pub fn dirty(&self) -> DirtySet {
        self.dirty
    }

    pub fn num_primitives(&self) -> u32 {
        self.num_primitives
    }

    pub fn num_batches(&self) -> u32 {
        self.num_batches
    }

    /// Restore every field to its default, drop all resolved objects, and mark every
    /// category dirty. Called at the start of each frame and after device recreation.
    pub fn reset(&mut self) {
        self.desc.reset();
        self.render_targets = Default::default();
        self.depth_stencil = None;
        self.viewport = Default::default();
        self.scissor = Default::default();
        self.vertex_buffers = Default::default();
        self.vertex_buffer_offsets = Default::default();
        self.index_buffer = None;
        self.index_type = Default::default();
        self.textures = Default::default();
        self.pending_parameters.clear();
        self.current_program = None;
        self.current_declaration = None;
        self.current_pipeline = None;
        self.current_srb = None;
        self.dirty = DirtySet::all();
        self.num_primitives = 0;
        self.num_batches = 0;
    }

    //
    // Setters. Each compares against the stored value and is a no-op when unchanged;
    // when changed it stores the value and marks exactly the categories it owns.
    //

    pub fn set_render_target(
        &mut self,
        index: usize,
        target: Option<KilnTexture>,
    ) {
        if index >= MAX_RENDER_TARGETS {
            log::error!("Render target index {} out of range, ignored", index);
            return;
        }

        if !texture_eq(&self.render_targets[index], &target) {
            self.render_targets[index] = target;
            self.dirty.mark(StateCategory::RenderTargets);
        }
    }

    pub fn set_depth_stencil(
        &mut self,
        target: Option<KilnTexture>,
    ) {
        if !texture_eq(&self.depth_stencil, &target) {
            self.depth_stencil = target;
            self.dirty.mark(StateCategory::DepthStencil);
        }
    }

    pub fn set_viewport(
        &mut self,
        viewport: KilnViewport,
    ) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.dirty.mark(StateCategory::Viewport);
        }
    }

    pub fn set_scissor(
        &mut self,
        scissor: KilnScissor,
    ) {
        if self.scissor != scissor {
            self.scissor = scissor;
            self.dirty.mark(StateCategory::Scissor);
        }
    }

    pub fn set_vertex_buffer(
        &mut self,
        slot: usize,
        buffer: Option<KilnBuffer>,
        byte_offset: u64,
    ) {
        if slot >= MAX_VERTEX_STREAMS {
            log::error!("Vertex buffer slot {} out of range, ignored", slot);
            return;
        }

        if !buffer_eq(&self.vertex_buffers[slot], &buffer)
            || self.vertex_buffer_offsets[slot] != byte_offset
        {
            self.vertex_buffers[slot] = buffer;
            self.vertex_buffer_offsets[slot] = byte_offset;
            self.dirty.mark(StateCategory::VertexBuffers);
        }
    }

    pub fn set_index_buffer(
        &mut self,
        buffer: Option<KilnBuffer>,
        index_type: IndexType,
    ) {
        if !buffer_eq(&self.index_buffer, &buffer) || self.index_type != index_type {
            self.index_buffer = buffer;
            self.index_type = index_type;
            self.dirty.mark(StateCategory::IndexBuffer);
        }
    }

    pub fn set_shaders(
        &mut self,
        vertex_shader: Arc<ShaderVariation>,
        pixel_shader: Arc<ShaderVariation>,
    ) {
        let unchanged = self
            .desc
            .shader(ShaderStage::Vertex)
            .map(|x| x.content_hash() == vertex_shader.content_hash())
            .unwrap_or(false)
            && self
                .desc
                .shader(ShaderStage::Pixel)
                .map(|x| x.content_hash() == pixel_shader.content_hash())
                .unwrap_or(false);
        if unchanged {
            return;
        }

        self.desc.set_shader(ShaderStage::Vertex, Some(vertex_shader));
        self.desc.set_shader(ShaderStage::Pixel, Some(pixel_shader));
        self.current_program = None;
        self.dirty.mark(StateCategory::Pipeline);
        self.dirty.mark(StateCategory::VertexDeclaration);
        self.dirty.mark(StateCategory::ShaderResources);
    }

    pub fn set_texture(
        &mut self,
        unit: usize,
        texture: Option<KilnTexture>,
    ) {
        if unit >= MAX_TEXTURE_UNITS {
            log::error!("Texture unit {} out of range, ignored", unit);
            return;
        }

        if !texture_eq(&self.textures[unit], &texture) {
            self.textures[unit] = texture;
            self.dirty.mark(StateCategory::ShaderResources);
        }
    }

    pub fn set_blend_mode(
        &mut self,
        blend_mode: BlendMode,
    ) {
        if self.desc.blend_state.blend_mode != blend_mode {
            self.desc.blend_state.blend_mode = blend_mode;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_color_write(
        &mut self,
        color_write: ColorWriteFlags,
    ) {
        if self.desc.blend_state.color_write != color_write {
            self.desc.blend_state.color_write = color_write;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_alpha_to_coverage(
        &mut self,
        enable: bool,
    ) {
        if self.desc.blend_state.alpha_to_coverage != enable {
            self.desc.blend_state.alpha_to_coverage = enable;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_fill_mode(
        &mut self,
        fill_mode: FillMode,
    ) {
        if self.desc.rasterizer_state.fill_mode != fill_mode {
            self.desc.rasterizer_state.fill_mode = fill_mode;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_cull_mode(
        &mut self,
        cull_mode: CullMode,
    ) {
        if self.desc.rasterizer_state.cull_mode != cull_mode {
            self.desc.rasterizer_state.cull_mode = cull_mode;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_depth_bias(
        &mut self,
        constant_bias: i32,
        slope_scaled_bias: f32,
    ) {
        if self.desc.rasterizer_state.depth_bias != constant_bias
            || self.desc.rasterizer_state.slope_scaled_depth_bias != slope_scaled_bias
        {
            self.desc.rasterizer_state.depth_bias = constant_bias;
            self.desc.rasterizer_state.slope_scaled_depth_bias = slope_scaled_bias;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_scissor_enable(
        &mut self,
        enable: bool,
    ) {
        if self.desc.rasterizer_state.scissor_enable != enable {
            self.desc.rasterizer_state.scissor_enable = enable;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_line_antialias(
        &mut self,
        enable: bool,
    ) {
        if self.desc.rasterizer_state.line_antialias != enable {
            self.desc.rasterizer_state.line_antialias = enable;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_depth_write(
        &mut self,
        enable: bool,
    ) {
        if self.desc.depth_stencil_state.depth_write_enable != enable {
            self.desc.depth_stencil_state.depth_write_enable = enable;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_depth_compare(
        &mut self,
        compare: CompareFunc,
    ) {
        if self.desc.depth_stencil_state.depth_compare != compare {
            self.desc.depth_stencil_state.depth_compare = compare;
            self.mark_pipeline_dirty();
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_stencil_test(
        &mut self,
        enable: bool,
        compare: CompareFunc,
        pass_op: StencilOp,
        fail_op: StencilOp,
        depth_fail_op: StencilOp,
        read_mask: u8,
        write_mask: u8,
    ) {
        let state = &mut self.desc.depth_stencil_state;
        if state.stencil_enable != enable
            || state.stencil_compare != compare
            || state.stencil_pass_op != pass_op
            || state.stencil_fail_op != fail_op
            || state.stencil_depth_fail_op != depth_fail_op
            || state.stencil_read_mask != read_mask
            || state.stencil_write_mask != write_mask
        {
            state.stencil_enable = enable;
            state.stencil_compare = compare;
            state.stencil_pass_op = pass_op;
            state.stencil_fail_op = fail_op;
            state.stencil_depth_fail_op = depth_fail_op;
            state.stencil_read_mask = read_mask;
            state.stencil_write_mask = write_mask;
            self.mark_pipeline_dirty();
        }
    }

    pub fn set_primitive_topology(
        &mut self,
        topology: PrimitiveTopology,
    ) {
        if self.desc.primitive_topology != topology {
            self.desc.primitive_topology = topology;
            self.mark_pipeline_dirty();
        }
    }

    /// Queue a uniform write, applied to constant buffers right before the next draw.
    /// Parameters the current program does not declare are skipped at flush time.
    pub fn set_shader_parameter(
        &mut self,
        name: &str,
        value: ShaderParameterValue,
    ) {
        self.pending_parameters.push((name.to_string(), value));
    }

    fn mark_pipeline_dirty(&mut self) {
        self.desc.invalidate_hash();
        self.dirty.mark(StateCategory::Pipeline);
    }

    //
    // Resolution
    //

    fn bound_extents(&self) -> Option<KilnExtents2D> {
        self.render_targets[0]
            .as_ref()
            .or(self.depth_stencil.as_ref())
            .map(|x| x.extents())
    }

    fn resolve_program(&mut self) -> KilnResult<Arc<ShaderProgram>> {
        if let Some(program) = &self.current_program {
            return Ok(program.clone());
        }

        let vertex_shader = self
            .desc
            .shader(ShaderStage::Vertex)
            .ok_or_else(|| {
                KilnError::ConfigurationError("Draw issued with no vertex shader set".to_string())
            })?
            .clone();
        let pixel_shader = self
            .desc
            .shader(ShaderStage::Pixel)
            .ok_or_else(|| {
                KilnError::ConfigurationError("Draw issued with no pixel shader set".to_string())
            })?
            .clone();

        let program = self.caches.programs.get_or_create(&vertex_shader, &pixel_shader)?;
        self.current_program = Some(program.clone());
        Ok(program)
    }

    /// Resolve the depth-stencil and render-target categories into the descriptor's
    /// output block and bind the targets if anything changed. Shared by draw and clear.
    fn resolve_targets(&mut self) -> KilnResult<()> {
        let targets_changed = self.dirty.contains(StateCategory::RenderTargets)
            || self.dirty.contains(StateCategory::DepthStencil);
        if !targets_changed {
            return Ok(());
        }

        let mut output = self.desc.output;
        output.depth_stencil_format = self
            .depth_stencil
            .as_ref()
            .map(|x| x.texture_def().format)
            .unwrap_or_default();

        output.render_target_count = 0;
        output.render_target_formats = Default::default();
        let mut multisample_count = 1;
        for (i, target) in self.render_targets.iter().enumerate() {
            if let Some(target) = target {
                output.render_target_count = i as u32 + 1;
                output.render_target_formats[i] = target.texture_def().format;
                multisample_count = target.texture_def().sample_count;
            }
        }
        output.multisample_count = multisample_count;

        // A format change invalidates the pipeline even though no pipeline setter ran
        if output != self.desc.output {
            self.desc.output = output;
            self.mark_pipeline_dirty();
        }

        let color_targets: Vec<&KilnTexture> =
            self.render_targets.iter().flatten().collect();
        self.command_buffer
            .cmd_bind_render_targets(&color_targets, self.depth_stencil.as_ref())?;

        self.dirty.unmark(StateCategory::RenderTargets);
        self.dirty.unmark(StateCategory::DepthStencil);
        Ok(())
    }

    /// Resolve every dirty category in dependency order. Later categories read values
    /// earlier ones may have just changed, so the order is load-bearing.
    #[profiling::function]
    fn prepare_draw(&mut self) -> KilnResult<()> {
        self.resolve_targets()?;

        if self.dirty.contains(StateCategory::VertexBuffers) {
            let bindings: Vec<KilnVertexBufferBinding> = self
                .vertex_buffers
                .iter()
                .zip(self.vertex_buffer_offsets.iter())
                .filter_map(|(buffer, offset)| {
                    buffer.as_ref().map(|buffer| KilnVertexBufferBinding {
                        buffer: buffer.clone(),
                        byte_offset: *offset,
                    })
                })
                .collect();
            self.command_buffer.cmd_bind_vertex_buffers(0, &bindings)?;

            // A different buffer may expose a different layout
            self.dirty.mark(StateCategory::VertexDeclaration);
            self.dirty.unmark(StateCategory::VertexBuffers);
        }

        if self.dirty.contains(StateCategory::IndexBuffer) {
            if let Some(index_buffer) = &self.index_buffer {
                self.command_buffer
                    .cmd_bind_index_buffer(index_buffer, self.index_type)?;
            }

            self.dirty.unmark(StateCategory::IndexBuffer);
        }

        if self.dirty.contains(StateCategory::VertexDeclaration) {
            let program = self.resolve_program()?;
            let declaration = self
                .caches
                .vertex_declarations
                .get_or_create(&program, &self.vertex_buffers)?;

            let layout_changed = self
                .current_declaration
                .as_ref()
                .map(|x| x.hash() != declaration.hash())
                .unwrap_or(true);
            if layout_changed {
                self.desc.input_layout = declaration.input_layout().clone();
                self.mark_pipeline_dirty();
            }

            self.current_declaration = Some(declaration);
            self.dirty.unmark(StateCategory::VertexDeclaration);
        }

        if self.dirty.contains(StateCategory::Pipeline) {
            let hash = self.desc.to_hash()?;
            let pipeline_changed = self
                .current_pipeline
                .as_ref()
                .map(|x| x.hash().as_u64() != hash)
                .unwrap_or(true);
            if pipeline_changed {
                let pipeline = self.caches.pipelines.acquire(&self.desc)?;
                self.command_buffer.cmd_bind_pipeline(pipeline.pipeline())?;
                self.current_pipeline = Some(pipeline);
                // A different pipeline needs its own resource binding
                self.dirty.mark(StateCategory::ShaderResources);
            }

            self.dirty.unmark(StateCategory::Pipeline);
        }

        if self.dirty.contains(StateCategory::ShaderResources) {
            let program = self.resolve_program()?;
            let pipeline = self.current_pipeline.as_ref().ok_or_else(|| {
                KilnError::ConfigurationError(
                    "Shader resources resolved before a pipeline exists".to_string(),
                )
            })?;

            let srb = self.caches.srbs.get_or_create(
                &self.caches.pipelines,
                pipeline.hash(),
                &program,
                &self.textures,
                &self.caches.constant_buffers,
            )?;
            self.command_buffer.cmd_bind_shader_resource_binding(&srb)?;
            self.current_srb = Some(srb);
            self.dirty.unmark(StateCategory::ShaderResources);
        }

        self.flush_shader_parameters()?;

        if self.dirty.contains(StateCategory::Viewport) {
            self.command_buffer.cmd_set_viewport(self.viewport)?;
            self.dirty.unmark(StateCategory::Viewport);
        }

        if self.dirty.contains(StateCategory::Scissor) {
            self.command_buffer.cmd_set_scissor(self.scissor)?;
            self.dirty.unmark(StateCategory::Scissor);
        }

        Ok(())
    }

    fn flush_shader_parameters(&mut self) -> KilnResult<()> {
        if self.pending_parameters.is_empty() {
            return Ok(());
        }

        let program = self.resolve_program()?;
        let pending = std::mem::take(&mut self.pending_parameters);
        for (name, value) in &pending {
            let binding = match program.parameter(name) {
                Some(binding) => binding,
                None => {
                    log::trace!("Shader parameter '{}' not declared by current program", name);
                    continue;
                }
            };

            for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
                if !binding.stages.contains(stage.flag()) {
                    continue;
                }

                if let Some(buffer) = self.caches.constant_buffers.get(stage, binding.group) {
                    buffer.write(binding.byte_offset, value.as_bytes())?;
                }
            }
        }

        // Upload every buffer a write landed in
        for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
            for group in ALL_SHADER_PARAMETER_GROUPS {
                if let Some(buffer) = self.caches.constant_buffers.get(stage, group) {
                    buffer.flush()?;
                }
            }
        }

        Ok(())
    }

    /// Resolve dirty state and issue a non-indexed draw. Resolution failure drops the
    /// draw and logs; GPU state is never touched with partially-resolved bindings.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        first_vertex: u32,
    ) -> KilnResult<()> {
        if let Err(e) = self.prepare_draw() {
            log::error!("Skipping draw, state resolution failed: {:?}", e);
            return Ok(());
        }

        self.command_buffer.cmd_draw(vertex_count, first_vertex)?;
        self.num_batches += 1;
        self.num_primitives += self.desc.primitive_topology.primitive_count(vertex_count);
        Ok(())
    }

    /// Resolve dirty state and issue an indexed draw. Same failure semantics as `draw`.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        base_vertex: i32,
    ) -> KilnResult<()> {
        if let Err(e) = self.prepare_draw() {
            log::error!("Skipping indexed draw, state resolution failed: {:?}", e);
            return Ok(());
        }

        self.command_buffer
            .cmd_draw_indexed(index_count, first_index, base_vertex)?;
        self.num_batches += 1;
        self.num_primitives += self.desc.primitive_topology.primitive_count(index_count);
        Ok(())
    }

    /// Clear the bound targets. When the current viewport covers the full target, a
    /// hardware clear is issued. A sub-rectangle clear falls back to drawing a
    /// fullscreen quad with the clear shaders, since rectangle-scoped hardware clears
    /// are not uniformly available across backends.
    pub fn clear(
        &mut self,
        flags: ClearFlags,
        color: [f32; 4],
        depth: f32,
        stencil: u8,
    ) -> KilnResult<()> {
        if let Err(e) = self.resolve_targets() {
            log::error!("Skipping clear, target resolution failed: {:?}", e);
            return Ok(());
        }

        let full_coverage = match self.bound_extents() {
            Some(extents) => self.viewport.covers(extents),
            None => true,
        };

        if full_coverage {
            return self.command_buffer.cmd_clear(flags, color, depth, stencil);
        }

        log::trace!("Viewport-scoped clear, falling back to a clear-shader quad");

        // Snapshot everything the quad draw touches so callers see their own state
        // after the clear, not the clear shaders and quad buffer
        let saved_vertex_shader = self.desc.shader(ShaderStage::Vertex).cloned();
        let saved_pixel_shader = self.desc.shader(ShaderStage::Pixel).cloned();
        let saved_vertex_buffers = self.vertex_buffers.clone();
        let saved_vertex_buffer_offsets = self.vertex_buffer_offsets;
        let saved_topology = self.desc.primitive_topology;
        let saved_blend_mode = self.desc.blend_state.blend_mode;
        let saved_cull_mode = self.desc.rasterizer_state.cull_mode;
        let saved_depth_write = self.desc.depth_stencil_state.depth_write_enable;
        let saved_depth_compare = self.desc.depth_stencil_state.depth_compare;
        let saved_parameters = std::mem::take(&mut self.pending_parameters);

        let clear_resources = self.caches.clear_resources.clone();
        self.set_shaders(
            clear_resources.vertex_shader.clone(),
            clear_resources.pixel_shader.clone(),
        );
        self.set_vertex_buffer(0, Some(clear_resources.quad_buffer.clone()), 0);
        for slot in 1..MAX_VERTEX_STREAMS {
            self.set_vertex_buffer(slot, None, 0);
        }
        self.set_primitive_topology(PrimitiveTopology::TriangleStrip);
        self.set_blend_mode(BlendMode::Replace);
        self.set_cull_mode(CullMode::None);
        self.set_depth_write(flags.contains(ClearFlags::DEPTH));
        self.set_depth_compare(CompareFunc::Always);
        self.set_shader_parameter("ClearColor", ShaderParameterValue::Vec4(color));
        self.set_shader_parameter("ClearDepth", ShaderParameterValue::Float(depth));
        let result = self.draw(4, 0);

        self.desc.set_shader(ShaderStage::Vertex, saved_vertex_shader);
        self.desc.set_shader(ShaderStage::Pixel, saved_pixel_shader);
        self.current_program = None;
        self.dirty.mark(StateCategory::Pipeline);
        self.dirty.mark(StateCategory::VertexDeclaration);
        self.dirty.mark(StateCategory::ShaderResources);
        for (slot, buffer) in saved_vertex_buffers.into_iter().enumerate() {
            self.set_vertex_buffer(slot, buffer, saved_vertex_buffer_offsets[slot]);
        }
        self.set_primitive_topology(saved_topology);
        self.set_blend_mode(saved_blend_mode);
        self.set_cull_mode(saved_cull_mode);
        self.set_depth_write(saved_depth_write);
        self.set_depth_compare(saved_depth_compare);
        self.pending_parameters = saved_parameters;

        result
    }
}
