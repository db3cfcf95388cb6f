use crate::*;
use kiln_api::backends::null::KilnDeviceContextNull;
use kiln_api::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn null_device() -> KilnDeviceContext {
    let _ = env_logger::builder().is_test(true).try_init();
    KilnDeviceContext::Null(KilnDeviceContextNull::new(KilnDeviceInfo::default()))
}

fn context(device_context: &KilnDeviceContext) -> GraphicsContext {
    GraphicsContext::new(device_context, VertexLayoutFallback::Lenient).unwrap()
}

fn pipelines_created(device_context: &KilnDeviceContext) -> u64 {
    device_context
        .null_device_context()
        .unwrap()
        .call_counters()
        .pipelines_created
        .load(Ordering::Relaxed)
}

fn draw_calls(device_context: &KilnDeviceContext) -> u64 {
    device_context
        .null_device_context()
        .unwrap()
        .call_counters()
        .draw_calls
        .load(Ordering::Relaxed)
}

fn hardware_clears(device_context: &KilnDeviceContext) -> u64 {
    device_context
        .null_device_context()
        .unwrap()
        .call_counters()
        .hardware_clears
        .load(Ordering::Relaxed)
}

fn basic_shaders(
    device_context: &KilnDeviceContext
) -> (Arc<ShaderVariation>, Arc<ShaderVariation>) {
    let vertex_inputs = vec![VertexInputReflection {
        semantic: VertexElementSemantic::Position,
        semantic_index: 0,
    }];
    let vertex_shader = device_context
        .create_shader_variation(&ShaderVariationDef {
            stage: ShaderStage::Vertex,
            name: "Basic".to_string(),
            source: "vs source".to_string(),
            defines: Vec::new(),
            reflection: ShaderReflection {
                parameters: vec![ShaderParameterReflection {
                    name: "World".to_string(),
                    group: ShaderParameterGroup::Object,
                    byte_offset: 0,
                    size: 64,
                }],
                textures: Vec::new(),
                element_hash: ShaderReflection::compute_element_hash(&vertex_inputs),
                vertex_inputs,
            },
        })
        .unwrap();

    let pixel_shader = device_context
        .create_shader_variation(&ShaderVariationDef {
            stage: ShaderStage::Pixel,
            name: "Basic".to_string(),
            source: "ps source".to_string(),
            defines: Vec::new(),
            reflection: ShaderReflection {
                parameters: vec![ShaderParameterReflection {
                    name: "MatDiffColor".to_string(),
                    group: ShaderParameterGroup::Material,
                    byte_offset: 0,
                    size: 16,
                }],
                textures: vec![ShaderTextureReflection {
                    name: "DiffMap".to_string(),
                    unit: 0,
                }],
                vertex_inputs: Vec::new(),
                element_hash: 0,
            },
        })
        .unwrap();

    (vertex_shader, pixel_shader)
}

fn position_buffer(
    device_context: &KilnDeviceContext,
    debug_name: &str,
) -> KilnBuffer {
    let layout = VertexLayout::new(&[VertexElement::new(
        VertexElementSemantic::Position,
        VertexElementType::Vec3,
    )]);
    device_context
        .create_buffer(&KilnBufferDef {
            size: layout.stride() as u64 * 3,
            memory_usage: KilnMemoryUsage::GpuOnly,
            resource_type: KilnResourceType::VERTEX_BUFFER,
            vertex_layout: Some(layout),
            index_type: None,
            debug_name: debug_name.to_string(),
        })
        .unwrap()
}

fn render_target(
    device_context: &KilnDeviceContext,
    format: KilnFormat,
) -> KilnTexture {
    device_context
        .create_texture(&KilnTextureDef {
            extents: KilnExtents2D {
                width: 128,
                height: 128,
            },
            format,
            resource_type: KilnResourceType::RENDER_TARGET_COLOR,
            ..Default::default()
        })
        .unwrap()
}

fn ready_to_draw(
    device_context: &KilnDeviceContext,
    graphics_context: &GraphicsContext,
) -> std::sync::Arc<std::sync::Mutex<DrawCommand>> {
    let command = graphics_context.create_draw_command().unwrap();
    {
        let mut command = command.lock().unwrap();
        let (vertex_shader, pixel_shader) = basic_shaders(device_context);
        command.set_render_target(
            0,
            Some(render_target(device_context, KilnFormat::R8G8B8A8_UNORM)),
        );
        command.set_viewport(KilnViewport {
            x: 0,
            y: 0,
            width: 128,
            height: 128,
        });
        command.set_shaders(vertex_shader, pixel_shader);
        command.set_vertex_buffer(0, Some(position_buffer(device_context, "tri")), 0);
    }
    command
}

fn descriptor_with_shaders(device_context: &KilnDeviceContext) -> PipelineStateDesc {
    let (vertex_shader, pixel_shader) = basic_shaders(device_context);
    let mut desc = PipelineStateDesc::default();
    desc.set_shader(ShaderStage::Vertex, Some(vertex_shader));
    desc.set_shader(ShaderStage::Pixel, Some(pixel_shader));
    desc.output.render_target_count = 1;
    desc.output.render_target_formats[0] = KilnFormat::R8G8B8A8_UNORM;
    desc
}

#[test]
fn debug_name_is_excluded_from_the_hash() {
    let device_context = null_device();
    let mut a = descriptor_with_shaders(&device_context);
    a.debug_name = "first".to_string();
    let mut b = a.clone();
    b.debug_name = "second".to_string();
    b.invalidate_hash();

    assert_eq!(a.to_hash().unwrap(), b.to_hash().unwrap());
}

#[test]
fn every_fixed_function_field_feeds_the_hash() {
    let device_context = null_device();
    let base = descriptor_with_shaders(&device_context);
    let base_hash = base.to_hash().unwrap();

    let mut changed = base.clone();
    changed.blend_state.blend_mode = BlendMode::Alpha;
    changed.invalidate_hash();
    assert_ne!(changed.to_hash().unwrap(), base_hash);

    let mut changed = base.clone();
    changed.rasterizer_state.cull_mode = CullMode::Cw;
    changed.invalidate_hash();
    assert_ne!(changed.to_hash().unwrap(), base_hash);

    let mut changed = base.clone();
    changed.depth_stencil_state.depth_write_enable = false;
    changed.invalidate_hash();
    assert_ne!(changed.to_hash().unwrap(), base_hash);

    let mut changed = base.clone();
    changed.primitive_topology = PrimitiveTopology::LineList;
    changed.invalidate_hash();
    assert_ne!(changed.to_hash().unwrap(), base_hash);
}

#[test]
fn identical_shader_inputs_produce_identical_variation_hashes() {
    // Two separately compiled instances of the same source and defines must key caches
    // identically, so reloads do not grow the caches
    let device_context = null_device();
    let (a, _) = basic_shaders(&device_context);
    let (b, _) = basic_shaders(&device_context);
    assert_eq!(a.content_hash(), b.content_hash());
}

#[test]
fn acquire_twice_creates_one_native_pipeline() {
    let device_context = null_device();
    let graphics_context = context(&device_context);

    let mut desc = descriptor_with_shaders(&device_context);
    desc.blend_state.blend_mode = BlendMode::Replace;
    desc.rasterizer_state.cull_mode = CullMode::Ccw;

    let first = graphics_context.pipelines().acquire(&desc).unwrap();
    let second = graphics_context.pipelines().acquire(&desc).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.hash(), second.hash());
    assert_eq!(pipelines_created(&device_context), 1);
}

#[test]
fn changing_render_target_format_changes_the_pipeline_hash() {
    let device_context = null_device();
    let graphics_context = context(&device_context);

    let desc = descriptor_with_shaders(&device_context);
    let first = graphics_context.pipelines().acquire(&desc).unwrap();

    let mut desc = desc;
    desc.output.render_target_formats[0] = KilnFormat::R16G16B16A16_SFLOAT;
    desc.invalidate_hash();
    let second = graphics_context.pipelines().acquire(&desc).unwrap();

    assert_ne!(first.hash(), second.hash());
    assert_eq!(pipelines_created(&device_context), 2);
}

#[test]
fn rebinding_the_same_vertex_buffer_is_a_no_op() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    command.draw(3, 0).unwrap();
    assert!(command.dirty().is_empty());
    let declarations_before = graphics_context.metrics().vertex_declaration_create_count;

    // Same buffer, same slot, same offset
    let buffer = position_buffer(&device_context, "tri2");
    command.set_vertex_buffer(1, Some(buffer.clone()), 0);
    let dirty_after_new = command.dirty();
    command.set_vertex_buffer(1, Some(buffer), 0);
    assert_eq!(command.dirty(), dirty_after_new);

    command.draw(3, 0).unwrap();
    command.draw(3, 0).unwrap();
    // The declaration was rebuilt at most once for the new binding, and not again for
    // the identical rebind
    let declarations_after = graphics_context.metrics().vertex_declaration_create_count;
    assert!(declarations_after <= declarations_before + 1);
}

#[test]
fn identical_draws_share_every_cached_object() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    command.draw(3, 0).unwrap();
    let metrics_first = graphics_context.metrics();
    command.draw(3, 0).unwrap();
    let metrics_second = graphics_context.metrics();

    assert_eq!(metrics_first, metrics_second);
    assert_eq!(draw_calls(&device_context), 2);
    assert_eq!(command.num_batches(), 2);
    assert_eq!(command.num_primitives(), 2);
}

#[test]
fn unchanged_setter_calls_leave_dirty_bits_alone() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();
    command.draw(3, 0).unwrap();
    assert!(command.dirty().is_empty());

    command.set_blend_mode(BlendMode::Replace);
    command.set_cull_mode(CullMode::None);
    command.set_depth_write(true);
    assert!(command.dirty().is_empty());

    command.set_blend_mode(BlendMode::Alpha);
    assert!(command.dirty().contains(StateCategory::Pipeline));
    assert!(!command.dirty().contains(StateCategory::VertexBuffers));
    assert!(!command.dirty().contains(StateCategory::ShaderResources));
}

#[test]
fn out_of_range_slots_are_rejected_without_panicking() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();
    command.draw(3, 0).unwrap();
    assert!(command.dirty().is_empty());

    command.set_render_target(MAX_RENDER_TARGETS, None);
    command.set_vertex_buffer(MAX_VERTEX_STREAMS, None, 0);
    command.set_texture(MAX_TEXTURE_UNITS, None);
    assert!(command.dirty().is_empty());
}

#[test]
fn changing_blend_mode_builds_a_second_pipeline() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    command.draw(3, 0).unwrap();
    assert_eq!(pipelines_created(&device_context), 1);

    command.set_blend_mode(BlendMode::Alpha);
    command.draw(3, 0).unwrap();
    assert_eq!(pipelines_created(&device_context), 2);

    // Back to a previously seen state, served from cache
    command.set_blend_mode(BlendMode::Replace);
    command.draw(3, 0).unwrap();
    assert_eq!(pipelines_created(&device_context), 2);
}

#[test]
fn rebinding_a_texture_builds_a_new_srb() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    let texture_a = render_target(&device_context, KilnFormat::R8G8B8A8_UNORM);
    let texture_b = render_target(&device_context, KilnFormat::R8G8B8A8_UNORM);

    command.set_texture(0, Some(texture_a.clone()));
    command.draw(3, 0).unwrap();
    let srbs_after_a = graphics_context.metrics().srb_create_count;

    command.set_texture(0, Some(texture_b));
    command.draw(3, 0).unwrap();
    assert_eq!(graphics_context.metrics().srb_create_count, srbs_after_a + 1);

    // Rebinding the first texture hits the cached SRB
    command.set_texture(0, Some(texture_a));
    command.draw(3, 0).unwrap();
    assert_eq!(graphics_context.metrics().srb_create_count, srbs_after_a + 1);
}

#[test]
fn reset_marks_everything_dirty_and_resolves_from_scratch() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();
    command.draw(3, 0).unwrap();
    assert!(command.dirty().is_empty());

    command.reset();
    assert_eq!(command.dirty(), DirtySet::all());
    assert_eq!(command.num_batches(), 0);
    assert_eq!(command.num_primitives(), 0);

    // No shaders are set after reset, so the draw is dropped, not issued
    let draws_before = draw_calls(&device_context);
    command.draw(3, 0).unwrap();
    assert_eq!(draw_calls(&device_context), draws_before);
}

#[test]
fn frame_completion_resets_every_live_command() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    {
        let mut command = command.lock().unwrap();
        command.draw(3, 0).unwrap();
        assert!(command.dirty().is_empty());
    }

    graphics_context.on_frame_complete();
    let command = command.lock().unwrap();
    assert_eq!(command.dirty(), DirtySet::all());
    assert_eq!(command.num_batches(), 0);
}

#[test]
fn srb_request_fails_cleanly_after_pipeline_release() {
    let device_context = null_device();
    let graphics_context = context(&device_context);

    let (vertex_shader, pixel_shader) = basic_shaders(&device_context);
    let program = graphics_context
        .programs()
        .get_or_create(&vertex_shader, &pixel_shader)
        .unwrap();

    let desc = descriptor_with_shaders(&device_context);
    let pipeline = graphics_context.pipelines().acquire(&desc).unwrap();
    let textures: [Option<KilnTexture>; MAX_TEXTURE_UNITS] = Default::default();

    graphics_context
        .srbs()
        .get_or_create(
            graphics_context.pipelines(),
            pipeline.hash(),
            &program,
            &textures,
            graphics_context.constant_buffers(),
        )
        .unwrap();

    // SRBs depend on pipelines, so both caches are dropped together
    graphics_context.srbs().clear();
    graphics_context.pipelines().clear();

    let result = graphics_context.srbs().get_or_create(
        graphics_context.pipelines(),
        pipeline.hash(),
        &program,
        &textures,
        graphics_context.constant_buffers(),
    );
    assert!(matches!(result, Err(KilnError::ConfigurationError(_))));
}

#[test]
fn failed_pipeline_creation_is_not_cached_and_drops_the_draw() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    device_context
        .null_device_context()
        .unwrap()
        .set_fail_pipeline_creation(true);
    command.draw(3, 0).unwrap();
    assert_eq!(draw_calls(&device_context), 0);
    assert_eq!(graphics_context.metrics().pipeline_create_count, 0);

    // Once the device cooperates the same state builds and draws
    device_context
        .null_device_context()
        .unwrap()
        .set_fail_pipeline_creation(false);
    command.draw(3, 0).unwrap();
    assert_eq!(draw_calls(&device_context), 1);
    assert_eq!(graphics_context.metrics().pipeline_create_count, 1);
}

#[test]
fn full_coverage_clear_uses_the_hardware_path() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    command
        .clear(ClearFlags::COLOR, [0.0, 0.0, 0.0, 1.0], 1.0, 0)
        .unwrap();
    assert_eq!(hardware_clears(&device_context), 1);
    assert_eq!(draw_calls(&device_context), 0);
}

#[test]
fn partial_clear_falls_back_to_a_quad_draw() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();

    command.set_viewport(KilnViewport {
        x: 32,
        y: 32,
        width: 64,
        height: 64,
    });
    command
        .clear(ClearFlags::COLOR, [1.0, 0.0, 0.0, 1.0], 1.0, 0)
        .unwrap();
    assert_eq!(hardware_clears(&device_context), 0);
    assert_eq!(draw_calls(&device_context), 1);
}

#[test]
fn quad_clear_restores_the_caller_state() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();
    command.draw(3, 0).unwrap();
    let pipelines_before = pipelines_created(&device_context);

    command.set_viewport(KilnViewport {
        x: 32,
        y: 32,
        width: 64,
        height: 64,
    });
    command
        .clear(ClearFlags::COLOR, [1.0, 0.0, 0.0, 1.0], 1.0, 0)
        .unwrap();
    // The quad draw built the clear pipeline
    assert_eq!(pipelines_created(&device_context), pipelines_before + 1);

    // The next draw re-resolves with the caller's own shaders and buffers, so both
    // pipelines are cache hits and no new one is built
    command.draw(3, 0).unwrap();
    assert_eq!(pipelines_created(&device_context), pipelines_before + 1);
}

#[test]
fn grown_default_constant_buffer_is_rebound_into_existing_srbs() {
    let device_context = null_device();
    let graphics_context = context(&device_context);
    let command = ready_to_draw(&device_context, &graphics_context);
    let mut command = command.lock().unwrap();
    command.draw(3, 0).unwrap();

    // A second shader pair demanding a larger material buffer forces the default for
    // (pixel, material) to grow
    let big_pixel_shader = device_context
        .create_shader_variation(&ShaderVariationDef {
            stage: ShaderStage::Pixel,
            name: "BigMaterial".to_string(),
            source: "big ps source".to_string(),
            defines: Vec::new(),
            reflection: ShaderReflection {
                parameters: vec![ShaderParameterReflection {
                    name: "MatBlock".to_string(),
                    group: ShaderParameterGroup::Material,
                    byte_offset: 0,
                    size: 1024,
                }],
                textures: Vec::new(),
                vertex_inputs: Vec::new(),
                element_hash: 0,
            },
        })
        .unwrap();
    let (vertex_shader, _) = basic_shaders(&device_context);
    command.set_shaders(vertex_shader, big_pixel_shader);
    command.draw(3, 0).unwrap();

    let grown = graphics_context
        .constant_buffers()
        .get(ShaderStage::Pixel, ShaderParameterGroup::Material)
        .unwrap();
    assert_eq!(grown.size(), 1024);

    // Every cached SRB now binds the grown buffer at that slot
    let grown_id = grown.buffer().buffer_id();
    graphics_context.srbs().for_each(|srb| {
        assert_eq!(
            srb.null_srb()
                .unwrap()
                .bound_constant_buffer_id(ShaderStage::Pixel, ShaderParameterGroup::Material),
            Some(grown_id)
        );
    });
}
