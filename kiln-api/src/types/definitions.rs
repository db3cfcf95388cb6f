use crate::types::*;
use crate::{KilnError, KilnResult, ShaderVariation};
use fnv::FnvHasher;
use kiln_base::DecimalF32;
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Fixed-function blend configuration for all render targets
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct BlendStateDesc {
    pub blend_mode: BlendMode,
    pub color_write: ColorWriteFlags,
    pub alpha_to_coverage: bool,
}

impl Default for BlendStateDesc {
    fn default() -> Self {
        BlendStateDesc {
            blend_mode: Default::default(),
            color_write: ColorWriteFlags::ALL,
            alpha_to_coverage: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RasterizerStateDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
    pub scissor_enable: bool,
    pub line_antialias: bool,
}

impl Eq for RasterizerStateDesc {}

// The f32 is hashed by bit pattern. Don't forget to update this if new fields are added.
impl Hash for RasterizerStateDesc {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.fill_mode.hash(state);
        self.cull_mode.hash(state);
        self.depth_bias.hash(state);
        DecimalF32(self.slope_scaled_depth_bias).hash(state);
        self.scissor_enable.hash(state);
        self.line_antialias.hash(state);
    }
}

impl Default for RasterizerStateDesc {
    fn default() -> Self {
        RasterizerStateDesc {
            fill_mode: Default::default(),
            cull_mode: Default::default(),
            depth_bias: 0,
            slope_scaled_depth_bias: 0.0,
            scissor_enable: false,
            line_antialias: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct DepthStencilStateDesc {
    pub depth_write_enable: bool,
    pub depth_compare: CompareFunc,
    pub stencil_enable: bool,
    pub stencil_compare: CompareFunc,
    pub stencil_pass_op: StencilOp,
    pub stencil_fail_op: StencilOp,
    pub stencil_depth_fail_op: StencilOp,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
}

impl Default for DepthStencilStateDesc {
    fn default() -> Self {
        DepthStencilStateDesc {
            depth_write_enable: true,
            depth_compare: CompareFunc::LessEqual,
            stencil_enable: false,
            stencil_compare: CompareFunc::Always,
            stencil_pass_op: StencilOp::Keep,
            stencil_fail_op: StencilOp::Keep,
            stencil_depth_fail_op: StencilOp::Keep,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
        }
    }
}

/// One attribute slot in the fully-resolved input layout handed to pipeline creation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct InputLayoutElement {
    pub input_index: u32,
    pub buffer_slot: u32,
    pub buffer_stride: u32,
    pub byte_offset: u32,
    pub element_type: VertexElementType,
    pub instance_step_rate: u32,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct InputLayoutDesc {
    pub elements: Vec<InputLayoutElement>,
}

/// Render-target and depth formats a pipeline will render into
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct OutputDesc {
    pub render_target_count: u32,
    pub render_target_formats: [KilnFormat; MAX_RENDER_TARGETS],
    pub depth_stencil_format: KilnFormat,
    pub multisample_count: u32,
    pub read_only_depth: bool,
}

impl Default for OutputDesc {
    fn default() -> Self {
        OutputDesc {
            render_target_count: 0,
            render_target_formats: [KilnFormat::UNDEFINED; MAX_RENDER_TARGETS],
            depth_stencil_format: KilnFormat::UNDEFINED,
            multisample_count: 1,
            read_only_depth: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct SamplerDesc {
    pub min_filter: FilterType,
    pub mag_filter: FilterType,
    pub mip_filter: FilterType,
    pub max_anisotropy: f32,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub shadow_compare: bool,
}

impl Eq for SamplerDesc {}

// The f32 is hashed by bit pattern. Don't forget to update this if new fields are added.
impl Hash for SamplerDesc {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.min_filter.hash(state);
        self.mag_filter.hash(state);
        self.mip_filter.hash(state);
        DecimalF32(self.max_anisotropy).hash(state);
        self.address_mode_u.hash(state);
        self.address_mode_v.hash(state);
        self.address_mode_w.hash(state);
        self.shadow_compare.hash(state);
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        SamplerDesc {
            min_filter: Default::default(),
            mag_filter: Default::default(),
            mip_filter: Default::default(),
            max_anisotropy: 1.0,
            address_mode_u: Default::default(),
            address_mode_v: Default::default(),
            address_mode_w: Default::default(),
            shadow_compare: false,
        }
    }
}

/// A sampler baked into the pipeline, matched to a shader variable by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ImmutableSamplerDesc {
    pub name: String,
    pub sampler: SamplerDesc,
}

/// Full description of a graphics pipeline: every fixed-function toggle, the resolved
/// input layout, output formats, immutable samplers, and the shader stages.
///
/// The hash is memoized. Zero means "not yet computed"; any setter that changes a
/// contributing field must call [`PipelineStateDesc::invalidate_hash`]. `debug_name`
/// deliberately does not contribute.
#[derive(Debug, Clone)]
pub struct PipelineStateDesc {
    pub blend_state: BlendStateDesc,
    pub rasterizer_state: RasterizerStateDesc,
    pub depth_stencil_state: DepthStencilStateDesc,
    pub input_layout: InputLayoutDesc,
    pub primitive_topology: PrimitiveTopology,
    pub output: OutputDesc,
    pub immutable_samplers: Vec<ImmutableSamplerDesc>,
    pub debug_name: String,
    shaders: [Option<Arc<ShaderVariation>>; MAX_SHADER_STAGES],
    hash: Cell<u64>,
}

impl Default for PipelineStateDesc {
    fn default() -> Self {
        PipelineStateDesc {
            blend_state: Default::default(),
            rasterizer_state: Default::default(),
            depth_stencil_state: Default::default(),
            input_layout: Default::default(),
            primitive_topology: Default::default(),
            output: Default::default(),
            immutable_samplers: Default::default(),
            debug_name: Default::default(),
            shaders: Default::default(),
            hash: Cell::new(0),
        }
    }
}

impl PipelineStateDesc {
    pub fn shader(
        &self,
        stage: ShaderStage,
    ) -> Option<&Arc<ShaderVariation>> {
        self.shaders[stage.index()].as_ref()
    }

    pub fn set_shader(
        &mut self,
        stage: ShaderStage,
        variation: Option<Arc<ShaderVariation>>,
    ) {
        self.shaders[stage.index()] = variation;
        self.invalidate_hash();
    }

    /// Must be called after mutating any public field that feeds the hash
    pub fn invalidate_hash(&self) {
        self.hash.set(0);
    }

    /// Restore every field to its default and drop all shader references
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// Deterministic hash over every field that affects the backend pipeline object.
    /// Memoized until [`PipelineStateDesc::invalidate_hash`] is called. Fails if the
    /// vertex or pixel stage is unset; such a descriptor can never build a pipeline
    /// and hashing it would poison the caches.
    #[profiling::function]
    pub fn to_hash(&self) -> KilnResult<u64> {
        let memoized = self.hash.get();
        if memoized != 0 {
            return Ok(memoized);
        }

        if self.shaders[ShaderStage::Vertex.index()].is_none()
            || self.shaders[ShaderStage::Pixel.index()].is_none()
        {
            return Err(KilnError::ConfigurationError(format!(
                "Pipeline desc '{}' is missing a vertex or pixel shader and cannot be hashed",
                self.debug_name
            )));
        }

        let mut hasher = FnvHasher::default();
        self.blend_state.hash(&mut hasher);
        self.rasterizer_state.hash(&mut hasher);
        self.depth_stencil_state.hash(&mut hasher);
        self.input_layout.hash(&mut hasher);
        self.primitive_topology.hash(&mut hasher);
        self.output.hash(&mut hasher);
        self.immutable_samplers.hash(&mut hasher);
        for shader in &self.shaders {
            match shader {
                Some(variation) => variation.content_hash().as_u64().hash(&mut hasher),
                None => 0u64.hash(&mut hasher),
            }
        }

        // Zero is reserved for "not computed"
        let hash = hasher.finish().max(1);
        self.hash.set(hash);
        Ok(hash)
    }
}

/// Borrowed view of a descriptor plus its already-computed hash, handed to the device
/// when creating the backend pipeline object
#[derive(Clone, Debug)]
pub struct KilnGraphicsPipelineDef<'a> {
    pub desc: &'a PipelineStateDesc,
    pub hash: u64,
}

/// Used to create a [`crate::KilnBuffer`]
#[derive(Clone, Debug)]
pub struct KilnBufferDef {
    pub size: u64,
    pub memory_usage: KilnMemoryUsage,
    pub resource_type: KilnResourceType,
    /// Required for vertex buffers; the input-layout builder reads element offsets from it
    pub vertex_layout: Option<VertexLayout>,
    pub index_type: Option<IndexType>,
    pub debug_name: String,
}

impl Default for KilnBufferDef {
    fn default() -> Self {
        KilnBufferDef {
            size: 0,
            memory_usage: Default::default(),
            resource_type: KilnResourceType::UNIFORM_BUFFER,
            vertex_layout: None,
            index_type: None,
            debug_name: Default::default(),
        }
    }
}

impl KilnBufferDef {
    pub fn verify(&self) -> KilnResult<()> {
        if self.size == 0 {
            return Err(KilnError::ConfigurationError(format!(
                "Buffer '{}' requested with zero size",
                self.debug_name
            )));
        }

        if self
            .resource_type
            .intersects(KilnResourceType::VERTEX_BUFFER)
            && self.vertex_layout.is_none()
        {
            return Err(KilnError::ConfigurationError(format!(
                "Vertex buffer '{}' requested without a vertex layout",
                self.debug_name
            )));
        }

        Ok(())
    }
}

/// Used to create a [`crate::KilnTexture`]
#[derive(Clone, Debug)]
pub struct KilnTextureDef {
    pub extents: KilnExtents2D,
    pub format: KilnFormat,
    pub resource_type: KilnResourceType,
    pub mip_count: u32,
    pub sample_count: u32,
    pub debug_name: String,
}

impl Default for KilnTextureDef {
    fn default() -> Self {
        KilnTextureDef {
            extents: Default::default(),
            format: KilnFormat::R8G8B8A8_UNORM,
            resource_type: KilnResourceType::TEXTURE,
            mip_count: 1,
            sample_count: 1,
            debug_name: Default::default(),
        }
    }
}

impl KilnTextureDef {
    pub fn verify(&self) -> KilnResult<()> {
        if self.extents.width == 0 || self.extents.height == 0 {
            return Err(KilnError::ConfigurationError(format!(
                "Texture '{}' requested with zero extents",
                self.debug_name
            )));
        }

        if self.format == KilnFormat::UNDEFINED {
            return Err(KilnError::ConfigurationError(format!(
                "Texture '{}' requested with an undefined format",
                self.debug_name
            )));
        }

        if self.resource_type.is_render_target() && self.mip_count != 1 {
            return Err(KilnError::ConfigurationError(format!(
                "Render target '{}' must have a single mip level",
                self.debug_name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_fails_without_required_shaders() {
        let desc = PipelineStateDesc::default();
        assert!(desc.to_hash().is_err());
    }

    #[test]
    fn output_desc_formats_feed_the_hash() {
        let mut a = OutputDesc::default();
        a.render_target_count = 1;
        a.render_target_formats[0] = KilnFormat::R8G8B8A8_UNORM;

        let mut b = a;
        b.render_target_formats[0] = KilnFormat::R16G16B16A16_SFLOAT;

        let hash = |desc: &OutputDesc| {
            let mut hasher = FnvHasher::default();
            desc.hash(&mut hasher);
            hasher.finish()
        };
        assert_ne!(hash(&a), hash(&b));
    }

    #[test]
    fn sampler_hash_distinguishes_anisotropy() {
        let a = SamplerDesc::default();
        let mut b = a;
        b.max_anisotropy = 8.0;

        let hash = |desc: &SamplerDesc| {
            let mut hasher = FnvHasher::default();
            desc.hash(&mut hasher);
            hasher.finish()
        };
        assert_ne!(hash(&a), hash(&b));
    }
}
