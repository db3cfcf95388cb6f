#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Color render targets bindable at once
pub const MAX_RENDER_TARGETS: usize = 4;
/// Vertex buffer stream slots
pub const MAX_VERTEX_STREAMS: usize = 4;
/// Texture units addressable by a shader resource binding
pub const MAX_TEXTURE_UNITS: usize = 16;
/// Immutable samplers baked into a pipeline
pub const MAX_IMMUTABLE_SAMPLERS: usize = 8;
/// Input layout elements any backend is guaranteed to accept
pub const MAX_INPUT_LAYOUT_ELEMENTS: usize = 16;
/// Shader stages a pipeline can reference (vertex, pixel, geometry, hull, domain)
pub const MAX_SHADER_STAGES: usize = 5;

/// How a pixel shader result is combined with the value already in the render target
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum BlendMode {
    Replace,
    Add,
    Multiply,
    Alpha,
    AddAlpha,
    PremultipliedAlpha,
    InvDestAlpha,
    Subtract,
    SubtractAlpha,
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Replace
    }
}

/// Comparison used for depth and stencil tests
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum CompareFunc {
    Always,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Never,
}

impl Default for CompareFunc {
    fn default() -> Self {
        CompareFunc::Always
    }
}

/// What happens to the stencil buffer value when a test passes or fails
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum StencilOp {
    Keep,
    Zero,
    Ref,
    Incr,
    Decr,
}

impl Default for StencilOp {
    fn default() -> Self {
        StencilOp::Keep
    }
}

/// Winding-based triangle culling
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum CullMode {
    None,
    Ccw,
    Cw,
}

impl Default for CullMode {
    fn default() -> Self {
        CullMode::None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum FillMode {
    Solid,
    Wireframe,
    Point,
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::Solid
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

impl Default for PrimitiveTopology {
    fn default() -> Self {
        PrimitiveTopology::TriangleList
    }
}

impl PrimitiveTopology {
    /// Primitives produced by `vertex_count` vertices with this topology
    pub fn primitive_count(
        self,
        vertex_count: u32,
    ) -> u32 {
        match self {
            PrimitiveTopology::TriangleList => vertex_count / 3,
            PrimitiveTopology::TriangleStrip => vertex_count.saturating_sub(2),
            PrimitiveTopology::LineList => vertex_count / 2,
            PrimitiveTopology::LineStrip => vertex_count.saturating_sub(1),
            PrimitiveTopology::PointList => vertex_count,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum FilterType {
    Nearest,
    Linear,
}

impl Default for FilterType {
    fn default() -> Self {
        FilterType::Nearest
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum AddressMode {
    Wrap,
    Mirror,
    Clamp,
    Border,
}

impl Default for AddressMode {
    fn default() -> Self {
        AddressMode::Wrap
    }
}

/// Index element width of an index buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum IndexType {
    Uint16,
    Uint32,
}

impl Default for IndexType {
    fn default() -> Self {
        IndexType::Uint16
    }
}

/// One programmable stage of a graphics pipeline. Vertex and pixel are mandatory for
/// pipeline building; the rest are optional.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum ShaderStage {
    Vertex = 0,
    Pixel = 1,
    Geometry = 2,
    Hull = 3,
    Domain = 4,
}

/// Contains all the individual stages in pipeline order
pub const ALL_SHADER_STAGES: [ShaderStage; MAX_SHADER_STAGES] = [
    ShaderStage::Vertex,
    ShaderStage::Pixel,
    ShaderStage::Geometry,
    ShaderStage::Hull,
    ShaderStage::Domain,
];

impl ShaderStage {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn flag(self) -> ShaderStageFlags {
        match self {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Pixel => ShaderStageFlags::PIXEL,
            ShaderStage::Geometry => ShaderStageFlags::GEOMETRY,
            ShaderStage::Hull => ShaderStageFlags::HULL,
            ShaderStage::Domain => ShaderStageFlags::DOMAIN,
        }
    }
}

bitflags::bitflags! {
    /// A set of shader stages. Parameter and texture bindings record which stages consume them.
    #[derive(Default)]
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct ShaderStageFlags : u32 {
        const NONE = 0;
        const VERTEX = 1;
        const PIXEL = 2;
        const GEOMETRY = 4;
        const HULL = 8;
        const DOMAIN = 16;
        const ALL = 0x1F;
    }
}

/// The fixed constant-buffer slots shared across all shaders by convention. Parameters are
/// grouped by how often they change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum ShaderParameterGroup {
    Frame = 0,
    Camera = 1,
    Zone = 2,
    Light = 3,
    Material = 4,
    Object = 5,
    Custom = 6,
}

pub const ALL_SHADER_PARAMETER_GROUPS: [ShaderParameterGroup; 7] = [
    ShaderParameterGroup::Frame,
    ShaderParameterGroup::Camera,
    ShaderParameterGroup::Zone,
    ShaderParameterGroup::Light,
    ShaderParameterGroup::Material,
    ShaderParameterGroup::Object,
    ShaderParameterGroup::Custom,
];

impl ShaderParameterGroup {
    pub fn index(self) -> usize {
        self as usize
    }
}

bitflags::bitflags! {
    /// Which aspects of the bound targets a clear affects
    pub struct ClearFlags : u8 {
        const COLOR = 1;
        const DEPTH = 2;
        const STENCIL = 4;
    }
}

bitflags::bitflags! {
    /// Flags for enabling/disabling color channels of a render target write
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct ColorWriteFlags : u8 {
        const RED = 1;
        const GREEN = 2;
        const BLUE = 4;
        const ALPHA = 8;
        const ALL = 0x0F;
    }
}

impl Default for ColorWriteFlags {
    fn default() -> Self {
        ColorWriteFlags::ALL
    }
}

bitflags::bitflags! {
    /// Indicates how a resource will be used. In some cases, multiple flags are allowed.
    #[derive(Default)]
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct KilnResourceType: u32 {
        const UNDEFINED = 0;
        const TEXTURE = 1<<0;
        const RENDER_TARGET_COLOR = 1<<1;
        const RENDER_TARGET_DEPTH_STENCIL = 1<<2;
        const VERTEX_BUFFER = 1<<3;
        const INDEX_BUFFER = 1<<4;
        const UNIFORM_BUFFER = 1<<5;
    }
}

impl KilnResourceType {
    pub fn is_render_target(self) -> bool {
        self.intersects(
            KilnResourceType::RENDER_TARGET_COLOR | KilnResourceType::RENDER_TARGET_DEPTH_STENCIL,
        )
    }
}

/// Indicates how the memory will be accessed and affects where it needs to be allocated.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum KilnMemoryUsage {
    /// The memory is only accessed by the GPU
    GpuOnly,
    /// The memory is written by the CPU and read by the GPU
    CpuToGpu,
}

impl Default for KilnMemoryUsage {
    fn default() -> Self {
        KilnMemoryUsage::GpuOnly
    }
}

/// A 2d size for render targets and textures
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KilnExtents2D {
    pub width: u32,
    pub height: u32,
}

/// Viewport rectangle in pixels. Depth range is fixed 0..1 in this subsystem.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KilnViewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl KilnViewport {
    pub fn covers(
        &self,
        extents: KilnExtents2D,
    ) -> bool {
        self.x == 0 && self.y == 0 && self.width >= extents.width && self.height >= extents.height
    }
}

/// Scissor rectangle in pixels
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KilnScissor {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Information about the device: limits and capability flags the state machine consults
#[derive(Clone, Debug)]
pub struct KilnDeviceInfo {
    pub max_render_target_count: u32,
    pub max_vertex_attribute_count: u32,

    /// GL-family backends strip unused vertex attributes at link time and support querying
    /// the linked result; explicit APIs do not and trust reflection instead
    pub supports_link_introspection: bool,
}

impl Default for KilnDeviceInfo {
    fn default() -> Self {
        KilnDeviceInfo {
            max_render_target_count: MAX_RENDER_TARGETS as u32,
            max_vertex_attribute_count: MAX_INPUT_LAYOUT_ELEMENTS as u32,
            supports_link_introspection: false,
        }
    }
}

/// Which backend a device context dispatches to. Feeds shader content hashing so that the
/// same source compiled for different backends never collides in caches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum KilnBackendKind {
    Null,
}
