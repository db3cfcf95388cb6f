//! Backend-agnostic graphics API abstraction for kiln.
//!
//! Every GPU object is an enum dispatching to a backend-specific implementation.
//! The `null` backend is always compiled; it implements the full API without
//! touching any real device and is used for headless runs and tests. Native
//! backends (Vulkan/D3D12/Metal) would be additional feature-gated variants.

pub use error::*;
pub use types::*;

pub use buffer::*;
pub use command_buffer::*;
pub use device_context::*;
pub use pipeline::*;
pub use sampler::*;
pub use shader_module::*;
pub use shader_resource_binding::*;
pub use texture::*;

pub mod backends;
mod types;

mod buffer;
mod command_buffer;
mod device_context;
mod error;
mod pipeline;
mod sampler;
mod shader_module;
mod shader_resource_binding;
mod texture;
