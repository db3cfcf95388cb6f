//! Draw command state machine and GPU object caches.
//!
//! Draw calls flow through a [`DrawCommand`], which tracks mutable render state in
//! dirty categories and resolves them in dependency order against hash-keyed caches:
//! shader programs, vertex declarations, pipeline states, and shader resource
//! bindings. Repeated draws with identical state reuse cached GPU objects instead of
//! recreating them. All caches are owned by a [`GraphicsContext`].

pub use constant_buffer::*;
pub use cooked_shader::*;
pub use draw_command::*;
pub use draw_command_queue::*;
pub use graphics_context::*;
pub use pipeline_state::*;
pub use resource_cache::*;
pub use shader_program::*;
pub use srb_cache::*;
pub use vertex_declaration::*;

mod constant_buffer;
mod cooked_shader;
mod draw_command;
mod draw_command_queue;
mod graphics_context;
mod pipeline_state;
mod resource_cache;
mod shader_program;
mod srb_cache;
mod vertex_declaration;

#[cfg(test)]
mod draw_command_tests;
