//! Umbrella crate re-exporting the kiln graphics stack.
//!
//! * [`api`] is the backend-agnostic device abstraction
//! * [`render`] is the draw command state machine and the GPU object caches
//! * [`base`] holds small shared utilities

pub use kiln_api as api;
pub use kiln_base as base;
pub use kiln_render as render;

pub use kiln_api::{KilnError, KilnResult};
pub use kiln_render::{DrawCommand, GraphicsContext};
