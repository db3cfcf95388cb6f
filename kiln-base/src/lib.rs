//! Lowest level crate of `kiln`. Hash-friendly value wrappers and memory
//! utilities shared by the graphics layers.

mod decimal;
pub use decimal::DecimalF32;

pub mod memory;
