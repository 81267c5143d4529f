//! Node registry and the built-in Qwen nodes.

pub mod registry;
pub mod builtin;

pub use registry::{FilterRegistry, FilterFactory};
