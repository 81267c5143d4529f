//! Core types and traits for the Qwen node system.
//!
//! This module contains the foundational types shared by every node:
//! - Value types and image tensors
//! - Port definitions and constraints
//! - Node traits and metadata
//! - Error types
//! - Execution and validation contexts

pub mod types;
pub mod tensor;
pub mod port;
pub mod error;
pub mod context;
pub mod node;

// Re-export commonly used types
pub use types::{Value, PortType};
pub use tensor::ImageTensor;
pub use port::{PortDefinition, PortDirection, ParameterDefinition, Constraint, UiHint};
pub use error::{NodesError, ApiError, ApiErrorKind, ValidationError, ExecutionError, NodeId};
pub use context::{ValidationContext, ExecutionContext};
pub use node::{FilterNode, NodeMetadata, Category};
