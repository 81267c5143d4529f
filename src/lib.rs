//! # qwen-nodes - Qwen models as host nodes
//!
//! Exposes Alibaba Cloud DashScope's Qwen image generation, image editing and
//! vision-language models as nodes with typed inputs and outputs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qwen_nodes::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! // Keys come from DASHSCOPE_API_KEY / DASHSCOPE_API_KEY_CHINA or a .env file
//! let config = Arc::new(ApiConfig::load());
//! let client = Arc::new(ApiClient::new(config));
//! let registry = FilterRegistry::with_builtins(client);
//!
//! let node = registry.create("qwen_text_to_image").unwrap();
//! let mut params = HashMap::new();
//! params.insert("prompt".to_string(), Value::String("a red bicycle".to_string()));
//!
//! let outputs = run_node(node.as_ref(), HashMap::new(), params)?;
//! let image = outputs["image"].as_image().unwrap(); // [1, H, W, 3]
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: value types, tensors, node traits, errors
//! - [`codec`]: tensor <-> PNG/base64 conversion
//! - [`dashscope`]: configuration, request envelopes, HTTP client, error classification
//! - [`filters`]: node registry and the three Qwen nodes
//! - [`execution`]: single-node runner

#![warn(clippy::all)]

pub mod codec;
pub mod core;
pub mod dashscope;
pub mod execution;
pub mod filters;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use qwen_nodes::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::tensor::ImageTensor;
    pub use crate::core::types::{PortType, Value};

    // Node traits and types
    pub use crate::core::node::{Category, FilterNode, NodeMetadata};

    // Port definitions
    pub use crate::core::port::{Constraint, ParameterDefinition, PortDefinition, UiHint};

    // Contexts
    pub use crate::core::context::{ExecutionContext, ValidationContext};

    // Errors
    pub use crate::core::error::{
        ApiError, ApiErrorKind, ExecutionError, NodeId, NodesError, RequestError, TensorError,
        ValidationError,
    };

    // Codec
    pub use crate::codec::EncodedImage;

    // API
    pub use crate::dashscope::{
        ApiClient, ApiConfig, ApiResponse, Endpoints, GeneratedImage, GenerationRequest, ImageSize,
        Operation, Region, Transport, VisionModel,
    };

    // Execution
    pub use crate::execution::run_node;

    // Registry and nodes
    pub use crate::filters::builtin::{QwenImageEdit, QwenTextToImage, QwenVisionDescribe};
    pub use crate::filters::registry::{FilterFactory, FilterRegistry, RegistryEntry};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "qwen-nodes");
    }

    #[test]
    fn test_registry_with_builtins() {
        let client = Arc::new(ApiClient::new(Arc::new(ApiConfig::new())));
        let registry = FilterRegistry::with_builtins(client);

        assert!(registry.contains("qwen_text_to_image"));
        assert!(registry.contains("qwen_image_edit"));
        assert!(registry.contains("qwen_vision_describe"));
    }
}
