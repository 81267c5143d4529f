//! FilterNode trait and node metadata.
//!
//! Every Qwen node is a `FilterNode`. The host calls it in two phases:
//! validation (cheap, no network) and execution (one remote call per run).

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::port::{ParameterDefinition, PortDefinition};
use serde::{Deserialize, Serialize};

/// Category for organizing nodes in the host's menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Text-to-image generation
    Generate,
    /// Instruction-based image editing
    Edit,
    /// Vision-language understanding
    Vision,
    /// Custom/user-defined
    Custom,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Generate => "Qwen/Generate",
            Category::Edit => "Qwen/Edit",
            Category::Vision => "Qwen/Vision",
            Category::Custom => "Custom",
        }
    }

    /// Get all categories in display order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Generate,
            Category::Edit,
            Category::Vision,
            Category::Custom,
        ]
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Custom
    }
}

/// Metadata describing a node.
///
/// This is everything the host needs to list the node, draw its ports and
/// build its parameter panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Unique identifier for this node type (e.g., "qwen_text_to_image")
    pub id: String,
    /// Human-readable name (e.g., "Qwen Text to Image")
    pub name: String,
    /// Category for menu organization
    pub category: Category,
    /// Detailed description
    pub description: String,
    /// Version string
    pub version: String,
    /// Author or source
    pub author: String,

    /// Input port definitions
    pub inputs: Vec<PortDefinition>,
    /// Output port definitions
    pub outputs: Vec<PortDefinition>,
    /// Parameter definitions
    pub parameters: Vec<ParameterDefinition>,

    /// Searchable tags
    pub tags: Vec<String>,
    /// Whether the same inputs always give the same outputs
    pub deterministic: bool,
}

impl NodeMetadata {
    /// Create a new metadata builder.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> NodeMetadataBuilder {
        NodeMetadataBuilder::new(id, name)
    }

    /// Get all input port names.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|p| p.name.as_str()).collect()
    }

    /// Get all output port names.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|p| p.name.as_str()).collect()
    }

    /// Get all parameter names.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Find an input port by name.
    pub fn get_input(&self, name: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Find an output port by name.
    pub fn get_output(&self, name: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Find a parameter by name.
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Builder for NodeMetadata.
pub struct NodeMetadataBuilder {
    id: String,
    name: String,
    category: Category,
    description: String,
    version: String,
    author: String,
    inputs: Vec<PortDefinition>,
    outputs: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
    tags: Vec<String>,
    deterministic: bool,
}

impl NodeMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::Custom,
            description: String::new(),
            version: crate::VERSION.to_string(),
            author: "Qwen Nodes".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            tags: Vec::new(),
            deterministic: true,
        }
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an input port.
    pub fn input(mut self, port: PortDefinition) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add an output port.
    pub fn output(mut self, port: PortDefinition) -> Self {
        self.outputs.push(port);
        self
    }

    /// Add a parameter.
    pub fn parameter(mut self, param: ParameterDefinition) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add multiple tags.
    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(|t| t.into()));
        self
    }

    /// Mark as non-deterministic.
    pub fn non_deterministic(mut self) -> Self {
        self.deterministic = false;
        self
    }

    /// Build the metadata.
    pub fn build(self) -> NodeMetadata {
        NodeMetadata {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            version: self.version,
            author: self.author,
            inputs: self.inputs,
            outputs: self.outputs,
            parameters: self.parameters,
            tags: self.tags,
            deterministic: self.deterministic,
        }
    }
}

/// The core trait for host nodes.
///
/// # Design
///
/// 1. **Validation Phase** (`validate`): checks parameters and inputs that
///    the declared constraints cannot express. Never touches the network.
///
/// 2. **Execution Phase** (`execute`): reads inputs, performs the remote
///    call and sets outputs.
///
/// # Example Implementation
///
/// ```ignore
/// struct Describe { client: Arc<ApiClient> }
///
/// impl FilterNode for Describe {
///     fn metadata(&self) -> NodeMetadata {
///         NodeMetadata::builder("describe", "Describe")
///             .category(Category::Vision)
///             .input(PortDefinition::input("image", PortType::Image))
///             .output(PortDefinition::output("description", PortType::String))
///             .parameter(ParameterDefinition::text("prompt", "What is in this picture?"))
///             .build()
///     }
///
///     fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
///         let image = ctx.get_input_image("image")?;
///         let prompt = ctx.get_string("prompt")?;
///         let text = describe(&self.client, image, prompt).map_err(|e| ctx.api_error(e))?;
///         ctx.set_output("description", Value::String(text))?;
///         Ok(())
///     }
///
///     fn clone_box(&self) -> Box<dyn FilterNode> {
///         Box::new(Describe { client: Arc::clone(&self.client) })
///     }
/// }
/// ```
pub trait FilterNode: Send + Sync {
    /// Get the metadata for this node.
    ///
    /// Called during registration and should return consistent values.
    fn metadata(&self) -> NodeMetadata;

    /// Validate the node configuration.
    ///
    /// Called after the declared parameter constraints have passed.
    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError>;

    /// Execute the node.
    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError>;

    /// Clone this node into a boxed trait object.
    fn clone_box(&self) -> Box<dyn FilterNode>;
}

// Allow cloning Box<dyn FilterNode>
impl Clone for Box<dyn FilterNode> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PortType;

    #[test]
    fn test_metadata_builder() {
        let metadata = NodeMetadata::builder("test_node", "Test Node")
            .category(Category::Vision)
            .description("A test node")
            .input(PortDefinition::input("image", PortType::Image))
            .output(PortDefinition::output("description", PortType::String))
            .tags(["test", "debug"])
            .non_deterministic()
            .build();

        assert_eq!(metadata.id, "test_node");
        assert_eq!(metadata.name, "Test Node");
        assert_eq!(metadata.category, Category::Vision);
        assert_eq!(metadata.input_names(), vec!["image"]);
        assert_eq!(metadata.output_names(), vec!["description"]);
        assert_eq!(metadata.tags.len(), 2);
        assert!(!metadata.deterministic);
        assert_eq!(metadata.version, crate::VERSION);
    }

    #[test]
    fn test_metadata_lookup() {
        let metadata = NodeMetadata::builder("lookup", "Lookup")
            .parameter(ParameterDefinition::flag("watermark", false))
            .build();

        assert!(metadata.get_parameter("watermark").is_some());
        assert!(metadata.get_parameter("seed").is_none());
        assert!(metadata.get_input("image").is_none());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Generate.display_name(), "Qwen/Generate");
        assert_eq!(Category::Vision.display_name(), "Qwen/Vision");
        assert_eq!(Category::all().len(), 4);
    }
}
