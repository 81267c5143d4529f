//! Execution and validation contexts.
//!
//! Contexts provide access to inputs, parameters, and outputs during
//! node validation and execution. They encapsulate the data flow.

use crate::core::error::{ApiError, ExecutionError, NodeId, ValidationError};
use crate::core::tensor::ImageTensor;
use crate::core::types::{PortType, Value};
use std::collections::HashMap;

/// Context provided during node validation.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// ID of the node being validated.
    pub node_id: NodeId,
    /// Input values.
    inputs: HashMap<String, Value>,
    /// Parameter values.
    parameters: HashMap<String, Value>,
}

impl ValidationContext {
    /// Create a new validation context.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            inputs: HashMap::new(),
            parameters: HashMap::new(),
        }
    }

    /// Add an input value to the context.
    pub fn add_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    /// Add a parameter value to the context.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Get all inputs.
    pub fn inputs(&self) -> &HashMap<String, Value> {
        &self.inputs
    }

    /// Get all parameters.
    pub fn parameters(&self) -> &HashMap<String, Value> {
        &self.parameters
    }

    // ========================================================================
    // Input Getters
    // ========================================================================

    /// Get an input value by name.
    pub fn get_input(&self, name: &str) -> Result<&Value, ValidationError> {
        self.inputs.get(name).ok_or_else(|| ValidationError::MissingRequiredInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    /// Get an input as an image.
    pub fn get_input_image(&self, name: &str) -> Result<&ImageTensor, ValidationError> {
        let value = self.get_input(name)?;
        value.as_image().ok_or(ValidationError::TypeMismatch {
            expected: PortType::Image,
            got: value.get_type(),
        })
    }

    /// Check if an input is connected. `Value::None` counts as absent.
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.get(name).is_some_and(|v| !v.is_none())
    }

    // ========================================================================
    // Parameter Getters
    // ========================================================================

    /// Get a parameter value by name.
    pub fn get_parameter(&self, name: &str) -> Result<&Value, ValidationError> {
        self.parameters.get(name).ok_or_else(|| ValidationError::ConstraintViolation {
            node_id: self.node_id,
            parameter: name.to_string(),
            error: "Parameter not set".to_string(),
        })
    }

    /// Get a parameter as an integer.
    pub fn get_integer(&self, name: &str) -> Result<i64, ValidationError> {
        let value = self.get_parameter(name)?;
        value.as_integer().ok_or(ValidationError::TypeMismatch {
            expected: PortType::Integer,
            got: value.get_type(),
        })
    }

    /// Get a parameter as a string.
    pub fn get_string(&self, name: &str) -> Result<&str, ValidationError> {
        let value = self.get_parameter(name)?;
        value.as_string().ok_or(ValidationError::TypeMismatch {
            expected: PortType::String,
            got: value.get_type(),
        })
    }

    /// Get a parameter as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, ValidationError> {
        let value = self.get_parameter(name)?;
        value.as_bool().ok_or(ValidationError::TypeMismatch {
            expected: PortType::Boolean,
            got: value.get_type(),
        })
    }
}

/// Context provided during node execution.
///
/// ExecutionContext contains the actual values and collects the outputs
/// the node sets.
#[derive(Debug)]
pub struct ExecutionContext {
    /// ID of the node being executed.
    pub node_id: NodeId,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Create a new execution context.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            inputs: HashMap::new(),
            parameters: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    /// Add an input value to the context.
    pub fn add_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    /// Add a parameter value to the context.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Get all outputs.
    pub fn outputs(&self) -> &HashMap<String, Value> {
        &self.outputs
    }

    /// Take ownership of all outputs.
    pub fn take_outputs(self) -> HashMap<String, Value> {
        self.outputs
    }

    /// Wrap a classified API failure with this node's ID.
    pub fn api_error(&self, error: ApiError) -> ExecutionError {
        ExecutionError::Api {
            node_id: self.node_id,
            error,
        }
    }

    // ========================================================================
    // Input Getters
    // ========================================================================

    /// Get an input value by name.
    pub fn get_input(&self, name: &str) -> Result<&Value, ExecutionError> {
        self.inputs.get(name).ok_or_else(|| ExecutionError::MissingInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    /// Get an input as an image.
    pub fn get_input_image(&self, name: &str) -> Result<&ImageTensor, ExecutionError> {
        self.get_input(name)?
            .as_image()
            .ok_or_else(|| ExecutionError::NodeExecution {
                node_id: self.node_id,
                error: format!("Input '{}' is not an image", name),
            })
    }

    /// Get an optional input as an image.
    /// Returns None if the input is missing or explicitly `Value::None`.
    pub fn get_input_image_optional(&self, name: &str) -> Option<&ImageTensor> {
        self.inputs.get(name).and_then(|v| v.as_image())
    }

    /// Check if an input is connected. `Value::None` counts as absent.
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.get(name).is_some_and(|v| !v.is_none())
    }

    // ========================================================================
    // Parameter Getters
    // ========================================================================

    /// Get a parameter value by name.
    pub fn get_parameter(&self, name: &str) -> Result<&Value, ExecutionError> {
        self.parameters.get(name).ok_or_else(|| ExecutionError::MissingParameter {
            node_id: self.node_id,
            parameter: name.to_string(),
        })
    }

    /// Get a parameter as an integer.
    pub fn get_integer(&self, name: &str) -> Result<i64, ExecutionError> {
        self.get_parameter(name)?
            .as_integer()
            .ok_or_else(|| ExecutionError::NodeExecution {
                node_id: self.node_id,
                error: format!("Parameter '{}' is not an integer", name),
            })
    }

    /// Get a parameter as a string.
    pub fn get_string(&self, name: &str) -> Result<&str, ExecutionError> {
        self.get_parameter(name)?
            .as_string()
            .ok_or_else(|| ExecutionError::NodeExecution {
                node_id: self.node_id,
                error: format!("Parameter '{}' is not a string", name),
            })
    }

    /// Get a parameter as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, ExecutionError> {
        self.get_parameter(name)?
            .as_bool()
            .ok_or_else(|| ExecutionError::NodeExecution {
                node_id: self.node_id,
                error: format!("Parameter '{}' is not a boolean", name),
            })
    }

    // ========================================================================
    // Output Setters
    // ========================================================================

    /// Set an output value.
    pub fn set_output(&mut self, name: impl Into<String>, value: Value) -> Result<(), ExecutionError> {
        self.outputs.insert(name.into(), value);
        Ok(())
    }

    /// Set an output image value.
    pub fn set_output_image(&mut self, name: impl Into<String>, image: ImageTensor) -> Result<(), ExecutionError> {
        self.set_output(name, Value::Image(image))
    }

    /// Check if an output has been set.
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }
}

/// Convert ValidationContext to ExecutionContext.
impl From<ValidationContext> for ExecutionContext {
    fn from(val_ctx: ValidationContext) -> Self {
        let mut exec_ctx = ExecutionContext::new(val_ctx.node_id);
        for (name, value) in val_ctx.inputs {
            exec_ctx.add_input(name, value);
        }
        for (name, value) in val_ctx.parameters {
            exec_ctx.add_parameter(name, value);
        }
        exec_ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ApiErrorKind;

    #[test]
    fn test_validation_context_inputs() {
        let mut ctx = ValidationContext::new(NodeId::new());
        ctx.add_input("seed", Value::Integer(42));
        ctx.add_input("mask", Value::None);

        assert!(ctx.has_input("seed"));
        assert!(!ctx.has_input("mask"));
        assert!(!ctx.has_input("nonexistent"));
        // Integer is in inputs, not parameters
        assert!(ctx.get_integer("seed").is_err());
    }

    #[test]
    fn test_validation_context_type_mismatch() {
        let mut ctx = ValidationContext::new(NodeId::new());
        ctx.add_parameter("prompt", Value::Integer(3));

        match ctx.get_string("prompt") {
            Err(ValidationError::TypeMismatch { expected, got }) => {
                assert_eq!(expected, PortType::String);
                assert_eq!(got, PortType::Integer);
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_execution_context_outputs() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.set_output("url", Value::String("https://x".to_string())).unwrap();

        assert!(ctx.has_output("url"));
        let outputs = ctx.take_outputs();
        assert_eq!(outputs.get("url"), Some(&Value::String("https://x".to_string())));
    }

    #[test]
    fn test_optional_image_input() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_input("image2", Value::None);
        ctx.add_input("image1", Value::Image(ImageTensor::zeros(vec![1, 2, 2, 3]).unwrap()));

        assert!(ctx.get_input_image_optional("image1").is_some());
        assert!(ctx.get_input_image_optional("image2").is_none());
        assert!(ctx.get_input_image_optional("image3").is_none());
        assert!(ctx.get_input_image("image2").is_err());
    }

    #[test]
    fn test_api_error_carries_node_id() {
        let node_id = NodeId::new();
        let ctx = ExecutionContext::new(node_id);
        let error = ctx.api_error(ApiError::transport("connection reset"));

        assert_eq!(error.node_id(), node_id);
        assert_eq!(error.api_kind(), Some(ApiErrorKind::Transport));
    }

    #[test]
    fn test_from_validation_context() {
        let mut val_ctx = ValidationContext::new(NodeId::new());
        val_ctx.add_parameter("watermark", Value::Boolean(true));

        let exec_ctx = ExecutionContext::from(val_ctx);
        assert!(exec_ctx.get_bool("watermark").unwrap());
    }
}
