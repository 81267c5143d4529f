//! Error types for qwen-nodes.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Be serializable for sending to a front end
//! - Include actionable information (which node, what to fix)
//! - Keep the remote API failure taxonomy intact from the client boundary
//!   up to the node adapter

use crate::core::types::PortType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a node invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Top-level error type for qwen-nodes.
#[derive(Error, Debug)]
pub enum NodesError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl NodesError {
    /// Kind of the underlying API failure, if any.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            NodesError::Api(error) => Some(error.kind),
            NodesError::Execution(error) => error.api_kind(),
            NodesError::Validation(_) => None,
        }
    }
}

// ============================================================================
// Remote API Errors
// ============================================================================

/// Category of a remote API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// No usable API key; raised before any network call.
    Configuration,
    /// HTTP 401 or 403.
    Authentication,
    /// HTTP 400.
    BadRequest,
    /// Network failure or any other non-2xx status.
    Transport,
    /// The response (or an image) did not have the expected shape.
    UnexpectedFormat,
}

impl ApiErrorKind {
    /// Human-readable label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            ApiErrorKind::Configuration => "Configuration error",
            ApiErrorKind::Authentication => "Authentication error",
            ApiErrorKind::BadRequest => "Bad request",
            ApiErrorKind::Transport => "Transport error",
            ApiErrorKind::UnexpectedFormat => "Unexpected format",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified failure of a remote API call.
///
/// Classification happens once, in the client. Callers surface
/// `kind` and `detail` as they are.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ApiError {
    /// Failure category.
    pub kind: ApiErrorKind,
    /// Message for the user, including any response body that helps diagnosis.
    pub detail: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(kind: ApiErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Shorthand for a configuration error.
    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Configuration, detail)
    }

    /// Shorthand for a transport error.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, detail)
    }

    /// Shorthand for an unexpected-format error.
    pub fn unexpected_format(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::UnexpectedFormat, detail)
    }
}

/// Malformed tensor shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Shape {shape:?} needs {expected} elements, got {actual}")]
    ElementCount {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported tensor rank {0} (expected 2, 3 or 4)")]
    UnsupportedRank(usize),
}

/// Caller contract violations while building a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Image editing needs at least one input image")]
    NoEditImages,

    #[error("Image editing accepts at most {max} images, got {got}")]
    TooManyEditImages { max: usize, got: usize },

    #[error("Unknown image size '{0}'")]
    UnknownSize(String),

    #[error("Unknown region '{0}'")]
    UnknownRegion(String),

    #[error("Unknown vision model '{0}'")]
    UnknownModel(String),
}

// ============================================================================
// Host Errors
// ============================================================================

/// Errors from the validation phase.
///
/// Validation errors are caught before any request is sent, so a
/// misconfigured node never costs an API call.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: PortType, got: PortType },

    #[error("Missing required input '{port}' on node {node_id}")]
    MissingRequiredInput { node_id: NodeId, port: String },

    #[error("Invalid input '{port}' on node {node_id}: {error}")]
    InvalidInput {
        node_id: NodeId,
        port: String,
        error: String,
    },

    #[error("Constraint violation on node {node_id}, parameter '{parameter}': {error}")]
    ConstraintViolation {
        node_id: NodeId,
        parameter: String,
        error: String,
    },

    #[error("Custom validation failed on node {node_id}: {error}")]
    CustomValidation { node_id: NodeId, error: String },
}

/// Errors during node execution.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Node {node_id} execution failed: {error}")]
    NodeExecution { node_id: NodeId, error: String },

    #[error("Node {node_id} API call failed: {error}")]
    Api {
        node_id: NodeId,
        #[source]
        error: ApiError,
    },

    #[error("Missing input '{port}' for node {node_id}")]
    MissingInput { node_id: NodeId, port: String },

    #[error("Missing parameter '{parameter}' for node {node_id}")]
    MissingParameter { node_id: NodeId, parameter: String },

    #[error("Output '{port}' was not set by node {node_id}")]
    OutputNotSet { node_id: NodeId, port: String },
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ValidationError {
    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ValidationError::MissingRequiredInput { port, .. } => {
                Some(format!("Connect an image to the '{}' input", port))
            }
            ValidationError::ConstraintViolation { parameter, error, .. } => {
                Some(format!("Adjust '{}': {}", parameter, error))
            }
            ValidationError::InvalidInput { port, .. } => {
                Some(format!("Check the value connected to '{}'", port))
            }
            _ => None,
        }
    }
}

impl ExecutionError {
    /// Get the node ID that caused this error.
    pub fn node_id(&self) -> NodeId {
        match self {
            ExecutionError::NodeExecution { node_id, .. }
            | ExecutionError::Api { node_id, .. }
            | ExecutionError::MissingInput { node_id, .. }
            | ExecutionError::MissingParameter { node_id, .. }
            | ExecutionError::OutputNotSet { node_id, .. } => *node_id,
        }
    }

    /// Kind of the underlying API failure, if this error came from the API.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            ExecutionError::Api { error, .. } => Some(error.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        let id = NodeId::new();
        let display = format!("{}", id);
        assert_eq!(display.len(), 8);
    }

    #[test]
    fn test_api_error_display_carries_kind_and_detail() {
        let error = ApiError::new(ApiErrorKind::BadRequest, "missing field 'text'");
        assert_eq!(error.to_string(), "Bad request: missing field 'text'");
    }

    #[test]
    fn test_api_error_serializes_kind_in_snake_case() {
        let error = ApiError::unexpected_format("no choices");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "unexpected_format");
        assert_eq!(json["detail"], "no choices");
    }

    #[test]
    fn test_execution_error_surfaces_api_kind() {
        let node_id = NodeId::new();
        let error = ExecutionError::Api {
            node_id,
            error: ApiError::new(ApiErrorKind::Authentication, "401"),
        };
        assert_eq!(error.api_kind(), Some(ApiErrorKind::Authentication));
        assert_eq!(error.node_id(), node_id);

        let other = ExecutionError::MissingInput {
            node_id,
            port: "image1".to_string(),
        };
        assert_eq!(other.api_kind(), None);
    }

    #[test]
    fn test_validation_error_suggestions() {
        let error = ValidationError::MissingRequiredInput {
            node_id: NodeId::new(),
            port: "image".to_string(),
        };
        assert!(error.suggested_fix().unwrap().contains("image"));
    }
}
