//! Core value types that flow between nodes.
//!
//! The type system uses an enum-based approach: the host hands a node a closed
//! set of data types (images, strings, integers, booleans), and exhaustive
//! matching catches missing cases at compile time.

use crate::core::tensor::ImageTensor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values that can be passed into or out of a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Image tensor
    Image(ImageTensor),
    /// 64-bit signed integer
    Integer(i64),
    /// UTF-8 string
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Represents absence of value
    None,
}

/// Port types for type checking node inputs and outputs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PortType {
    Image,
    Integer,
    String,
    Boolean,
    /// Accepts any type
    Any,
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Value {
    /// Get the port type of this value.
    pub fn get_type(&self) -> PortType {
        match self {
            Value::Image(_) => PortType::Image,
            Value::Integer(_) => PortType::Integer,
            Value::String(_) => PortType::String,
            Value::Boolean(_) => PortType::Boolean,
            Value::None => PortType::Any,
        }
    }

    /// Try to get this value as an image reference.
    pub fn as_image(&self) -> Option<&ImageTensor> {
        if let Value::Image(img) = self {
            Some(img)
        } else {
            None
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Check if this value is None.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Image(img) => write!(f, "Image{:?}", img.shape()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::None => write!(f, "None"),
        }
    }
}

// ============================================================================
// PortType Implementation
// ============================================================================

impl PortType {
    /// Check if a value matches this port type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (PortType::Any, _) => true,
            (PortType::Image, Value::Image(_)) => true,
            (PortType::Integer, Value::Integer(_)) => true,
            (PortType::String, Value::String(_)) => true,
            (PortType::Boolean, Value::Boolean(_)) => true,
            _ => false,
        }
    }

    /// Get a human-readable name for this type.
    pub fn display_name(&self) -> &'static str {
        match self {
            PortType::Image => "Image",
            PortType::Integer => "Integer",
            PortType::String => "String",
            PortType::Boolean => "Boolean",
            PortType::Any => "Any",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_type_matching() {
        assert!(PortType::Integer.matches(&Value::Integer(42)));
        assert!(PortType::String.matches(&Value::String("cat".to_string())));
        assert!(!PortType::Integer.matches(&Value::Boolean(true)));
        assert!(PortType::Any.matches(&Value::String("test".to_string())));

        let image = ImageTensor::zeros(vec![2, 2, 3]).unwrap();
        assert!(PortType::Image.matches(&Value::Image(image)));
        assert!(!PortType::Image.matches(&Value::None));
    }

    #[test]
    fn test_value_type_inference() {
        assert_eq!(Value::Integer(42).get_type(), PortType::Integer);
        assert_eq!(Value::Boolean(false).get_type(), PortType::Boolean);
        assert_eq!(Value::None.get_type(), PortType::Any);
    }

    #[test]
    fn test_value_display() {
        let image = ImageTensor::zeros(vec![1, 2, 2, 3]).unwrap();
        assert_eq!(Value::Image(image).to_string(), "Image[1, 2, 2, 3]");
        assert_eq!(Value::String("x".to_string()).to_string(), "\"x\"");
    }

    #[test]
    fn test_value_serde_tagging() {
        let json = serde_json::to_value(Value::Integer(7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Integer", "data": 7}));
    }
}
