//! Port definitions and constraints for node inputs/outputs.
//!
//! Ports define the interface of a node: what data it accepts and produces.
//! Parameters are the values a user sets on the node itself (prompt, size,
//! region) and carry constraints that are checked before execution.

use crate::core::types::{PortType, Value};
use serde::{Deserialize, Serialize};

/// Direction of a port (input or output).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Definition of a node port (input or output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDefinition {
    /// Unique name within the node (used in code)
    pub name: String,
    /// Human-readable name (used in UI)
    pub display_name: String,
    /// Type of data this port accepts/produces
    pub port_type: PortType,
    /// Direction (input or output)
    pub direction: PortDirection,
    /// Whether this port is optional
    pub optional: bool,
    /// Description for documentation and tooltips
    pub description: String,
}

/// UI hints for parameter display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "widget", content = "options")]
pub enum UiHint {
    /// Default input widget based on type
    Default,
    /// Dropdown for selecting from options
    Dropdown {
        /// Available options
        options: Vec<String>,
    },
    /// Text input field
    TextInput {
        /// Allow multiple lines
        multiline: bool,
    },
    /// Checkbox for booleans
    Checkbox,
    /// Spin box for integers
    SpinBox,
}

/// Definition of a node parameter (configuration).
///
/// Parameters differ from inputs: they are set on the node rather than
/// connected to other nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Unique name within the node
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Type of the parameter
    pub param_type: PortType,
    /// Default value (required for parameters)
    pub default_value: Value,
    /// Description for documentation
    pub description: String,
    /// Constraints for validation
    pub constraints: Vec<Constraint>,
    /// UI widget hint
    pub ui_hint: UiHint,
    /// Whether the host lists this parameter under its optional section
    pub optional: bool,
}

/// Constraints that can be applied to parameter values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "params")]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range { min: i64, max: i64 },
    /// String must not be empty (after trimming whitespace)
    NotEmpty,
    /// Value must equal one of the specified options
    OneOf(Vec<Value>),
}

// ============================================================================
// PortDefinition Builder Pattern
// ============================================================================

impl PortDefinition {
    /// Create a new input port definition.
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::with_direction(name.into(), port_type, PortDirection::Input)
    }

    /// Create a new output port definition.
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::with_direction(name.into(), port_type, PortDirection::Output)
    }

    fn with_direction(name: String, port_type: PortType, direction: PortDirection) -> Self {
        Self {
            display_name: name_to_display(&name),
            name,
            port_type,
            direction,
            optional: false,
            description: String::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark this port as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Validate a value against this port's type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.port_type.matches(value) {
            return Err(format!(
                "Type mismatch for port '{}': expected {}, got {}",
                self.name,
                self.port_type,
                value.get_type()
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ParameterDefinition Builder Pattern
// ============================================================================

impl ParameterDefinition {
    /// Create a new parameter definition.
    pub fn new(name: impl Into<String>, param_type: PortType, default_value: Value) -> Self {
        let name = name.into();
        Self {
            display_name: name_to_display(&name),
            name,
            param_type,
            default_value,
            description: String::new(),
            constraints: Vec::new(),
            ui_hint: UiHint::Default,
            optional: false,
        }
    }

    /// A multiline string parameter.
    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(name, PortType::String, Value::String(default.into()))
            .with_ui_hint(UiHint::TextInput { multiline: true })
    }

    /// A string parameter restricted to a fixed set of options.
    pub fn choice<S: AsRef<str>>(name: impl Into<String>, options: &[S], default: &str) -> Self {
        let options: Vec<String> = options.iter().map(|o| o.as_ref().to_string()).collect();
        let allowed = options.iter().cloned().map(Value::String).collect();
        Self::new(name, PortType::String, Value::String(default.to_string()))
            .with_constraint(Constraint::OneOf(allowed))
            .with_ui_hint(UiHint::Dropdown { options })
    }

    /// A boolean parameter shown as a checkbox.
    pub fn flag(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, PortType::Boolean, Value::Boolean(default)).with_ui_hint(UiHint::Checkbox)
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a range constraint and set UI hint to a spin box.
    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        if matches!(self.ui_hint, UiHint::Default) {
            self.ui_hint = UiHint::SpinBox;
        }
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Set the UI hint.
    pub fn with_ui_hint(mut self, ui_hint: UiHint) -> Self {
        self.ui_hint = ui_hint;
        self
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Validate a value against this parameter's type and constraints.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.param_type.matches(value) {
            return Err(format!(
                "Type mismatch for parameter '{}': expected {}, got {}",
                self.name,
                self.param_type,
                value.get_type()
            ));
        }

        for constraint in &self.constraints {
            constraint.validate(value)?;
        }

        Ok(())
    }
}

/// Convert snake_case name to Title Case display name.
fn name_to_display(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Constraint Validation
// ============================================================================

impl Constraint {
    /// Validate a value against this constraint.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::Range { min, max } => {
                if let Some(num) = value.as_integer() {
                    if num < *min || num > *max {
                        return Err(format!("Value {} is out of range [{}, {}]", num, min, max));
                    }
                }
            }

            Constraint::NotEmpty => {
                if let Value::String(s) = value {
                    if s.trim().is_empty() {
                        return Err("Value cannot be empty".to_string());
                    }
                }
            }

            Constraint::OneOf(options) => {
                if !options.contains(value) {
                    return Err(format!("{} is not one of the allowed options", value));
                }
            }
        }

        Ok(())
    }

    /// Get a human-readable description of this constraint.
    pub fn description(&self) -> String {
        match self {
            Constraint::Range { min, max } => format!("Must be between {} and {}", min, max),
            Constraint::NotEmpty => "Cannot be empty".to_string(),
            Constraint::OneOf(options) => format!("One of {} options", options.len()),
        }
    }
}

impl Default for UiHint {
    fn default() -> Self {
        UiHint::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_definition_builder() {
        let port = PortDefinition::input("mask", PortType::Image)
            .with_description("Area to edit")
            .optional();

        assert_eq!(port.name, "mask");
        assert_eq!(port.display_name, "Mask");
        assert_eq!(port.port_type, PortType::Image);
        assert!(matches!(port.direction, PortDirection::Input));
        assert!(port.optional);
    }

    #[test]
    fn test_constraint_range_validation() {
        let constraint = Constraint::Range { min: 0, max: 2_147_483_647 };

        assert!(constraint.validate(&Value::Integer(0)).is_ok());
        assert!(constraint.validate(&Value::Integer(2_147_483_647)).is_ok());
        assert!(constraint.validate(&Value::Integer(-1)).is_err());
        assert!(constraint.validate(&Value::Integer(2_147_483_648)).is_err());
    }

    #[test]
    fn test_constraint_not_empty() {
        let constraint = Constraint::NotEmpty;

        assert!(constraint.validate(&Value::String("a cat".to_string())).is_ok());
        assert!(constraint.validate(&Value::String("".to_string())).is_err());
        assert!(constraint.validate(&Value::String("  \n".to_string())).is_err());
    }

    #[test]
    fn test_choice_parameter_rejects_unknown_option() {
        let param = ParameterDefinition::choice("region", &["international", "mainland_china"], "international");

        assert_eq!(param.default_value, Value::String("international".to_string()));
        assert!(param.validate(&Value::String("mainland_china".to_string())).is_ok());
        assert!(param.validate(&Value::String("mars".to_string())).is_err());
        assert!(param.validate(&Value::Integer(1)).is_err());
        assert_eq!(
            param.ui_hint,
            UiHint::Dropdown {
                options: vec!["international".to_string(), "mainland_china".to_string()]
            }
        );
    }

    #[test]
    fn test_name_to_display() {
        assert_eq!(name_to_display("negative_prompt"), "Negative Prompt");
        assert_eq!(name_to_display("image"), "Image");
    }
}
