//! Single-node execution.
//!
//! The host hands a node its inputs and parameter values once per
//! invocation. The runner applies parameter defaults, checks everything the
//! metadata declares, and only then lets the node touch the network.

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, NodeId, NodesError, ValidationError};
use crate::core::node::FilterNode;
use crate::core::types::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Validate and execute `node` once, returning its outputs by port name.
///
/// Missing parameters take their declared defaults. Inputs that are absent
/// or `Value::None` count as unconnected.
pub fn run_node(
    node: &dyn FilterNode,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
) -> Result<HashMap<String, Value>, NodesError> {
    let node_id = NodeId::new();
    let metadata = node.metadata();
    log::info!("Running {} ({})", metadata.id, node_id);

    for name in parameters.keys() {
        if metadata.get_parameter(name).is_none() {
            log::warn!("Ignoring unknown parameter '{}' for {}", name, metadata.id);
        }
    }
    for name in inputs.keys() {
        if metadata.get_input(name).is_none() {
            log::warn!("Ignoring unknown input '{}' for {}", name, metadata.id);
        }
    }

    let mut ctx = ValidationContext::new(node_id);

    // Parameters (with defaults)
    for param_def in &metadata.parameters {
        let value = parameters
            .get(&param_def.name)
            .cloned()
            .unwrap_or_else(|| param_def.default_value.clone());

        param_def
            .validate(&value)
            .map_err(|error| ValidationError::ConstraintViolation {
                node_id,
                parameter: param_def.name.clone(),
                error,
            })?;

        ctx.add_parameter(param_def.name.clone(), value);
    }

    // Inputs
    for port in &metadata.inputs {
        match inputs.get(&port.name).filter(|v| !v.is_none()) {
            Some(value) => {
                port.validate(value)
                    .map_err(|error| ValidationError::InvalidInput {
                        node_id,
                        port: port.name.clone(),
                        error,
                    })?;
                ctx.add_input(port.name.clone(), value.clone());
            }
            None if !port.optional => {
                return Err(ValidationError::MissingRequiredInput {
                    node_id,
                    port: port.name.clone(),
                }
                .into());
            }
            None => {}
        }
    }

    node.validate(&ctx)?;

    let mut exec_ctx = ExecutionContext::from(ctx);
    let start = Instant::now();
    node.execute(&mut exec_ctx)?;
    log::debug!("{} finished in {:?}", metadata.id, start.elapsed());

    let outputs = exec_ctx.take_outputs();
    for port in &metadata.outputs {
        if !port.optional && !outputs.contains_key(&port.name) {
            return Err(ExecutionError::OutputNotSet {
                node_id,
                port: port.name.clone(),
            }
            .into());
        }
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{Category, NodeMetadata};
    use crate::core::port::{ParameterDefinition, PortDefinition};
    use crate::core::tensor::ImageTensor;
    use crate::core::types::PortType;

    /// Echoes its `label` parameter and whether `extra` was connected.
    #[derive(Clone)]
    struct Probe {
        set_outputs: bool,
    }

    impl FilterNode for Probe {
        fn metadata(&self) -> NodeMetadata {
            NodeMetadata::builder("probe", "Probe")
                .category(Category::Custom)
                .input(PortDefinition::input("image", PortType::Image))
                .input(PortDefinition::input("extra", PortType::Image).optional())
                .output(PortDefinition::output("label", PortType::String))
                .output(PortDefinition::output("has_extra", PortType::Boolean))
                .parameter(ParameterDefinition::text("label", "default"))
                .parameter(ParameterDefinition::new("count", PortType::Integer, Value::Integer(1)).with_range(1, 4))
                .build()
        }

        fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
            if ctx.get_string("label")? == "reject" {
                return Err(ValidationError::CustomValidation {
                    node_id: ctx.node_id,
                    error: "rejected".to_string(),
                });
            }
            Ok(())
        }

        fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
            if self.set_outputs {
                let label = ctx.get_string("label")?.to_string();
                let has_extra = ctx.has_input("extra");
                ctx.set_output("label", Value::String(label))?;
                ctx.set_output("has_extra", Value::Boolean(has_extra))?;
            }
            Ok(())
        }

        fn clone_box(&self) -> Box<dyn FilterNode> {
            Box::new(self.clone())
        }
    }

    fn image_inputs() -> HashMap<String, Value> {
        HashMap::from([
            ("image".to_string(), Value::Image(ImageTensor::zeros(vec![2, 2, 3]).unwrap())),
            ("extra".to_string(), Value::None),
        ])
    }

    #[test]
    fn test_defaults_are_applied() {
        let outputs = run_node(&Probe { set_outputs: true }, image_inputs(), HashMap::new()).unwrap();

        assert_eq!(outputs["label"], Value::String("default".to_string()));
        assert_eq!(outputs["has_extra"], Value::Boolean(false));
    }

    #[test]
    fn test_constraint_violation() {
        let err = run_node(
            &Probe { set_outputs: true },
            image_inputs(),
            HashMap::from([("count".to_string(), Value::Integer(9))]),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            NodesError::Validation(ValidationError::ConstraintViolation { ref parameter, .. }) if parameter == "count"
        ));
    }

    #[test]
    fn test_parameter_type_mismatch_is_rejected() {
        let err = run_node(
            &Probe { set_outputs: true },
            image_inputs(),
            HashMap::from([("label".to_string(), Value::Integer(3))]),
        )
        .unwrap_err();

        assert!(matches!(err, NodesError::Validation(ValidationError::ConstraintViolation { .. })));
    }

    #[test]
    fn test_missing_required_input() {
        let err = run_node(&Probe { set_outputs: true }, HashMap::new(), HashMap::new()).unwrap_err();

        assert!(matches!(
            err,
            NodesError::Validation(ValidationError::MissingRequiredInput { ref port, .. }) if port == "image"
        ));
    }

    #[test]
    fn test_wrong_input_type() {
        let inputs = HashMap::from([("image".to_string(), Value::String("cat.png".to_string()))]);
        let err = run_node(&Probe { set_outputs: true }, inputs, HashMap::new()).unwrap_err();

        assert!(matches!(err, NodesError::Validation(ValidationError::InvalidInput { .. })));
    }

    #[test]
    fn test_custom_validation_runs_before_execute() {
        let err = run_node(
            &Probe { set_outputs: true },
            image_inputs(),
            HashMap::from([("label".to_string(), Value::String("reject".to_string()))]),
        )
        .unwrap_err();

        assert!(matches!(err, NodesError::Validation(ValidationError::CustomValidation { .. })));
    }

    #[test]
    fn test_unset_output_is_an_error() {
        let err = run_node(&Probe { set_outputs: false }, image_inputs(), HashMap::new()).unwrap_err();

        assert!(matches!(err, NodesError::Execution(ExecutionError::OutputNotSet { .. })));
    }
}
