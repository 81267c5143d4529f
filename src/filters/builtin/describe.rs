//! Vision-language describe node.

use super::{check_choice, encode_input, parse_choice};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::dashscope::{ApiClient, GenerationRequest, Region, VisionModel};
use crate::filters::registry::FilterRegistry;
use std::sync::Arc;

pub(super) fn register(registry: &mut FilterRegistry, client: Arc<ApiClient>) {
    registry.register(move || Box::new(QwenVisionDescribe::new(Arc::clone(&client))));
}

/// Answers a question about an image with a Qwen-VL model.
#[derive(Debug, Clone)]
pub struct QwenVisionDescribe {
    client: Arc<ApiClient>,
}

impl QwenVisionDescribe {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl FilterNode for QwenVisionDescribe {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("qwen_vision_describe", "Qwen Vision Describe")
            .description("Describe or answer questions about an image with a Qwen-VL model")
            .category(Category::Vision)
            .tags(["qwen", "dashscope", "vision", "caption", "vl"])
            .non_deterministic()
            .input(
                PortDefinition::input("image", PortType::Image)
                    .with_description("Image to describe"),
            )
            .output(
                PortDefinition::output("description", PortType::String)
                    .with_description("Model answer"),
            )
            .parameter(
                ParameterDefinition::text("prompt", "What is in this picture?")
                    .with_description("Question about the image")
                    .with_constraint(Constraint::NotEmpty),
            )
            .parameter(
                ParameterDefinition::choice("model", &VisionModel::names(), VisionModel::default().as_str())
                    .with_description("Vision-language model"),
            )
            .parameter(
                ParameterDefinition::choice("region", &Region::names(), Region::default().as_str())
                    .with_description("API deployment; mainland_china uses DASHSCOPE_API_KEY_CHINA when set"),
            )
            .parameter(
                ParameterDefinition::flag("stream", false)
                    .with_description("Receive the answer as a server-sent event stream")
                    .optional(),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        check_choice::<VisionModel>(ctx, "model")?;
        check_choice::<Region>(ctx, "region")?;
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let image = encode_input(ctx, ctx.get_input_image("image")?)?;
        let request = GenerationRequest::describe(ctx.get_string("prompt")?, image, parse_choice(ctx, "model")?)
            .with_region(parse_choice(ctx, "region")?)
            .with_stream(ctx.get_bool("stream")?);

        let description = self
            .client
            .describe(&request)
            .map_err(|e| ctx.api_error(e))?;

        ctx.set_output("description", Value::String(description))?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ApiErrorKind;
    use crate::dashscope::Endpoints;
    use crate::execution::run_node;
    use crate::filters::builtin::testing::{input_image, mock_client};
    use serde_json::json;
    use std::collections::HashMap;

    fn image_input() -> HashMap<String, Value> {
        HashMap::from([("image".to_string(), Value::Image(input_image()))])
    }

    #[test]
    fn test_describe() {
        let (client, mock) = mock_client();
        mock.push_json(200, &json!({ "choices": [{ "message": { "content": "A black square." } }] }));

        let node = QwenVisionDescribe::new(client);
        let outputs = run_node(
            &node,
            image_input(),
            HashMap::from([
                ("model".to_string(), Value::String("qwen-vl-plus-latest".to_string())),
                ("region".to_string(), Value::String("mainland_china".to_string())),
            ]),
        )
        .unwrap();

        assert_eq!(outputs["description"], Value::String("A black square.".to_string()));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, Endpoints::default().chat(Region::MainlandChina));
        let body = requests[0].body.clone().unwrap();
        assert_eq!(body["model"], "qwen-vl-plus-latest");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["content"][0]["type"], "image_url");
        assert_eq!(body["messages"][0]["content"][1]["text"], "What is in this picture?");
    }

    #[test]
    fn test_unknown_model_fails_validation() {
        let (client, mock) = mock_client();
        let node = QwenVisionDescribe::new(client);

        let result = run_node(
            &node,
            image_input(),
            HashMap::from([("model".to_string(), Value::String("qwen-vl-ultra".to_string()))]),
        );
        assert!(result.is_err());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_forbidden_is_authentication() {
        let (client, mock) = mock_client();
        mock.push_response(403, "Forbidden", "Model access denied.");

        let node = QwenVisionDescribe::new(client);
        let err = run_node(&node, image_input(), HashMap::new()).unwrap_err();
        assert_eq!(err.api_kind(), Some(ApiErrorKind::Authentication));
    }
}
