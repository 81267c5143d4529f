//! Text-to-image node.

use super::{check_choice, parse_choice, seed_parameter, MAX_SEED};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::dashscope::{ApiClient, GenerationRequest, ImageSize, Region};
use crate::filters::registry::FilterRegistry;
use std::sync::Arc;

pub(super) fn register(registry: &mut FilterRegistry, client: Arc<ApiClient>) {
    registry.register(move || Box::new(QwenTextToImage::new(Arc::clone(&client))));
}

/// Generates an image from a text prompt with `qwen-image`.
#[derive(Debug, Clone)]
pub struct QwenTextToImage {
    client: Arc<ApiClient>,
}

impl QwenTextToImage {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl FilterNode for QwenTextToImage {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("qwen_text_to_image", "Qwen Text to Image")
            .description("Generate an image from a text prompt with the Qwen-Image model")
            .category(Category::Generate)
            .tags(["qwen", "dashscope", "generate", "text-to-image"])
            .non_deterministic()
            .output(
                PortDefinition::output("image", PortType::Image)
                    .with_description("Generated image"),
            )
            .output(
                PortDefinition::output("url", PortType::String)
                    .with_display_name("Image URL")
                    .with_description("Remote URL of the generated image"),
            )
            .parameter(
                ParameterDefinition::text("prompt", "Generate an image of a cat")
                    .with_description("What to generate")
                    .with_constraint(Constraint::NotEmpty),
            )
            .parameter(
                ParameterDefinition::choice("size", &ImageSize::names(), ImageSize::default().as_str())
                    .with_description("Output resolution (width*height)"),
            )
            .parameter(
                ParameterDefinition::choice("region", &Region::names(), Region::default().as_str())
                    .with_description("API deployment; mainland_china uses DASHSCOPE_API_KEY_CHINA when set"),
            )
            .parameter(
                ParameterDefinition::text("negative_prompt", "")
                    .with_description("Content to avoid")
                    .optional(),
            )
            .parameter(
                ParameterDefinition::flag("prompt_extend", true)
                    .with_description("Let the service elaborate short prompts")
                    .optional(),
            )
            .parameter(
                ParameterDefinition::flag("watermark", false)
                    .with_description("Stamp the Qwen-Image watermark on the result")
                    .optional(),
            )
            .parameter(
                ParameterDefinition::new("seed", PortType::Integer, Value::Integer(0))
                    .with_description("Random seed; 0 lets the service pick")
                    .with_range(0, MAX_SEED)
                    .optional(),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        check_choice::<ImageSize>(ctx, "size")?;
        check_choice::<Region>(ctx, "region")?;
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let request = GenerationRequest::text_to_image(ctx.get_string("prompt")?)
            .with_size(parse_choice(ctx, "size")?)
            .with_region(parse_choice(ctx, "region")?)
            .with_negative_prompt(ctx.get_string("negative_prompt")?)
            .with_prompt_extend(ctx.get_bool("prompt_extend")?)
            .with_watermark(ctx.get_bool("watermark")?)
            .with_seed(seed_parameter(ctx)?);

        let generated = self
            .client
            .generate_image(&request)
            .map_err(|e| ctx.api_error(e))?;

        ctx.set_output_image("image", generated.image)?;
        ctx.set_output("url", Value::String(generated.url))?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}
