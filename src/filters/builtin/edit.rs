//! Image edit node.

use super::{check_choice, encode_input, parse_choice};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::dashscope::{ApiClient, GenerationRequest, Region};
use crate::filters::registry::FilterRegistry;
use std::sync::Arc;

/// Image inputs in the order they are sent.
const IMAGE_INPUTS: [&str; 3] = ["image1", "image2", "image3"];

pub(super) fn register(registry: &mut FilterRegistry, client: Arc<ApiClient>) {
    registry.register(move || Box::new(QwenImageEdit::new(Arc::clone(&client))));
}

/// Edits up to three images from a text instruction with `qwen-image-edit`.
///
/// An optional mask limits the edit to its white area of the first image.
#[derive(Debug, Clone)]
pub struct QwenImageEdit {
    client: Arc<ApiClient>,
}

impl QwenImageEdit {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl FilterNode for QwenImageEdit {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("qwen_image_edit", "Qwen Image Edit")
            .description("Edit images from a text instruction with the Qwen-Image-Edit model")
            .category(Category::Edit)
            .tags(["qwen", "dashscope", "edit", "image-to-image", "inpaint"])
            .non_deterministic()
            .input(
                PortDefinition::input("image1", PortType::Image)
                    .with_display_name("Image")
                    .with_description("Image to edit"),
            )
            .input(
                PortDefinition::input("image2", PortType::Image)
                    .with_description("Additional reference image")
                    .optional(),
            )
            .input(
                PortDefinition::input("image3", PortType::Image)
                    .with_description("Additional reference image")
                    .optional(),
            )
            .input(
                PortDefinition::input("mask", PortType::Image)
                    .with_description("Area of the first image to edit")
                    .optional(),
            )
            .output(
                PortDefinition::output("image", PortType::Image)
                    .with_description("Edited image"),
            )
            .output(
                PortDefinition::output("url", PortType::String)
                    .with_display_name("Image URL")
                    .with_description("Remote URL of the edited image"),
            )
            .parameter(
                ParameterDefinition::text("prompt", "Edit this image")
                    .with_description("Edit instruction")
                    .with_constraint(Constraint::NotEmpty),
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
                ParameterDefinition::flag("watermark", false)
                    .with_description("Stamp the Qwen-Image watermark on the result")
                    .optional(),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        check_choice::<Region>(ctx, "region")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        // image1 is required; the runner reports it missing before this point
        let mut images = Vec::with_capacity(IMAGE_INPUTS.len());
        images.push(encode_input(ctx, ctx.get_input_image("image1")?)?);
        for name in &IMAGE_INPUTS[1..] {
            if let Some(image) = ctx.get_input_image_optional(name) {
                images.push(encode_input(ctx, image)?);
            }
        }

        let mut request = GenerationRequest::edit(ctx.get_string("prompt")?, images)
            .map_err(|e| ExecutionError::NodeExecution {
                node_id: ctx.node_id,
                error: e.to_string(),
            })?
            .with_region(parse_choice(ctx, "region")?)
            .with_negative_prompt(ctx.get_string("negative_prompt")?)
            .with_watermark(ctx.get_bool("watermark")?);

        if let Some(mask) = ctx.get_input_image_optional("mask") {
            request = request.with_mask(encode_input(ctx, mask)?);
        }

        log::debug!(
            "Editing {} image(s){}",
            request.images().len(),
            if request.has_mask() { " with mask" } else { "" }
        );

        let edited = self
            .client
            .generate_image(&request)
            .map_err(|e| ctx.api_error(e))?;

        ctx.set_output_image("image", edited.image)?;
        ctx.set_output("url", Value::String(edited.url))?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}
