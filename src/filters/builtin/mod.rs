//! Built-in Qwen nodes.
//!
//! All three nodes share one `ApiClient`; each invocation is one request.

mod describe;
mod edit;
mod generate;

use crate::codec::{self, EncodedImage};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, RequestError, ValidationError};
use crate::core::tensor::ImageTensor;
use crate::dashscope::ApiClient;
use crate::filters::registry::FilterRegistry;
use std::str::FromStr;
use std::sync::Arc;

pub use describe::QwenVisionDescribe;
pub use edit::QwenImageEdit;
pub use generate::QwenTextToImage;

/// Largest seed the service accepts.
pub const MAX_SEED: i64 = 2_147_483_647;

/// Register all built-in nodes against `client`.
pub fn register_all(registry: &mut FilterRegistry, client: Arc<ApiClient>) {
    generate::register(registry, Arc::clone(&client));
    edit::register(registry, Arc::clone(&client));
    describe::register(registry, client);
}

// ============================================================================
// Shared parameter handling
// ============================================================================

/// Check that a string parameter parses as `T`.
fn check_choice<T>(ctx: &ValidationContext, name: &str) -> Result<(), ValidationError>
where
    T: FromStr<Err = RequestError>,
{
    let raw = ctx.get_string(name)?;
    T::from_str(raw)
        .map(|_| ())
        .map_err(|e| ValidationError::ConstraintViolation {
            node_id: ctx.node_id,
            parameter: name.to_string(),
            error: e.to_string(),
        })
}

/// Parse a string parameter as `T`.
fn parse_choice<T>(ctx: &ExecutionContext, name: &str) -> Result<T, ExecutionError>
where
    T: FromStr<Err = RequestError>,
{
    let raw = ctx.get_string(name)?;
    T::from_str(raw).map_err(|e| ExecutionError::NodeExecution {
        node_id: ctx.node_id,
        error: e.to_string(),
    })
}

/// Read the `seed` parameter. Out-of-range values are rejected.
fn seed_parameter(ctx: &ExecutionContext) -> Result<u32, ExecutionError> {
    let seed = ctx.get_integer("seed")?;
    match u32::try_from(seed) {
        Ok(seed) if i64::from(seed) <= MAX_SEED => Ok(seed),
        _ => Err(ExecutionError::NodeExecution {
            node_id: ctx.node_id,
            error: format!("Seed {} is outside [0, {}]", seed, MAX_SEED),
        }),
    }
}

/// Encode an input image for the wire, tagging failures with the node.
fn encode_input(ctx: &ExecutionContext, image: &ImageTensor) -> Result<EncodedImage, ExecutionError> {
    codec::encode(image).map_err(|e| ctx.api_error(e))
}


#[cfg(test)]
mod tests {
    use super::testing::mock_client;
    use super::*;
    use crate::core::error::NodeId;
    use crate::core::types::Value;
    use crate::dashscope::{ImageSize, Region};

    #[test]
    fn test_register_all() {
        let (client, _) = mock_client();
        let mut registry = FilterRegistry::new();
        register_all(&mut registry, client);

        assert_eq!(
            registry.filter_ids().collect::<Vec<_>>(),
            vec!["qwen_text_to_image", "qwen_image_edit", "qwen_vision_describe"]
        );
    }

    #[test]
    fn test_parse_choice() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_parameter("size", Value::String("928*1664".to_string()));
        ctx.add_parameter("region", Value::String("moon".to_string()));

        assert_eq!(parse_choice::<ImageSize>(&ctx, "size").unwrap(), ImageSize::Tall);
        assert!(parse_choice::<Region>(&ctx, "region").is_err());
    }

    #[test]
    fn test_check_choice() {
        let mut ctx = ValidationContext::new(NodeId::new());
        ctx.add_parameter("region", Value::String("mainland_china".to_string()));
        ctx.add_parameter("size", Value::String("1x1".to_string()));

        assert!(check_choice::<Region>(&ctx, "region").is_ok());
        assert!(matches!(
            check_choice::<ImageSize>(&ctx, "size"),
            Err(ValidationError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_seed_bounds() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_parameter("seed", Value::Integer(MAX_SEED));
        assert_eq!(seed_parameter(&ctx).unwrap(), 2_147_483_647);

        ctx.add_parameter("seed", Value::Integer(MAX_SEED + 1));
        assert!(seed_parameter(&ctx).is_err());

        ctx.add_parameter("seed", Value::Integer(-1));
        assert!(seed_parameter(&ctx).is_err());
    }
}
