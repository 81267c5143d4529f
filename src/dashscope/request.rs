//! Request types and JSON envelopes for the three operations.
//!
//! The generation endpoint uses DashScope's native `input.messages` envelope
//! for both text-to-image and editing. The vision models sit behind the
//! OpenAI-compatible chat endpoint instead.

use crate::codec::EncodedImage;
use crate::core::error::RequestError;
use crate::dashscope::config::Region;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Model used for text-to-image.
pub const TEXT_TO_IMAGE_MODEL: &str = "qwen-image";
/// Model used for image editing.
pub const EDIT_MODEL: &str = "qwen-image-edit";
/// Most images an edit request may carry.
pub const MAX_EDIT_IMAGES: usize = 3;

/// The remote operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TextToImage,
    Edit,
    Describe,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::TextToImage => "text_to_image",
            Operation::Edit => "edit",
            Operation::Describe => "describe",
        }
    }

    /// Whether the operation returns an image URL.
    pub fn produces_image(&self) -> bool {
        matches!(self, Operation::TextToImage | Operation::Edit)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output sizes accepted by the text-to-image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageSize {
    /// 16:9
    #[serde(rename = "1664*928")]
    Landscape,
    /// 4:3
    #[serde(rename = "1472*1140")]
    Standard,
    /// 1:1
    #[default]
    #[serde(rename = "1328*1328")]
    Square,
    /// 3:4
    #[serde(rename = "1140*1472")]
    Portrait,
    /// 9:16
    #[serde(rename = "928*1664")]
    Tall,
}

impl ImageSize {
    /// Wire form, e.g. `"1328*1328"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Landscape => "1664*928",
            ImageSize::Standard => "1472*1140",
            ImageSize::Square => "1328*1328",
            ImageSize::Portrait => "1140*1472",
            ImageSize::Tall => "928*1664",
        }
    }

    pub fn all() -> &'static [ImageSize] {
        &[
            ImageSize::Landscape,
            ImageSize::Standard,
            ImageSize::Square,
            ImageSize::Portrait,
            ImageSize::Tall,
        ]
    }

    /// Size names for UI dropdowns.
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(ImageSize::as_str).collect()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| RequestError::UnknownSize(s.to_string()))
    }
}

/// Vision-language models available for describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VisionModel {
    #[default]
    #[serde(rename = "qwen-vl-max")]
    Max,
    #[serde(rename = "qwen-vl-plus")]
    Plus,
    #[serde(rename = "qwen-vl-max-latest")]
    MaxLatest,
    #[serde(rename = "qwen-vl-plus-latest")]
    PlusLatest,
}

impl VisionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisionModel::Max => "qwen-vl-max",
            VisionModel::Plus => "qwen-vl-plus",
            VisionModel::MaxLatest => "qwen-vl-max-latest",
            VisionModel::PlusLatest => "qwen-vl-plus-latest",
        }
    }

    pub fn all() -> &'static [VisionModel] {
        &[
            VisionModel::Max,
            VisionModel::Plus,
            VisionModel::MaxLatest,
            VisionModel::PlusLatest,
        ]
    }

    /// Model names for UI dropdowns.
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(VisionModel::as_str).collect()
    }
}

impl fmt::Display for VisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisionModel {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| RequestError::UnknownModel(s.to_string()))
    }
}

/// One call to the remote service.
///
/// Built with one of the operation constructors and then refined with the
/// `with_*` methods. Options that an operation does not send (e.g. `size`
/// for editing) are kept but ignored when the payload is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    operation: Operation,
    prompt: String,
    negative_prompt: Option<String>,
    images: Vec<EncodedImage>,
    mask: Option<EncodedImage>,
    size: ImageSize,
    prompt_extend: bool,
    watermark: bool,
    seed: Option<u32>,
    model: String,
    region: Region,
    stream: bool,
}

impl GenerationRequest {
    fn base(operation: Operation, prompt: String, model: &str) -> Self {
        Self {
            operation,
            prompt,
            negative_prompt: None,
            images: Vec::new(),
            mask: None,
            size: ImageSize::default(),
            prompt_extend: true,
            watermark: false,
            seed: None,
            model: model.to_string(),
            region: Region::default(),
            stream: false,
        }
    }

    /// Generate an image from text.
    pub fn text_to_image(prompt: impl Into<String>) -> Self {
        Self::base(Operation::TextToImage, prompt.into(), TEXT_TO_IMAGE_MODEL)
    }

    /// Edit one to three images according to `prompt`.
    pub fn edit(prompt: impl Into<String>, images: Vec<EncodedImage>) -> Result<Self, RequestError> {
        if images.is_empty() {
            return Err(RequestError::NoEditImages);
        }
        if images.len() > MAX_EDIT_IMAGES {
            return Err(RequestError::TooManyEditImages {
                max: MAX_EDIT_IMAGES,
                got: images.len(),
            });
        }

        let mut request = Self::base(Operation::Edit, prompt.into(), EDIT_MODEL);
        request.images = images;
        Ok(request)
    }

    /// Ask a vision model about one image.
    pub fn describe(prompt: impl Into<String>, image: EncodedImage, model: VisionModel) -> Self {
        let mut request = Self::base(Operation::Describe, prompt.into(), model.as_str());
        request.images = vec![image];
        request
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Set the negative prompt. An empty string clears it.
    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        let negative_prompt = negative_prompt.into();
        self.negative_prompt = if negative_prompt.is_empty() {
            None
        } else {
            Some(negative_prompt)
        };
        self
    }

    pub fn with_prompt_extend(mut self, prompt_extend: bool) -> Self {
        self.prompt_extend = prompt_extend;
        self
    }

    pub fn with_watermark(mut self, watermark: bool) -> Self {
        self.watermark = watermark;
        self
    }

    /// Set the seed. 0 means "let the service pick".
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = (seed != 0).then_some(seed);
        self
    }

    /// Restrict an edit to the white area of `mask`.
    pub fn with_mask(mut self, mask: EncodedImage) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Request a server-sent event stream (describe only).
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn seed(&self) -> Option<u32> {
        self.seed
    }

    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    /// Build the JSON body for this request.
    pub fn to_payload(&self) -> Value {
        match self.operation {
            Operation::TextToImage => text_to_image_payload(self),
            Operation::Edit => edit_payload(self),
            Operation::Describe => describe_payload(self),
        }
    }
}

// ============================================================================
// Envelopes
// ============================================================================

fn user_message(content: Vec<Value>) -> Value {
    json!({ "role": "user", "content": content })
}

fn text_to_image_payload(request: &GenerationRequest) -> Value {
    let mut parameters = Map::new();
    parameters.insert("size".into(), json!(request.size.as_str()));
    parameters.insert("prompt_extend".into(), json!(request.prompt_extend));
    parameters.insert("watermark".into(), json!(request.watermark));
    if let Some(negative_prompt) = &request.negative_prompt {
        parameters.insert("negative_prompt".into(), json!(negative_prompt));
    }
    if let Some(seed) = request.seed {
        parameters.insert("seed".into(), json!(seed));
    }

    json!({
        "model": request.model,
        "input": {
            "messages": [user_message(vec![json!({ "text": request.prompt })])]
        },
        "parameters": parameters,
    })
}

fn edit_payload(request: &GenerationRequest) -> Value {
    let mut content = Vec::with_capacity(request.images.len() + 2);
    for (index, image) in request.images.iter().enumerate() {
        content.push(json!({ "image": image.data_uri() }));
        // The mask refers to the first image and follows it directly
        if index == 0 {
            if let Some(mask) = &request.mask {
                content.push(json!({ "mask": mask.data_uri() }));
            }
        }
    }
    content.push(json!({ "text": request.prompt }));

    let mut parameters = Map::new();
    parameters.insert("watermark".into(), json!(request.watermark));
    if let Some(negative_prompt) = &request.negative_prompt {
        parameters.insert("negative_prompt".into(), json!(negative_prompt));
    }

    json!({
        "model": request.model,
        "input": {
            "messages": [user_message(content)]
        },
        "parameters": parameters,
    })
}

fn describe_payload(request: &GenerationRequest) -> Value {
    let mut content = Vec::with_capacity(2);
    if let Some(image) = request.images.first() {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": image.data_uri() }
        }));
    }
    content.push(json!({ "type": "text", "text": request.prompt }));

    json!({
        "model": request.model,
        "messages": [user_message(content)],
        "stream": request.stream,
    })
}
