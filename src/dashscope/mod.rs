//! DashScope (Alibaba Cloud Model Studio) access for the Qwen models.
//!
//! - `config`: keys, regions and endpoints
//! - `request`: request types and JSON envelopes
//! - `transport`: the HTTP seam
//! - `client`: send, extract, download
//! - `classify`: HTTP outcome to `ApiError` mapping
//! - `response`: result extraction from response bodies

pub mod classify;
pub mod client;
pub mod config;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{ApiClient, ApiResponse, GeneratedImage};
pub use config::{ApiConfig, Endpoints, Region};
pub use request::{GenerationRequest, ImageSize, Operation, VisionModel};
pub use transport::{HttpResponse, Transport, TransportFailure, UreqTransport};
