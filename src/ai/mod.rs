pub mod gemini;
pub mod prompt;
pub mod response;

use crate::error::Result;
use async_trait::async_trait;

/// A single text generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Generative model used to analyze metric data
#[async_trait]
pub trait AiModel: Send + Sync {
    /// Generate text for a request. `Ok(None)` means the model answered
    /// without any text.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>>;
}
