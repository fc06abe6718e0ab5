use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the conversation sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// Plain text system prompt, used by providers without tiered caching.
    pub system: String,
    /// Optional 3-tier prompt with Anthropic cache breakpoints.
    pub system_prompt: Option<crate::prefix::SystemPrompt>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// Narrow capability every LLM backend implements. Generation is the only
/// thing the pipeline needs — no tool loop, no streaming, matching the
/// spec's "uniform generate-response surface" requirement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Cost in USD for the given token counts. Providers without published
    /// per-token pricing fall back to the word-count estimate in `cost.rs`.
    fn cost_usd(&self, tokens_in: u32, tokens_out: u32) -> f64;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out")]
    Timeout,
}
