use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key-value store error: {0}")]
    Kv(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Safety evaluator rejected the draft: {reason}")]
    SafetyRejection { reason: String },

    #[error("Review {id} was modified concurrently")]
    StaleReview { id: String },

    #[error("Backpressure: {0}")]
    Backpressure(String),

    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    #[error("Interaction not found: {id}")]
    NotFound { id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Short error code surfaced on the dashboard HTTP boundary.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::Kv(_) => "KV_ERROR",
            CoreError::Database(_) => "DATABASE_ERROR",
            CoreError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            CoreError::Transport(_) => "TRANSPORT_ERROR",
            CoreError::RateLimited { .. } => "RATE_LIMITED",
            CoreError::SafetyRejection { .. } => "SAFETY_REJECTION",
            CoreError::StaleReview { .. } => "STALE_REVIEW",
            CoreError::Backpressure(_) => "BACKPRESSURE",
            CoreError::FatalConfig(_) => "FATAL_CONFIG",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Serialization(_) => "SERIALIZATION_ERROR",
            CoreError::Io(_) => "IO_ERROR",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
