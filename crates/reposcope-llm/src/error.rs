#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("embedding request failed with status {status}")]
    Status { status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("embedding request timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
