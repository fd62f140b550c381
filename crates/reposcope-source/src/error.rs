#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("host returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid repository key: {0}")]
    InvalidRepoKey(String),

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("failed to decode content of {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
