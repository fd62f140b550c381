mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::secret::Secret;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reads credentials from the environment. Secrets never come from the
    /// config file.
    pub fn resolve_secrets(&mut self) {
        self.secrets.github_token = std::env::var("REPOSCOPE_GITHUB_TOKEN")
            .ok()
            .filter(|v| !v.is_empty())
            .map(Secret::new);
        self.secrets.embedding_api_key = std::env::var("REPOSCOPE_EMBEDDING_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .map(Secret::new);
    }

    /// # Errors
    ///
    /// Returns the first zero-valued size or width, zero `top_k`, or empty
    /// required string.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("index.max_chunk_size", self.index.max_chunk_size),
            ("index.max_chunks_per_file", self.index.max_chunks_per_file),
            ("index.fetch_batch_size", self.index.fetch_batch_size),
            ("index.embed_concurrency", self.index.embed_concurrency),
            ("index.upsert_batch_size", self.index.upsert_batch_size),
            ("retrieval.top_k", self.retrieval.top_k),
        ];
        if let Some((field, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field: *field });
        }

        let strings = [
            ("vector_store.collection", &self.vector_store.collection),
            ("embedding.model", &self.embedding.model),
        ];
        if let Some((field, _)) = strings.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Empty { field: *field });
        }
        Ok(())
    }
}

impl TimeoutConfig {
    fn limit(seconds: u64) -> Option<Duration> {
        (seconds > 0).then(|| Duration::from_secs(seconds))
    }

    #[must_use]
    pub fn source(&self) -> Option<Duration> {
        Self::limit(self.source_seconds)
    }

    #[must_use]
    pub fn embedding(&self) -> Option<Duration> {
        Self::limit(self.embedding_seconds)
    }

    #[must_use]
    pub fn store(&self) -> Option<Duration> {
        Self::limit(self.store_seconds)
    }
}
