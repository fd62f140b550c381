use serde::{Deserialize, Serialize};

use reposcope_index::{Backpressure, ContinuationPolicy};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Any OpenAI-compatible `/embeddings` endpoint.
    #[default]
    OpenAi,
    Ollama,
}

impl EmbeddingProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}

fn default_embedding_model() -> String {
    "gemini-embedding-001".into()
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Retries on HTTP 429 before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Qdrant,
    /// Process-local store; contents are lost on exit.
    Memory,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection() -> String {
    "reposcope_chunks".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub backend: VectorBackend,
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            url: default_qdrant_url(),
            collection: default_collection(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    #[default]
    GitHub,
    Local,
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_source_root() -> String {
    ".".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub backend: SourceBackend,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Directory holding one checkout per repository key (`local` backend).
    #[serde(default = "default_source_root")]
    pub root: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::default(),
            api_base: default_api_base(),
            root: default_source_root(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    4000
}

fn default_max_chunks_per_file() -> usize {
    3
}

fn default_fetch_batch_size() -> usize {
    20
}

fn default_embed_concurrency() -> usize {
    10
}

fn default_upsert_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct IndexConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_max_chunks_per_file")]
    pub max_chunks_per_file: usize,
    #[serde(default)]
    pub continuation_policy: ContinuationPolicy,
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    #[serde(default)]
    pub backpressure: Backpressure,
    #[serde(default)]
    pub skip_unchanged: bool,
    #[serde(default)]
    pub prune_stale: bool,
    /// Added to the built-in excluded directory list.
    #[serde(default)]
    pub extra_excluded_dirs: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            max_chunks_per_file: default_max_chunks_per_file(),
            continuation_policy: ContinuationPolicy::default(),
            fetch_batch_size: default_fetch_batch_size(),
            embed_concurrency: default_embed_concurrency(),
            upsert_batch_size: default_upsert_batch_size(),
            backpressure: Backpressure::default(),
            skip_unchanged: false,
            prune_stale: false,
            extra_excluded_dirs: Vec::new(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_source_timeout() -> u64 {
    30
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_store_timeout() -> u64 {
    60
}

/// Per-call timeouts in seconds. Zero disables the timeout.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_source_timeout")]
    pub source_seconds: u64,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
    #[serde(default = "default_store_timeout")]
    pub store_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            source_seconds: default_source_timeout(),
            embedding_seconds: default_embedding_timeout(),
            store_seconds: default_store_timeout(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub github_token: Option<Secret>,
    pub embedding_api_key: Option<Secret>,
}
