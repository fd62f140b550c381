//! Component construction from a loaded [`Config`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use reposcope_index::{
    ChunkerConfig, CodebaseIndexer, ContextRetriever, ExclusionPolicy, FileDiscoverer,
    IndexerConfig,
};
use reposcope_llm::EmbeddingProvider;
use reposcope_llm::any::AnyProvider;
use reposcope_llm::ollama::OllamaProvider;
use reposcope_llm::openai::OpenAiProvider;
use reposcope_memory::{InMemoryVectorStore, QdrantOps, VectorStore};
use reposcope_source::{GitHubHost, LocalHost, SourceHost};

use crate::config::{Config, EmbeddingProviderKind, SourceBackend, VectorBackend};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Priority: explicit path > `REPOSCOPE_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var("REPOSCOPE_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads, resolves secrets and validates.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or validation fails.
pub fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<Config> {
    let path = resolve_config_path(explicit);
    let mut config = Config::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.resolve_secrets();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[must_use]
pub fn create_provider(config: &Config) -> AnyProvider {
    let embedding = &config.embedding;
    let provider = match embedding.provider {
        EmbeddingProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .embedding_api_key
                .as_ref()
                .map(|s| s.expose().to_owned())
                .unwrap_or_default();
            let mut provider =
                OpenAiProvider::new(api_key, embedding.base_url.clone(), embedding.model.clone())
                    .with_max_retries(embedding.max_retries);
            if let Some(timeout) = config.timeouts.embedding() {
                provider = provider.with_client(reposcope_llm::http::client_with_timeout(timeout));
            }
            AnyProvider::OpenAi(provider)
        }
        EmbeddingProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &embedding.base_url,
            embedding.model.clone(),
        )),
    };
    tracing::info!(
        provider = provider.name(),
        model = %embedding.model,
        "embedding provider configured"
    );
    provider
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.vector_store.backend {
        VectorBackend::Qdrant => {
            let ops = QdrantOps::new(&config.vector_store.url).with_context(|| {
                format!("failed to create Qdrant client for {}", config.vector_store.url)
            })?;
            Ok(Arc::new(ops))
        }
        VectorBackend::Memory => {
            tracing::warn!("using in-memory vector store; the index is lost on exit");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

#[must_use]
pub fn create_host(config: &Config) -> Arc<dyn SourceHost> {
    match config.source.backend {
        SourceBackend::GitHub => {
            let token = config
                .secrets
                .github_token
                .as_ref()
                .map(|s| s.expose().to_owned());
            if token.is_none() {
                tracing::warn!("REPOSCOPE_GITHUB_TOKEN not set; using unauthenticated GitHub API");
            }
            let timeout = config
                .timeouts
                .source()
                .unwrap_or(std::time::Duration::from_secs(60));
            let client = reposcope_llm::http::client_with_timeout(timeout);
            Arc::new(GitHubHost::new(client, token).with_base_url(config.source.api_base.clone()))
        }
        SourceBackend::Local => Arc::new(LocalHost::new(&config.source.root)),
    }
}

#[must_use]
pub fn exclusion_policy(config: &Config) -> ExclusionPolicy {
    ExclusionPolicy::default().with_extra_dirs(config.index.extra_excluded_dirs.iter().cloned())
}

#[must_use]
pub fn indexer_config(config: &Config) -> IndexerConfig {
    let index = &config.index;
    IndexerConfig {
        collection: config.vector_store.collection.clone(),
        chunker: ChunkerConfig {
            max_chunk_size: index.max_chunk_size,
            max_chunks_per_file: index.max_chunks_per_file,
            continuation_policy: index.continuation_policy,
        },
        fetch_batch_size: index.fetch_batch_size,
        embed_concurrency: index.embed_concurrency,
        upsert_batch_size: index.upsert_batch_size,
        backpressure: index.backpressure,
        skip_unchanged: index.skip_unchanged,
        prune_stale: index.prune_stale,
        source_timeout: config.timeouts.source(),
        embed_timeout: config.timeouts.embedding(),
        store_timeout: config.timeouts.store(),
    }
}

#[must_use]
pub fn build_indexer<P: EmbeddingProvider>(
    config: &Config,
    provider: Arc<P>,
    store: Arc<dyn VectorStore>,
    host: Arc<dyn SourceHost>,
) -> CodebaseIndexer<P> {
    CodebaseIndexer::new(provider, store, indexer_config(config))
        .with_source(host, exclusion_policy(config))
}

#[must_use]
pub fn build_discoverer(config: &Config, host: Arc<dyn SourceHost>) -> FileDiscoverer {
    FileDiscoverer::new(host, exclusion_policy(config)).with_call_timeout(config.timeouts.source())
}

#[must_use]
pub fn build_retriever<P: EmbeddingProvider>(
    config: &Config,
    provider: Arc<P>,
    store: Arc<dyn VectorStore>,
) -> ContextRetriever<P> {
    ContextRetriever::new(provider, store, config.vector_store.collection.clone())
        .with_timeouts(config.timeouts.embedding(), config.timeouts.store())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_config_path(Some(PathBuf::from("/etc/reposcope.toml")));
        assert_eq!(path, PathBuf::from("/etc/reposcope.toml"));
    }

    #[test]
    fn create_provider_openai_by_default() {
        let provider = create_provider(&Config::default());
        assert!(matches!(provider, AnyProvider::OpenAi(_)));
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn create_provider_ollama() {
        let mut config = Config::default();
        config.embedding.provider = EmbeddingProviderKind::Ollama;
        config.embedding.base_url = "http://localhost:11434".into();
        let provider = create_provider(&config);
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn create_memory_store() {
        let mut config = Config::default();
        config.vector_store.backend = VectorBackend::Memory;
        assert!(create_store(&config).is_ok());
    }

    #[test]
    fn create_local_host() {
        let mut config = Config::default();
        config.source.backend = SourceBackend::Local;
        assert_eq!(create_host(&config).name(), "local");
    }

    #[test]
    fn create_github_host_by_default() {
        assert_eq!(create_host(&Config::default()).name(), "github");
    }

    #[test]
    fn indexer_config_maps_sections() {
        let mut config = Config::default();
        config.vector_store.collection = "code".into();
        config.index.max_chunk_size = 1200;
        config.index.prune_stale = true;
        config.timeouts.store_seconds = 0;

        let ic = indexer_config(&config);

        assert_eq!(ic.collection, "code");
        assert_eq!(ic.chunker.max_chunk_size, 1200);
        assert_eq!(ic.fetch_batch_size, 20);
        assert!(ic.prune_stale);
        assert!(ic.store_timeout.is_none());
        assert_eq!(ic.embed_timeout, Some(std::time::Duration::from_secs(30)));
    }

    #[test]
    fn extra_excluded_dirs_extend_defaults() {
        let mut config = Config::default();
        config.index.extra_excluded_dirs = vec!["generated".into()];
        let policy = exclusion_policy(&config);
        assert!(policy.is_excluded_dir("generated"));
        assert!(policy.is_excluded_dir("node_modules"));
    }
}
