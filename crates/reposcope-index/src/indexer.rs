//! Indexing orchestrator: discover → fetch → chunk → embed → upsert.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reposcope_llm::EmbeddingProvider;
use reposcope_memory::{VectorFilter, VectorStore};
use reposcope_source::SourceHost;

use crate::chunker::{Chunk, ChunkerConfig, chunk_file};
use crate::discovery::FileDiscoverer;
use crate::embedder::EmbeddingGenerator;
use crate::error::{IndexError, Result};
use crate::fetcher::{ContentFetcher, FileRecord};
use crate::policy::ExclusionPolicy;
use crate::pool::{Backpressure, GroupScheduler, bounded};
use crate::report::{FailureStage, IndexReport, ItemFailure};
use crate::upserter::{
    CHUNK_ID_FIELD, CONTENT_HASH_FIELD, EmbeddingResult, REPO_KEY_FIELD, VectorUpserter, chunk_id,
    content_hash,
};

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub collection: String,
    pub chunker: ChunkerConfig,
    pub fetch_batch_size: usize,
    pub embed_concurrency: usize,
    pub upsert_batch_size: usize,
    pub backpressure: Backpressure,
    /// Skip embedding chunks whose id and content hash are already stored.
    pub skip_unchanged: bool,
    /// Delete this repository's vectors that the run did not produce.
    pub prune_stale: bool,
    pub source_timeout: Option<Duration>,
    pub embed_timeout: Option<Duration>,
    pub store_timeout: Option<Duration>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            collection: "reposcope_chunks".into(),
            chunker: ChunkerConfig::default(),
            fetch_batch_size: 20,
            embed_concurrency: 10,
            upsert_batch_size: 100,
            backpressure: Backpressure::Grouped,
            skip_unchanged: false,
            prune_stale: false,
            source_timeout: None,
            embed_timeout: None,
            store_timeout: None,
        }
    }
}

struct SourceStages {
    discoverer: FileDiscoverer,
    fetcher: ContentFetcher,
}

pub struct CodebaseIndexer<P: EmbeddingProvider> {
    store: Arc<dyn VectorStore>,
    embedder: EmbeddingGenerator<P>,
    upserter: VectorUpserter,
    source: Option<SourceStages>,
    config: IndexerConfig,
}

impl<P: EmbeddingProvider> CodebaseIndexer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, store: Arc<dyn VectorStore>, config: IndexerConfig) -> Self {
        let embedder = EmbeddingGenerator::new(
            provider,
            GroupScheduler::new(config.embed_concurrency)
                .with_mode(config.backpressure)
                .with_call_timeout(config.embed_timeout),
        );
        let upserter = VectorUpserter::new(
            Arc::clone(&store),
            config.collection.clone(),
            config.upsert_batch_size,
        )
        .with_call_timeout(config.store_timeout);
        Self {
            store,
            embedder,
            upserter,
            source: None,
            config,
        }
    }

    /// Enables [`index_repository`](Self::index_repository).
    #[must_use]
    pub fn with_source(mut self, host: Arc<dyn SourceHost>, policy: ExclusionPolicy) -> Self {
        let discoverer = FileDiscoverer::new(Arc::clone(&host), policy)
            .with_call_timeout(self.config.source_timeout);
        let fetcher = ContentFetcher::new(
            host,
            GroupScheduler::new(self.config.fetch_batch_size)
                .with_mode(self.config.backpressure)
                .with_call_timeout(self.config.source_timeout),
        );
        self.source = Some(SourceStages {
            discoverer,
            fetcher,
        });
        self
    }

    /// Discovers and fetches every included file of `repo_key`, then indexes
    /// them. Fetch failures are reported, not fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if no source host is configured, discovery fails, or
    /// the upsert stage fails.
    pub async fn index_repository(&self, repo_key: &str) -> Result<IndexReport> {
        let start = Instant::now();
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| IndexError::Config("no source host configured".into()))?;

        let paths = source.discoverer.discover(repo_key, "").await?;
        let outcome = source.fetcher.fetch(repo_key, &paths).await;

        let mut report = self.run(repo_key, outcome.files, outcome.failed).await?;
        report.files_received = paths.len();
        report.duration_ms = elapsed_ms(start);
        Ok(report)
    }

    /// Chunks, embeds and stores already-fetched files.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store fails; per-chunk embedding
    /// failures are recorded in the report instead.
    pub async fn index_codebase(&self, repo_key: &str, files: Vec<FileRecord>) -> Result<IndexReport> {
        let start = Instant::now();
        let mut report = self.run(repo_key, files, Vec::new()).await?;
        report.duration_ms = elapsed_ms(start);
        Ok(report)
    }

    async fn run(
        &self,
        repo_key: &str,
        files: Vec<FileRecord>,
        prior_failures: Vec<ItemFailure>,
    ) -> Result<IndexReport> {
        let mut report = IndexReport {
            files_received: files.len(),
            files_failed: prior_failures.len(),
            failures: prior_failures,
            ..IndexReport::default()
        };
        tracing::info!(repo = repo_key, files = files.len(), "indexing started");

        let mut chunks: Vec<Chunk> = Vec::new();
        for file in &files {
            let chunked = chunk_file(file, &self.config.chunker);
            report.chunks_truncated += chunked.truncated;
            chunks.extend(chunked.chunks);
        }
        drop(files);
        report.chunks_created = chunks.len();

        let produced: HashSet<String> = chunks
            .iter()
            .map(|c| chunk_id(repo_key, &c.source_path, c.part_index))
            .collect();

        let existing = if self.config.skip_unchanged || self.config.prune_stale {
            Some(self.existing_hashes(repo_key).await?)
        } else {
            None
        };

        if self.config.skip_unchanged
            && let Some(existing) = &existing
        {
            let before = chunks.len();
            chunks.retain(|c| {
                let id = chunk_id(repo_key, &c.source_path, c.part_index);
                existing.get(&id).map(String::as_str) != Some(content_hash(&c.text).as_str())
            });
            report.chunks_unchanged = before - chunks.len();
            tracing::debug!(repo = repo_key, unchanged = report.chunks_unchanged, "skipping unchanged chunks");
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(texts).await;

        let mut embedded = Vec::with_capacity(chunks.len());
        for (chunk, result) in chunks.into_iter().zip(vectors) {
            let vector = match result {
                Ok(v) => {
                    report.chunks_embedded += 1;
                    Some(v)
                }
                Err(e) => {
                    report.failures.push(ItemFailure {
                        key: chunk_id(repo_key, &chunk.source_path, chunk.part_index),
                        stage: FailureStage::Embed,
                        reason: e.to_string(),
                    });
                    None
                }
            };
            embedded.push(EmbeddingResult { chunk, vector });
        }

        let summary = self.upserter.upsert(repo_key, embedded).await?;
        report.vectors_upserted = summary.vectors;
        report.upsert_batches = summary.batches;

        if self.config.prune_stale
            && let Some(existing) = existing
        {
            if report.failures.is_empty() {
                report.vectors_pruned = self.prune(repo_key, existing, &produced).await?;
            } else {
                tracing::warn!(
                    repo = repo_key,
                    failures = report.failures.len(),
                    "skipping stale pruning because some items failed"
                );
            }
        }

        tracing::info!(
            repo = repo_key,
            chunks = report.chunks_created,
            embedded = report.chunks_embedded,
            upserted = report.vectors_upserted,
            failed = report.failures.len(),
            "indexing complete"
        );
        Ok(report)
    }

    /// `chunk_id` → `content_hash` for every vector stored for `repo_key`.
    async fn existing_hashes(&self, repo_key: &str) -> Result<HashMap<String, String>> {
        let collection = &self.config.collection;
        let exists = bounded(self.config.store_timeout, async {
            self.store
                .collection_exists(collection)
                .await
                .map_err(IndexError::Store)
        })
        .await?;
        if !exists {
            return Ok(HashMap::new());
        }

        let scrolled = bounded(self.config.store_timeout, async {
            self.store
                .scroll_all(
                    collection,
                    CHUNK_ID_FIELD,
                    Some(VectorFilter::text_equals(REPO_KEY_FIELD, repo_key)),
                )
                .await
                .map_err(IndexError::Store)
        })
        .await?;

        Ok(scrolled
            .into_iter()
            .map(|(id, mut fields)| {
                let hash = fields.remove(CONTENT_HASH_FIELD).unwrap_or_default();
                (id, hash)
            })
            .collect())
    }

    async fn prune(
        &self,
        repo_key: &str,
        existing: HashMap<String, String>,
        produced: &HashSet<String>,
    ) -> Result<usize> {
        let mut stale: Vec<String> = existing
            .into_keys()
            .filter(|id| !produced.contains(id))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        stale.sort();
        let count = stale.len();
        bounded(self.config.store_timeout, async {
            self.store
                .delete_by_ids(&self.config.collection, stale)
                .await
                .map_err(IndexError::Store)
        })
        .await?;
        tracing::info!(repo = repo_key, pruned = count, "pruned stale vectors");
        Ok(count)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
