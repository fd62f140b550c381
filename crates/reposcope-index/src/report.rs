use std::fmt;

use serde::Serialize;

/// Pipeline stage at which an isolated, non-fatal failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fetch,
    Embed,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Embed => f.write_str("embed"),
        }
    }
}

/// One item that failed without aborting its batch. `key` is a file path for
/// fetch failures and a chunk id for embedding failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub key: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// Summary of an indexing run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexReport {
    pub files_received: usize,
    pub files_failed: usize,
    pub chunks_created: usize,
    /// Chunks dropped by the per-file chunk cap.
    pub chunks_truncated: usize,
    pub chunks_embedded: usize,
    pub chunks_unchanged: usize,
    pub vectors_upserted: usize,
    pub upsert_batches: usize,
    pub vectors_pruned: usize,
    pub failures: Vec<ItemFailure>,
    pub duration_ms: u64,
}

impl IndexReport {
    #[must_use]
    pub fn embed_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Embed)
            .count()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "files: {} received, {} failed",
            self.files_received, self.files_failed
        )?;
        writeln!(
            f,
            "chunks: {} created, {} truncated, {} embedded, {} unchanged",
            self.chunks_created, self.chunks_truncated, self.chunks_embedded, self.chunks_unchanged
        )?;
        writeln!(
            f,
            "vectors: {} upserted in {} batches, {} pruned",
            self.vectors_upserted, self.upsert_batches, self.vectors_pruned
        )?;
        for failure in &self.failures {
            writeln!(f, "  {} {}: {}", failure.stage, failure.key, failure.reason)?;
        }
        write!(f, "took {}ms", self.duration_ms)
    }
}
