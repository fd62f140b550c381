//! Bounded-concurrency content retrieval with per-file failure isolation.

use std::sync::Arc;

use reposcope_source::{ContentEntry, SourceHost};

use crate::error::{IndexError, Result};
use crate::pool::GroupScheduler;
use crate::report::{FailureStage, ItemFailure};

/// One fetched text file. Lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
}

impl FileRecord {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Files fetched in input path order, plus the paths that failed.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub files: Vec<FileRecord>,
    pub failed: Vec<ItemFailure>,
}

pub struct ContentFetcher {
    host: Arc<dyn SourceHost>,
    scheduler: GroupScheduler,
}

impl ContentFetcher {
    /// `scheduler` width is the fetch batch size.
    #[must_use]
    pub fn new(host: Arc<dyn SourceHost>, scheduler: GroupScheduler) -> Self {
        Self { host, scheduler }
    }

    /// Never fails as a whole; each path either yields a record or a failure.
    pub async fn fetch(&self, repo_key: &str, paths: &[String]) -> FetchOutcome {
        let total = paths.len();
        tracing::info!(repo = repo_key, total, batch = self.scheduler.width(), "fetching files");

        let results = self
            .scheduler
            .run(paths.to_vec(), |path| self.fetch_one(repo_key, path))
            .await;

        let mut outcome = FetchOutcome::default();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(record) => outcome.files.push(record),
                Err(e) => {
                    tracing::warn!(repo = repo_key, path = %path, "fetch failed: {e}");
                    outcome.failed.push(ItemFailure {
                        key: path.clone(),
                        stage: FailureStage::Fetch,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            repo = repo_key,
            fetched = outcome.files.len(),
            failed = outcome.failed.len(),
            "fetch complete"
        );
        outcome
    }

    async fn fetch_one(&self, repo_key: &str, path: String) -> Result<FileRecord> {
        let fail = |reason: String| IndexError::Fetch {
            path: path.clone(),
            reason,
        };

        let entry = self
            .host
            .get_content(repo_key, &path)
            .await
            .map_err(|e| fail(e.to_string()))?;

        match entry {
            ContentEntry::File {
                body: Some(body), ..
            } => {
                let content = body.decode(&path).map_err(|e| fail(e.to_string()))?;
                if content.is_empty() {
                    return Err(fail("empty content".into()));
                }
                Ok(FileRecord::new(path.clone(), content))
            }
            ContentEntry::File { body: None, .. } => Err(fail("no inline content".into())),
            ContentEntry::Dir(_) => Err(fail("not a regular file".into())),
        }
    }
}
