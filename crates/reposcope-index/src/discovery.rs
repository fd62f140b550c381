//! Recursive enumeration of indexable repository paths.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, try_join_all};
use reposcope_source::{ContentEntry, EntryKind, SourceHost};

use crate::error::{IndexError, Result};
use crate::policy::ExclusionPolicy;
use crate::pool::bounded;

pub struct FileDiscoverer {
    host: Arc<dyn SourceHost>,
    policy: ExclusionPolicy,
    call_timeout: Option<Duration>,
}

impl FileDiscoverer {
    #[must_use]
    pub fn new(host: Arc<dyn SourceHost>, policy: ExclusionPolicy) -> Self {
        Self {
            host,
            policy,
            call_timeout: None,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Lists every included file under `start_path` (empty for the root).
    /// Sibling directories are walked concurrently. The result is sorted and
    /// free of duplicates.
    ///
    /// # Errors
    ///
    /// Any failed listing fails the whole discovery with
    /// [`IndexError::Discovery`]; no partial tree is returned.
    pub async fn discover(&self, repo_key: &str, start_path: &str) -> Result<Vec<String>> {
        let start = start_path.trim_matches('/');
        let mut paths = self.walk(repo_key, start.to_owned(), true).await?;
        paths.sort();
        paths.dedup();
        tracing::info!(repo = repo_key, start = start, total = paths.len(), "discovery complete");
        Ok(paths)
    }

    fn walk<'a>(
        &'a self,
        repo_key: &'a str,
        path: String,
        is_start: bool,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            let entry = bounded(self.call_timeout, async {
                self.host
                    .get_content(repo_key, &path)
                    .await
                    .map_err(|source| IndexError::Discovery {
                        path: path.clone(),
                        source,
                    })
            })
            .await?;

            match entry {
                ContentEntry::File { path: file, .. } => {
                    if self.policy.includes_file(&file) {
                        Ok(vec![file])
                    } else {
                        tracing::debug!(path = %file, "skipping file");
                        Ok(Vec::new())
                    }
                }
                ContentEntry::Dir(_) if is_start && !path.is_empty() && self.policy.is_excluded_dir(&path) => {
                    tracing::debug!(path = %path, "start path is an excluded directory");
                    Ok(Vec::new())
                }
                ContentEntry::Dir(entries) => {
                    let mut files = Vec::new();
                    let mut subdirs = Vec::new();
                    for e in entries {
                        match e.kind {
                            EntryKind::Dir if self.policy.is_excluded_dir(&e.path) => {
                                tracing::debug!(path = %e.path, "skipping directory");
                            }
                            EntryKind::Dir => subdirs.push(self.walk(repo_key, e.path, false)),
                            EntryKind::File if self.policy.includes_file(&e.path) => {
                                files.push(e.path);
                            }
                            EntryKind::File => {
                                tracing::debug!(path = %e.path, "skipping file");
                            }
                        }
                    }
                    for nested in try_join_all(subdirs).await? {
                        files.extend(nested);
                    }
                    Ok(files)
                }
            }
        })
    }
}
