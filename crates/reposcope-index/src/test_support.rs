use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use reposcope_source::host::BoxFuture;
use reposcope_source::{ContentEntry, DirEntry, FileBody, SourceError, SourceHost};

/// In-memory repository tree served through [`SourceHost`].
#[derive(Default)]
pub(crate) struct TreeHost {
    entries: HashMap<String, ContentEntry>,
    failing: HashSet<String>,
    pub(crate) calls: AtomicUsize,
}

impl TreeHost {
    /// Builds directory listings from a flat list of `(path, content)` files.
    pub(crate) fn from_files(files: &[(&str, &str)]) -> Self {
        let mut dirs: HashMap<String, Vec<DirEntry>> = HashMap::new();
        let mut entries = HashMap::new();
        for (path, content) in files {
            entries.insert(
                (*path).to_owned(),
                ContentEntry::File {
                    path: (*path).to_owned(),
                    body: Some(FileBody::utf8(*content)),
                },
            );
            let mut child = (*path).to_owned();
            let mut kind_is_dir = false;
            loop {
                let parent = child.rsplit_once('/').map_or("", |(p, _)| p).to_owned();
                let entry = if kind_is_dir {
                    DirEntry::dir(child.clone())
                } else {
                    DirEntry::file(child.clone())
                };
                let list = dirs.entry(parent.clone()).or_default();
                if !list.contains(&entry) {
                    list.push(entry);
                }
                if parent.is_empty() {
                    break;
                }
                child = parent;
                kind_is_dir = true;
            }
        }
        for (dir, mut list) in dirs {
            list.sort_by(|a, b| a.path.cmp(&b.path));
            entries.insert(dir, ContentEntry::Dir(list));
        }
        Self {
            entries,
            ..Self::default()
        }
    }

    pub(crate) fn with_entry(mut self, path: &str, entry: ContentEntry) -> Self {
        self.entries.insert(path.to_owned(), entry);
        self
    }

    pub(crate) fn failing_on(mut self, path: &str) -> Self {
        self.failing.insert(path.to_owned());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceHost for TreeHost {
    fn get_content(
        &self,
        repo_key: &str,
        path: &str,
    ) -> BoxFuture<'_, Result<ContentEntry, SourceError>> {
        let key = format!("{repo_key}:{path}");
        let path = path.to_owned();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&path) {
                return Err(SourceError::Status {
                    status: 500,
                    path,
                });
            }
            self.entries
                .get(&path)
                .cloned()
                .ok_or(SourceError::NotFound(key))
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "tree"
    }
}
