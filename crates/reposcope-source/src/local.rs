use std::path::{Component, Path, PathBuf};

use crate::error::SourceError;
use crate::host::{BoxFuture, ContentEntry, DirEntry, FileBody, SourceHost};

/// Serves repositories from a local directory. A repository key resolves to
/// `root/<repo_key>`; the key `.` resolves to `root` itself.
#[derive(Debug, Clone)]
pub struct LocalHost {
    root: PathBuf,
}

impl LocalHost {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, repo_key: &str, path: &str) -> Result<PathBuf, SourceError> {
        let repo = Path::new(repo_key);
        if !is_contained(repo) {
            return Err(SourceError::InvalidRepoKey(repo_key.to_owned()));
        }
        let rel = Path::new(path.trim_matches('/'));
        if !is_contained(rel) {
            return Err(SourceError::InvalidPath(path.to_owned()));
        }
        Ok(self.root.join(repo).join(rel))
    }

    async fn read(&self, repo_key: &str, path: &str) -> Result<ContentEntry, SourceError> {
        let full = self.resolve(repo_key, path)?;
        let meta = match tokio::fs::symlink_metadata(&full).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(format!("{repo_key}:{path}")));
            }
            Err(e) => return Err(e.into()),
        };
        let path = path.trim_matches('/');

        if meta.is_dir() {
            let mut entries = Vec::new();
            let mut dir = tokio::fs::read_dir(&full).await?;
            while let Some(child) = dir.next_entry().await? {
                let file_type = child.file_type().await?;
                let name = child.file_name().to_string_lossy().into_owned();
                let child_path = if path.is_empty() {
                    name
                } else {
                    format!("{path}/{name}")
                };
                if file_type.is_dir() {
                    entries.push(DirEntry::dir(child_path));
                } else if file_type.is_file() {
                    entries.push(DirEntry::file(child_path));
                } else {
                    tracing::debug!(path = %child_path, "ignoring non-regular entry");
                }
            }
            entries.sort_by(|a, b| a.path.cmp(&b.path));
            return Ok(ContentEntry::Dir(entries));
        }

        if !meta.is_file() {
            return Ok(ContentEntry::File {
                path: path.to_owned(),
                body: None,
            });
        }

        let bytes = tokio::fs::read(&full).await?;
        Ok(ContentEntry::File {
            path: path.to_owned(),
            body: Some(FileBody::utf8(String::from_utf8_lossy(&bytes).into_owned())),
        })
    }
}

fn is_contained(p: &Path) -> bool {
    p.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl SourceHost for LocalHost {
    fn get_content(
        &self,
        repo_key: &str,
        path: &str,
    ) -> BoxFuture<'_, Result<ContentEntry, SourceError>> {
        let repo_key = repo_key.to_owned();
        let path = path.to_owned();
        Box::pin(async move { self.read(&repo_key, &path).await })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("acme").join("api");
        std::fs::create_dir_all(repo.join("src")).unwrap();
        std::fs::write(repo.join("README.md"), "# api").unwrap();
        std::fs::write(repo.join("src").join("lib.rs"), "pub fn f() {}").unwrap();
        dir
    }

    #[tokio::test]
    async fn lists_root_sorted() {
        let dir = fixture();
        let host = LocalHost::new(dir.path());
        let entry = host.get_content("acme/api", "").await.unwrap();
        assert_eq!(
            entry,
            ContentEntry::Dir(vec![DirEntry::file("README.md"), DirEntry::dir("src")])
        );
    }

    #[tokio::test]
    async fn lists_nested_with_relative_paths() {
        let dir = fixture();
        let host = LocalHost::new(dir.path());
        let entry = host.get_content("acme/api", "src").await.unwrap();
        assert_eq!(entry, ContentEntry::Dir(vec![DirEntry::file("src/lib.rs")]));
    }

    #[tokio::test]
    async fn reads_file_as_utf8() {
        let dir = fixture();
        let host = LocalHost::new(dir.path());
        let entry = host.get_content("acme/api", "src/lib.rs").await.unwrap();
        let ContentEntry::File { path, body } = entry else {
            panic!("expected file");
        };
        assert_eq!(path, "src/lib.rs");
        assert_eq!(body.unwrap().decode(&path).unwrap(), "pub fn f() {}");
    }

    #[tokio::test]
    async fn dot_key_serves_root() {
        let dir = fixture();
        let host = LocalHost::new(dir.path().join("acme").join("api"));
        let entry = host.get_content(".", "README.md").await.unwrap();
        assert!(matches!(entry, ContentEntry::File { body: Some(_), .. }));
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let dir = fixture();
        let host = LocalHost::new(dir.path());
        let err = host.get_content("acme/api", "nope.rs").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_parent_traversal() {
        let dir = fixture();
        let host = LocalHost::new(dir.path());
        assert!(matches!(
            host.get_content("../etc", "").await,
            Err(SourceError::InvalidRepoKey(_))
        ));
        assert!(matches!(
            host.get_content("acme/api", "../../secret").await,
            Err(SourceError::InvalidPath(_))
        ));
    }

    #[test]
    fn name_is_local() {
        assert_eq!(LocalHost::new("/tmp").name(), "local");
    }
}
