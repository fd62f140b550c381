use std::future::Future;
use std::pin::Pin;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::SourceError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One child of a directory listing. `path` is relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl DirEntry {
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    #[must_use]
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Base64,
    Utf8,
}

/// Raw file payload as delivered by a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBody {
    pub encoding: ContentEncoding,
    pub data: String,
}

impl FileBody {
    #[must_use]
    pub fn base64(data: impl Into<String>) -> Self {
        Self {
            encoding: ContentEncoding::Base64,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn utf8(data: impl Into<String>) -> Self {
        Self {
            encoding: ContentEncoding::Utf8,
            data: data.into(),
        }
    }

    /// Decodes the payload to text. Invalid UTF-8 sequences are replaced
    /// rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Decode`] if base64 data is malformed.
    pub fn decode(&self, path: &str) -> Result<String, SourceError> {
        match self.encoding {
            ContentEncoding::Utf8 => Ok(self.data.clone()),
            ContentEncoding::Base64 => {
                // GitHub wraps base64 at 60 columns.
                let compact: String = self
                    .data
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let bytes = STANDARD.decode(compact).map_err(|e| SourceError::Decode {
                    path: path.to_owned(),
                    reason: e.to_string(),
                })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

/// Result of asking a host for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEntry {
    /// `body` is `None` when the host reports the path but serves no inline
    /// content (symlinks, submodules, oversized blobs).
    File {
        path: String,
        body: Option<FileBody>,
    },
    Dir(Vec<DirEntry>),
}

/// Source-control content API.
pub trait SourceHost: Send + Sync {
    /// Lists a directory or returns a file at `path` (empty for the root).
    fn get_content(
        &self,
        repo_key: &str,
        path: &str,
    ) -> BoxFuture<'_, Result<ContentEntry, SourceError>>;

    fn name(&self) -> &str;
}
