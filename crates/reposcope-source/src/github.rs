use std::fmt;

use serde::Deserialize;

use crate::error::SourceError;
use crate::host::{BoxFuture, ContentEntry, DirEntry, FileBody, SourceHost};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// GitHub contents-API client. `repo_key` is `owner/name`.
pub struct GitHubHost {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl fmt::Debug for GitHubHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubHost")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Dir(Vec<RawEntry>),
    File(RawEntry),
}

#[derive(Deserialize)]
struct RawEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl GitHubHost {
    /// The client carries the request timeout and user agent; GitHub rejects
    /// requests without a `User-Agent`.
    #[must_use]
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            api_base: GITHUB_API_BASE.to_owned(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Override the API root, e.g. for GitHub Enterprise or tests.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        self.api_base = url;
        self
    }

    /// Every repository path segment is percent-encoded, so names holding
    /// `#`, `?` or `%` reach the API intact.
    fn contents_url(&self, repo_key: &str, path: &str) -> Result<reqwest::Url, SourceError> {
        let (owner, name) = split_repo_key(repo_key)?;
        let invalid_base = || SourceError::InvalidBaseUrl(self.api_base.clone());
        let mut url = reqwest::Url::parse(&self.api_base).map_err(|_| invalid_base())?;
        url.path_segments_mut()
            .map_err(|()| invalid_base())?
            .pop_if_empty()
            .extend(["repos", owner, name, "contents"])
            .extend(path.trim_matches('/').split('/'));
        Ok(url)
    }

    async fn fetch(&self, repo_key: &str, path: &str) -> Result<ContentEntry, SourceError> {
        let url = self.contents_url(repo_key, path)?;
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("{repo_key}:{path}")));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                path: path.to_owned(),
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: ContentsResponse = serde_json::from_slice(&bytes)?;
        Ok(into_entry(parsed))
    }
}

fn split_repo_key(repo_key: &str) -> Result<(&str, &str), SourceError> {
    match repo_key.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(SourceError::InvalidRepoKey(repo_key.to_owned())),
    }
}

fn into_entry(resp: ContentsResponse) -> ContentEntry {
    match resp {
        ContentsResponse::Dir(entries) => ContentEntry::Dir(
            entries
                .into_iter()
                .filter_map(|e| match e.kind.as_str() {
                    "file" => Some(DirEntry::file(e.path)),
                    "dir" => Some(DirEntry::dir(e.path)),
                    other => {
                        tracing::debug!(path = %e.path, kind = other, "ignoring entry");
                        None
                    }
                })
                .collect(),
        ),
        ContentsResponse::File(e) => {
            let body = match (e.kind.as_str(), e.encoding.as_deref(), e.content) {
                ("file", Some("base64"), Some(content)) => Some(FileBody::base64(content)),
                _ => None,
            };
            ContentEntry::File { path: e.path, body }
        }
    }
}

impl SourceHost for GitHubHost {
    fn get_content(
        &self,
        repo_key: &str,
        path: &str,
    ) -> BoxFuture<'_, Result<ContentEntry, SourceError>> {
        let repo_key = repo_key.to_owned();
        let path = path.to_owned();
        Box::pin(async move { self.fetch(&repo_key, &path).await })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "github"
    }
}
