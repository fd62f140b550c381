//! Source-control content access: a `SourceHost` trait with GitHub
//! contents-API and local filesystem implementations.

pub mod error;
pub mod github;
pub mod host;
pub mod local;

pub use error::SourceError;
pub use github::GitHubHost;
pub use host::{ContentEncoding, ContentEntry, DirEntry, EntryKind, FileBody, SourceHost};
pub use local::LocalHost;
