//! Content source interfaces.
//!
//! A source only delivers raw document text and listings. Parsing and
//! validation happen in [`crate::content::ContentLoader`], so the typed
//! operations behave identically over every backend.

pub mod factory;
pub mod filesystem;
pub mod remote;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::{ItemMetadata, RawDocument};
use crate::error::Result;

pub use factory::{create_source, reset_shared_source, shared_source};
pub use filesystem::FilesystemSource;
pub use remote::RemoteSource;

/// Backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Filesystem,
    Github,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Filesystem => write!(f, "filesystem"),
            SourceKind::Github => write!(f, "github"),
        }
    }
}

/// A backend delivering raw content documents
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Backend kind
    fn kind(&self) -> SourceKind;

    /// Fetch one document; `Ok(None)` when it doesn't exist.
    ///
    /// An empty slug addresses the directory's index document.
    async fn fetch_raw(&self, path: &str, slug: &str) -> Result<Option<RawDocument>>;

    /// List the content documents under a path, sorted by name
    async fn fetch_metadata(&self, path: &str) -> Result<Vec<ItemMetadata>>;

    /// Fetch every content document under a path, in listing order
    async fn fetch_raw_many(&self, path: &str) -> Result<Vec<RawDocument>>;
}

/// File name for a slug (`index.md` for the empty slug)
pub(crate) fn file_name(slug: &str) -> String {
    if slug.is_empty() {
        "index.md".to_string()
    } else {
        format!("{slug}.md")
    }
}

/// Reject slugs that could escape the content directory
pub(crate) fn is_safe_slug(slug: &str) -> bool {
    !slug.contains("..") && !slug.contains('/') && !slug.contains('\\')
}

/// Join path segments with `/`, ignoring empty ones
pub(crate) fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("hello"), "hello.md");
        assert_eq!(file_name(""), "index.md");
    }

    #[test]
    fn test_safe_slug() {
        assert!(is_safe_slug("my-story"));
        assert!(is_safe_slug(""));
        assert!(!is_safe_slug("../secrets"));
        assert!(!is_safe_slug("nested/slug"));
        assert!(!is_safe_slug("win\\path"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(&["stories/en/", "/a.md"]), "stories/en/a.md");
        assert_eq!(join_path(&["", "pages", ""]), "pages");
    }
}
