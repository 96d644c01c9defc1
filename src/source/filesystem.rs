//! Local filesystem source.
//!
//! Layout: `{base}/{path}/{slug}.md`, with `index.md` for the empty slug.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{file_name, is_safe_slug, join_path, ContentSource, SourceKind};
use crate::content::{normalize_slug, ItemMetadata, RawDocument};
use crate::error::{ContentError, FsOperation, Result};

/// Reads content documents from a local directory tree
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    base_path: PathBuf,
}

impl FilesystemSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a source-relative directory; `None` if it climbs out of the base
    fn resolve_dir(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.base_path.join(relative))
    }
}

#[async_trait]
impl ContentSource for FilesystemSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Filesystem
    }

    async fn fetch_raw(&self, path: &str, slug: &str) -> Result<Option<RawDocument>> {
        if !is_safe_slug(slug) {
            debug!("Rejected unsafe slug '{}'", slug);
            return Ok(None);
        }
        let Some(dir) = self.resolve_dir(path) else {
            return Ok(None);
        };

        let name = file_name(slug);
        let full_path = dir.join(&name);

        match tokio::fs::read_to_string(&full_path).await {
            Ok(text) => Ok(Some(RawDocument {
                path: join_path(&[path, name.as_str()]),
                name,
                text,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ContentError::file_system(FsOperation::Read, full_path, e)),
        }
    }

    async fn fetch_metadata(&self, path: &str) -> Result<Vec<ItemMetadata>> {
        let dir = self.resolve_dir(path).ok_or_else(|| {
            ContentError::file_system(
                FsOperation::List,
                path,
                "path escapes the content directory",
            )
        })?;

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ContentError::file_system(FsOperation::List, &dir, e))?;

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ContentError::file_system(FsOperation::List, &dir, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".md") {
                continue;
            }

            let metadata = entry
                .metadata()
                .await
                .map_err(|e| ContentError::file_system(FsOperation::Read, entry.path(), e))?;
            if !metadata.is_file() {
                continue;
            }

            items.push(ItemMetadata {
                path: join_path(&[path, name.as_str()]),
                slug: normalize_slug(&name),
                size: metadata.len(),
                sha: None,
                name,
            });
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn fetch_raw_many(&self, path: &str) -> Result<Vec<RawDocument>> {
        let items = self.fetch_metadata(path).await?;
        let Some(dir) = self.resolve_dir(path) else {
            return Ok(Vec::new());
        };

        let mut documents = Vec::with_capacity(items.len());
        for item in items {
            let full_path = dir.join(&item.name);
            let text = tokio::fs::read_to_string(&full_path)
                .await
                .map_err(|e| ContentError::file_system(FsOperation::Read, &full_path, e))?;
            documents.push(RawDocument {
                name: item.name,
                path: item.path,
                text,
            });
        }

        debug!("Read {} documents from {}", documents.len(), dir.display());
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_dir_rejects_parent_components() {
        let source = FilesystemSource::new("/content");
        assert_eq!(
            source.resolve_dir("stories/en"),
            Some(PathBuf::from("/content/stories/en"))
        );
        assert_eq!(source.resolve_dir("/pages/"), Some(PathBuf::from("/content/pages")));
        assert!(source.resolve_dir("../etc").is_none());
    }

    #[tokio::test]
    async fn test_unsafe_slug_is_not_found() {
        let source = FilesystemSource::new("/nonexistent");
        assert!(source.fetch_raw("stories/en", "../x").await.unwrap().is_none());
    }
}
