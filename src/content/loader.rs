//! Typed fetch operations over any content source.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::processor::{process, ProcessOptions, ProcessingResult};
use super::render::TransformConfig;
use super::{ContentRecord, ContentResult, ItemMetadata};
use crate::error::ContentError;
use crate::schema::Frontmatter;
use crate::source::ContentSource;

/// Pairs a source with the processor.
///
/// Single fetches report every outcome as a [`ContentResult`]; listings are
/// fail-fast: one unusable document aborts the whole listing with a source
/// error, while ignored documents are dropped silently.
#[derive(Clone)]
pub struct ContentLoader {
    source: Arc<dyn ContentSource>,
    transform: TransformConfig,
    lint_unknown_fields: bool,
}

impl ContentLoader {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            transform: TransformConfig::default(),
            lint_unknown_fields: false,
        }
    }

    pub fn with_transform(mut self, transform: TransformConfig) -> Self {
        self.transform = transform;
        self
    }

    /// Enable the unknown-field lint pass
    pub fn with_lint(mut self, enabled: bool) -> Self {
        self.lint_unknown_fields = enabled;
        self
    }

    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }

    fn options(&self) -> ProcessOptions {
        ProcessOptions::batch().with_lint(self.lint_unknown_fields)
    }

    /// Fetch and process one document
    pub async fn fetch_single<T: Frontmatter>(
        &self,
        path: &str,
        slug: &str,
    ) -> ContentResult<ContentRecord<T>> {
        let document = match self.source.fetch_raw(path, slug).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!("{} '{}' not found under '{}'", T::CONTENT_TYPE, slug, path);
                return ContentResult::NotFound;
            }
            Err(e) => {
                warn!("Failed to fetch {} '{}': {}", T::CONTENT_TYPE, slug, e);
                return ContentResult::SourceError(e);
            }
        };

        match process::<T>(&document.text, &document.name, &self.transform, &self.options()) {
            ProcessingResult::Processed(record) => ContentResult::Success(record),
            ProcessingResult::Ignored => ContentResult::Ignored,
            ProcessingResult::Failed(ContentError::Validation { issues, .. }) => {
                warn!(
                    "{} '{}' failed validation: {}",
                    T::CONTENT_TYPE,
                    slug,
                    issues.join("; ")
                );
                ContentResult::ValidationError(issues)
            }
            ProcessingResult::Failed(e) => ContentResult::SourceError(e),
        }
    }

    /// Fetch and process every document under a path
    pub async fn fetch_multiple<T: Frontmatter>(
        &self,
        path: &str,
    ) -> ContentResult<Vec<ContentRecord<T>>> {
        let documents = match self.source.fetch_raw_many(path).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!("Failed to list {} under '{}': {}", T::CONTENT_TYPE, path, e);
                return ContentResult::SourceError(e);
            }
        };

        let options = self.options();
        let mut records = Vec::with_capacity(documents.len());
        for document in &documents {
            match process::<T>(&document.text, &document.name, &self.transform, &options) {
                ProcessingResult::Processed(record) => records.push(record),
                ProcessingResult::Ignored => {
                    debug!("Dropped ignored document {}", document.path);
                }
                ProcessingResult::Failed(e) => {
                    error!("Aborting {} listing at {}: {}", T::CONTENT_TYPE, document.path, e);
                    return ContentResult::SourceError(ContentError::fetch(
                        self.source.kind().to_string(),
                        document.path.clone(),
                        500,
                        e,
                    ));
                }
            }
        }

        ContentResult::Success(records)
    }

    /// List documents under a path without fetching bodies
    pub async fn fetch_metadata(&self, path: &str) -> ContentResult<Vec<ItemMetadata>> {
        match self.source.fetch_metadata(path).await {
            Ok(items) => ContentResult::Success(items),
            Err(e) => {
                warn!("Failed to list '{}': {}", path, e);
                ContentResult::SourceError(e)
            }
        }
    }
}
