//! Content domain types.
//!
//! A [`ContentRecord`] is the unit handed to the rendering layer; a
//! [`ContentResult`] is what every fetch returns, so expected outcomes
//! (absent, ignored, invalid) never surface as errors.

pub mod loader;
pub mod processor;
pub mod render;
pub mod service;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

pub use loader::ContentLoader;
pub use processor::{process, ProcessOptions, ProcessingResult};
pub use render::{RenderNode, RenderTree, TransformConfig};
pub use service::{CachedContent, ContentService};

/// File suffixes recognised as content documents
pub const CONTENT_EXTENSIONS: &[&str] = &[".markdoc", ".mdoc", ".md"];

/// Content kinds served by the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Story,
    Blogpost,
    Page,
    Offer,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Story,
        ContentType::Blogpost,
        ContentType::Page,
        ContentType::Offer,
    ];

    /// Top-level storage directory
    pub fn directory(&self) -> &'static str {
        match self {
            ContentType::Story => "stories",
            ContentType::Blogpost => "blog",
            ContentType::Page => "pages",
            ContentType::Offer => "offers",
        }
    }

    /// Whether items live under a per-language directory
    pub fn is_localized(&self) -> bool {
        !matches!(self, ContentType::Page)
    }

    /// Storage path for a language-partitioned type (`{dir}/{lang}`).
    ///
    /// Pages have no convention; callers supply their raw path.
    pub fn storage_path(&self, lang: &str) -> Option<String> {
        self.is_localized()
            .then(|| format!("{}/{}", self.directory(), lang))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Story => write!(f, "story"),
            ContentType::Blogpost => write!(f, "blogpost"),
            ContentType::Page => write!(f, "page"),
            ContentType::Offer => write!(f, "offer"),
        }
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "story" | "stories" => Ok(ContentType::Story),
            "blogpost" | "blog" | "post" => Ok(ContentType::Blogpost),
            "page" | "pages" => Ok(ContentType::Page),
            "offer" | "offers" | "job" => Ok(ContentType::Offer),
            _ => Err(ContentError::config(format!("Unknown content type: {s}"))),
        }
    }
}

/// A fully processed content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord<T> {
    pub slug: String,
    pub frontmatter: T,
    pub content: RenderTree,
    pub raw_text: String,
}

/// Unprocessed document text as delivered by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// File name without directory (e.g. `my-story.md`)
    pub name: String,
    /// Source-relative path
    pub path: String,
    pub text: String,
}

impl RawDocument {
    pub fn slug(&self) -> String {
        normalize_slug(&self.name)
    }
}

/// Listing entry describing an item without its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub name: String,
    pub path: String,
    pub slug: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Outcome state of a content fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    Success,
    NotFound,
    ValidationError,
    SourceError,
    Ignored,
}

impl ContentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentState::Success => "success",
            ContentState::NotFound => "not_found",
            ContentState::ValidationError => "validation_error",
            ContentState::SourceError => "source_error",
            ContentState::Ignored => "ignored",
        }
    }
}

impl fmt::Display for ContentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a content fetch.
///
/// Absent, ignored and invalid items are data, not errors; only
/// `SourceError` carries a [`ContentError`].
#[derive(Debug, Clone)]
pub enum ContentResult<T> {
    Success(T),
    NotFound,
    Ignored,
    ValidationError(Vec<String>),
    SourceError(ContentError),
}

impl<T> ContentResult<T> {
    /// HTTP-style status
    pub fn status_code(&self) -> u16 {
        match self {
            ContentResult::Success(_) => 200,
            ContentResult::NotFound | ContentResult::Ignored => 404,
            ContentResult::ValidationError(_) => 422,
            ContentResult::SourceError(err) => err.http_status(),
        }
    }

    pub fn state(&self) -> ContentState {
        match self {
            ContentResult::Success(_) => ContentState::Success,
            ContentResult::NotFound => ContentState::NotFound,
            ContentResult::Ignored => ContentState::Ignored,
            ContentResult::ValidationError(_) => ContentState::ValidationError,
            ContentResult::SourceError(_) => ContentState::SourceError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ContentResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ContentResult::Success(data) => Some(data),
            _ => None,
        }
    }

    /// `(status, state, data)` triple
    pub fn into_tuple(self) -> (u16, ContentState, Option<T>) {
        let status = self.status_code();
        let state = self.state();
        let data = match self {
            ContentResult::Success(data) => Some(data),
            _ => None,
        };
        (status, state, data)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ContentResult<U> {
        match self {
            ContentResult::Success(data) => ContentResult::Success(f(data)),
            ContentResult::NotFound => ContentResult::NotFound,
            ContentResult::Ignored => ContentResult::Ignored,
            ContentResult::ValidationError(issues) => ContentResult::ValidationError(issues),
            ContentResult::SourceError(err) => ContentResult::SourceError(err),
        }
    }

    /// Convert to a `Result`, turning every non-success outcome into a
    /// typed error.
    pub fn into_result(
        self,
        content_type: ContentType,
        identifier: &str,
    ) -> Result<T, ContentError> {
        match self {
            ContentResult::Success(data) => Ok(data),
            ContentResult::NotFound | ContentResult::Ignored => {
                Err(ContentError::not_found(content_type, identifier))
            }
            ContentResult::ValidationError(issues) => {
                Err(ContentError::validation(content_type, issues))
            }
            ContentResult::SourceError(err) => Err(err),
        }
    }
}

/// Normalize a storage name or path into a slug.
///
/// Takes the last path segment, strips a content suffix and maps the
/// `index` sentinel to the empty string.
pub fn normalize_slug(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = CONTENT_EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name);

    if stem == "index" {
        String::new()
    } else {
        stem.to_string()
    }
}

/// Whether a file name carries a content suffix
pub fn is_content_file(name: &str) -> bool {
    CONTENT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
