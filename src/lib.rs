//! contentkit - source-agnostic markdown content loading and caching
//!
//! Loads markdown documents with YAML frontmatter (stories, blog posts,
//! pages, job offers) from a local directory or a hosted repository,
//! validates them against per-type schemas and caches the typed results.
//!
//! # Architecture
//!
//! A request flows through three layers:
//! - The cache key is derived and the in-process cache consulted
//! - On a miss the active source delivers raw text
//! - The processor decodes, validates and transforms it into a record
//!
//! Expected outcomes (absent, ignored, invalid) come back as
//! [`ContentResult`] variants; unexpected failures carry a [`ContentError`].
//!
//! # Modules
//!
//! - `cache`: TTL + size-bounded cache, key builders
//! - `content`: records, processor, loader and the cache-fronted service
//! - `schema`: frontmatter schemas and validation
//! - `source`: filesystem and remote backends, source factory
//! - `config`: configuration from file and environment
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch one story
//! contentkit fetch story test-story --lang en
//!
//! # Check every blog post, reporting unknown frontmatter fields
//! contentkit lint blogpost --lang fr
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod language;
pub mod schema;
pub mod source;

// Re-export main types at crate root for convenience
pub use cache::{CacheSettings, CacheStats, ContentCache, InvalidationPattern};
pub use config::{ContentConfig, ContentSourceConfig};
pub use content::{
    CachedContent, ContentLoader, ContentRecord, ContentResult, ContentService, ContentState,
    ContentType, ItemMetadata, RawDocument, RenderTree, TransformConfig,
};
pub use error::{is_content_error, to_content_error, ContentError};
pub use schema::{Blogpost, Frontmatter, Offer, Page, Story, ValidationResult};
pub use source::{ContentSource, FilesystemSource, RemoteSource, SourceKind};
