//! Cache-fronted content operations.
//!
//! Request flow: derive the cache key, return the cached value on a hit,
//! otherwise load through the [`ContentLoader`] and cache successful
//! results only. Concurrent misses on one key each load independently;
//! the last write wins.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use super::loader::ContentLoader;
use super::render::TransformConfig;
use super::{ContentRecord, ContentResult, ContentType, ItemMetadata};
use crate::cache::{self, keys, CacheStats, ContentCache};
use crate::config::ContentConfig;
use crate::error::Result;
use crate::language;
use crate::schema::{Blogpost, Frontmatter, Offer, Page, Story};
use crate::source::{shared_source, ContentSource};

/// Value stored in the content cache
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CachedContent {
    Story(Arc<ContentRecord<Story>>),
    Stories(Arc<Vec<ContentRecord<Story>>>),
    Blogpost(Arc<ContentRecord<Blogpost>>),
    Blogposts(Arc<Vec<ContentRecord<Blogpost>>>),
    Page(Arc<ContentRecord<Page>>),
    Pages(Arc<Vec<ContentRecord<Page>>>),
    Offer(Arc<ContentRecord<Offer>>),
    Offers(Arc<Vec<ContentRecord<Offer>>>),
    Metadata(Arc<Vec<ItemMetadata>>),
}

/// Frontmatter types that can live in the content cache
pub trait CachedFrontmatter: Frontmatter {
    fn wrap_one(record: Arc<ContentRecord<Self>>) -> CachedContent;
    fn unwrap_one(cached: CachedContent) -> Option<Arc<ContentRecord<Self>>>;
    fn wrap_many(records: Arc<Vec<ContentRecord<Self>>>) -> CachedContent;
    fn unwrap_many(cached: CachedContent) -> Option<Arc<Vec<ContentRecord<Self>>>>;
}

macro_rules! cached_frontmatter {
    ($ty:ty, $one:ident, $many:ident) => {
        impl CachedFrontmatter for $ty {
            fn wrap_one(record: Arc<ContentRecord<Self>>) -> CachedContent {
                CachedContent::$one(record)
            }

            fn unwrap_one(cached: CachedContent) -> Option<Arc<ContentRecord<Self>>> {
                match cached {
                    CachedContent::$one(record) => Some(record),
                    _ => None,
                }
            }

            fn wrap_many(records: Arc<Vec<ContentRecord<Self>>>) -> CachedContent {
                CachedContent::$many(records)
            }

            fn unwrap_many(cached: CachedContent) -> Option<Arc<Vec<ContentRecord<Self>>>> {
                match cached {
                    CachedContent::$many(records) => Some(records),
                    _ => None,
                }
            }
        }
    };
}

cached_frontmatter!(Story, Story, Stories);
cached_frontmatter!(Blogpost, Blogpost, Blogposts);
cached_frontmatter!(Page, Page, Pages);
cached_frontmatter!(Offer, Offer, Offers);

/// Single item result
pub type ItemResult<T> = ContentResult<Arc<ContentRecord<T>>>;

/// Listing result
pub type ListResult<T> = ContentResult<Arc<Vec<ContentRecord<T>>>>;

/// Content access for request handlers
#[derive(Clone)]
pub struct ContentService {
    loader: ContentLoader,
    cache: Arc<ContentCache<CachedContent>>,
    default_language: String,
}

impl ContentService {
    pub fn new(source: Arc<dyn ContentSource>, cache: Arc<ContentCache<CachedContent>>) -> Self {
        Self {
            loader: ContentLoader::new(source),
            cache,
            default_language: language::DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Wire the shared source and a fresh cache from configuration
    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        let source = shared_source(config)?;
        let cache = Arc::new(ContentCache::new(&config.cache));

        Ok(Self::new(source, cache)
            .with_default_language(&config.default_language)
            .with_lint(config.lint_unknown_fields))
    }

    pub fn with_default_language(mut self, lang: &str) -> Self {
        self.default_language = lang.to_string();
        self
    }

    pub fn with_lint(mut self, enabled: bool) -> Self {
        self.loader = self.loader.with_lint(enabled);
        self
    }

    pub fn with_transform(mut self, transform: TransformConfig) -> Self {
        self.loader = self.loader.with_transform(transform);
        self
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    pub fn cache(&self) -> &Arc<ContentCache<CachedContent>> {
        &self.cache
    }

    /// Sweep expired cache entries periodically
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        cache::spawn_cleanup_task(Arc::clone(&self.cache), interval)
    }

    fn lang<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        language::resolve_or(lang, &self.default_language)
    }

    fn storage_path(content_type: ContentType, lang: &str) -> String {
        content_type
            .storage_path(lang)
            .unwrap_or_else(|| content_type.directory().to_string())
    }

    async fn cached_single<T: CachedFrontmatter>(
        &self,
        key: String,
        path: &str,
        slug: &str,
    ) -> ItemResult<T> {
        if let Some(record) = self.cache.get(&key).and_then(T::unwrap_one) {
            debug!("Cache hit: {}", key);
            return ContentResult::Success(record);
        }
        debug!("Cache miss: {}", key);

        let result = self.loader.fetch_single::<T>(path, slug).await.map(Arc::new);
        if let ContentResult::Success(record) = &result {
            self.cache.set(key, T::wrap_one(Arc::clone(record)));
        }
        result
    }

    async fn cached_many<T: CachedFrontmatter>(&self, key: String, path: &str) -> ListResult<T> {
        if let Some(records) = self.cache.get(&key).and_then(T::unwrap_many) {
            debug!("Cache hit: {}", key);
            return ContentResult::Success(records);
        }
        debug!("Cache miss: {}", key);

        let result = self.loader.fetch_multiple::<T>(path).await.map(Arc::new);
        if let ContentResult::Success(records) = &result {
            self.cache.set(key, T::wrap_many(Arc::clone(records)));
        }
        result
    }

    pub async fn story(&self, slug: &str, lang: Option<&str>) -> ItemResult<Story> {
        let lang = self.lang(lang);
        let path = Self::storage_path(ContentType::Story, lang);
        self.cached_single(keys::story(slug, Some(lang)), &path, slug)
            .await
    }

    pub async fn stories(&self, lang: Option<&str>) -> ListResult<Story> {
        let lang = self.lang(lang);
        let path = Self::storage_path(ContentType::Story, lang);
        self.cached_many(keys::stories(Some(lang)), &path).await
    }

    pub async fn blog_post(&self, slug: &str, lang: Option<&str>) -> ItemResult<Blogpost> {
        let lang = self.lang(lang);
        let path = Self::storage_path(ContentType::Blogpost, lang);
        self.cached_single(keys::blog_post(slug, Some(lang)), &path, slug)
            .await
    }

    pub async fn blog_posts(&self, lang: Option<&str>) -> ListResult<Blogpost> {
        let lang = self.lang(lang);
        let path = Self::storage_path(ContentType::Blogpost, lang);
        self.cached_many(keys::blog_posts(Some(lang)), &path).await
    }

    pub async fn offer(&self, slug: &str, lang: Option<&str>) -> ItemResult<Offer> {
        let lang = self.lang(lang);
        let path = Self::storage_path(ContentType::Offer, lang);
        self.cached_single(keys::offer(slug, Some(lang)), &path, slug)
            .await
    }

    pub async fn offers(&self, lang: Option<&str>) -> ListResult<Offer> {
        let lang = self.lang(lang);
        let path = Self::storage_path(ContentType::Offer, lang);
        self.cached_many(keys::offers(Some(lang)), &path).await
    }

    /// Page stored at `{path}/{slug}.md`
    pub async fn page(&self, path: &str, slug: &str) -> ItemResult<Page> {
        self.cached_single(keys::page(path, slug), path, slug).await
    }

    pub async fn pages(&self, path: &str) -> ListResult<Page> {
        self.cached_many(keys::pages(path), path).await
    }

    /// Item listing without bodies.
    ///
    /// Lists `path` when given. Otherwise localized types list their
    /// language directory and pages list `pages`. Each distinct path is
    /// cached under its own key.
    pub async fn metadata(
        &self,
        content_type: ContentType,
        lang: Option<&str>,
        path: Option<&str>,
    ) -> ContentResult<Arc<Vec<ItemMetadata>>> {
        let lang = self.lang(lang);
        let path = match path {
            Some(path) => path.to_string(),
            None => Self::storage_path(content_type, lang),
        };
        let key = keys::metadata(content_type, Some(lang), &path);

        if let Some(CachedContent::Metadata(items)) = self.cache.get(&key) {
            debug!("Cache hit: {}", key);
            return ContentResult::Success(items);
        }

        let result = self.loader.fetch_metadata(&path).await.map(Arc::new);
        if let ContentResult::Success(items) = &result {
            self.cache.set(key, CachedContent::Metadata(Arc::clone(items)));
        }
        result
    }

    /// Drop every cached entry of a language
    pub fn invalidate_language(&self, lang: &str) -> usize {
        self.cache.invalidate(keys::patterns::language(lang))
    }

    /// Drop cached entries of a content type, optionally for one language
    pub fn invalidate_type(&self, content_type: ContentType, lang: Option<&str>) -> usize {
        self.cache
            .invalidate(keys::patterns::content_type(content_type, lang))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_hit_ratio(&self) -> f64 {
        self.cache.hit_ratio()
    }
}
