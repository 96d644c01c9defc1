//! Cache key derivation.
//!
//! Keys are colon-delimited: `{kind}:{lang}:{slug}` for single items and
//! `{kinds}:{lang}:all` for listings. Callers use the same builders to
//! construct invalidation patterns without duplicating the format.

use crate::content::ContentType;
use crate::language;

/// Key for the story listing of a language
pub fn stories(lang: Option<&str>) -> String {
    format!("stories:{}:all", language::resolve(lang))
}

/// Key for a single story
pub fn story(slug: &str, lang: Option<&str>) -> String {
    format!("story:{}:{}", language::resolve(lang), slug)
}

/// Key for the blog post listing of a language
pub fn blog_posts(lang: Option<&str>) -> String {
    format!("blogposts:{}:all", language::resolve(lang))
}

/// Key for a single blog post
pub fn blog_post(slug: &str, lang: Option<&str>) -> String {
    format!("blogpost:{}:{}", language::resolve(lang), slug)
}

/// Key for the job offer listing of a language
pub fn offers(lang: Option<&str>) -> String {
    format!("offers:{}:all", language::resolve(lang))
}

/// Key for a single job offer
pub fn offer(slug: &str, lang: Option<&str>) -> String {
    format!("offer:{}:{}", language::resolve(lang), slug)
}

/// Key for the page listing under a path (`/` become `:`)
pub fn pages(path: &str) -> String {
    format!("pages:{}", path.trim_matches('/').replace('/', ":"))
}

/// Key for a single page
pub fn page(path: &str, slug: &str) -> String {
    format!("page:{}:{}", path.trim_matches('/'), slug)
}

/// Key for an item listing without bodies at `path`.
///
/// Localized types: `{type}-metadata:{lang}:{path}`; pages:
/// `page-metadata:{path}`. `/` in the path become `:`.
pub fn metadata(content_type: ContentType, lang: Option<&str>, path: &str) -> String {
    let path = path.trim_matches('/').replace('/', ":");
    if content_type.is_localized() {
        format!("{}-metadata:{}:{}", content_type, language::resolve(lang), path)
    } else {
        format!("{}-metadata:{}", content_type, path)
    }
}

/// Invalidation patterns matching families of keys.
pub mod patterns {
    use crate::content::ContentType;

    /// Story entries (single and listing) of a language
    pub fn stories(lang: &str) -> String {
        format!("stor*:{lang}:*")
    }

    /// All blog entries, every language
    pub fn blog() -> String {
        "blog*".to_string()
    }

    /// Job offer entries of a language
    pub fn offers(lang: &str) -> String {
        format!("offer*:{lang}:*")
    }

    /// All page entries
    pub fn pages() -> String {
        "page*".to_string()
    }

    /// Every language-partitioned entry of a language
    pub fn language(lang: &str) -> String {
        format!("*:{lang}:*")
    }

    /// Entries of one content type, optionally narrowed to a language.
    ///
    /// Pages are not localized, so `lang` is ignored for them.
    pub fn content_type(content_type: ContentType, lang: Option<&str>) -> String {
        let prefix = match content_type {
            ContentType::Story => "stor",
            ContentType::Blogpost => "blog",
            ContentType::Offer => "offer",
            ContentType::Page => return pages(),
        };
        match lang {
            Some(lang) => format!("{prefix}*:{lang}:*"),
            None => format!("{prefix}*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InvalidationPattern;

    #[test]
    fn test_single_keys() {
        assert_eq!(story("s", Some("fr")), "story:fr:s");
        assert_eq!(blog_post("hello", Some("en")), "blogpost:en:hello");
        assert_eq!(offer("dev", Some("fr")), "offer:fr:dev");
        assert_eq!(page("legal/terms", "privacy"), "page:legal/terms:privacy");
    }

    #[test]
    fn test_listing_keys_default_language() {
        assert_eq!(stories(None), "stories:en:all");
        assert_eq!(blog_posts(None), "blogposts:en:all");
        assert_eq!(offers(Some("fr")), "offers:fr:all");
        assert_eq!(pages("/legal/terms/"), "pages:legal:terms");
    }

    #[test]
    fn test_keys_are_stable_and_distinct() {
        assert_eq!(story("a", Some("en")), story("a", Some("en")));
        assert_ne!(story("a", Some("en")), story("a", Some("fr")));
        assert_ne!(story("a", Some("en")), blog_post("a", Some("en")));
        assert_ne!(stories(Some("en")), story("all", Some("en")));
    }

    #[test]
    fn test_patterns_cover_their_keys() {
        let stories_en = InvalidationPattern::glob(&patterns::stories("en"));
        assert!(stories_en.matches(&story("a", Some("en"))));
        assert!(stories_en.matches(&stories(Some("en"))));
        assert!(!stories_en.matches(&story("a", Some("fr"))));

        let blog = InvalidationPattern::glob(&patterns::blog());
        assert!(blog.matches(&blog_post("a", Some("fr"))));
        assert!(blog.matches(&blog_posts(Some("en"))));

        let offers_fr = InvalidationPattern::glob(&patterns::offers("fr"));
        assert!(offers_fr.matches(&offer("a", Some("fr"))));
        assert!(offers_fr.matches(&offers(Some("fr"))));

        let english = InvalidationPattern::glob(&patterns::language("en"));
        assert!(english.matches(&offer("a", Some("en"))));
        assert!(english.matches(&blog_posts(Some("en"))));
        assert!(!english.matches(&offer("a", Some("fr"))));
    }

    #[test]
    fn test_metadata_keys_follow_type_patterns() {
        let story_meta = metadata(ContentType::Story, Some("en"), "stories/en");
        assert_eq!(story_meta, "story-metadata:en:stories:en");
        assert_ne!(
            story_meta,
            metadata(ContentType::Story, Some("en"), "stories/en/archive")
        );
        assert_eq!(
            metadata(ContentType::Page, None, "/legal/terms"),
            "page-metadata:legal:terms"
        );

        let stories_en =
            InvalidationPattern::glob(&patterns::content_type(ContentType::Story, Some("en")));
        assert!(stories_en.matches(&story_meta));
        assert!(stories_en.matches(&story("a", Some("en"))));

        let all_blog = InvalidationPattern::glob(&patterns::content_type(ContentType::Blogpost, None));
        assert!(all_blog.matches(&metadata(ContentType::Blogpost, Some("fr"), "blog/fr")));
        assert!(!all_blog.matches(&story("a", Some("fr"))));

        let english = InvalidationPattern::glob(&patterns::language("en"));
        assert!(english.matches(&story_meta));
    }
}
