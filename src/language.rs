//! Content languages.

/// Language used when a caller does not specify one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Languages content is published in
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr"];

/// Resolve an optional language to a concrete one, falling back to
/// [`DEFAULT_LANGUAGE`].
pub fn resolve(lang: Option<&str>) -> &str {
    resolve_or(lang, DEFAULT_LANGUAGE)
}

/// Resolve an optional language, falling back to `default` when it is
/// absent or blank.
pub fn resolve_or<'a>(lang: Option<&'a str>, default: &'a str) -> &'a str {
    match lang {
        Some(lang) if !lang.trim().is_empty() => lang,
        _ => default,
    }
}
