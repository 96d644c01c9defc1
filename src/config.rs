//! Configuration for content sources and the cache.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CONTENT_SOURCE, CONTENT_PATH, GITHUB_TOKEN, ...)
//! 2. Config file (.contentkit/config.yaml)
//! 3. Defaults (filesystem source reading ./content)
//!
//! Config file discovery:
//! - `CONTENTKIT_CONFIG` points at a file explicitly
//! - Otherwise searches current directory and parents for .contentkit/config.yaml
//! - `base_path` in the config file is relative to the project root (the
//!   parent of `.contentkit/`)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cache::CacheSettings;
use crate::error::ContentError;
use crate::language;
use crate::source::remote::{DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_TIMEOUT};
use crate::source::SourceKind;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<std::result::Result<ContentConfig, String>> = OnceLock::new();

/// Filesystem content root when nothing is configured
const DEFAULT_CONTENT_DIR: &str = "content";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub cache: Option<CacheSettings>,
    #[serde(default)]
    pub languages: LanguagesSection,
    /// Log frontmatter fields no schema knows about
    #[serde(default)]
    pub lint_unknown_fields: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceSection {
    /// `filesystem` or `github`
    pub kind: Option<String>,
    /// Content root for the filesystem source
    pub base_path: Option<String>,
    /// Contents API root for the github source
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    pub timeout_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguagesSection {
    pub default: Option<String>,
    #[serde(default)]
    pub supported: Vec<String>,
}

/// Active content backend
#[derive(Clone, PartialEq, Eq)]
pub enum ContentSourceConfig {
    Filesystem {
        base_path: PathBuf,
    },
    Github {
        access_token: String,
        base_url: String,
        timeout: Duration,
        batch_size: usize,
        batch_delay: Duration,
    },
}

impl ContentSourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            ContentSourceConfig::Filesystem { .. } => SourceKind::Filesystem,
            ContentSourceConfig::Github { .. } => SourceKind::Github,
        }
    }

    /// Printable form with the access token redacted
    pub fn describe(&self) -> Value {
        match self {
            ContentSourceConfig::Filesystem { base_path } => json!({
                "source": "filesystem",
                "basePath": base_path.display().to_string(),
            }),
            ContentSourceConfig::Github {
                base_url,
                timeout,
                batch_size,
                batch_delay,
                ..
            } => json!({
                "source": "github",
                "baseUrl": base_url,
                "accessToken": "***",
                "timeoutMs": timeout.as_millis() as u64,
                "batchSize": batch_size,
                "batchDelayMs": batch_delay.as_millis() as u64,
            }),
        }
    }
}

impl fmt::Debug for ContentSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub source: ContentSourceConfig,
    pub cache: CacheSettings,
    pub default_language: String,
    pub languages: Vec<String>,
    pub lint_unknown_fields: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ContentConfig {
    /// Resolve configuration from a key lookup alone (no config file).
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ContentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(&ConfigFile::default(), Path::new("."), lookup)
    }

    /// Merge a config file with lookup overrides.
    ///
    /// `root` is the directory relative paths in the file resolve against.
    pub fn resolve<F>(
        file: &ConfigFile,
        root: &Path,
        lookup: F,
    ) -> std::result::Result<Self, ContentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let source = resolve_source(&file.source, root, &lookup)?;

        let mut cache = file.cache.clone().unwrap_or_default();
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CACHE_TTL_SECONDS")? {
            cache.ttl = Duration::from_secs(secs);
        }
        if let Some(max_entries) = parse_var(&lookup, "CACHE_MAX_ENTRIES")? {
            cache.max_entries = max_entries;
        }
        if let Some(max_size) = parse_var(&lookup, "CACHE_MAX_SIZE_BYTES")? {
            cache.max_size_bytes = max_size;
        }
        if cache.cleanup_interval.is_zero() {
            return Err(ContentError::Configuration {
                message: "Cache cleanup interval must be at least 1 second".to_string(),
                context: json!({ "setting": "cache.cleanup_interval" }),
            });
        }

        let languages = if file.languages.supported.is_empty() {
            language::SUPPORTED_LANGUAGES
                .iter()
                .map(|lang| lang.to_string())
                .collect()
        } else {
            file.languages.supported.clone()
        };

        let default_language = lookup("CONTENT_DEFAULT_LANGUAGE")
            .or_else(|| file.languages.default.clone())
            .unwrap_or_else(|| language::DEFAULT_LANGUAGE.to_string());

        if !languages.contains(&default_language) {
            return Err(ContentError::Configuration {
                message: format!("Default language '{default_language}' is not supported"),
                context: json!({ "defaultLanguage": default_language, "languages": languages }),
            });
        }

        Ok(Self {
            source,
            cache,
            default_language,
            languages,
            lint_unknown_fields: file.lint_unknown_fields,
            config_file: None,
        })
    }

    /// Resolve an optional language against the configured default
    pub fn language<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        language::resolve_or(lang, &self.default_language)
    }
}

fn resolve_source<F>(
    section: &SourceSection,
    root: &Path,
    lookup: &F,
) -> std::result::Result<ContentSourceConfig, ContentError>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = lookup("CONTENT_SOURCE")
        .or_else(|| section.kind.clone())
        .unwrap_or_else(|| match lookup("APP_ENV").as_deref() {
            Some("production") => "github".to_string(),
            _ => "filesystem".to_string(),
        });

    match kind.trim().to_lowercase().as_str() {
        "filesystem" | "fs" | "local" => {
            let base_path = match (lookup("CONTENT_PATH"), &section.base_path) {
                (Some(path), _) => PathBuf::from(path),
                (None, Some(path)) => resolve_path(root, path),
                (None, None) => PathBuf::from(DEFAULT_CONTENT_DIR),
            };
            Ok(ContentSourceConfig::Filesystem { base_path })
        }
        "github" | "remote" => {
            let access_token = lookup("GITHUB_TOKEN")
                .or_else(|| section.access_token.clone())
                .ok_or_else(|| missing("GITHUB_TOKEN", "access token"))?;
            let base_url = lookup("CONTENT_API_URL")
                .or_else(|| section.base_url.clone())
                .ok_or_else(|| missing("CONTENT_API_URL", "contents API URL"))?;

            let timeout = parse_var(lookup, "CONTENT_TIMEOUT_MS")?
                .or(section.timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT);
            let batch_size = parse_var(lookup, "CONTENT_BATCH_SIZE")?
                .or(section.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE);
            let batch_delay = parse_var(lookup, "CONTENT_BATCH_DELAY_MS")?
                .or(section.batch_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_BATCH_DELAY);

            if batch_size == 0 {
                return Err(ContentError::Configuration {
                    message: "Batch size must be at least 1".to_string(),
                    context: json!({ "variable": "CONTENT_BATCH_SIZE" }),
                });
            }

            Ok(ContentSourceConfig::Github {
                access_token,
                base_url,
                timeout,
                batch_size,
                batch_delay,
            })
        }
        other => Err(ContentError::Configuration {
            message: format!("Unknown content source: {other}"),
            context: json!({ "variable": "CONTENT_SOURCE", "value": other }),
        }),
    }
}

fn missing(variable: &str, what: &str) -> ContentError {
    ContentError::Configuration {
        message: format!("Missing {what} for the github content source ({variable})"),
        context: json!({ "variable": variable }),
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> std::result::Result<Option<T>, ContentError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ContentError::Configuration {
                message: format!("Invalid value for {key}: {e}"),
                context: json!({ "variable": key, "value": raw }),
            }
        }),
    }
}

/// Find config file: explicit path first, then search upwards
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("CONTENTKIT_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    let mut current = std::env::current_dir().ok()?;
    loop {
        let config_path = current.join(".contentkit").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ContentConfig> {
    let config_file = find_config_file();

    let (file, root) = match &config_file {
        Some(config_path) => {
            let file = load_config_file(config_path)?;
            // Project root is the parent of .contentkit/
            let root = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            (file, root)
        }
        None => (ConfigFile::default(), PathBuf::from(".")),
    };

    let mut config = ContentConfig::resolve(&file, &root, |key| std::env::var(key).ok())?;
    config.config_file = config_file;
    Ok(config)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ContentConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{e:#}")));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (bypasses the process-wide cache)
pub fn reload_config() -> Result<ContentConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_filesystem() {
        let config = ContentConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(
            config.source,
            ContentSourceConfig::Filesystem {
                base_path: PathBuf::from("content")
            }
        );
        assert_eq!(config.default_language, "en");
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_production_selects_github() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("GITHUB_TOKEN", "secret"),
            ("CONTENT_API_URL", "https://api.example.com/contents"),
            ("CONTENT_BATCH_SIZE", "4"),
        ]))
        .unwrap();

        match config.source {
            ContentSourceConfig::Github {
                ref access_token,
                timeout,
                batch_size,
                batch_delay,
                ..
            } => {
                assert_eq!(access_token, "secret");
                assert_eq!(timeout, Duration::from_millis(10_000));
                assert_eq!(batch_size, 4);
                assert_eq!(batch_delay, Duration::from_millis(100));
            }
            other => panic!("expected github source, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_source_overrides_app_env() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("CONTENT_SOURCE", "filesystem"),
            ("CONTENT_PATH", "/srv/content"),
        ]))
        .unwrap();

        assert_eq!(config.source.kind(), SourceKind::Filesystem);
    }

    #[test]
    fn test_github_requires_token() {
        let err = ContentConfig::from_lookup(lookup(&[
            ("CONTENT_SOURCE", "github"),
            ("CONTENT_API_URL", "https://api.example.com"),
        ]))
        .unwrap_err();

        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert_eq!(err.context()["variable"], "GITHUB_TOKEN");
    }

    #[test]
    fn test_invalid_numbers_and_kinds() {
        let err = ContentConfig::from_lookup(lookup(&[("CACHE_MAX_ENTRIES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("CACHE_MAX_ENTRIES"));

        let err = ContentConfig::from_lookup(lookup(&[("CONTENT_SOURCE", "ftp")])).unwrap_err();
        assert_eq!(err.context()["value"], "ftp");

        let err = ContentConfig::from_lookup(lookup(&[
            ("CONTENT_SOURCE", "github"),
            ("GITHUB_TOKEN", "t"),
            ("CONTENT_API_URL", "http://x"),
            ("CONTENT_BATCH_SIZE", "0"),
        ]))
        .unwrap_err();
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_describe_redacts_token() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("CONTENT_SOURCE", "github"),
            ("GITHUB_TOKEN", "super-secret"),
            ("CONTENT_API_URL", "http://x"),
        ]))
        .unwrap();

        let described = config.source.describe().to_string();
        assert!(!described.contains("super-secret"));
        assert!(!format!("{:?}", config.source).contains("super-secret"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".contentkit");
        std::fs::create_dir_all(&config_dir).unwrap();

        let config_path = config_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1"
source:
  kind: filesystem
  base_path: site/content
cache:
  ttl: 60
  max_entries: 20
languages:
  default: fr
  supported: [en, fr]
lint_unknown_fields: true
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        let config = ContentConfig::resolve(&parsed, temp.path(), lookup(&[])).unwrap();

        assert_eq!(
            config.source,
            ContentSourceConfig::Filesystem {
                base_path: temp.path().join("site/content")
            }
        );
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.cache.max_entries, 20);
        assert_eq!(config.cache.max_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.default_language, "fr");
        assert_eq!(config.language(None), "fr");
        assert!(config.lint_unknown_fields);
    }

    #[test]
    fn test_env_overrides_file_cache_settings() {
        let file = ConfigFile {
            cache: Some(CacheSettings::default()),
            ..Default::default()
        };
        let config = ContentConfig::resolve(
            &file,
            Path::new("."),
            lookup(&[("CACHE_TTL_SECONDS", "5"), ("CACHE_MAX_SIZE_BYTES", "2048")]),
        )
        .unwrap();

        assert_eq!(config.cache.ttl, Duration::from_secs(5));
        assert_eq!(config.cache.max_size_bytes, 2048);
    }

    #[test]
    fn test_zero_cleanup_interval_rejected() {
        let file: ConfigFile = serde_yaml::from_str("cache:\n  cleanup_interval: 0\n").unwrap();
        let err = ContentConfig::resolve(&file, Path::new("."), lookup(&[])).unwrap_err();

        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert_eq!(err.context()["setting"], "cache.cleanup_interval");
    }

    #[test]
    fn test_unsupported_default_language() {
        let err =
            ContentConfig::from_lookup(lookup(&[("CONTENT_DEFAULT_LANGUAGE", "de")])).unwrap_err();
        assert!(err.to_string().contains("'de'"));
    }
}
