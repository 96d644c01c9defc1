//! Raw document processing.
//!
//! Splits the frontmatter block off the body, decodes it, applies the
//! ignore flag, validates against the schema and transforms the body.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::render::{transform, TransformConfig};
use super::{normalize_slug, ContentRecord};
use crate::error::ContentError;
use crate::schema::{self, Frontmatter, ValidationResult};

const DELIMITER: &str = "---";

/// Content-level processing policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Short-circuit documents whose frontmatter has a truthy `ignore`
    pub respect_ignore_flag: bool,
    /// Log frontmatter fields the schema doesn't know
    pub lint_unknown_fields: bool,
}

impl ProcessOptions {
    /// Options used for listings: ignored items are dropped
    pub fn batch() -> Self {
        Self {
            respect_ignore_flag: true,
            lint_unknown_fields: false,
        }
    }

    pub fn with_lint(mut self, enabled: bool) -> Self {
        self.lint_unknown_fields = enabled;
        self
    }
}

/// Outcome of processing one document
#[derive(Debug, Clone)]
pub enum ProcessingResult<T> {
    Processed(ContentRecord<T>),
    Ignored,
    Failed(ContentError),
}

impl<T> ProcessingResult<T> {
    pub fn is_ignored(&self) -> bool {
        matches!(self, ProcessingResult::Ignored)
    }
}

/// Split a document into its frontmatter block (if any) and body.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let Some(rest) = text.strip_prefix(DELIMITER) else {
        return (None, text);
    };
    let rest = match rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
        Some(rest) => rest,
        // `---` followed by anything but a newline is a thematic break or text
        None if rest.trim().is_empty() => return (Some(""), ""),
        None => return (None, text),
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == DELIMITER {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(block), body);
        }
        offset += line.len();
    }

    // Unterminated block: not frontmatter
    (None, text)
}

/// Decode a frontmatter block; absent or blank blocks yield `{}`.
pub fn decode_frontmatter(block: Option<&str>) -> Result<Value, String> {
    match block {
        Some(block) if !block.trim().is_empty() => {
            serde_yaml::from_str::<Value>(block).map_err(|e| e.to_string())
        }
        _ => Ok(Value::Object(Map::new())),
    }
}

/// Whether decoded frontmatter asks to be skipped.
///
/// Only mappings can carry the flag; scalars and sequences never do.
pub fn is_ignored(frontmatter: &Value) -> bool {
    frontmatter
        .as_object()
        .and_then(|map| map.get("ignore"))
        .is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Process raw document text into a typed record.
pub fn process<T: Frontmatter>(
    raw_text: &str,
    slug: &str,
    transform_config: &TransformConfig,
    options: &ProcessOptions,
) -> ProcessingResult<T> {
    let content_type = T::CONTENT_TYPE;
    let (block, body) = split_frontmatter(raw_text);

    let frontmatter = match decode_frontmatter(block) {
        Ok(value) => value,
        Err(message) => {
            return ProcessingResult::Failed(ContentError::validation(
                content_type,
                vec![format!("frontmatter: {message}")],
            ));
        }
    };

    if options.respect_ignore_flag && is_ignored(&frontmatter) {
        debug!("Skipping ignored {} '{}'", content_type, slug);
        return ProcessingResult::Ignored;
    }

    if options.lint_unknown_fields {
        let unknown = schema::unknown_fields::<T>(&frontmatter);
        if !unknown.is_empty() {
            warn!(
                "{} '{}' has unknown frontmatter fields: {}",
                content_type,
                slug,
                unknown.join(", ")
            );
        }
    }

    let frontmatter = match schema::validate::<T>(&frontmatter) {
        ValidationResult::Valid(frontmatter) => frontmatter,
        invalid @ ValidationResult::Invalid(_) => {
            return ProcessingResult::Failed(ContentError::validation(
                content_type,
                invalid.issue_messages(),
            ));
        }
    };

    ProcessingResult::Processed(ContentRecord {
        slug: normalize_slug(slug),
        frontmatter,
        content: transform(body, transform_config),
        raw_text: raw_text.to_string(),
    })
}
