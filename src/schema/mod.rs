//! Frontmatter schemas and validation.
//!
//! Validation runs in two independent passes:
//! 1. [`validate`]: lenient structural + semantic rules that decide whether
//!    a document is usable. Unknown fields are tolerated.
//! 2. [`unknown_fields`]: an optional lint listing fields no schema knows
//!    about, so content can be cleaned up gradually.

pub mod types;

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::content::ContentType;

pub use types::{Blogpost, Offer, Page, Story};

/// A frontmatter schema bound to one content type.
pub trait Frontmatter: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Content type this schema describes
    const CONTENT_TYPE: ContentType;

    /// Every field the schema understands (used by the lint pass)
    const KNOWN_FIELDS: &'static [&'static str];

    /// Apply the field rules
    fn rules(fields: &mut FieldValidator);
}

/// One violated rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of schema validation
#[derive(Debug, Clone)]
pub enum ValidationResult<T> {
    Valid(T),
    Invalid(Vec<ValidationIssue>),
}

impl<T> ValidationResult<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    /// Issues formatted as `"{field}: {message}"`
    pub fn issue_messages(&self) -> Vec<String> {
        match self {
            ValidationResult::Valid(_) => Vec::new(),
            ValidationResult::Invalid(issues) => issues.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Validate a decoded frontmatter value against a schema.
pub fn validate<T: Frontmatter>(value: &Value) -> ValidationResult<T> {
    let Value::Object(map) = value else {
        return ValidationResult::Invalid(vec![ValidationIssue::new(
            "frontmatter",
            "expected a mapping of fields",
        )]);
    };

    let mut fields = FieldValidator::new(map.clone());
    T::rules(&mut fields);

    let (normalized, issues) = fields.finish();
    if !issues.is_empty() {
        return ValidationResult::Invalid(issues);
    }

    match serde_json::from_value::<T>(Value::Object(normalized)) {
        Ok(frontmatter) => ValidationResult::Valid(frontmatter),
        Err(e) => ValidationResult::Invalid(vec![ValidationIssue::new("frontmatter", e.to_string())]),
    }
}

/// Fields present in the frontmatter that the schema does not know.
pub fn unknown_fields<T: Frontmatter>(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .keys()
            .filter(|key| !T::KNOWN_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse the date formats accepted in frontmatter.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|datetime| datetime.date())
}

/// Check an external video ID (11 characters of `[A-Za-z0-9_-]`)
pub fn is_video_id(value: &str) -> bool {
    value.len() == 11
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Applies field rules to a frontmatter mapping, normalizing values
/// (trimmed strings, defaulted arrays) and collecting issues.
pub struct FieldValidator {
    fields: Map<String, Value>,
    issues: Vec<ValidationIssue>,
}

impl FieldValidator {
    fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            issues: Vec::new(),
        }
    }

    fn finish(self) -> (Map<String, Value>, Vec<ValidationIssue>) {
        (self.fields, self.issues)
    }

    fn issue(&mut self, field: &str, message: &str) {
        self.issues.push(ValidationIssue::new(field, message));
    }

    fn present(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    /// Trim a string field in place; returns false (and records an issue)
    /// when it isn't a non-empty string.
    fn trimmed_string(&mut self, name: &str) -> bool {
        let trimmed = match self.fields.get(name) {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => {
                self.issue(name, "Expected string");
                return false;
            }
        };

        if trimmed.is_empty() {
            self.issue(name, "cannot be empty");
            return false;
        }
        self.fields.insert(name.to_string(), Value::String(trimmed));
        true
    }

    /// Required non-empty string
    pub fn required_string(&mut self, name: &str) {
        if self.present(name).is_none() {
            self.issue(name, "Required");
            return;
        }
        self.trimmed_string(name);
    }

    /// Optional string that must not be empty when given
    pub fn optional_string(&mut self, name: &str) {
        if self.present(name).is_none() {
            self.fields.remove(name);
            return;
        }
        self.trimmed_string(name);
    }

    /// Array of non-empty strings, defaulting to empty
    pub fn string_array(&mut self, name: &str) {
        let items = match self.present(name) {
            None => {
                self.fields.insert(name.to_string(), Value::Array(Vec::new()));
                return;
            }
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                self.issue(name, "Expected array of strings");
                return;
            }
        };

        let mut normalized = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(s) if !s.trim().is_empty() => {
                    normalized.push(Value::String(s.trim().to_string()))
                }
                Value::String(_) => self.issue(&format!("{name}.{index}"), "cannot be empty"),
                _ => self.issue(&format!("{name}.{index}"), "Expected string"),
            }
        }
        self.fields.insert(name.to_string(), Value::Array(normalized));
    }

    /// Required date string in one of the accepted formats
    pub fn date(&mut self, name: &str) {
        if self.present(name).is_none() {
            self.issue(name, "Required");
            return;
        }
        if !self.trimmed_string(name) {
            return;
        }

        let valid = self
            .fields
            .get(name)
            .and_then(Value::as_str)
            .and_then(parse_date)
            .is_some();
        if !valid {
            self.issue(name, "Invalid date");
        }
    }

    /// Optional external video ID
    pub fn optional_video_id(&mut self, name: &str) {
        if self.present(name).is_none() {
            self.fields.remove(name);
            return;
        }
        if !self.trimmed_string(name) {
            return;
        }

        let valid = self
            .fields
            .get(name)
            .and_then(Value::as_str)
            .is_some_and(is_video_id);
        if !valid {
            self.issue(name, "Invalid video ID (expected 11 characters)");
        }
    }

    /// Optional boolean flag
    pub fn optional_bool(&mut self, name: &str) {
        match self.present(name) {
            None => {
                self.fields.remove(name);
            }
            Some(Value::Bool(_)) => {}
            Some(_) => self.issue(name, "Expected boolean"),
        }
    }
}
