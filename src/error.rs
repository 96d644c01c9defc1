//! Error taxonomy for the content layer.
//!
//! Every error carries a machine-readable code, an HTTP-style status and a
//! structured context object so it can be logged or surfaced uniformly at
//! the request boundary.

use std::any::Any;
use std::backtrace::BacktraceStatus;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias for content operations.
pub type Result<T, E = ContentError> = std::result::Result<T, E>;

/// Filesystem operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FsOperation {
    Read,
    Write,
    List,
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsOperation::Read => write!(f, "read"),
            FsOperation::Write => write!(f, "write"),
            FsOperation::List => write!(f, "list"),
        }
    }
}

/// Unified content-layer error.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// A source could not deliver content
    #[error("Failed to fetch content from {source_kind} at '{path}': {message}")]
    Fetch {
        source_kind: String,
        path: String,
        status: u16,
        message: String,
    },

    /// Requested content does not exist
    #[error("{content_type} not found: {identifier}")]
    NotFound {
        content_type: String,
        identifier: String,
    },

    /// Frontmatter failed schema validation
    #[error("Invalid {content_type} content: {}", .issues.join("; "))]
    Validation {
        content_type: String,
        issues: Vec<String>,
    },

    /// Missing or invalid configuration, or an unclassified failure
    #[error("Configuration error: {message}")]
    Configuration { message: String, context: Value },

    /// Upstream API answered with a non-success status
    #[error("Remote API returned status {status} for {url}")]
    RemoteApi {
        status: u16,
        url: String,
        response: Option<String>,
    },

    /// Local filesystem access failed
    #[error("Failed to {operation} '{}': {message}", .path.display())]
    FileSystem {
        operation: FsOperation,
        path: PathBuf,
        message: String,
    },

    /// Remote request exceeded its timeout
    #[error("Request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },
}

impl ContentError {
    /// Create a fetch error.
    pub fn fetch(
        source_kind: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        message: impl fmt::Display,
    ) -> Self {
        Self::Fetch {
            source_kind: source_kind.into(),
            path: path.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(content_type: impl fmt::Display, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            content_type: content_type.to_string(),
            identifier: identifier.into(),
        }
    }

    /// Create a validation error from a list of issues.
    pub fn validation(content_type: impl fmt::Display, issues: Vec<String>) -> Self {
        Self::Validation {
            content_type: content_type.to_string(),
            issues,
        }
    }

    /// Create a configuration error without extra context.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: json!({}),
        }
    }

    /// Create a remote API error.
    pub fn remote_api(status: u16, url: impl Into<String>, response: Option<String>) -> Self {
        Self::RemoteApi {
            status,
            url: url.into(),
            response,
        }
    }

    /// Create a filesystem error.
    pub fn file_system(
        operation: FsOperation,
        path: impl Into<PathBuf>,
        message: impl fmt::Display,
    ) -> Self {
        Self::FileSystem {
            operation,
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout,
        }
    }

    /// Error kind name
    pub fn name(&self) -> &'static str {
        match self {
            ContentError::Fetch { .. } => "ContentFetchError",
            ContentError::NotFound { .. } => "ContentNotFoundError",
            ContentError::Validation { .. } => "ContentValidationError",
            ContentError::Configuration { .. } => "ConfigurationError",
            ContentError::RemoteApi { .. } => "RemoteAPIError",
            ContentError::FileSystem { .. } => "FileSystemError",
            ContentError::Timeout { .. } => "TimeoutError",
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ContentError::Fetch { .. } => "CONTENT_FETCH_ERROR",
            ContentError::NotFound { .. } => "CONTENT_NOT_FOUND",
            ContentError::Validation { .. } => "CONTENT_VALIDATION_ERROR",
            ContentError::Configuration { .. } => "CONFIGURATION_ERROR",
            ContentError::RemoteApi { .. } => "REMOTE_API_ERROR",
            ContentError::FileSystem { .. } => "FILESYSTEM_ERROR",
            ContentError::Timeout { .. } => "REQUEST_TIMEOUT",
        }
    }

    /// HTTP-style status for this error
    pub fn http_status(&self) -> u16 {
        match self {
            ContentError::Fetch { status, .. } => *status,
            ContentError::NotFound { .. } => 404,
            ContentError::Validation { .. } => 422,
            ContentError::Configuration { .. } => 500,
            ContentError::RemoteApi { status, .. } => *status,
            ContentError::FileSystem { .. } => 500,
            ContentError::Timeout { .. } => 408,
        }
    }

    /// Structured context for logging
    pub fn context(&self) -> Value {
        match self {
            ContentError::Fetch {
                source_kind,
                path,
                status,
                ..
            } => json!({ "source": source_kind, "path": path, "status": status }),
            ContentError::NotFound {
                content_type,
                identifier,
            } => json!({ "contentType": content_type, "identifier": identifier }),
            ContentError::Validation {
                content_type,
                issues,
            } => json!({ "contentType": content_type, "issues": issues }),
            ContentError::Configuration { context, .. } => context.clone(),
            ContentError::RemoteApi {
                status,
                url,
                response,
            } => json!({ "status": status, "url": url, "response": response }),
            ContentError::FileSystem {
                operation, path, ..
            } => json!({ "operation": operation, "path": path.display().to_string() }),
            ContentError::Timeout { url, timeout } => {
                json!({ "url": url, "timeoutMs": timeout.as_millis() as u64 })
            }
        }
    }

    /// Uniform JSON shape: `{name, message, code, httpStatus, context}`
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name(),
            "message": self.to_string(),
            "code": self.code(),
            "httpStatus": self.http_status(),
            "context": self.context(),
        })
    }

    /// Validation issues, if this is a validation error
    pub fn issues(&self) -> Option<&[String]> {
        match self {
            ContentError::Validation { issues, .. } => Some(issues),
            _ => None,
        }
    }

    /// Wrap a panic payload (or any other non-error value) into a
    /// configuration error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let original = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-error value>".to_string()
        };

        Self::Configuration {
            message: format!("Unexpected failure: {original}"),
            context: json!({ "original": original, "kind": "panic" }),
        }
    }
}

/// Check whether an error is (or wraps) a `ContentError`.
pub fn is_content_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ContentError>().is_some()
}

/// Convert any error into a `ContentError`.
///
/// Content errors pass through unchanged. Anything else becomes a
/// `Configuration` error whose context holds the original message, the
/// cause chain and the backtrace when one was captured.
pub fn to_content_error(err: anyhow::Error) -> ContentError {
    match err.downcast::<ContentError>() {
        Ok(content_error) => content_error,
        Err(err) => {
            let chain: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
            let mut context = json!({ "original": err.to_string(), "chain": chain });

            let backtrace = err.backtrace();
            if backtrace.status() == BacktraceStatus::Captured {
                context["backtrace"] = json!(backtrace.to_string());
            }

            ContentError::Configuration {
                message: format!("Unexpected error: {err}"),
                context,
            }
        }
    }
}
