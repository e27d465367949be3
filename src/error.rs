//! # Error Handling
//!
//! One error type, [`LensError`], covers every failure the document-comparison
//! flow can surface: crop geometry, capture devices, document ingestion, the
//! credential store and the remote analysis call.
//!
//! Each variant carries an [`ErrorContext`] with extra context, a retry flag
//! and an optional hint for the user. Classification is exposed through two
//! small traits:
//!
//! - `Retryable`: the same call may succeed if repeated
//! - `HasRecoverySuggestion`: what the user can do about it
//!
//! ## Usage
//!
//! ```rust
//! use difflens::error::{LensError, Retryable, HasRecoverySuggestion};
//!
//! let error = LensError::analysis("generate_content", "empty response")
//!     .with_context("comparing 2 + 3 documents")
//!     .with_recovery_suggestion("Retry, or reduce the number of pages per set");
//!
//! assert!(error.is_retryable());
//! assert!(error.recovery_suggestion().is_some());
//! ```

use std::{error::Error as StdError, fmt};

use lens_crop::cpu::ScaleError;
use lens_crop::viewport::GeometryError;

/// Extra information attached to every [`LensError`]
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Base error type for DiffLens
#[derive(Debug)]
pub enum LensError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Viewport or crop geometry that cannot be mapped
    Geometry {
        source: GeometryError,
        context: ErrorContext,
    },
    /// Capture device failures (not ready, permission, frame grab)
    Capture {
        device: String,
        reason: String,
        context: ErrorContext,
    },
    /// Pixel extraction or still encoding failures
    Processing {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// A document could not be read or understood
    Document {
        name: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// Timeout errors
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },
    /// Validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// State errors (invalid state transitions)
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Network errors
    Network {
        operation: String,
        status: Option<u16>,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Missing or rejected API credential
    Auth {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// The model answered but the answer is unusable (empty, blocked)
    Analysis {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
}

impl LensError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a geometry error
    pub fn geometry(source: GeometryError) -> Self {
        Self::Geometry {
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a capture device error
    pub fn capture(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Capture {
            device: device.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a processing error
    pub fn processing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a document error
    pub fn document(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Document {
            name: name.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.as_ref().display().to_string()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            status: None,
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create a network error for a non-success HTTP status
    pub fn http_status(operation: impl Into<String>, status: u16) -> Self {
        Self::Network {
            operation: operation.into(),
            status: Some(status),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create an authentication error
    pub fn auth(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an analysis error
    pub fn analysis(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Analysis {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.context_mut().retryable = true;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Geometry { context, .. } => context,
            Self::Capture { context, .. } => context,
            Self::Processing { context, .. } => context,
            Self::Document { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::Auth { context, .. } => context,
            Self::Analysis { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Geometry { context, .. } => context,
            Self::Capture { context, .. } => context,
            Self::Processing { context, .. } => context,
            Self::Document { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::Auth { context, .. } => context,
            Self::Analysis { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Geometry { .. } => "geometry",
            Self::Capture { .. } => "capture",
            Self::Processing { .. } => "processing",
            Self::Document { .. } => "document",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
            Self::Timeout { .. } => "timeout",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
            Self::Network { .. } => "network",
            Self::Auth { .. } => "auth",
            Self::Analysis { .. } => "analysis",
        }
    }

    /// The message shown to a user: the error, its context and the hint, if any.
    pub fn describe(&self) -> String {
        let ctx = self.context();
        let mut text = self.to_string();
        if let Some(context) = &ctx.context {
            text.push_str(": ");
            text.push_str(context);
        }
        if let Some(hint) = &ctx.recovery_suggestion {
            text.push_str("\n  hint: ");
            text.push_str(hint);
        }
        text
    }
}

impl fmt::Display for LensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LensError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            LensError::Geometry { source, .. } => write!(f, "Invalid crop geometry: {}", source),
            LensError::Capture { device, reason, .. } => {
                write!(f, "Capture from {} failed: {}", device, reason)
            }
            LensError::Processing {
                operation, reason, ..
            } => {
                write!(f, "Processing failed during {}: {}", operation, reason)
            }
            LensError::Document { name, reason, .. } => {
                write!(f, "Document '{}' could not be used: {}", name, reason)
            }
            LensError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            LensError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
            LensError::Timeout {
                operation,
                duration_ms,
                ..
            } => {
                write!(f, "Timeout during {} after {}ms", operation, duration_ms)
            }
            LensError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            LensError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            LensError::Network {
                operation,
                status,
                source,
                ..
            } => match (status, source) {
                (Some(status), _) => {
                    write!(f, "Network error during {}: HTTP {}", operation, status)
                }
                (None, Some(source)) => write!(f, "Network error during {}: {}", operation, source),
                (None, None) => write!(f, "Network error during {}", operation),
            },
            LensError::Auth {
                operation, reason, ..
            } => {
                write!(f, "Authentication error during {}: {}", operation, reason)
            }
            LensError::Analysis {
                operation, reason, ..
            } => {
                write!(f, "Analysis failed during {}: {}", operation, reason)
            }
        }
    }
}

impl StdError for LensError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Geometry { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            Self::Network {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type LensResult<T> = Result<T, LensError>;

/// Trait for errors that can be retried
pub trait Retryable {
    /// Check if this error can be retried
    fn is_retryable(&self) -> bool;
}

impl Retryable for LensError {
    fn is_retryable(&self) -> bool {
        self.context().retryable
            || matches!(
                self,
                Self::Timeout { .. } | Self::Analysis { .. } | Self::Capture { .. }
            )
            || matches!(self, Self::Network { status, .. } if status.is_none_or(|s| s == 429 || s >= 500))
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for LensError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

impl From<std::io::Error> for LensError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<GeometryError> for LensError {
    fn from(error: GeometryError) -> Self {
        Self::geometry(error)
    }
}

impl From<ScaleError> for LensError {
    fn from(error: ScaleError) -> Self {
        Self::processing("crop_scale", error.to_string())
    }
}

impl From<image::ImageError> for LensError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}

impl From<serde_json::Error> for LensError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<base64::DecodeError> for LensError {
    fn from(error: base64::DecodeError) -> Self {
        Self::validation("base64", "invalid encoding", error.to_string())
    }
}

impl From<reqwest::Error> for LensError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::timeout("http_request", 0).retryable();
        }
        let status = error.status().map(|s| s.as_u16());
        Self::Network {
            operation: "http_request".to_string(),
            status,
            source: Some(Box::new(error)),
            context: ErrorContext::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = LensError::config("model", "", "must not be empty");
        assert_eq!(error.category(), "config");
        assert!(!error.is_retryable());
        assert!(error.recovery_suggestion().is_none());
    }

    #[test]
    fn test_error_with_context() {
        let error = LensError::processing("encode_jpeg", "zero-sized still")
            .with_context("capturing photo 3 for set 1")
            .with_recovery_suggestion("move the document into the guide")
            .retryable();

        assert_eq!(error.category(), "processing");
        assert!(error.is_retryable());
        assert_eq!(
            error.recovery_suggestion(),
            Some("move the document into the guide")
        );
    }

    #[test]
    fn test_geometry_error_keeps_source() {
        let error: LensError = GeometryError::InvalidFrame { width: 0, height: 0 }.into();
        assert_eq!(error.category(), "geometry");
        assert!(error.source().is_some());
        assert!(error.to_string().contains("0x0"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_http_status_retry_policy() {
        assert!(LensError::http_status("generate_content", 503).is_retryable());
        assert!(LensError::http_status("generate_content", 429).is_retryable());
        assert!(!LensError::http_status("generate_content", 400).is_retryable());
        assert!(LensError::network("connect").is_retryable());
    }

    #[test]
    fn test_auth_is_not_retried() {
        let error = LensError::auth("generate_content", "API key rejected")
            .with_recovery_suggestion("Check the API key with `difflens key set`");
        assert!(!error.is_retryable());
        assert_eq!(error.category(), "auth");
        assert!(error.to_string().contains("API key rejected"));
        assert!(error.describe().ends_with("hint: Check the API key with `difflens key set`"));
    }

    #[test]
    fn test_describe_includes_context() {
        let error = LensError::http_status("generate_content", 400).with_context("Request too large");
        assert_eq!(
            error.describe(),
            "Network error during generate_content: HTTP 400: Request too large"
        );
    }
}
