//! Unified error types for catalog-delta.
//!
//! Errors fall into three families: validation errors for malformed input
//! documents and rules, reference errors for resource references that do not
//! parse, and report errors for output that cannot be produced. Every error is
//! a value scoped to one host's comparison or one merge; none is fatal to the
//! process.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for catalog-delta operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PreviewError {
    /// Malformed input documents, rules or overview snapshots
    #[error("Validation failed: {context}")]
    Validation {
        context: String,
        #[source]
        source: ValidationErrorKind,
    },

    /// Resource references that do not resolve to `Type[title]`
    #[error("Invalid reference: {context}")]
    Reference {
        context: String,
        #[source]
        source: ReferenceErrorKind,
    },

    /// Errors during report generation
    #[error("Report generation failed: {context}")]
    Report {
        context: String,
        #[source]
        source: ReportErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Specific validation error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ValidationErrorKind {
    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid field value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("Invalid entity id '{key}': {message}")]
    InvalidEntityId { key: String, message: String },

    #[error("Exit code {0} does not denote a compilation failure (expected 2 or 3)")]
    NotAFailure(i32),
}

/// Specific reference error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReferenceErrorKind {
    #[error("Malformed resource reference '{0}' (expected Type[title])")]
    MalformedResource(String),

    #[error("Malformed resource type name '{0}'")]
    MalformedType(String),

    #[error("Entity {0} does not exist in this overview")]
    UnknownEntity(u64),

    #[error("Entity {id} is a {actual}, expected {expected}")]
    WrongKind {
        id: u64,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Specific report error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReportErrorKind {
    #[error("JSON serialization failed: {0}")]
    JsonSerialization(String),

    #[error("Text rendering failed: {0}")]
    Format(#[from] std::fmt::Error),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for catalog-delta operations
pub type Result<T> = std::result::Result<T, PreviewError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl PreviewError {
    /// Create a validation error with context
    pub fn validation(context: impl Into<String>, source: ValidationErrorKind) -> Self {
        Self::Validation {
            context: context.into(),
            source,
        }
    }

    /// Create a validation error for a missing field
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::validation(
            "missing required field",
            ValidationErrorKind::MissingField {
                field: field.into(),
                context: context.into(),
            },
        )
    }

    /// Create a validation error for an invalid field value
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(
            "invalid field value",
            ValidationErrorKind::InvalidValue {
                field: field.into(),
                message: message.into(),
            },
        )
    }

    /// Create a reference error with context
    pub fn reference(context: impl Into<String>, source: ReferenceErrorKind) -> Self {
        Self::Reference {
            context: context.into(),
            source,
        }
    }

    /// Create a reference error for a malformed `Type[title]` string
    pub fn malformed_resource(reference: impl Into<String>) -> Self {
        Self::reference(
            "parsing resource reference",
            ReferenceErrorKind::MalformedResource(reference.into()),
        )
    }

    /// Create a report error
    pub fn report(context: impl Into<String>, source: ReportErrorKind) -> Self {
        Self::Report {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error was caused by malformed input rather than a bad reference
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error was caused by a reference that does not resolve
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for PreviewError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PreviewError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(
            "JSON deserialization",
            ValidationErrorKind::InvalidJson(err.to_string()),
        )
    }
}

impl From<std::fmt::Error> for PreviewError {
    fn from(err: std::fmt::Error) -> Self {
        Self::report("rendering text", ReportErrorKind::Format(err))
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context, creating
/// a chain that shows the path through the code.
///
/// ```ignore
/// use catalog_delta::error::ErrorContext;
///
/// let catalog = Catalog::from_json_str(&content)
///     .with_context(|| format!("loading baseline catalog {}", path.display()))?;
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<PreviewError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: PreviewError, new_ctx: &str) -> PreviewError {
    match err {
        PreviewError::Validation {
            context: existing,
            source,
        } => PreviewError::Validation {
            context: chain_context(new_ctx, &existing),
            source,
        },
        PreviewError::Reference {
            context: existing,
            source,
        } => PreviewError::Reference {
            context: chain_context(new_ctx, &existing),
            source,
        },
        PreviewError::Report {
            context: existing,
            source,
        } => PreviewError::Report {
            context: chain_context(new_ctx, &existing),
            source,
        },
        PreviewError::Io {
            path,
            message,
            source,
        } => PreviewError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        PreviewError::Config(msg) => PreviewError::Config(chain_context(new_ctx, &msg)),
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to a missing-field error naming `field` within `context`.
    fn required(self, field: &str, context: &str) -> Result<T>;
}

impl<T> OptionContext<T> for Option<T> {
    fn required(self, field: &str, context: &str) -> Result<T> {
        self.ok_or_else(|| PreviewError::missing_field(field, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PreviewError::malformed_resource("File/tmp/x");
        let display = err.to_string();
        assert!(display.contains("Invalid reference"), "{display}");

        let err = PreviewError::missing_field("environment", "catalog");
        let display = err.to_string();
        assert!(display.contains("missing required field"), "{display}");
        let source = std::error::Error::source(&err).expect("has source").to_string();
        assert!(source.contains("environment"), "{source}");
    }

    #[test]
    fn test_error_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = PreviewError::io("/path/to/catalog.json", io_err);

        assert!(err.to_string().contains("/path/to/catalog.json"));
    }

    #[test]
    fn test_context_chaining_multiple_levels() {
        fn inner() -> Result<()> {
            Err(PreviewError::malformed_resource("nope"))
        }

        fn middle() -> Result<()> {
            inner().context("comparing edges")
        }

        fn outer() -> Result<()> {
            middle().context("node web01")
        }

        match outer() {
            Err(PreviewError::Reference { context, .. }) => {
                assert_eq!(
                    context,
                    "node web01: comparing edges: parsing resource reference"
                );
            }
            other => panic!("Expected Reference error, got {other:?}"),
        }
    }

    #[test]
    fn test_with_context_only_formats_on_error() {
        let mut formatted = Vec::new();

        let parsed: Result<u64> = Ok(7);
        let _ = parsed.with_context(|| {
            formatted.push("web01");
            "indexing web01"
        });
        assert!(formatted.is_empty());

        let failed: Result<u64> = Err(PreviewError::malformed_resource("Package["));
        let err = failed
            .with_context(|| {
                formatted.push("web02");
                "indexing web02"
            })
            .unwrap_err();
        assert_eq!(formatted, ["web02"]);
        assert!(err.to_string().contains("indexing web02"), "{err}");
    }

    #[test]
    fn test_serde_json_errors_are_validation_errors() {
        let err: PreviewError = serde_json::from_str::<serde_json::Value>("{")
            .expect_err("truncated JSON")
            .into();
        assert!(err.is_validation());
        assert!(!err.is_reference());
    }

    #[test]
    fn test_option_required() {
        assert_eq!(Some(3).required("line", "location").unwrap(), 3);

        match None::<u64>.required("line", "location") {
            Err(PreviewError::Validation {
                source: ValidationErrorKind::MissingField { field, context },
                ..
            }) => {
                assert_eq!(field, "line");
                assert_eq!(context, "location");
            }
            other => panic!("Expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_context_helper() {
        assert_eq!(chain_context("merging web01", ""), "merging web01");
        assert_eq!(
            chain_context("merging web01", "edge source"),
            "merging web01: edge source"
        );
    }
}
