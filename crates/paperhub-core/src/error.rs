//! Unified application error types for PaperHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found, or the caller may not see it.
    NotFound,
    /// The caller is known but lacks the role required for the action.
    Forbidden,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// A summarization attempt is already live for the file.
    AlreadyProcessing,
    /// The requested summary style is not one of the supported styles.
    InvalidStyle,
    /// No workspace matches the supplied invite code.
    InviteCodeInvalid,
    /// The caller is already a member of the workspace.
    AlreadyMember,
    /// The requested summary version does not exist.
    NoSummary,
    /// An object storage call failed.
    StorageUnavailable,
    /// The AI worker was unreachable or answered with a non-success status.
    UpstreamUnavailable,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// HTTP status code an outer surface should use for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound | Self::NoSummary => 404,
            Self::Forbidden => 403,
            Self::Validation | Self::InvalidStyle | Self::InviteCodeInvalid => 400,
            Self::Conflict | Self::AlreadyProcessing | Self::AlreadyMember => 409,
            Self::StorageUnavailable => 503,
            Self::UpstreamUnavailable => 502,
            Self::Database | Self::Configuration | Self::Serialization | Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::AlreadyProcessing => write!(f, "ALREADY_PROCESSING"),
            Self::InvalidStyle => write!(f, "INVALID_STYLE"),
            Self::InviteCodeInvalid => write!(f, "INVITE_CODE_INVALID"),
            Self::AlreadyMember => write!(f, "ALREADY_MEMBER"),
            Self::NoSummary => write!(f, "NO_SUMMARY"),
            Self::StorageUnavailable => write!(f, "STORAGE_UNAVAILABLE"),
            Self::UpstreamUnavailable => write!(f, "UPSTREAM_UNAVAILABLE"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

/// The unified application error used throughout PaperHub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Field-level details, populated for validation failures.
    pub fields: Vec<FieldError>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: Vec::new(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: Vec::new(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a validation error pinned to a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self {
            kind: ErrorKind::Validation,
            message: format!("{field}: {message}"),
            fields: vec![FieldError { field, message }],
            source: None,
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an already-processing error.
    pub fn already_processing() -> Self {
        Self::new(
            ErrorKind::AlreadyProcessing,
            "A summary is already being generated for this file",
        )
    }

    /// Create an invalid-style error.
    pub fn invalid_style(style: &str) -> Self {
        Self::new(
            ErrorKind::InvalidStyle,
            format!("Invalid summary style '{style}'"),
        )
    }

    /// Create an invalid-invite-code error.
    pub fn invite_code_invalid() -> Self {
        Self::new(ErrorKind::InviteCodeInvalid, "Invalid invite code")
    }

    /// Create an already-member error.
    pub fn already_member() -> Self {
        Self::new(
            ErrorKind::AlreadyMember,
            "You are already a member of this workspace",
        )
    }

    /// Create a no-summary error.
    pub fn no_summary(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoSummary, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageUnavailable, message)
    }

    /// Create an upstream (AI worker) error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            fields: self.fields.clone(),
            source: None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, list)| {
                list.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        let summary = fields
            .iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            kind: ErrorKind::Validation,
            message: format!("Validation failed: {summary}"),
            fields,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(
            ErrorKind::StorageUnavailable,
            format!("I/O error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct SignupForm {
        #[validate(length(min = 1, max = 3))]
        name: String,
    }

    #[test]
    fn test_validation_errors_keep_field_detail() {
        let form = SignupForm {
            name: "toolong".into(),
        };
        let err: AppError = form.validate().unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields[0].field, "name");
    }

    #[test]
    fn test_not_found_and_forbidden_map_to_distinct_codes() {
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::AlreadyProcessing.status_code(), 409);
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("disk");
        let err = AppError::from(io);
        let cloned = err.clone();
        assert!(cloned.source.is_none());
        assert_eq!(cloned.kind, ErrorKind::StorageUnavailable);
    }
}
