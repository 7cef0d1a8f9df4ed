//! Unified error handling for pbxgen-core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::{
    ApplicationError,
    error::{CacheError, FilesystemError, GenerationError, WritingError},
};
use crate::domain::DomainError;

/// Root error type for pbxgen-core operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PbxError {
    /// The spec is structurally invalid.
    #[error("Spec validation failed: {0}")]
    Domain(#[from] DomainError),

    /// Resolution, writing or caching failed.
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl From<GenerationError> for PbxError {
    fn from(e: GenerationError) -> Self {
        Self::Application(e.into())
    }
}

impl From<WritingError> for PbxError {
    fn from(e: WritingError) -> Self {
        Self::Application(e.into())
    }
}

impl From<CacheError> for PbxError {
    fn from(e: CacheError) -> Self {
        Self::Application(e.into())
    }
}

impl From<FilesystemError> for PbxError {
    fn from(e: FilesystemError) -> Self {
        Self::Application(e.into())
    }
}

impl PbxError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check your setup and try again".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in pbxgen".into(),
                "Please report this issue at: https://github.com/cosecruz/pbxgen/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Compatibility => ErrorCategory::Compatibility,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether the error came from the cache and may be ignored.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Application(ApplicationError::Cache(_)))
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Generation,
    Io,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type PbxResult<T> = Result<T, PbxError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> PbxResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> PbxResult<T> {
        self.map_err(|e| PbxError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
