//! Application layer errors.
//!
//! These errors represent failures while resolving, writing or caching, not
//! spec validation. Validation errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// I/O failure reported by a filesystem port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to {operation} {path}: {reason}")]
pub struct FilesystemError {
    pub path: PathBuf,
    pub operation: &'static str,
    pub reason: String,
}

/// Failure during resolution or graph building. No graph is exposed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Cannot read source path {path}: {reason}")]
    UnreadablePath { path: PathBuf, reason: String },

    #[error("Cannot read build script {path}: {reason}")]
    UnreadableScript { path: PathBuf, reason: String },

    #[error("Target '{target}' depends on '{reference}', which was not found at {expected}")]
    UnresolvedDependency {
        target: String,
        reference: String,
        expected: PathBuf,
    },

    #[error("Settings group cycle: {chain}")]
    SettingsGroupCycle { chain: String },

    #[error("Graph has {count} unresolved references, first: {first}")]
    IncompleteGraph { count: usize, first: String },

    #[error("Worker pool failed: {reason}")]
    WorkerPool { reason: String },
}

/// I/O failure while writing the project. Previous state is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WritingError {
    #[error("Failed to write {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Project already exists at {path}")]
    BundleExists { path: PathBuf },

    #[error("Rollback failed for {path}: {reason}")]
    RollbackFailed { path: PathBuf, reason: String },
}

/// Recoverable cache failure; generation proceeds without the cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to read cache {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write cache {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Failed to compute signature: {reason}")]
    Signature { reason: String },
}

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Writing(#[from] WritingError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Shared state lock was poisoned.
    #[error("Internal store lock poisoned")]
    StoreLockError,
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Generation(GenerationError::UnreadablePath { path, .. }) => vec![
                format!("Check that {} exists and is readable", path.display()),
                "Mark the source as optional if it is produced later".into(),
            ],
            Self::Generation(GenerationError::UnresolvedDependency { expected, .. }) => vec![
                format!("Build the framework so that {} exists", expected.display()),
                "Or run without strict dependency resolution".into(),
            ],
            Self::Generation(GenerationError::SettingsGroupCycle { .. }) => {
                vec!["Remove the group that includes itself".into()]
            }
            Self::Writing(WritingError::BundleExists { path }) => vec![
                format!("A project already exists at {}", path.display()),
                "Pass --force to replace it".into(),
            ],
            Self::Writing(_) | Self::Filesystem(_) => vec![
                "Check that you have write permissions".into(),
                "Ensure the destination directory exists".into(),
            ],
            Self::Cache(_) => vec!["Delete the cache file or pass --no-cache".into()],
            Self::StoreLockError => vec!["Try again in a moment".into()],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Generation(GenerationError::UnresolvedDependency { .. }) => {
                ErrorCategory::NotFound
            }
            Self::Generation(GenerationError::IncompleteGraph { .. })
            | Self::Generation(GenerationError::WorkerPool { .. })
            | Self::StoreLockError => ErrorCategory::Internal,
            Self::Generation(_) => ErrorCategory::Generation,
            Self::Writing(WritingError::BundleExists { .. }) => ErrorCategory::Validation,
            Self::Writing(_) | Self::Filesystem(_) | Self::Cache(_) => ErrorCategory::Io,
        }
    }
}
