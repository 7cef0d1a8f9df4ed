//! Errors raised while loading adapter inputs from disk.

use std::path::PathBuf;

use pbxgen_core::error::PbxError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Cannot read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid JSON in {path} at line {line}, column {column}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        reason: String,
    },
}

impl LoadError {
    pub(crate) fn read(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, e: &serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            line: e.line(),
            column: e.column(),
            reason: e.to_string(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

impl From<LoadError> for PbxError {
    fn from(e: LoadError) -> Self {
        PbxError::Configuration {
            message: e.to_string(),
        }
    }
}
