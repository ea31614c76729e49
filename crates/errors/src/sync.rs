//! Artifact synchronization error types
//!
//! A failed sync may leave the destination partially written. `replace`
//! and `copy` converge when re-run against an unchanged source, so every
//! variant here is reported as retryable.

use std::borrow::Cow;
use std::path::Path;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("copy failed: {src} -> {dst}: {message}")]
    CopyFailed {
        src: String,
        dst: String,
        message: String,
    },

    #[error("remove failed: {path}: {message}")]
    RemoveFailed { path: String, message: String },

    #[error("cannot create directory {path}: {message}")]
    CreateDirFailed { path: String, message: String },

    #[error("source missing: {path}")]
    SourceMissing { path: String },
}

impl SyncError {
    /// Build a copy failure from an I/O error
    #[must_use]
    pub fn copy(err: &std::io::Error, src: &Path, dst: &Path) -> Self {
        Self::CopyFailed {
            src: src.display().to_string(),
            dst: dst.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Build a removal failure from an I/O error
    #[must_use]
    pub fn remove(err: &std::io::Error, path: &Path) -> Self {
        Self::RemoveFailed {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Build a directory creation failure from an I/O error
    #[must_use]
    pub fn create_dir(err: &std::io::Error, path: &Path) -> Self {
        Self::CreateDirFailed {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl UserFacingError for SyncError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RemoveFailed { .. } => {
                Some("Close programs holding files in the dependency folder, then rebuild.")
            }
            _ => Some("Rebuilding is safe; the sync converges on a repeated run."),
        }
    }

    fn is_retryable(&self) -> bool {
        true
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CopyFailed { .. } => "sync.copy_failed",
            Self::RemoveFailed { .. } => "sync.remove_failed",
            Self::CreateDirFailed { .. } => "sync.create_dir_failed",
            Self::SourceMissing { .. } => "sync.source_missing",
        };
        Some(code)
    }
}
