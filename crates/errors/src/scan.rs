//! Workspace scanning error types
//!
//! None of these abort a scan: an unreadable or malformed manifest is
//! logged and the package is left out of the package map.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ScanError {
    #[error("cannot read manifest {path}: {message}")]
    ManifestUnreadable { path: String, message: String },

    #[error("invalid manifest {path}: {message}")]
    ManifestInvalid { path: String, message: String },

    #[error("failed to walk {path}: {message}")]
    WalkFailed { path: String, message: String },

    #[error("not a package: {path} - {reason}")]
    NotAPackage { path: String, reason: String },

    #[error("duplicate package name {name}: {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },
}

impl UserFacingError for ScanError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestInvalid { .. } => {
                Some("Fix the JSON syntax and the name/version fields of the manifest.")
            }
            Self::NotAPackage { .. } => {
                Some("Select a package.json file or a folder that directly contains one.")
            }
            Self::DuplicateName { .. } => {
                Some("Give every local package a unique name; the first one found is used.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ManifestUnreadable { .. } => "scan.manifest_unreadable",
            Self::ManifestInvalid { .. } => "scan.manifest_invalid",
            Self::WalkFailed { .. } => "scan.walk_failed",
            Self::NotAPackage { .. } => "scan.not_a_package",
            Self::DuplicateName { .. } => "scan.duplicate_name",
        };
        Some(code)
    }
}
