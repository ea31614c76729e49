//! Dependency installation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("install failed in {directory}: {message}")]
    InstallFailed { directory: String, message: String },

    #[error("concurrency error: {message}")]
    ConcurrencyError { message: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallFailed { .. } => {
                Some("Run the package manager's install in that folder to see the full output.")
            }
            Self::ConcurrencyError { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::InstallFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InstallFailed { .. } => "install.failed",
            Self::ConcurrencyError { .. } => "install.concurrency_error",
        };
        Some(code)
    }
}
