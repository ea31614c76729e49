//! Version and range parsing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version range: {input}")]
    InvalidRange { input: String },

    #[error("version parse error: {message}")]
    ParseError { message: String },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ParseError { .. } => {
                Some("Use semantic-version strings like 1.2.3 in the manifest.")
            }
            Self::InvalidRange { .. } => {
                Some("Use caret (`^`), tilde (`~`), comparison, hyphen or x-range syntax.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidRange { .. } => "version.invalid_range",
            Self::ParseError { .. } => "version.parse_error",
        };
        Some(code)
    }
}
