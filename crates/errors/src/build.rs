//! Module build error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("error building module {module}: `{script}` failed: {message}")]
    ScriptFailed {
        module: String,
        script: String,
        message: String,
    },

    #[error("build output {path} of {module} did not appear within {waited_ms} ms")]
    BuildOutputTimeout {
        module: String,
        path: String,
        waited_ms: u64,
    },

    #[error("build orchestrator is no longer running")]
    OrchestratorClosed,
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ScriptFailed { .. } => {
                Some("Run the build script inside the module folder to see the full output.")
            }
            Self::BuildOutputTimeout { .. } => Some(
                "Check that the manifest's `files` entries match what the build writes, or raise timing.output_timeout_ms.",
            ),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::BuildOutputTimeout { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ScriptFailed { .. } => "build.script_failed",
            Self::BuildOutputTimeout { .. } => "build.output_timeout",
            Self::OrchestratorClosed => "build.orchestrator_closed",
        };
        Some(code)
    }
}
