use serde::{Deserialize, Serialize};

use wsb_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, e.g. `build.output_timeout`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod build;
pub mod general;
pub mod resolver;
pub mod sync;

pub use build::*;
pub use general::*;
pub use resolver::*;
pub use sync::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Workspace scan and resolution
    Resolver(ResolverEvent),

    /// Build queue and per-run pipeline
    Build(BuildEvent),

    /// Filesystem mirroring
    Sync(SyncEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Build(BuildEvent::RunFailed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Resolver(ResolverEvent::PackageSkipped { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Resolver(ResolverEvent::DependencySkipped { .. })
            | Self::Build(BuildEvent::OutputPending { .. })
            | Self::Sync(SyncEvent::Replaced { .. }) => Level::DEBUG,

            Self::Sync(SyncEvent::FileCopied { .. } | SyncEvent::EntryRemoved { .. }) => {
                Level::TRACE
            }

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "wsb::events::general",
            Self::Resolver(_) => "wsb::events::resolver",
            Self::Build(_) => "wsb::events::build",
            Self::Sync(_) => "wsb::events::sync",
        }
    }

    /// Get structured fields for logging
    #[must_use]
    pub fn log_fields(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
