//! Forward application events to tracing

use tracing::{debug, error, info, trace, warn};
use wsb_events::{AppEvent, BuildEvent, GeneralEvent};

/// Log an event at its own level, with the event serialized as a field
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.log_target();

    match event {
        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(source, message = %message, context = ?context, "Warning");
        }
        AppEvent::General(GeneralEvent::Error { message, details }) => {
            error!(source, message = %message, details = ?details, "Error");
        }
        AppEvent::Build(BuildEvent::RunFailed {
            task_id,
            phase,
            failure,
        }) => {
            error!(
                source,
                task_id,
                phase = ?phase,
                code = ?failure.code,
                message = %failure.message,
                retryable = failure.retryable,
                "Build run failed"
            );
        }
        _ => {
            let fields = event.log_fields();
            match event.log_level() {
                tracing::Level::ERROR => error!(source, event = %fields, "Application event"),
                tracing::Level::WARN => warn!(source, event = %fields, "Application event"),
                tracing::Level::INFO => info!(source, event = %fields, "Application event"),
                tracing::Level::DEBUG => debug!(source, event = %fields, "Application event"),
                _ => trace!(source, event = %fields, "Application event"),
            }
        }
    }
}
