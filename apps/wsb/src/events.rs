//! Event handling and progress display

use console::{style, Term};
use std::time::Duration;
use wsb_events::{AppEvent, BuildEvent, GeneralEvent, ResolverEvent};

use crate::logging::log_event_with_tracing;

/// Renders progress lines on stderr and forwards every event to tracing
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// JSON mode: log only, no human-readable lines
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::General(general) => self.handle_general(general),
            AppEvent::Resolver(resolver) => self.handle_resolver(resolver),
            AppEvent::Build(build) => self.handle_build(build),
            AppEvent::Sync(_) => {}
        }
    }

    fn handle_general(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message} ({context})")),
                None => self.show_warning(&message),
            },
            GeneralEvent::Error { message, details } => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
            GeneralEvent::DebugLog { message, .. } => self.show_debug(&message),
            GeneralEvent::OperationStarted { operation } => self.show_debug(&operation),
            GeneralEvent::OperationCompleted { .. } => {}
            GeneralEvent::OperationFailed { operation, error } => {
                self.show_debug(&format!("{operation} failed: {error}"));
            }
        }
    }

    fn handle_resolver(&self, event: ResolverEvent) {
        match event {
            ResolverEvent::ScanStarted { roots } => {
                let roots: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
                self.show_status(&format!("Scanning {}", roots.join(", ")));
            }
            ResolverEvent::ScanCompleted {
                packages,
                watched,
                marker,
                ..
            } => {
                self.show_status(&format!(
                    "Found {packages} packages, {watched} watched ({marker})"
                ));
            }
            ResolverEvent::PackageSkipped { path, reason } => {
                self.show_warning(&format!("Skipped {}: {reason}", path.display()));
            }
            ResolverEvent::DependencySkipped {
                package,
                dependency,
                range,
                reason,
            } => {
                self.show_debug(&format!("{package}: {dependency}@{range} not linked ({reason})"));
            }
            ResolverEvent::ResolutionCompleted {
                projects, tasks, ..
            } => {
                self.show_status(&format!(
                    "Resolved {tasks} copy tasks for {projects} projects"
                ));
            }
            ResolverEvent::PackageWatched { manifest, .. } => {
                self.show_success(&format!("Watching {}", manifest.display()));
            }
        }
    }

    fn handle_build(&self, event: BuildEvent) {
        match event {
            BuildEvent::Queued {
                task_id, position, ..
            } if position > 0 => {
                self.show_status(&format!(
                    "Build #{task_id} queued behind {position} other build(s)"
                ));
            }
            BuildEvent::RunStarted {
                task_id,
                projects,
                copy_tasks,
                excluded,
            } => {
                let mut line =
                    format!("Build #{task_id}: {projects} projects, {copy_tasks} copy tasks");
                if excluded > 0 {
                    line.push_str(&format!(", {excluded} excluded by included_patterns"));
                }
                self.show_status(&line);
            }
            BuildEvent::PhaseStarted { phase, items, .. } if items > 0 => {
                self.show_status(&format!("{}...", capitalize(&phase.to_string())));
            }
            BuildEvent::PhaseStillRunning {
                phase, elapsed_ms, ..
            } => {
                self.show_status(&format!("Still {phase} ({}s)", elapsed_ms / 1000));
            }
            BuildEvent::ProjectInstalled { directory } => {
                self.show_debug(&format!("Installed {}", directory.display()));
            }
            BuildEvent::ModuleInstalled { module } => {
                self.show_debug(&format!("Installed {}", module.display()));
            }
            BuildEvent::ModuleBuilt { module } => {
                self.show_success(&format!("Built {}", module.display()));
            }
            BuildEvent::OutputPending { path, .. } => {
                self.show_debug(&format!("Waiting for {}", path.display()));
            }
            BuildEvent::SyncCompleted {
                module,
                destination,
                ..
            } => {
                self.show_debug(&format!(
                    "Copied {} -> {}",
                    module.display(),
                    destination.display()
                ));
            }
            BuildEvent::RunCompleted {
                task_id,
                modules,
                duration_ms,
                ..
            } => {
                self.show_success(&format!(
                    "Build #{task_id} finished: {modules} modules in {:.1}s",
                    Duration::from_millis(duration_ms).as_secs_f64()
                ));
            }
            BuildEvent::RunFailed {
                task_id,
                phase,
                failure,
            } => {
                let phase = phase.map_or_else(String::new, |p| format!(" while {p}"));
                self.show_error(&format!("Build #{task_id} failed{phase}: {}", failure.message));
                if let Some(hint) = failure.hint {
                    self.show_hint(&hint);
                }
            }
            _ => {}
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_success(&self, message: &str) {
        if self.colors_enabled {
            let _ = self.term.write_line(&format!("{}", style(message).green()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn show_warning(&self, message: &str) {
        if self.colors_enabled {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("warning:").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("warning: {message}"));
        }
    }

    fn show_error(&self, message: &str) {
        if self.colors_enabled {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("error:").red().bold()));
        } else {
            let _ = self.term.write_line(&format!("error: {message}"));
        }
    }

    fn show_hint(&self, hint: &str) {
        if self.colors_enabled {
            let _ = self.term.write_line(&format!("  {}", style(hint).dim()));
        } else {
            let _ = self.term.write_line(&format!("  {hint}"));
        }
    }

    fn show_debug(&self, message: &str) {
        if !self.debug_enabled {
            return;
        }
        if self.colors_enabled {
            let _ = self.term.write_line(&format!("{}", style(message).dim()));
        } else {
            let _ = self.term.write_line(message);
        }
    }
}

// Phase labels are lower case ("building modules")
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
