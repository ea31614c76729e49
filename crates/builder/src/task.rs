//! Build requests, queue records and run reports

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use wsb_config::IncludeFilter;
use wsb_errors::Error;
use wsb_types::CopyTask;

/// Index of a build task in the orchestrator's arena
pub type BuildTaskId = usize;

/// What one build run covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    /// Watched project directories whose dependencies may need installing
    pub projects: Vec<PathBuf>,
    pub tasks: Vec<CopyTask>,
}

impl BuildRequest {
    #[must_use]
    pub fn new(projects: Vec<PathBuf>, tasks: Vec<CopyTask>) -> Self {
        Self { projects, tasks }
    }

    /// Drop projects and tasks outside the allow-list
    ///
    /// A task is kept only if both its destination and its module directory
    /// pass. Returns the number of entries removed.
    pub fn retain_included(&mut self, filter: &IncludeFilter) -> usize {
        if filter.is_empty() {
            return 0;
        }
        let before = self.projects.len() + self.tasks.len();
        self.projects.retain(|p| filter.matches(p));
        self.tasks
            .retain(|t| filter.matches(&t.destination) && filter.matches(&t.module_path));
        before - self.projects.len() - self.tasks.len()
    }

    /// Distinct module directories, in first-reference order
    #[must_use]
    pub fn modules(&self) -> Vec<PathBuf> {
        let mut modules: Vec<PathBuf> = Vec::new();
        for task in &self.tasks {
            if !modules.contains(&task.module_path) {
                modules.push(task.module_path.clone());
            }
        }
        modules
    }
}

/// Outcome of a successful build run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub task_id: BuildTaskId,
    pub projects: Vec<PathBuf>,
    pub modules: Vec<PathBuf>,
    pub copy_tasks: usize,
    /// Projects and tasks removed by the allow-list
    pub excluded: usize,
    /// Some project had no `node_modules` and was installed during this run
    pub fresh_install: bool,
    pub files_copied: usize,
    pub entries_removed: usize,
    #[serde(skip)]
    pub duration: Duration,
}

/// Lifecycle of one queued build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// Whether the orchestrator is currently executing a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// Snapshot published on every state change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStatus {
    pub state: RunState,
    /// Requests waiting behind the current run
    pub queued: usize,
    pub current: Option<BuildTaskId>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Arena entry for one submitted request
#[derive(Debug)]
pub(crate) struct BuildTaskRecord {
    pub(crate) state: TaskState,
    /// Taken when the run starts
    pub(crate) request: Option<BuildRequest>,
    pub(crate) reply: Option<oneshot::Sender<Result<BuildReport, Error>>>,
    pub(crate) submitted_at: Instant,
}

impl BuildTaskRecord {
    pub(crate) fn new(
        request: BuildRequest,
        reply: oneshot::Sender<Result<BuildReport, Error>>,
    ) -> Self {
        Self {
            state: TaskState::Queued,
            request: Some(request),
            reply: Some(reply),
            submitted_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(consumer: &str, module: &str) -> CopyTask {
        CopyTask::new(
            PathBuf::from(format!("/ws/{consumer}/node_modules/{module}")),
            PathBuf::from(format!("/ws/{module}")),
            vec!["dist".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_modules_are_distinct_in_order() {
        let request = BuildRequest::new(
            vec![PathBuf::from("/ws/app"), PathBuf::from("/ws/admin")],
            vec![task("app", "ui"), task("admin", "core"), task("admin", "ui")],
        );
        assert_eq!(
            request.modules(),
            vec![PathBuf::from("/ws/ui"), PathBuf::from("/ws/core")]
        );
    }

    #[test]
    fn test_allow_list_checks_both_ends_of_a_task() {
        let mut request = BuildRequest::new(
            vec![PathBuf::from("/ws/app"), PathBuf::from("/ws/legacy-app")],
            vec![task("app", "ui"), task("app", "core")],
        );
        // "ui" matches the module and the destination's last segment; "core" matches neither
        let filter = IncludeFilter::new(&["^app$", "^ui$"]).unwrap();
        let excluded = request.retain_included(&filter);

        assert_eq!(excluded, 2);
        assert_eq!(request.projects, vec![PathBuf::from("/ws/app")]);
        assert_eq!(request.tasks.len(), 1);
        assert_eq!(request.tasks[0].module_path, PathBuf::from("/ws/ui"));
    }

    #[test]
    fn test_empty_allow_list_keeps_everything() {
        let mut request = BuildRequest::new(vec![PathBuf::from("/ws/app")], vec![task("app", "ui")]);
        let filter = IncludeFilter::new::<&str>(&[]).unwrap();
        assert_eq!(request.retain_included(&filter), 0);
        assert_eq!(request.tasks.len(), 1);
    }
}
