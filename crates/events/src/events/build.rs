use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::FailureContext;

/// The sequential steps of one build run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    ProjectInstall,
    ModuleInstall,
    ModuleBuild,
    Sync,
    Cleanup,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ProjectInstall => "installing project dependencies",
            Self::ModuleInstall => "installing module dependencies",
            Self::ModuleBuild => "building modules",
            Self::Sync => "copying build output",
            Self::Cleanup => "cleaning module output",
        };
        f.write_str(label)
    }
}

/// Build orchestrator events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// A build request was accepted; `position` is its place in the queue
    Queued {
        task_id: usize,
        position: usize,
        projects: usize,
        copy_tasks: usize,
    },

    /// A queued build started running
    RunStarted {
        task_id: usize,
        projects: usize,
        copy_tasks: usize,
        excluded: usize,
    },

    PhaseStarted {
        task_id: usize,
        phase: BuildPhase,
        items: usize,
    },

    /// Re-announces a phase that is still running after the refresh delay
    PhaseStillRunning {
        task_id: usize,
        phase: BuildPhase,
        elapsed_ms: u64,
    },

    PhaseCompleted {
        task_id: usize,
        phase: BuildPhase,
        duration_ms: u64,
    },

    ProjectInstalled { directory: PathBuf },

    ModuleInstalled { module: PathBuf },

    ModuleBuilt { module: PathBuf },

    /// A declared output is not there yet; the sync will poll again
    OutputPending {
        module: PathBuf,
        path: PathBuf,
        waited_ms: u64,
    },

    SyncCompleted {
        module: PathBuf,
        destination: PathBuf,
        files: usize,
    },

    RunCompleted {
        task_id: usize,
        modules: usize,
        copy_tasks: usize,
        duration_ms: u64,
    },

    RunFailed {
        task_id: usize,
        phase: Option<BuildPhase>,
        failure: FailureContext,
    },
}
