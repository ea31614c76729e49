use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Workspace scan and dependency resolution events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolverEvent {
    /// Scan of the workspace roots started
    ScanStarted { roots: Vec<PathBuf> },

    /// Scan finished and the package map is built
    ScanCompleted {
        manifests: usize,
        packages: usize,
        watched: usize,
        marker: String,
    },

    /// A manifest was left out of the package map
    PackageSkipped { path: PathBuf, reason: String },

    /// A constraint no local package satisfies; assumed to be satisfied externally
    DependencySkipped {
        package: String,
        dependency: String,
        range: String,
        reason: String,
    },

    /// Copy tasks derived for every watched package
    ResolutionCompleted {
        projects: usize,
        tasks: usize,
        watch_paths: usize,
        duration_ms: u64,
    },

    /// A package was marked as watched
    PackageWatched { manifest: PathBuf, marker: PathBuf },
}
