//! Flattening watched packages' dependency trees into copy tasks

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use wsb_types::paths::NODE_MODULES;
use wsb_types::{CopyTask, Dependency, Package};

use crate::graph::PackageMap;

/// Why a dependency constraint produced no copy task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// No local package has that name
    NotFound,
    /// The local package's version is outside the range
    Unsatisfied { version: Option<String> },
    /// `file:`, git or URL specifiers never match a local package
    NonSemver,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("no local package"),
            Self::Unsatisfied { version: Some(v) } => write!(f, "local version {v} is out of range"),
            Self::Unsatisfied { version: None } => f.write_str("local package has no valid version"),
            Self::NonSemver => f.write_str("not a semver range"),
        }
    }
}

/// A constraint left to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDependency {
    /// Watched package whose tree was being resolved
    pub project: String,
    /// Package that declared the constraint
    pub declared_by: String,
    pub name: String,
    pub range: String,
    pub reason: SkipReason,
}

/// A manifest left out of the package map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPackage {
    pub manifest: PathBuf,
    pub reason: String,
}

/// What a changed file means for the current resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    /// A manifest changed; the package map is stale
    Reresolve,
    /// Sources of these modules changed
    Rebuild(Vec<CopyTask>),
    Ignore,
}

/// Projects and tasks picked from a resolution for a partial build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSelection {
    pub projects: Vec<PathBuf>,
    pub tasks: Vec<CopyTask>,
    /// Requested directories that are not watched packages
    pub unwatched: Vec<PathBuf>,
}

/// Result of one resolution pass
///
/// Replaced wholesale by the next pass; nothing in it is mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    #[serde(skip)]
    pub packages: PackageMap,
    /// Marker file name in effect for this pass
    pub marker: String,
    /// Directories of watched packages
    pub projects: Vec<PathBuf>,
    pub tasks: Vec<CopyTask>,
    /// Watched manifests followed by every task's module directory
    pub watch_paths: Vec<PathBuf>,
    pub skipped: Vec<SkippedDependency>,
    pub skipped_packages: Vec<SkippedPackage>,
}

impl Resolution {
    /// Derive copy tasks for every watched package in `packages`
    #[must_use]
    pub fn resolve(packages: PackageMap, marker: impl Into<String>) -> Self {
        let mut tasks: Vec<CopyTask> = Vec::new();
        let mut skipped: Vec<SkippedDependency> = Vec::new();
        let mut projects = Vec::new();
        let mut watch_paths = Vec::new();

        for project in packages.watched() {
            projects.push(project.directory().to_path_buf());
            watch_paths.push(project.manifest_path.clone());

            for task in resolve_project(&packages, project, &mut skipped) {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
        }

        for task in &tasks {
            if !watch_paths.contains(&task.module_path) {
                watch_paths.push(task.module_path.clone());
            }
        }

        Self {
            packages,
            marker: marker.into(),
            projects,
            tasks,
            watch_paths,
            skipped,
            skipped_packages: Vec::new(),
        }
    }

    /// Tasks that copy into the given watched projects
    ///
    /// Each entry may be a project directory or its manifest path.
    /// Directories that are not watched packages are returned in
    /// `unwatched` and contribute no tasks.
    #[must_use]
    pub fn tasks_for_projects(&self, dirs: &[PathBuf]) -> ProjectSelection {
        let mut selection = ProjectSelection::default();

        for dir in dirs {
            let dir = if Package::is_manifest(dir) {
                dir.parent().unwrap_or(dir).to_path_buf()
            } else {
                dir.clone()
            };

            if !self.projects.contains(&dir) {
                selection.unwatched.push(dir);
                continue;
            }

            let deps_dir = dir.join(NODE_MODULES);
            for task in &self.tasks {
                if task.destination.starts_with(&deps_dir) && !selection.tasks.contains(task) {
                    selection.tasks.push(task.clone());
                }
            }
            if !selection.projects.contains(&dir) {
                selection.projects.push(dir);
            }
        }

        selection
    }

    /// Decide what a saved file means for this resolution
    ///
    /// Paths inside a module's `node_modules` or its declared outputs never
    /// trigger a rebuild.
    #[must_use]
    pub fn classify_change(&self, path: &Path) -> ChangeAction {
        if Package::is_manifest(path) {
            return ChangeAction::Reresolve;
        }

        let tasks: Vec<CopyTask> = self
            .tasks
            .iter()
            .filter(|t| {
                path.starts_with(&t.module_path)
                    && !path.starts_with(t.module_path.join(NODE_MODULES))
                    && !t.files.iter().any(|f| path.starts_with(t.source_of(f)))
            })
            .cloned()
            .collect();

        if tasks.is_empty() {
            ChangeAction::Ignore
        } else {
            ChangeAction::Rebuild(tasks)
        }
    }
}

/// Level-by-level walk of one watched package's dependency tree
///
/// Level 0 is the project's runtime and development constraints; deeper
/// levels follow runtime constraints only. Within a level the first
/// satisfiable constraint for a name wins. A name resolved at any level is
/// never resolved again for this project, which also ends cycles.
fn resolve_project(
    packages: &PackageMap,
    project: &Package,
    skipped: &mut Vec<SkippedDependency>,
) -> Vec<CopyTask> {
    let deps_dir = project.dependency_dir();
    let mut tasks = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(project.name.as_str());

    let mut level: Vec<(&Package, &Dependency)> =
        project.all_dependencies().map(|d| (project, d)).collect();

    while !level.is_empty() {
        let mut next: Vec<(&Package, &Dependency)> = Vec::new();

        for (declared_by, dep) in level {
            if visited.contains(dep.name.as_str()) {
                continue;
            }

            let reason = match packages.get(&dep.name) {
                None => Some(SkipReason::NotFound),
                Some(_) if dep.range.is_non_semver() => Some(SkipReason::NonSemver),
                Some(candidate) if !candidate.satisfies(dep) => Some(SkipReason::Unsatisfied {
                    version: candidate.version.as_ref().map(ToString::to_string),
                }),
                Some(_) => None,
            };

            if let Some(reason) = reason {
                let record = SkippedDependency {
                    project: project.name.clone(),
                    declared_by: declared_by.name.clone(),
                    name: dep.name.clone(),
                    range: dep.range.to_string(),
                    reason,
                };
                tracing::debug!(
                    project = %record.project,
                    dependency = %record.name,
                    range = %record.range,
                    reason = %record.reason,
                    "dependency left to the registry"
                );
                if !skipped.contains(&record) {
                    skipped.push(record);
                }
                continue;
            }

            let Some(resolved) = packages.get(&dep.name) else {
                continue;
            };
            visited.insert(resolved.name.as_str());

            if let Some(task) = CopyTask::new(
                deps_dir.join(&resolved.name),
                resolved.directory(),
                resolved.files.clone(),
            ) {
                tasks.push(task);
            }

            next.extend(resolved.dependencies.iter().map(|d| (resolved, d)));
        }

        next.retain(|(_, d)| !visited.contains(d.name.as_str()));
        level = next;
    }

    tasks
}
