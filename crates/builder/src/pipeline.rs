//! The per-request build pipeline
//!
//! A run is five strictly ordered steps over the whole request: project
//! install, module install, module build, sync and source cleanup. Step k
//! finishes for every module before any module starts step k+1. Inside a
//! step, work is spread over the bounded batcher.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use wsb_config::{Config, TimingConfig};
use wsb_errors::{BuildError, Error, SyncError};
use wsb_events::{BuildEvent, BuildPhase, EventEmitter, EventSender};
use wsb_platform::{exists, is_dir, PackageManager, PlatformContext, SyncEngine, SyncStats};
use wsb_types::paths::{NODE_MODULES, PACKAGE_LOCK_JSON};
use wsb_types::CopyTask;

use crate::batch::run_bounded;
use crate::task::{BuildReport, BuildRequest, BuildTaskId};

/// Knobs taken from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Width of every batched step
    pub concurrency: usize,
    /// Skip the module install step
    pub build_without_install: bool,
    pub build_script: String,
    pub timing: TimingConfig,
}

impl PipelineOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency(),
            build_without_install: config.build.build_without_install,
            build_script: config.build.build_script.clone(),
            timing: config.timing.clone(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A failed step, kept apart from the error so the run can be reported
/// against the phase it died in
#[derive(Debug)]
pub(crate) struct StepFailure {
    pub(crate) phase: BuildPhase,
    pub(crate) error: Error,
}

/// Runs build requests against a package manager and the sync engine
pub struct BuildPipeline {
    package_manager: Arc<dyn PackageManager>,
    sync: SyncEngine,
    options: PipelineOptions,
    tx: Option<EventSender>,
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BuildPipeline {
    #[must_use]
    pub fn new(package_manager: Arc<dyn PackageManager>, options: PipelineOptions) -> Self {
        let sync = SyncEngine::new(PlatformContext::default(), options.timing.remove_dir_delay());
        Self {
            package_manager,
            sync,
            options,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.sync = SyncEngine::new(
            PlatformContext::new(Some(tx.clone())),
            self.options.timing.remove_dir_delay(),
        );
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run one request outside any orchestrator
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that failed. Files already copied
    /// or removed by that point stay as they are.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildReport, Error> {
        self.execute(0, request).await.map_err(|f| f.error)
    }

    pub(crate) async fn execute(
        &self,
        task_id: BuildTaskId,
        request: &BuildRequest,
    ) -> Result<BuildReport, StepFailure> {
        let start = Instant::now();
        let modules = request.modules();

        let fresh_install = self
            .phase(
                task_id,
                BuildPhase::ProjectInstall,
                request.projects.len(),
                self.install_projects(&request.projects),
            )
            .await?;

        if self.options.build_without_install {
            tracing::debug!(task_id, "module install skipped by configuration");
        } else {
            self.phase(
                task_id,
                BuildPhase::ModuleInstall,
                modules.len(),
                self.install_modules(&modules),
            )
            .await?;
        }

        self.phase(
            task_id,
            BuildPhase::ModuleBuild,
            modules.len(),
            self.build_modules(&modules),
        )
        .await?;

        let synced = self
            .phase(
                task_id,
                BuildPhase::Sync,
                request.tasks.len(),
                self.sync_tasks(&request.tasks, fresh_install),
            )
            .await?;

        let cleaned = self
            .phase(
                task_id,
                BuildPhase::Cleanup,
                modules.len(),
                self.clean_sources(&request.tasks),
            )
            .await?;

        Ok(BuildReport {
            task_id,
            projects: request.projects.clone(),
            modules,
            copy_tasks: request.tasks.len(),
            excluded: 0,
            fresh_install,
            files_copied: synced.files_copied,
            entries_removed: synced.entries_removed + cleaned,
            duration: start.elapsed(),
        })
    }

    /// Wrap one step with start/completion events
    ///
    /// While the step runs longer than the progress refresh delay, a
    /// `PhaseStillRunning` event is emitted after every delay.
    async fn phase<T, F>(
        &self,
        task_id: BuildTaskId,
        phase: BuildPhase,
        items: usize,
        work: F,
    ) -> Result<T, StepFailure>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tracing::debug!(task_id, %phase, items, "phase started");
        self.emit_build(BuildEvent::PhaseStarted {
            task_id,
            phase,
            items,
        });

        let start = Instant::now();
        let refresh = self.options.timing.progress_refresh();
        tokio::pin!(work);

        let result = if refresh.is_zero() {
            work.await
        } else {
            loop {
                tokio::select! {
                    result = &mut work => break result,
                    () = tokio::time::sleep(refresh) => {
                        self.emit_build(BuildEvent::PhaseStillRunning {
                            task_id,
                            phase,
                            elapsed_ms: millis(start.elapsed()),
                        });
                    }
                }
            }
        };

        match result {
            Ok(value) => {
                self.emit_build(BuildEvent::PhaseCompleted {
                    task_id,
                    phase,
                    duration_ms: millis(start.elapsed()),
                });
                Ok(value)
            }
            Err(error) => Err(StepFailure { phase, error }),
        }
    }

    /// Install every project that has no `node_modules` yet
    ///
    /// Returns whether any project needed a fresh install.
    async fn install_projects(&self, projects: &[PathBuf]) -> Result<bool, Error> {
        let installed = run_bounded(projects, self.options.concurrency, |project| async move {
            if is_dir(&project.join(NODE_MODULES)) {
                return Ok(false);
            }
            self.package_manager.install(project, &[]).await?;
            self.emit_build(BuildEvent::ProjectInstalled {
                directory: project.clone(),
            });
            Ok(true)
        })
        .await?;
        Ok(installed.into_iter().any(|fresh| fresh))
    }

    async fn install_modules(&self, modules: &[PathBuf]) -> Result<(), Error> {
        run_bounded(modules, self.options.concurrency, |module| async move {
            if is_dir(&module.join(NODE_MODULES)) {
                return Ok(());
            }
            self.package_manager.install(module, &[]).await?;
            self.emit_build(BuildEvent::ModuleInstalled {
                module: module.clone(),
            });
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Run the build script, then drop the module's lock file and
    /// `node_modules` so they cannot leak into the sync
    async fn build_modules(&self, modules: &[PathBuf]) -> Result<(), Error> {
        run_bounded(modules, self.options.concurrency, |module| async move {
            self.package_manager
                .run_script(module, &self.options.build_script)
                .await?;
            self.sync.remove(&module.join(PACKAGE_LOCK_JSON)).await?;
            self.sync.remove(&module.join(NODE_MODULES)).await?;
            self.emit_build(BuildEvent::ModuleBuilt {
                module: module.clone(),
            });
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn sync_tasks(&self, tasks: &[CopyTask], fresh_install: bool) -> Result<SyncStats, Error> {
        let settle = self.options.timing.settle_delay();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let per_task = run_bounded(tasks, self.options.concurrency, |task| {
            self.sync_task(task, fresh_install)
        })
        .await?;

        let mut total = SyncStats::default();
        for stats in per_task {
            total += stats;
        }
        Ok(total)
    }

    /// Mirror every declared output of one task into its destination
    async fn sync_task(&self, task: &CopyTask, fresh_install: bool) -> Result<SyncStats, Error> {
        // A fresh install may still be writing the consumer's node_modules
        if !fresh_install && !is_dir(&task.destination) {
            tokio::fs::create_dir_all(&task.destination)
                .await
                .map_err(|e| SyncError::create_dir(&e, &task.destination))?;
        }

        let mut stats = SyncStats::default();
        for file in &task.files {
            let src = task.source_of(file);
            self.wait_for_output(task, &src).await?;
            stats += self.sync.replace(&src, &task.target_of(file)).await?;
        }

        self.emit_build(BuildEvent::SyncCompleted {
            module: task.module_path.clone(),
            destination: task.destination.clone(),
            files: task.files.len(),
        });
        Ok(stats)
    }

    /// Poll until a build output exists or the output timeout runs out
    async fn wait_for_output(&self, task: &CopyTask, src: &Path) -> Result<(), Error> {
        let timeout = self.options.timing.output_timeout();
        let interval = self.options.timing.poll_interval();
        let start = Instant::now();

        while !exists(src) {
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(BuildError::BuildOutputTimeout {
                    module: task.module_path.display().to_string(),
                    path: src.display().to_string(),
                    waited_ms: millis(waited),
                }
                .into());
            }
            self.emit_build(BuildEvent::OutputPending {
                module: task.module_path.clone(),
                path: src.to_path_buf(),
                waited_ms: millis(waited),
            });
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    /// Delete synced outputs from the modules' own directories
    ///
    /// Returns the number of entries removed.
    async fn clean_sources(&self, tasks: &[CopyTask]) -> Result<usize, Error> {
        let mut sources: Vec<PathBuf> = Vec::new();
        for task in tasks {
            for file in &task.files {
                let src = task.source_of(file);
                if !sources.contains(&src) {
                    sources.push(src);
                }
            }
        }

        let removed =
            run_bounded(&sources, self.options.concurrency, |src| self.sync.remove(src)).await?;
        Ok(removed.iter().map(|stats| stats.entries_removed).sum())
    }
}

impl EventEmitter for BuildPipeline {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
