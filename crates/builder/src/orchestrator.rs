//! Build orchestrator: one run at a time, everything else queued
//!
//! All queue state lives in a single worker task. Handles only send
//! submissions over a channel, so a request never blocks on an active run
//! and there is no shared running flag to race on.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use wsb_config::{Config, IncludeFilter};
use wsb_errors::{BuildError, Error};
use wsb_events::{BuildEvent, EventEmitter, EventSender, FailureContext};
use wsb_platform::PackageManager;
use wsb_resolver::Resolution;
use wsb_types::CopyTask;

use crate::pipeline::{millis, BuildPipeline, PipelineOptions, StepFailure};
use crate::task::{
    BuildReport, BuildRequest, BuildTaskId, BuildTaskRecord, OrchestratorStatus, RunState,
    TaskState,
};

/// Owns the pipeline until [`BuildOrchestrator::spawn`] moves it into the worker
#[derive(Debug)]
pub struct BuildOrchestrator {
    pipeline: BuildPipeline,
    filter: IncludeFilter,
    tx: Option<EventSender>,
}

impl BuildOrchestrator {
    #[must_use]
    pub fn new(pipeline: BuildPipeline, filter: IncludeFilter) -> Self {
        Self {
            pipeline,
            filter,
            tx: None,
        }
    }

    /// Assemble pipeline and allow-list from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an allow-list pattern is not a valid regex.
    pub fn from_config(
        config: &Config,
        package_manager: Arc<dyn PackageManager>,
    ) -> Result<Self, Error> {
        let filter = config.include_filter()?;
        let pipeline = BuildPipeline::new(package_manager, PipelineOptions::from_config(config));
        Ok(Self::new(pipeline, filter))
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.pipeline = self.pipeline.with_event_sender(tx.clone());
        self.tx = Some(tx);
        self
    }

    /// Start the worker on the current runtime
    ///
    /// The worker stops once every handle is dropped and the queue is empty.
    #[must_use]
    pub fn spawn(self) -> OrchestratorHandle {
        let (submit, inbox) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(OrchestratorStatus::default());

        let worker = Worker {
            pipeline: Arc::new(self.pipeline),
            filter: self.filter,
            tx: self.tx,
            records: Vec::new(),
            queue: VecDeque::new(),
            current: None,
            succeeded: 0,
            failed: 0,
            status: status_tx,
            inbox,
        };
        tokio::spawn(worker.run());

        OrchestratorHandle {
            submit,
            status: status_rx,
        }
    }
}

struct Submission {
    request: BuildRequest,
    reply: oneshot::Sender<Result<BuildReport, Error>>,
}

/// Cheap, cloneable entry point to a running orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    submit: mpsc::UnboundedSender<Submission>,
    status: watch::Receiver<OrchestratorStatus>,
}

impl OrchestratorHandle {
    /// Queue a build of explicit projects and copy tasks
    pub fn build(&self, projects: Vec<PathBuf>, tasks: Vec<CopyTask>) -> BuildTicket {
        self.submit(BuildRequest::new(projects, tasks))
    }

    /// Queue a build of every watched project and every copy task
    pub fn build_resolution(&self, resolution: &Resolution) -> BuildTicket {
        self.build(resolution.projects.clone(), resolution.tasks.clone())
    }

    /// Queue a build of every watched project with a subset of the tasks
    pub fn build_with_tasks(&self, resolution: &Resolution, tasks: Vec<CopyTask>) -> BuildTicket {
        self.build(resolution.projects.clone(), tasks)
    }

    pub fn submit(&self, request: BuildRequest) -> BuildTicket {
        let (reply, rx) = oneshot::channel();
        // A closed worker drops `reply`, which the ticket reports
        let _ = self.submit.send(Submission { request, reply });
        BuildTicket { rx }
    }

    #[must_use]
    pub fn status(&self) -> OrchestratorStatus {
        self.status.borrow().clone()
    }

    /// Receiver that sees every status change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status.clone()
    }
}

/// Resolves to the outcome of one queued build
#[derive(Debug)]
pub struct BuildTicket {
    rx: oneshot::Receiver<Result<BuildReport, Error>>,
}

impl BuildTicket {
    /// Wait for the build to finish
    ///
    /// # Errors
    ///
    /// Returns the run's error, or `BuildError::OrchestratorClosed` if the
    /// worker went away before answering.
    pub async fn wait(self) -> Result<BuildReport, Error> {
        self.rx
            .await
            .map_err(|_| Error::from(BuildError::OrchestratorClosed))?
    }
}

struct Worker {
    pipeline: Arc<BuildPipeline>,
    filter: IncludeFilter,
    tx: Option<EventSender>,
    /// Arena indexed by `BuildTaskId`
    records: Vec<BuildTaskRecord>,
    queue: VecDeque<BuildTaskId>,
    current: Option<BuildTaskId>,
    succeeded: usize,
    failed: usize,
    status: watch::Sender<OrchestratorStatus>,
    inbox: mpsc::UnboundedReceiver<Submission>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            while let Some(id) = self.queue.pop_front() {
                self.run_task(id).await;
            }
            self.publish();

            match self.inbox.recv().await {
                Some(submission) => self.accept(submission),
                None => break,
            }
        }
        tracing::debug!(
            succeeded = self.succeeded,
            failed = self.failed,
            "build orchestrator stopped"
        );
    }

    fn accept(&mut self, submission: Submission) {
        let id = self.records.len();
        let projects = submission.request.projects.len();
        let copy_tasks = submission.request.tasks.len();
        self.records
            .push(BuildTaskRecord::new(submission.request, submission.reply));
        self.queue.push_back(id);

        let position = self.queue.len() - 1 + usize::from(self.current.is_some());
        if position > 0 {
            tracing::info!(task_id = id, position, "build queued behind the active run");
        }
        self.emit_build(BuildEvent::Queued {
            task_id: id,
            position,
            projects,
            copy_tasks,
        });
        self.publish();
    }

    async fn run_task(&mut self, id: BuildTaskId) {
        let Some(mut request) = self.records.get_mut(id).and_then(|r| r.request.take()) else {
            return;
        };
        self.set_state(id, TaskState::Running);
        self.current = Some(id);

        let excluded = request.retain_included(&self.filter);
        self.emit_build(BuildEvent::RunStarted {
            task_id: id,
            projects: request.projects.len(),
            copy_tasks: request.tasks.len(),
            excluded,
        });
        self.publish();

        let pipeline = Arc::clone(&self.pipeline);
        let run = pipeline.execute(id, &request);
        tokio::pin!(run);

        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                Some(submission) = self.inbox.recv() => self.accept(submission),
            }
        };

        let outcome = match result {
            Ok(mut report) => {
                report.excluded = excluded;
                self.succeeded += 1;
                self.set_state(id, TaskState::Succeeded);
                tracing::info!(
                    task_id = id,
                    modules = report.modules.len(),
                    copy_tasks = report.copy_tasks,
                    "build completed"
                );
                self.emit_build(BuildEvent::RunCompleted {
                    task_id: id,
                    modules: report.modules.len(),
                    copy_tasks: report.copy_tasks,
                    duration_ms: millis(report.duration),
                });
                Ok(report)
            }
            Err(StepFailure { phase, error }) => {
                self.failed += 1;
                self.set_state(id, TaskState::Failed);
                tracing::error!(task_id = id, %phase, error = %error, "build failed");
                self.emit_build(BuildEvent::RunFailed {
                    task_id: id,
                    phase: Some(phase),
                    failure: FailureContext::from_error(&error),
                });
                Err(error)
            }
        };

        self.current = None;
        if let Some(record) = self.records.get_mut(id) {
            tracing::debug!(
                task_id = id,
                elapsed_ms = millis(record.submitted_at.elapsed()),
                "build task finished"
            );
            if let Some(reply) = record.reply.take() {
                if reply.send(outcome).is_err() {
                    tracing::debug!(task_id = id, "build requester went away");
                }
            }
        }
    }

    fn set_state(&mut self, id: BuildTaskId, state: TaskState) {
        if let Some(record) = self.records.get_mut(id) {
            record.state = state;
        }
    }

    fn publish(&self) {
        self.status.send_replace(OrchestratorStatus {
            state: if self.current.is_some() {
                RunState::Running
            } else {
                RunState::Idle
            },
            queued: self.queue.len(),
            current: self.current,
            succeeded: self.succeeded,
            failed: self.failed,
        });
    }
}

impl EventEmitter for Worker {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{package_dir, FakePackageManager};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use wsb_config::TimingConfig;
    use wsb_events::AppEvent;

    fn orchestrator(npm: Arc<FakePackageManager>, patterns: &[&str]) -> BuildOrchestrator {
        let options = PipelineOptions {
            concurrency: 2,
            build_without_install: true,
            build_script: "build".to_string(),
            timing: TimingConfig::immediate(),
        };
        BuildOrchestrator::new(
            BuildPipeline::new(npm, options),
            IncludeFilter::new(patterns).unwrap(),
        )
    }

    fn link(root: &Path, consumer: &str, module: &str) -> (PathBuf, CopyTask) {
        let consumer = package_dir(root, consumer, true);
        let module = package_dir(root, module, true);
        let task = CopyTask::new(
            consumer.join("node_modules").join(module.file_name().unwrap()),
            module,
            vec!["dist".to_string()],
        )
        .unwrap();
        (consumer, task)
    }

    #[tokio::test]
    async fn test_second_request_waits_for_first() {
        let tmp = TempDir::new().unwrap();
        let (app, first) = link(tmp.path(), "app", "ui");
        let (admin, second) = link(tmp.path(), "admin", "core");

        let npm = FakePackageManager::new();
        let gate = npm.gate(&first.module_path);
        let (tx, mut rx) = wsb_events::channel();
        let handle = orchestrator(npm.clone(), &[]).with_event_sender(tx).spawn();

        let t1 = handle.build(vec![app], vec![first.clone()]);
        let t2 = handle.build(vec![admin], vec![second.clone()]);

        let mut status = handle.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.state == RunState::Running && s.queued == 1),
        )
        .await
        .unwrap()
        .unwrap();

        gate.notify_one();
        let r1 = t1.wait().await.unwrap();
        let r2 = t2.wait().await.unwrap();
        assert_eq!(r1.task_id, 0);
        assert_eq!(r2.task_id, 1);

        let builds: Vec<String> = npm
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("run "))
            .collect();
        assert_eq!(
            builds,
            vec![
                format!("run build {}", first.module_path.display()),
                format!("run build {}", second.module_path.display()),
            ]
        );

        let mut order = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Build(BuildEvent::RunStarted { task_id, .. }) => {
                    order.push(format!("start {task_id}"));
                }
                AppEvent::Build(BuildEvent::RunCompleted { task_id, .. }) => {
                    order.push(format!("done {task_id}"));
                }
                _ => {}
            }
        }
        assert_eq!(order, vec!["start 0", "done 0", "start 1", "done 1"]);
    }

    #[tokio::test]
    async fn test_failed_run_does_not_block_queue() {
        let tmp = TempDir::new().unwrap();
        let (app, broken) = link(tmp.path(), "app", "broken");
        let (admin, good) = link(tmp.path(), "admin", "good");

        let npm = FakePackageManager::new();
        npm.fail(&broken.module_path);
        let handle = orchestrator(npm, &[]).spawn();

        let t1 = handle.build(vec![app], vec![broken]);
        let t2 = handle.build(vec![admin.clone()], vec![good]);

        let err = t1.wait().await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::ScriptFailed { .. })));
        t2.wait().await.unwrap();
        assert!(admin.join("node_modules/good/dist/index.js").exists());

        let status = handle.status();
        assert_eq!(status.state, RunState::Idle);
        assert_eq!(status.failed, 1);
        assert_eq!(status.succeeded, 1);
    }

    #[tokio::test]
    async fn test_allow_list_applies_when_run_starts() {
        let tmp = TempDir::new().unwrap();
        let (app, ui) = link(tmp.path(), "app", "ui");
        let (_, core) = link(tmp.path(), "app", "core");

        let npm = FakePackageManager::new();
        let handle = orchestrator(npm.clone(), &["^(app|ui)$"]).spawn();
        let report = handle.build(vec![app], vec![ui, core]).wait().await.unwrap();

        assert_eq!(report.excluded, 1);
        assert_eq!(report.copy_tasks, 1);
        assert!(npm.calls().iter().all(|c| !c.contains("core")));
    }

    #[tokio::test]
    async fn test_dropped_reply_reports_closed() {
        let (reply, rx) = oneshot::channel::<Result<BuildReport, Error>>();
        drop(reply);
        let err = BuildTicket { rx }.wait().await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::OrchestratorClosed)));
    }
}
