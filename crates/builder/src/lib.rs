#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Module builds and output sync for wsb
//!
//! This crate turns a resolution into built, linked workspaces:
//! - A bounded batcher that caps concurrent package-manager work
//! - The build pipeline (install, build, sync, cleanup) for one request
//! - The orchestrator, which runs one request at a time and queues the rest
//!   in submission order

mod batch;
mod orchestrator;
mod pipeline;
mod task;

#[cfg(test)]
mod test_support;

pub use batch::run_bounded;
pub use orchestrator::{BuildOrchestrator, BuildTicket, OrchestratorHandle};
pub use pipeline::{BuildPipeline, PipelineOptions};
pub use task::{
    BuildReport, BuildRequest, BuildTaskId, OrchestratorStatus, RunState, TaskState,
};
