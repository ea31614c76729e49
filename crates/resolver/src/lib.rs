#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Workspace scanning and dependency resolution for wsb
//!
//! A resolution pass walks the workspace roots for manifests and watch
//! markers, builds a map of local packages by name, and for every watched
//! package flattens its dependency tree into copy tasks: "build this
//! sibling package and copy its declared output into my `node_modules`".
//! Constraints no local package satisfies are skipped and assumed to be
//! provided by the registry.

mod graph;
mod resolution;
mod resolver;
mod scanner;
mod watch;

pub use graph::PackageMap;
pub use resolution::{
    ChangeAction, ProjectSelection, Resolution, SkipReason, SkippedDependency, SkippedPackage,
};
pub use resolver::Resolver;
pub use watch::mark_watched;
