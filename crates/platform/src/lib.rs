//! Platform layer for wsb: filesystem mirroring and external processes.
//!
//! This crate provides:
//! - The sync engine (`remove`, `copy`, `replace`) used to move built module
//!   output into a consumer's dependency folder
//! - Process execution with event emission and error mapping
//! - The package-manager client used to install dependencies and run build
//!   scripts
//!
//! Everything reports through the event channel carried by
//! [`PlatformContext`]; nothing here prints.

pub mod core;
pub mod fs;
pub mod package_manager;
pub mod process;

pub use core::PlatformContext;
pub use fs::{exists, is_dir, is_file, SyncEngine, SyncStats};
pub use package_manager::{NpmClient, PackageManager};
pub use process::{CommandOutput, NativeProcessOperations, PlatformCommand, ProcessOperations};
