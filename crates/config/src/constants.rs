//! Built-in defaults
//!
//! Every value here can be overridden in the config file.

pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";
pub const DEFAULT_BUILD_SCRIPT: &str = "build";
pub const DEFAULT_CONCURRENCY: usize = 4;

pub const POLL_INTERVAL_MS: u64 = 500;
pub const OUTPUT_TIMEOUT_MS: u64 = 120_000;
pub const SETTLE_DELAY_MS: u64 = 3_000;
pub const REMOVE_DIR_DELAY_MS: u64 = 200;
pub const PROGRESS_REFRESH_MS: u64 = 5_000;
