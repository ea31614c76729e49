//! File and directory names with a fixed meaning in a workspace

/// Dependency install directory of every package
pub const NODE_MODULES: &str = "node_modules";

/// Package manifest file name
pub const PACKAGE_JSON: &str = "package.json";

/// Lock file written by the package manager's install
pub const PACKAGE_LOCK_JSON: &str = "package-lock.json";

pub const GIT_DIR: &str = ".git";
pub const SVN_DIR: &str = ".svn";

/// Watch marker placed next to a manifest
pub const MARKER: &str = ".nodewebproject";

/// Marker name used by older workspaces
pub const LEGACY_MARKER: &str = ".nodedwswatcher";

/// Directory names never descended into while scanning
pub const IGNORED_DIRS: [&str; 3] = [NODE_MODULES, GIT_DIR, SVN_DIR];

/// Whether a directory entry name is skipped by the scanner
#[must_use]
pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}
