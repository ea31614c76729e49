//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wsb_types::ColorChoice;

/// wsb - build local npm packages and link their output into consumers
#[derive(Parser)]
#[command(name = "wsb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build local npm packages and link their output into the projects that use them")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show debug events and logs
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum concurrent installs, builds and syncs (0 = auto)
    #[arg(long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Build modules without installing their dependencies first
    #[arg(long, global = true)]
    pub build_without_install: bool,

    /// Package manager program used for install and run-script
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub package_manager: Option<String>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the workspace and print packages, copy tasks and watch paths
    Scan {
        /// Workspace roots (default: current directory)
        roots: Vec<PathBuf>,
    },

    /// Resolve the workspace and build every watched project
    Build {
        /// Workspace roots (default: current directory)
        roots: Vec<PathBuf>,
    },

    /// Build only the given watched projects
    BuildProject {
        /// Project directories or their package.json files
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Workspace root (repeatable; default: current directory)
        #[arg(long = "root", value_name = "ROOT")]
        roots: Vec<PathBuf>,
    },

    /// Mark packages as watched, then resolve and build
    Watch {
        /// Package directories or their package.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Workspace root (repeatable; default: current directory)
        #[arg(long = "root", value_name = "ROOT")]
        roots: Vec<PathBuf>,
    },

    /// React to a saved file: rebuild affected modules or re-resolve
    Changed {
        /// The file that changed
        file: PathBuf,

        /// Workspace root (repeatable; default: current directory)
        #[arg(long = "root", value_name = "ROOT")]
        roots: Vec<PathBuf>,
    },
}

impl Commands {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "scan",
            Self::Build { .. } => "build",
            Self::BuildProject { .. } => "build-project",
            Self::Watch { .. } => "watch",
            Self::Changed { .. } => "changed",
        }
    }
}
