#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for wsb
//!
//! Manifest parsing, the package model used by the resolver, npm-style
//! version ranges and the copy tasks handed to the build orchestrator.

pub mod manifest;
pub mod package;
pub mod paths;
pub mod task;
pub mod version;

pub use manifest::Manifest;
pub use package::{DepKind, Dependency, Package};
pub use semver::Version;
pub use task::CopyTask;
pub use version::VersionRange;

use serde::{Deserialize, Serialize};

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
