#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for wsb
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/wsb/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod filter;
pub mod resources_semaphore;

pub use filter::IncludeFilter;
pub use resources_semaphore::{acquire_semaphore_permit, create_semaphore};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use wsb_errors::{ConfigError, Error};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Forced marker file name. When unset, the default marker is used
    /// unless the workspace still carries legacy markers.
    #[serde(default)]
    pub marker_name: Option<String>,
    #[serde(default = "default_true")]
    pub show_output: bool,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize, // 0 = auto-detect
    #[serde(default)]
    pub build_without_install: bool,
    #[serde(default)]
    pub included_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub auto_build_on_save: bool,
    #[serde(default)]
    pub auto_build_on_folders_changed: bool,
    #[serde(default = "default_package_manager")]
    pub package_manager: String,
    #[serde(default = "default_build_script")]
    pub build_script: String,
}

/// Delays and timeouts, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_output_timeout")]
    pub output_timeout_ms: u64,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_remove_dir_delay")]
    pub remove_dir_delay_ms: u64,
    #[serde(default = "default_progress_refresh")]
    pub progress_refresh_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            marker_name: None,
            show_output: true,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            concurrency: constants::DEFAULT_CONCURRENCY,
            build_without_install: false,
            included_patterns: Vec::new(),
            auto_build_on_save: true,
            auto_build_on_folders_changed: false,
            package_manager: constants::DEFAULT_PACKAGE_MANAGER.to_string(),
            build_script: constants::DEFAULT_BUILD_SCRIPT.to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::POLL_INTERVAL_MS,
            output_timeout_ms: constants::OUTPUT_TIMEOUT_MS,
            settle_delay_ms: constants::SETTLE_DELAY_MS,
            remove_dir_delay_ms: constants::REMOVE_DIR_DELAY_MS,
            progress_refresh_ms: constants::PROGRESS_REFRESH_MS,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn output_timeout(&self) -> Duration {
        Duration::from_millis(self.output_timeout_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn remove_dir_delay(&self) -> Duration {
        Duration::from_millis(self.remove_dir_delay_ms)
    }

    #[must_use]
    pub fn progress_refresh(&self) -> Duration {
        Duration::from_millis(self.progress_refresh_ms)
    }

    /// All delays zeroed and a short output timeout, for tests
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 10,
            output_timeout_ms: 1_000,
            settle_delay_ms: 0,
            remove_dir_delay_ms: 0,
            progress_refresh_ms: 0,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    constants::DEFAULT_CONCURRENCY
}

fn default_package_manager() -> String {
    constants::DEFAULT_PACKAGE_MANAGER.to_string()
}

fn default_build_script() -> String {
    constants::DEFAULT_BUILD_SCRIPT.to_string()
}

fn default_poll_interval() -> u64 {
    constants::POLL_INTERVAL_MS
}

fn default_output_timeout() -> u64 {
    constants::OUTPUT_TIMEOUT_MS
}

fn default_settle_delay() -> u64 {
    constants::SETTLE_DELAY_MS
}

fn default_remove_dir_delay() -> u64 {
    constants::REMOVE_DIR_DELAY_MS
}

fn default_progress_refresh() -> u64 {
    constants::PROGRESS_REFRESH_MS
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("wsb").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` for invalid TOML.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed into its field type.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed into its field type.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // WSB_CONCURRENCY
        if let Some(value) = lookup("WSB_CONCURRENCY") {
            self.build.concurrency = parse_number("WSB_CONCURRENCY", value)?;
        }

        // WSB_BUILD_WITHOUT_INSTALL
        if let Some(value) = lookup("WSB_BUILD_WITHOUT_INSTALL") {
            self.build.build_without_install = match value.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "WSB_BUILD_WITHOUT_INSTALL".to_string(),
                        value,
                    }
                    .into())
                }
            };
        }

        // WSB_INCLUDED_PATTERNS
        if let Some(value) = lookup("WSB_INCLUDED_PATTERNS") {
            self.build.included_patterns = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        // WSB_PACKAGE_MANAGER
        if let Some(value) = lookup("WSB_PACKAGE_MANAGER") {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "WSB_PACKAGE_MANAGER".to_string(),
                    value,
                }
                .into());
            }
            self.build.package_manager = value;
        }

        // WSB_OUTPUT_TIMEOUT_MS
        if let Some(value) = lookup("WSB_OUTPUT_TIMEOUT_MS") {
            self.timing.output_timeout_ms = parse_number("WSB_OUTPUT_TIMEOUT_MS", value)?;
        }

        Ok(())
    }

    /// Check values that serde cannot
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an invalid allow-list pattern
    /// or an empty package manager / build script name.
    pub fn validate(&self) -> Result<(), Error> {
        IncludeFilter::new(&self.build.included_patterns)?;
        for (field, value) in [
            ("build.package_manager", &self.build.package_manager),
            ("build.build_script", &self.build.build_script),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Compiled allow-list
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid regex.
    pub fn include_filter(&self) -> Result<IncludeFilter, Error> {
        IncludeFilter::new(&self.build.included_patterns)
    }

    /// Effective batcher width
    #[must_use]
    pub fn concurrency(&self) -> usize {
        calculate_concurrency(self.build.concurrency)
    }
}

/// Resolve a configured concurrency, where 0 means auto-detect
#[must_use]
pub fn calculate_concurrency(config_value: usize) -> usize {
    if config_value > 0 {
        config_value
    } else {
        // Half the CPUs, minimum 1
        (num_cpus::get() / 2).max(1)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: String) -> Result<T, Error> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()
    })
}
