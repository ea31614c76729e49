//! Include-pattern allow-list for projects and modules

use regex::Regex;
use std::path::Path;
use wsb_errors::{ConfigError, Error};

/// Compiled `build.included_patterns`
///
/// Patterns match the last segment of a directory path. An empty list
/// admits every directory.
#[derive(Debug, Clone, Default)]
pub struct IncludeFilter {
    patterns: Vec<Regex>,
}

impl IncludeFilter {
    /// Compile the allow-list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first pattern that is
    /// not a valid regular expression.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, Error> {
        let patterns = patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    Error::from(ConfigError::InvalidValue {
                        field: "build.included_patterns".to_string(),
                        value: format!("{p} ({e})"),
                    })
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a directory passes the allow-list
    #[must_use]
    pub fn matches(&self, dir: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let Some(segment) = last_segment(dir) else {
            return false;
        };
        self.patterns.iter().any(|re| re.is_match(segment))
    }
}

// `Path::file_name` already skips a trailing separator.
fn last_segment(dir: &Path) -> Option<&str> {
    dir.file_name().and_then(|n| n.to_str())
}
