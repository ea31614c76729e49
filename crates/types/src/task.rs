//! Copy tasks: "build this module, then copy its outputs into a consumer"

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths::NODE_MODULES;

/// One module-to-consumer link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CopyTask {
    /// `<consumer>/node_modules/<dependency>`
    pub destination: PathBuf,
    /// The dependency's package directory
    pub module_path: PathBuf,
    /// Output files or directories relative to `module_path`, in manifest order
    pub files: Vec<String>,
}

impl CopyTask {
    /// Create a copy task; `None` if there is nothing to copy
    #[must_use]
    pub fn new(
        destination: impl Into<PathBuf>,
        module_path: impl Into<PathBuf>,
        files: Vec<String>,
    ) -> Option<Self> {
        let files: Vec<String> = files
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if files.is_empty() {
            return None;
        }
        Some(Self {
            destination: destination.into(),
            module_path: module_path.into(),
            files,
        })
    }

    /// Where a declared output is read from
    #[must_use]
    pub fn source_of(&self, file: &str) -> PathBuf {
        self.module_path.join(relative(file))
    }

    /// Where a declared output is written to
    #[must_use]
    pub fn target_of(&self, file: &str) -> PathBuf {
        self.destination.join(relative(file))
    }

    /// The consumer package directory (parent of its `node_modules`)
    #[must_use]
    pub fn consumer_dir(&self) -> Option<&Path> {
        self.destination
            .ancestors()
            .find(|p| p.file_name().is_some_and(|n| n == NODE_MODULES))
            .and_then(Path::parent)
    }
}

// Manifest entries may be written "./dist/" or "dist"; both name the same path.
fn relative(file: &str) -> &Path {
    let trimmed = file.trim_start_matches("./").trim_end_matches(['/', '\\']);
    Path::new(trimmed)
}

impl fmt::Display for CopyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [{}]",
            self.module_path.display(),
            self.destination.display(),
            self.files.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_list_is_rejected() {
        assert!(CopyTask::new("/a/node_modules/lib", "/lib", vec![]).is_none());
        assert!(CopyTask::new("/a/node_modules/lib", "/lib", vec![" ".into()]).is_none());
    }

    #[test]
    fn test_paths() {
        let task =
            CopyTask::new("/ws/app/node_modules/lib", "/ws/lib", vec!["./dist/".into()]).unwrap();
        assert_eq!(task.source_of("./dist/"), PathBuf::from("/ws/lib/dist"));
        assert_eq!(
            task.target_of("./dist/"),
            PathBuf::from("/ws/app/node_modules/lib/dist")
        );
        assert_eq!(task.consumer_dir(), Some(Path::new("/ws/app")));

        let scoped =
            CopyTask::new("/ws/app/node_modules/@org/lib", "/ws/lib", vec!["dist".into()]).unwrap();
        assert_eq!(scoped.consumer_dir(), Some(Path::new("/ws/app")));
    }
}
