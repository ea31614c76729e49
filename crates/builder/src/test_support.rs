//! In-memory package manager for pipeline and orchestrator tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wsb_errors::{BuildError, Error};
use wsb_platform::PackageManager;

/// Records every call; `run_script` writes `dist/index.js` like a real build
#[derive(Default)]
pub(crate) struct FakePackageManager {
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) failing: Mutex<HashSet<PathBuf>>,
    /// Builds of these modules wait until notified
    pub(crate) gates: Mutex<Vec<(PathBuf, Arc<Notify>)>>,
    /// Skip writing output, to exercise the poll timeout
    pub(crate) no_output: bool,
}

impl FakePackageManager {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail(&self, module: &Path) {
        self.failing.lock().unwrap().insert(module.to_path_buf());
    }

    pub(crate) fn gate(&self, module: &Path) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .push((module.to_path_buf(), notify.clone()));
        notify
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn install(&self, directory: &Path, _dependencies: &[String]) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("install {}", directory.display()));
        tokio::fs::create_dir_all(directory.join("node_modules"))
            .await
            .map_err(|e| Error::io_with_path(&e, directory))
    }

    async fn run_script(&self, directory: &Path, script: &str) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("run {script} {}", directory.display()));

        let gate = self
            .gates
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == directory)
            .map(|(_, n)| n.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().unwrap().contains(directory) {
            return Err(BuildError::ScriptFailed {
                module: directory.display().to_string(),
                script: script.to_string(),
                message: "exit code 1".to_string(),
            }
            .into());
        }
        if self.no_output {
            return Ok(());
        }
        let dist = directory.join("dist");
        tokio::fs::create_dir_all(&dist)
            .await
            .map_err(|e| Error::io_with_path(&e, &dist))?;
        tokio::fs::write(dist.join("index.js"), b"module.exports = 1;\n")
            .await
            .map_err(|e| Error::io_with_path(&e, &dist))
    }
}

/// Create `<root>/<name>` with a manifest, and `node_modules` if `installed`
pub(crate) fn package_dir(root: &Path, name: &str, installed: bool) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("package.json"),
        format!(r#"{{"name":"{name}","version":"1.0.0"}}"#),
    )
    .unwrap();
    if installed {
        std::fs::create_dir_all(dir.join("node_modules")).unwrap();
    }
    dir
}
