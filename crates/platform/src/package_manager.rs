//! Package-manager client used for installs and build scripts

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use wsb_errors::{BuildError, Error, InstallError};

use crate::core::PlatformContext;
use crate::process::{NativeProcessOperations, ProcessOperations};

/// Number of output lines kept in install/build error messages
const ERROR_TAIL_LINES: usize = 20;

/// External package-manager operations
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Install dependencies in `directory`
    ///
    /// An empty `dependencies` list installs everything the manifest declares.
    async fn install(&self, directory: &Path, dependencies: &[String]) -> Result<(), Error>;

    /// Run a manifest script (`build`) with `directory` as working directory
    async fn run_script(&self, directory: &Path, script: &str) -> Result<(), Error>;
}

/// Client for npm and npm-compatible CLIs (`pnpm`, `yarn`)
#[derive(Clone)]
pub struct NpmClient {
    program: String,
    ctx: PlatformContext,
    process: Arc<dyn ProcessOperations>,
}

impl std::fmt::Debug for NpmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpmClient")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl NpmClient {
    #[must_use]
    pub fn new(program: impl Into<String>, ctx: PlatformContext) -> Self {
        Self::with_process(program, ctx, Arc::new(NativeProcessOperations::new()))
    }

    /// Use a specific process backend
    #[must_use]
    pub fn with_process(
        program: impl Into<String>,
        ctx: PlatformContext,
        process: Arc<dyn ProcessOperations>,
    ) -> Self {
        Self {
            program: program.into(),
            ctx,
            process,
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl PackageManager for NpmClient {
    async fn install(&self, directory: &Path, dependencies: &[String]) -> Result<(), Error> {
        let mut cmd = self.process.create_command(&self.program);
        cmd.arg("install").args(dependencies).current_dir(directory);

        let output = self
            .process
            .execute_command(&self.ctx, cmd)
            .await
            .map_err(|e| InstallError::InstallFailed {
                directory: directory.display().to_string(),
                message: e.to_string(),
            })?;

        if output.success() {
            Ok(())
        } else {
            Err(InstallError::InstallFailed {
                directory: directory.display().to_string(),
                message: output.error_tail(ERROR_TAIL_LINES),
            }
            .into())
        }
    }

    async fn run_script(&self, directory: &Path, script: &str) -> Result<(), Error> {
        let mut cmd = self.process.create_command(&self.program);
        cmd.args(["run", script]).current_dir(directory);

        let failed = |message: String| BuildError::ScriptFailed {
            module: directory.display().to_string(),
            script: script.to_string(),
            message,
        };

        let output = self
            .process
            .execute_command(&self.ctx, cmd)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if output.success() {
            Ok(())
        } else {
            Err(failed(output.error_tail(ERROR_TAIL_LINES)).into())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, PlatformCommand};
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::sync::Mutex;

    /// Records commands and answers with a fixed exit code
    struct Recorder {
        code: i32,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl ProcessOperations for Recorder {
        async fn execute_command(
            &self,
            _ctx: &PlatformContext,
            cmd: PlatformCommand,
        ) -> Result<CommandOutput, Error> {
            self.calls.lock().unwrap().push((
                cmd.display(),
                cmd.get_current_dir().map(|d| d.display().to_string()),
            ));
            Ok(CommandOutput {
                status: ExitStatus::from_raw(self.code << 8),
                stdout: Vec::new(),
                stderr: b"npm ERR! missing script: build\n".to_vec(),
            })
        }
    }

    fn client(code: i32) -> (NpmClient, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            code,
            calls: Mutex::new(Vec::new()),
        });
        let client = NpmClient::with_process("npm", PlatformContext::default(), recorder.clone());
        (client, recorder)
    }

    #[tokio::test]
    async fn test_install_command_line() {
        let (npm, recorder) = client(0);
        npm.install(Path::new("/ws/app"), &[]).await.unwrap();
        npm.install(Path::new("/ws/app"), &["left-pad".to_string()])
            .await
            .unwrap();
        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0], ("npm install".to_string(), Some("/ws/app".to_string())));
        assert_eq!(calls[1].0, "npm install left-pad");
    }

    #[tokio::test]
    async fn test_failed_script_is_build_error() {
        let (npm, recorder) = client(1);
        let err = npm.run_script(Path::new("/ws/lib"), "build").await.unwrap_err();
        match err {
            Error::Build(BuildError::ScriptFailed { module, message, .. }) => {
                assert_eq!(module, "/ws/lib");
                assert!(message.contains("missing script"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(recorder.calls.lock().unwrap()[0].0, "npm run build");
    }

    #[tokio::test]
    async fn test_failed_install_is_install_error() {
        let (npm, _) = client(1);
        let err = npm.install(Path::new("/ws/lib"), &[]).await.unwrap_err();
        assert!(matches!(err, Error::Install(InstallError::InstallFailed { .. })));
    }
}
