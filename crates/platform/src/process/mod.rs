//! Process execution

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Instant;
use tokio::process::Command;
use wsb_errors::{Error, PlatformError};
use wsb_events::EventEmitter;

use crate::core::PlatformContext;

/// Command builder handed to [`ProcessOperations`]
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl PlatformCommand {
    /// Create a new platform command
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Command line as typed in a shell, for messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output from command execution
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Last `lines` lines of stderr, falling back to stdout when stderr is empty
    #[must_use]
    pub fn error_tail(&self, lines: usize) -> String {
        let stream = if self.stderr.iter().all(u8::is_ascii_whitespace) {
            &self.stdout
        } else {
            &self.stderr
        };
        let text = String::from_utf8_lossy(stream);
        let collected: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = collected.len().saturating_sub(lines);
        let tail = collected[start..].join("\n");
        if tail.is_empty() {
            format!("exited with {}", self.status)
        } else {
            tail
        }
    }
}

/// Trait for process execution operations
#[async_trait]
pub trait ProcessOperations: Send + Sync {
    /// Execute a command to completion and capture its output
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error>;

    /// Create a new command builder
    fn create_command(&self, program: &str) -> PlatformCommand {
        PlatformCommand::new(program)
    }
}

/// Process execution backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProcessOperations;

impl NativeProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessOperations for NativeProcessOperations {
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        let start = Instant::now();
        let line = cmd.display();
        ctx.emit_operation_started(line.clone());

        let mut command = Command::new(cmd.program());
        command.args(cmd.get_args()).kill_on_drop(true);
        if let Some(dir) = cmd.get_current_dir() {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            let err = if e.kind() == std::io::ErrorKind::NotFound {
                PlatformError::CommandNotFound {
                    command: cmd.program().to_string(),
                }
            } else {
                PlatformError::ProcessExecutionFailed {
                    command: line.clone(),
                    message: e.to_string(),
                }
            };
            ctx.emit_operation_failed(line.clone(), err.to_string());
            err
        })?;

        let output = CommandOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        tracing::debug!(
            command = %line,
            cwd = ?cmd.get_current_dir(),
            status = %output.status,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "process finished"
        );
        ctx.emit_operation_completed(line, output.success());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let mut cmd = PlatformCommand::new("npm");
        cmd.args(["run", "build"]).current_dir("/ws/lib");
        assert_eq!(cmd.display(), "npm run build");
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/ws/lib")));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let ops = NativeProcessOperations::new();
        let ctx = PlatformContext::default();
        let cmd = ops.create_command("wsb-definitely-not-a-real-program");
        let err = ops.execute_command(&ctx, cmd).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::CommandNotFound { .. })
        ));
    }
}
