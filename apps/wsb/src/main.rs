//! wsb - build local npm packages and link their output into consumers
//!
//! Resolves which watched projects depend on which local packages, builds
//! those packages and mirrors their declared output into the projects'
//! `node_modules`.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};
use wsb_builder::{BuildOrchestrator, BuildTicket, OrchestratorHandle};
use wsb_config::Config;
use wsb_errors::{BuildError, Error};
use wsb_events::{EventEmitter, EventReceiver, EventSender};
use wsb_platform::{NpmClient, PlatformContext};
use wsb_resolver::{ChangeAction, Resolution, Resolver};
use wsb_types::ColorChoice;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting wsb v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults < file < environment < CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);
    config.validate()?;

    let (event_sender, event_receiver) = wsb_events::channel();
    let ctx = CommandContext::new(config, event_sender);

    let color = cli.global.color.unwrap_or_default();
    let renderer = OutputRenderer::new(cli.global.json, color);
    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let quiet = cli.global.json || !ctx.config.general.show_output;
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, quiet);

    info!(command = cli.command.name(), "Running command");
    let result =
        execute_command_with_events(cli.command, ctx, event_receiver, &mut event_handler).await?;

    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Everything a command needs, built once from the merged configuration
struct CommandContext {
    config: Config,
    resolver: Resolver,
    tx: EventSender,
}

impl CommandContext {
    fn new(config: Config, tx: EventSender) -> Self {
        let resolver = Resolver::new()
            .with_marker_name(config.general.marker_name.clone())
            .with_event_sender(tx.clone());
        Self {
            config,
            resolver,
            tx,
        }
    }

    async fn prepare(&self, roots: &[PathBuf]) -> Result<Resolution, CliError> {
        Ok(self.resolver.prepare(roots).await?)
    }

    fn orchestrator(&self) -> Result<OrchestratorHandle, CliError> {
        let npm = NpmClient::new(
            self.config.build.package_manager.clone(),
            PlatformContext::new(Some(self.tx.clone())),
        );
        let orchestrator = BuildOrchestrator::from_config(&self.config, Arc::new(npm))?
            .with_event_sender(self.tx.clone());
        Ok(orchestrator.spawn())
    }
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ctx: CommandContext,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(command: Commands, ctx: CommandContext) -> Result<CommandResult, CliError> {
    match command {
        Commands::Scan { roots } => {
            let resolution = ctx.prepare(&workspace_roots(roots)?).await?;
            Ok(CommandResult::Scan(resolution))
        }

        Commands::Build { roots } => {
            let resolution = ctx.prepare(&workspace_roots(roots)?).await?;
            let handle = ctx.orchestrator()?;
            finish(handle.build_resolution(&resolution)).await
        }

        Commands::BuildProject { dirs, roots } => {
            let resolution = ctx.prepare(&workspace_roots(roots)?).await?;
            let dirs = dirs
                .iter()
                .map(|d| absolute(d))
                .collect::<Result<Vec<_>, _>>()?;

            let selection = resolution.tasks_for_projects(&dirs);
            for dir in &selection.unwatched {
                ctx.tx.emit_warning_with_context(
                    "not a watched project, skipped",
                    dir.display().to_string(),
                );
            }
            if selection.projects.is_empty() {
                return Err(CliError::InvalidArguments(
                    "none of the given directories is a watched project".to_string(),
                ));
            }

            let handle = ctx.orchestrator()?;
            finish(handle.build(selection.projects, selection.tasks)).await
        }

        Commands::Watch { paths, roots } => {
            let roots = workspace_roots(roots)?;
            let before = ctx.prepare(&roots).await?;

            let mut marked = 0;
            for path in &paths {
                // Failures are already reported as warnings by the resolver
                if ctx
                    .resolver
                    .mark_watched(&absolute(path)?, &before.marker)
                    .await
                    .is_ok()
                {
                    marked += 1;
                }
            }
            if marked == 0 {
                return Err(CliError::InvalidArguments(
                    "no package could be marked as watched".to_string(),
                ));
            }

            let resolution = ctx.prepare(&roots).await?;
            let handle = ctx.orchestrator()?;
            finish(handle.build_resolution(&resolution)).await
        }

        Commands::Changed { file, roots } => {
            let roots = workspace_roots(roots)?;
            let file = absolute(&file)?;
            let resolution = ctx.prepare(&roots).await?;
            let build = &ctx.config.build;

            // A root itself names a workspace folder that was added or removed
            if roots.contains(&file) {
                if build.auto_build_on_folders_changed {
                    let handle = ctx.orchestrator()?;
                    return finish(handle.build_resolution(&resolution)).await;
                }
                return Ok(CommandResult::Message(format!(
                    "Workspace folder changed; re-resolved with {} copy task(s), \
                     auto_build_on_folders_changed is off",
                    resolution.tasks.len()
                )));
            }

            match resolution.classify_change(&file) {
                ChangeAction::Reresolve if build.auto_build_on_save => {
                    let handle = ctx.orchestrator()?;
                    finish(handle.build_resolution(&resolution)).await
                }
                ChangeAction::Reresolve => Ok(CommandResult::Message(format!(
                    "Manifest changed; re-resolved with {} copy task(s), auto_build_on_save is off",
                    resolution.tasks.len()
                ))),
                ChangeAction::Rebuild(tasks) if build.auto_build_on_save => {
                    let handle = ctx.orchestrator()?;
                    finish(handle.build_with_tasks(&resolution, tasks)).await
                }
                ChangeAction::Rebuild(tasks) => Ok(CommandResult::Message(format!(
                    "{} copy task(s) affected; auto_build_on_save is off",
                    tasks.len()
                ))),
                ChangeAction::Ignore => Ok(CommandResult::Message(
                    "No watched module is affected by this change".to_string(),
                )),
            }
        }
    }
}

/// Wait for a queued build
///
/// A failed run was already rendered from its `RunFailed` event, so only a
/// count is returned for the exit status.
async fn finish(ticket: BuildTicket) -> Result<CommandResult, CliError> {
    match ticket.wait().await {
        Ok(report) => Ok(CommandResult::Build(report)),
        Err(e @ Error::Build(BuildError::OrchestratorClosed)) => Err(e.into()),
        Err(e) => {
            tracing::debug!(error = %e, "build run failed");
            Err(CliError::BuildFailed(1))
        }
    }
}

/// Roots as absolute paths; the current directory when none are given
fn workspace_roots(roots: Vec<PathBuf>) -> Result<Vec<PathBuf>, CliError> {
    if roots.is_empty() {
        return Ok(vec![absolute(&std::env::current_dir()?)?]);
    }
    roots.iter().map(|r| absolute(r)).collect()
}

/// Canonical path when it exists, so it compares equal to scanned paths
fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .map_err(CliError::from)
}

/// Initialize tracing/logging
///
/// Logs go to stderr so `--json` output on stdout stays parseable. In the
/// default mode forwarded events are filtered out because the event
/// handler already renders them.
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "debug,wsb=debug"
    } else if json_mode {
        "info,wsb=info"
    } else {
        "warn,wsb::logging=off"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(concurrency) = global.concurrency {
        config.build.concurrency = concurrency;
    }
    if global.build_without_install {
        config.build.build_without_install = true;
    }
    if let Some(program) = &global.package_manager {
        config.build.package_manager.clone_from(program);
    }
}
