//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::{style, Term};
use serde::Serialize;
use std::io;
use std::path::Path;
use wsb_builder::BuildReport;
use wsb_resolver::Resolution;
use wsb_types::ColorChoice;

/// What a command produced
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Scan(Resolution),
    Build(BuildReport),
    Message(String),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Scan(resolution) => self.render_resolution(resolution),
            CommandResult::Build(report) => self.render_build_report(report),
            CommandResult::Message(message) => {
                println!("{message}");
                Ok(())
            }
        }
    }

    fn render_resolution(&self, resolution: &Resolution) -> io::Result<()> {
        println!(
            "{} {} (marker {})",
            self.bold("Watched projects:"),
            resolution.projects.len(),
            resolution.marker
        );
        for project in &resolution.projects {
            println!("  {}", project.display());
        }
        println!();

        if resolution.tasks.is_empty() {
            println!("No copy tasks: no watched project depends on a local package.");
        } else {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Consumer").add_attribute(Attribute::Bold),
                Cell::new("Module").add_attribute(Attribute::Bold),
                Cell::new("Files").add_attribute(Attribute::Bold),
            ]);
            for task in &resolution.tasks {
                let consumer = task.consumer_dir().unwrap_or(&task.destination);
                table.add_row(vec![
                    Cell::new(short(consumer)),
                    Cell::new(task.module_path.display()),
                    Cell::new(task.files.join(", ")),
                ]);
            }
            println!("{table}");
        }

        if !resolution.skipped.is_empty() {
            println!();
            println!("{}", self.bold("Not linked:"));
            for skip in &resolution.skipped {
                println!(
                    "  {} -> {}@{} ({})",
                    skip.declared_by, skip.name, skip.range, skip.reason
                );
            }
        }

        if !resolution.skipped_packages.is_empty() {
            println!();
            println!("{}", self.bold("Skipped manifests:"));
            for skipped in &resolution.skipped_packages {
                println!("  {}: {}", skipped.manifest.display(), skipped.reason);
            }
        }

        println!();
        println!(
            "{} {}",
            self.bold("Watch paths:"),
            resolution.watch_paths.len()
        );
        Ok(())
    }

    fn render_build_report(&self, report: &BuildReport) -> io::Result<()> {
        let headline = format!(
            "Built {} module(s) into {} project(s): {} copy task(s), {} file(s) copied",
            report.modules.len(),
            report.projects.len(),
            report.copy_tasks,
            report.files_copied
        );
        if self.supports_color() {
            self.term.write_line(&format!("{}", style(headline).green()))?;
        } else {
            self.term.write_line(&headline)?;
        }
        if report.excluded > 0 {
            self.term.write_line(&format!(
                "{} project(s) or task(s) excluded by included_patterns",
                report.excluded
            ))?;
        }
        Ok(())
    }

    fn bold(&self, text: &str) -> String {
        if self.supports_color() {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

// Consumers are identified by their directory name in tables
fn short(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
