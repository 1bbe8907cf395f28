//! Output formatting for CLI commands.
//!
//! Progress events are streamed by the sinks while a walk runs; this module
//! renders what is printed once it is over.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ValidationResult, WalkScript};
use crate::hooks::ChangeCounts;
use crate::planner::ChangeAction;
use crate::walker::WalkReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Planned change row for table display.
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Depends on")]
    depends_on: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the planned changes of a script.
    #[must_use]
    pub fn format_plan(&self, script: &WalkScript, counts: &ChangeCounts) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::new(script, counts)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(script, counts),
        }
    }

    fn format_plan_text(script: &WalkScript, counts: &ChangeCounts) -> String {
        if counts.plan_is_empty() {
            return format!(
                "{} No changes. Your infrastructure matches the configuration.\n",
                "✓".green()
            );
        }

        let mut output = String::new();
        let _ = write!(output, "\nPlan for {}\n\n", script.name.bold());

        let rows: Vec<PlanRow> = script
            .resources
            .iter()
            .filter(|r| r.action != ChangeAction::NoOp || r.forget || r.import_id.is_some())
            .enumerate()
            .map(|(i, r)| PlanRow {
                index: i + 1,
                action: Self::format_action(r.action),
                resource: Self::truncate(&r.address.to_string(), 60),
                depends_on: r
                    .depends_on
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();

        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let _ = writeln!(output, "\n{}", counts.plan_summary().bold());
        output
    }

    /// Formats the outcome of an apply walk.
    #[must_use]
    pub fn format_apply(&self, report: &WalkReport, counts: &ChangeCounts) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ApplyJson {
                message: counts.apply_summary(),
                counts,
                report,
            })
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_apply_text(report, counts),
        }
    }

    fn format_apply_text(report: &WalkReport, counts: &ChangeCounts) -> String {
        let mut output = String::new();

        if report.failed.is_empty() && !report.halted {
            let _ = writeln!(output, "\n{}", counts.apply_summary().green().bold());
        } else {
            let _ = writeln!(output, "\n{} Apply failed", "✗".red());
            for failure in &report.failed {
                let _ = writeln!(output, "   - {}", failure.message.red());
            }
            let _ = writeln!(output, "\n{}", counts.apply_summary());
        }

        if report.halted {
            let _ = writeln!(output, "{} Walk was halted by a hook", "⚠".yellow());
        }

        if !report.skipped.is_empty() {
            let _ = writeln!(
                output,
                "{} {} resources were not applied:",
                "⚠".yellow(),
                report.skipped.len()
            );
            for address in &report.skipped {
                let _ = writeln!(output, "   - {address}");
            }
        }

        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        script: &WalkScript,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "name": script.name,
                "resources": script.resources.len(),
                "warnings": result.warnings,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Walk script {} is valid ({} resources, {} warnings)\n",
                    "✓".green(),
                    script.name.bold(),
                    script.resources.len(),
                    result.warning_count()
                );
                if show_warnings {
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   {} {warning}", "⚠".yellow());
                    }
                }
                output
            }
        }
    }

    /// Formats an error for the selected format.
    #[must_use]
    pub fn format_error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "error", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "✗".red()),
        }
    }

    /// Formats an action with color.
    fn format_action(action: ChangeAction) -> String {
        let label = format!("{}{action}", action.symbol().trim());
        match action {
            ChangeAction::Create => label.green().to_string(),
            ChangeAction::Update => label.yellow().to_string(),
            ChangeAction::Delete => label.red().to_string(),
            ChangeAction::CreateThenDelete | ChangeAction::DeleteThenCreate => {
                label.magenta().to_string()
            }
            ChangeAction::Read => label.cyan().to_string(),
            ChangeAction::NoOp => label.dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    name: String,
    message: String,
    summary: ChangeCounts,
    resources: Vec<PlannedJson>,
}

#[derive(Serialize)]
struct PlannedJson {
    address: String,
    action: ChangeAction,
}

impl PlanJson {
    fn new(script: &WalkScript, counts: &ChangeCounts) -> Self {
        Self {
            name: script.name.clone(),
            message: counts.plan_summary(),
            summary: *counts,
            resources: script
                .resources
                .iter()
                .map(|r| PlannedJson {
                    address: r.address.to_string(),
                    action: r.action,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ApplyJson<'a> {
    message: String,
    counts: &'a ChangeCounts,
    report: &'a WalkReport,
}
