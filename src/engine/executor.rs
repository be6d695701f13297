//! Execution engine with terminal UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    Action, Address, ApplyResult, AutoConfirm, ConfirmCallback, DeadlineSink, ExecuteSummary,
    ExecutionPlan, ExecutionReport, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};

use super::differ::display_diff;
use crate::ui;

/// Options for execution, including `yes` to skip the confirmation prompt
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Progress bar over one batch of operations
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize, label: &str) {
        let bar = ProgressBar::new(count as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message(label.to_string());
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, address: &Address, action: Action) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} {address}", action.symbol()));
        }
    }

    fn on_resource_complete(&mut self, address: &Address, result: &ApplyResult) {
        let Some(bar) = &self.bar else { return };
        let symbol = match result {
            ApplyResult::NoChange => "○".dimmed(),
            ApplyResult::Failed { .. } => "✗".red(),
            _ => "✓".green(),
        };
        bar.println(format!("    {symbol} {address}"));
        bar.inc(1);
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Asks on the terminal
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

/// Show the plan, confirm, and apply it
///
/// Recorded state inside `plan` is updated in place; the caller persists it.
pub fn execute(
    plan: &mut ExecutionPlan<'_>,
    opts: &ExecuteOptions,
    sink: Option<&dyn DeadlineSink>,
) -> Result<ExecutionReport> {
    let diffs = plan.diffs()?;
    display_diff(&diffs, opts.verbose);

    if !diffs.iter().any(|d| d.action.is_change()) {
        return Ok(ExecutionReport::default());
    }

    let inner = declarative::ExecuteOptions {
        dry_run: opts.dry_run,
        verbose: opts.verbose,
    };
    let mut progress = BarProgress::default();
    let report = if opts.yes {
        declarative::execute(plan, &inner, sink, &mut progress, &mut AutoConfirm)?
    } else {
        declarative::execute(plan, &inner, sink, &mut progress, &mut PromptConfirm)?
    };

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(report);
    }

    if report.summary.total() == report.summary.skipped {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(report);
    }

    print_diagnostics(&report);
    print_summary(&report.summary);
    Ok(report)
}

/// Print every collected diagnostic under its resource address
pub fn print_diagnostics(report: &ExecutionReport) {
    for (address, diags) in &report.diagnostics {
        ui::diagnostics(&address.to_string(), diags);
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    let lines = [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.replaced, "replaced"),
        (summary.removed, "removed"),
        (summary.imported, "imported"),
        (summary.skipped, "skipped"),
    ];
    for (count, what) in lines {
        if count > 0 {
            println!("    • {count} resources {what}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
