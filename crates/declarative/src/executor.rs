//! Execution engine - applies planned changes in dependency order

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diagnostics::Diagnostics;
use crate::planner::ExecutionPlan;
use crate::resource::BoxedResource;
use crate::timeouts::DeadlineSink;
use crate::types::{Action, Address, ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;

/// Outcome of running a plan
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub summary: ExecuteSummary,
    /// Diagnostics per resource, only for resources that produced any
    pub diagnostics: Vec<(Address, Diagnostics)>,
}

impl ExecutionReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|(_, d)| d.has_error())
    }

    fn record(&mut self, address: &Address, result: &ApplyResult, diagnostics: Diagnostics) {
        self.summary.add_result(result);
        if !diagnostics.is_empty() {
            self.diagnostics.push((address.clone(), diagnostics));
        }
    }
}

/// Execute a plan with the given options and callbacks
///
/// Deletions run first, in reverse plan order, so dependents go before the
/// objects they reference. Every other change then runs in plan order.
///
/// # Arguments
/// * `plan` - The execution plan to run; recorded state is updated in place
/// * `opts` - Execution options (dry_run, verbose)
/// * `sink` - Receives the deadline of each remote operation
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
pub fn execute<P, C>(
    plan: &mut ExecutionPlan<'_>,
    opts: &ExecuteOptions,
    sink: Option<&dyn DeadlineSink>,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecutionReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = plan.diffs()?;
    let pending: Vec<(usize, Action)> = diffs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.action.is_change())
        .map(|(i, d)| (i, d.action))
        .collect();

    if pending.is_empty() {
        return Ok(ExecutionReport::default());
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok(ExecutionReport {
            summary: ExecuteSummary {
                skipped: pending.len(),
                ..Default::default()
            },
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecutionReport::default());
    }

    let (deletes, changes): (Vec<_>, Vec<_>) =
        pending.into_iter().partition(|(_, a)| *a == Action::Delete);

    let mut report = ExecutionReport::default();

    if !deletes.is_empty() {
        progress.on_batch_start(deletes.len(), "Destroying");
        for &(i, action) in deletes.iter().rev() {
            apply_one(&mut plan.resources[i], action, opts, sink, progress, &mut report);
        }
        progress.on_batch_complete();
    }

    if !changes.is_empty() {
        progress.on_batch_start(changes.len(), "Applying");
        for &(i, action) in &changes {
            apply_one(&mut plan.resources[i], action, opts, sink, progress, &mut report);
        }
        progress.on_batch_complete();
    }

    Ok(report)
}

/// Apply a single resource
fn apply_one<P: ProgressCallback>(
    resource: &mut BoxedResource<'_>,
    action: Action,
    opts: &ExecuteOptions,
    sink: Option<&dyn DeadlineSink>,
    progress: &mut P,
    report: &mut ExecutionReport,
) {
    let address = resource.address().clone();
    progress.on_resource_start(&address, action);

    let mut ctx = ApplyContext::new(false, opts.verbose)
        .with_timeouts(resource.timeouts())
        .with_deadline_sink(sink);
    let result = resource.apply(&mut ctx, action);

    progress.on_resource_complete(&address, &result);
    report.record(&address, &result, ctx.diagnostics);
}

/// Re-read every tracked resource from the remote service
pub fn refresh<P: ProgressCallback>(
    plan: &mut ExecutionPlan<'_>,
    sink: Option<&dyn DeadlineSink>,
    progress: &mut P,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let tracked: Vec<usize> = plan
        .resources
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_tracked())
        .map(|(i, _)| i)
        .collect();

    if tracked.is_empty() {
        return report;
    }

    progress.on_batch_start(tracked.len(), "Refreshing");
    for i in tracked {
        let resource = &mut plan.resources[i];
        let address = resource.address().clone();
        progress.on_resource_start(&address, Action::NoOp);

        let mut ctx = ApplyContext::new(false, false)
            .with_timeouts(resource.timeouts())
            .with_deadline_sink(sink);
        resource.refresh(&mut ctx);

        let result = if ctx.diagnostics.has_error() {
            ApplyResult::Failed {
                error: format!("refresh of {address} failed"),
            }
        } else {
            ApplyResult::NoChange
        };
        progress.on_resource_complete(&address, &result);
        if !ctx.diagnostics.is_empty() {
            report.diagnostics.push((address, ctx.diagnostics));
        }
    }
    progress.on_batch_complete();

    report
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: &mut ExecutionPlan<'_>, opts: &ExecuteOptions) -> Result<ExecutionReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, None, &mut NoProgress, &mut AutoConfirm)
}
