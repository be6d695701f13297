//! Apply context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of progress display, prompts, etc.

use crate::diagnostics::Diagnostics;
use crate::timeouts::{DeadlineSink, Operation, Timeouts};
use crate::types::{Action, Address, ApplyResult};
use anyhow::Result;
use std::time::Instant;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called before a batch of operations starts
    fn on_batch_start(&mut self, count: usize, label: &str);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, address: &Address, action: Action);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, address: &Address, result: &ApplyResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize, _label: &str) {}
    fn on_resource_start(&mut self, _address: &Address, _action: Action) {}
    fn on_resource_complete(&mut self, _address: &Address, _result: &ApplyResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to a single lifecycle operation
///
/// Holds the diagnostics the operation produces and the timeouts that bound
/// each remote call it makes.
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
    /// Per-operation timeout budget
    pub timeouts: Timeouts,
    /// Warnings and errors raised by the operation
    pub diagnostics: Diagnostics,
    deadline_sink: Option<&'a dyn DeadlineSink>,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self {
            dry_run,
            verbose,
            timeouts: Timeouts::default(),
            diagnostics: Diagnostics::new(),
            deadline_sink: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Forward operation deadlines to the component doing the blocking calls
    pub fn with_deadline_sink(mut self, sink: Option<&'a dyn DeadlineSink>) -> Self {
        self.deadline_sink = sink;
        self
    }

    /// Run `f` with the deadline for `operation` installed
    ///
    /// The deadline is cleared again once `f` returns, whatever its outcome.
    /// A budget too large to represent as an instant runs unbounded.
    pub fn bounded<T>(&mut self, operation: Operation, f: impl FnOnce(&mut Self) -> T) -> T {
        let budget = self.timeouts.get(operation);
        let deadline = Instant::now().checked_add(budget);
        log::trace!("{operation} bounded to {}s", budget.as_secs());

        if let Some(sink) = self.deadline_sink {
            sink.set_deadline(deadline);
        }
        let out = f(self);
        if let Some(sink) = self.deadline_sink {
            sink.set_deadline(None);
        }
        out
    }

    /// Record a warning
    pub fn warn(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        let detail = detail.into();
        log::warn!("{detail}");
        self.diagnostics.add_warning(summary, detail);
    }
}
