//! # Declarative
//!
//! A framework for declarative resource lifecycles.
//!
//! This crate provides the core abstractions for declaring desired state,
//! comparing it with recorded state, and converging a remote service to
//! match it through create, read, update and delete operations.
//!
//! ## Core Concepts
//!
//! - **Lifecycle**: How one kind of resource is planned, created, read, updated, deleted and imported
//! - **Instance**: One declared or recorded object bound to its lifecycle
//! - **ResourceDiff**: The planned action for an instance plus its attribute changes
//! - **Diagnostics**: Warnings and errors collected per operation instead of aborting
//! - **Timeouts**: Per-operation budgets enforced through a [`DeadlineSink`]
//! - **ExecutionPlan**: Instances in apply order
//! - **Executor**: Applies planned changes, deletions first
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecutionPlan, ExecuteOptions, Instance, execute_simple};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(
//!     Instance::new(TagLifecycle { api: &api }, "analytics").with_config(tag_config),
//! ));
//!
//! let report = execute_simple(&mut plan, &ExecuteOptions::default())?;
//! for (address, diags) in &report.diagnostics {
//!     for diag in diags {
//!         eprintln!("{address}: {diag}");
//!     }
//! }
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`DeadlineSink`]: Receives the deadline of the running operation
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or remote clients.

pub mod context;
pub mod diagnostics;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod timeouts;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diagnostics::{Diagnose, Diagnostic, Diagnostics, Severity};
pub use diff::{AttributeChange, DiffSummary, ResourceDiff, diff_values, group_by_type};
pub use executor::{ExecutionReport, execute, execute_simple, refresh};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Instance, Lifecycle, Resource, StateError};
pub use timeouts::{DEFAULT_TIMEOUT, DeadlineSink, LONG_TIMEOUT, Operation, Timeouts};
pub use types::{Action, Address, ApplyResult, ExecuteOptions, ExecuteSummary};
