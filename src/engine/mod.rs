//! Execution engine for dashform
//!
//! The engine orchestrates:
//! 1. Planning - Bind declared and recorded resources to their lifecycles
//! 2. Diffing - Show what would change, per kind and attribute
//! 3. Executing - Confirm, apply deletions then changes, report diagnostics

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::display_diff;
pub use executor::{ExecuteOptions, execute, print_diagnostics};
pub use planner::{ClientDeadline, Goal, build_plan, record};
