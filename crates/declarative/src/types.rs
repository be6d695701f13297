//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a declared resource instance: `kind.name`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub kind: String,
    pub name: String,
}

impl Address {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => Ok(Self::new(kind, name)),
            _ => Err(format!(
                "Invalid resource address '{s}': expected <kind>.<name>"
            )),
        }
    }
}

/// What a plan intends to do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Declared and live state agree
    NoOp,
    /// Declared but not yet created
    Create,
    /// Exists, attributes drifted
    Update,
    /// Exists, but an immutable attribute changed
    Replace,
    /// In state but no longer declared
    Delete,
}

impl Action {
    /// Check if the action mutates the remote service
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Plan symbol shown next to the resource address
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::NoOp => "no changes",
            Self::Create => "create",
            Self::Update => "update in-place",
            Self::Replace => "replace",
            Self::Delete => "destroy",
        };
        f.write_str(verb)
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was deleted and created again
    Replaced,
    /// Resource was removed
    Removed,
    /// Existing remote object adopted into state
    Imported,
    /// Apply failed
    Failed { error: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed | Self::Imported
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub imported: usize,
    /// Pending changes left unapplied because confirmation was declined
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed + self.imported
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Imported => self.imported += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let address: Address = "dataset_folder.sales".parse().unwrap();
        assert_eq!(address.kind, "dataset_folder");
        assert_eq!(address.name, "sales");
        assert_eq!(address.to_string(), "dataset_folder.sales");
    }

    #[test]
    fn test_address_keeps_dots_in_name() {
        let address: Address = "tag.team.analytics".parse().unwrap();
        assert_eq!(address.kind, "tag");
        assert_eq!(address.name, "team.analytics");
    }

    #[test]
    fn test_address_rejects_missing_name() {
        assert!("user".parse::<Address>().is_err());
        assert!("user.".parse::<Address>().is_err());
        assert!(".alice".parse::<Address>().is_err());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Replaced);
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_action_symbols() {
        assert_eq!(Action::Replace.symbol(), "-/+");
        assert!(!Action::NoOp.is_change());
        assert!(Action::Delete.is_change());
    }
}
