//! Diagnostics collected while running a lifecycle operation
//!
//! Operations never bubble errors up as control flow. Each one records
//! warnings and errors into a [`Diagnostics`] list, and the caller decides
//! what to do with the collected result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a single diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("Warning"),
            Self::Error => f.write_str("Error"),
        }
    }
}

/// A single finding with a short summary and a detailed message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Attribute path the finding refers to, if any (e.g. `permissions[2]`)
    pub path: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            path: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(path) = &self.path {
            write!(f, " (at {path})")?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// Errors that know which diagnostic summary they belong under
pub trait Diagnose: std::error::Error {
    /// Short heading shown above the error detail
    fn summary(&self) -> &'static str {
        "Error"
    }
}

/// Ordered list of diagnostics for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary, detail));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary, detail));
    }

    /// Record a failed operation using the error's own summary
    pub fn add_failure<E: Diagnose + ?Sized>(&mut self, error: &E) {
        self.push(Diagnostic::error(error.summary(), error.to_string()));
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.0.len() - self.error_count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("role 'Gamma' not found")]
    struct MissingRole;

    impl Diagnose for MissingRole {
        fn summary(&self) -> &'static str {
            "Invalid Roles"
        }
    }

    #[test]
    fn test_warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.add_warning("Deletion Error", "user is referenced");
        assert!(!diags.has_error());
        assert_eq!(diags.warning_count(), 1);

        diags.add_error("Client Error", "deactivate failed");
        assert!(diags.has_error());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_add_failure_uses_error_summary() {
        let mut diags = Diagnostics::new();
        diags.add_failure(&MissingRole);

        let first = diags.iter().next().unwrap();
        assert_eq!(first.summary, "Invalid Roles");
        assert_eq!(first.detail, "role 'Gamma' not found");
        assert!(first.is_error());
    }

    #[test]
    fn test_display_includes_path() {
        let diag = Diagnostic::error("Duplicate Permission", "already declared").at("permissions[1]");
        assert_eq!(
            diag.to_string(),
            "Error: Duplicate Permission (at permissions[1]): already declared"
        );
    }
}
