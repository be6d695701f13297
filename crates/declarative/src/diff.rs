//! Diff computation for resources

use crate::types::{Action, Address};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Value shown instead of a sensitive attribute
pub const SENSITIVE_MASK: &str = "(sensitive value)";

/// A single changed attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Dotted attribute path, with `[i]` for list elements
    pub path: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AttributeChange {
    pub fn is_addition(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    pub fn is_removal(&self) -> bool {
        self.before.is_some() && self.after.is_none()
    }
}

/// Compare two attribute trees and list every leaf that differs
///
/// `null` counts as absent. Attributes named in `sensitive` are compared
/// normally but their values are masked in the output.
pub fn diff_values(
    before: Option<&Value>,
    after: Option<&Value>,
    sensitive: &[&str],
) -> Vec<AttributeChange> {
    let mut changes = Vec::new();
    walk(String::new(), before, after, sensitive, &mut changes);
    changes
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn walk(
    path: String,
    before: Option<&Value>,
    after: Option<&Value>,
    sensitive: &[&str],
    out: &mut Vec<AttributeChange>,
) {
    let before = present(before);
    let after = present(after);

    let empty = Map::new();

    match (before, after) {
        (None, None) => {}
        (b, a) if matches!(b, Some(Value::Object(_))) || matches!(a, Some(Value::Object(_))) => {
            if let (Some(bm), Some(am)) = (object_or_empty(b, &empty), object_or_empty(a, &empty)) {
                let keys: BTreeSet<&String> = bm.keys().chain(am.keys()).collect();
                for key in keys {
                    walk(join(&path, key), bm.get(key), am.get(key), sensitive, out);
                }
            } else {
                push_leaf(path, b, a, sensitive, out);
            }
        }
        (b, a) if matches!(b, Some(Value::Array(_))) || matches!(a, Some(Value::Array(_))) => {
            if let (Some(bl), Some(al)) = (array_or_empty(b), array_or_empty(a)) {
                for i in 0..bl.len().max(al.len()) {
                    walk(format!("{path}[{i}]"), bl.get(i), al.get(i), sensitive, out);
                }
            } else {
                push_leaf(path, b, a, sensitive, out);
            }
        }
        (b, a) => push_leaf(path, b, a, sensitive, out),
    }
}

fn object_or_empty<'v>(
    value: Option<&'v Value>,
    empty: &'v Map<String, Value>,
) -> Option<&'v Map<String, Value>> {
    match value {
        Some(Value::Object(map)) => Some(map),
        None => Some(empty),
        Some(_) => None,
    }
}

fn array_or_empty(value: Option<&Value>) -> Option<&[Value]> {
    match value {
        Some(Value::Array(items)) => Some(items),
        None => Some(&[]),
        Some(_) => None,
    }
}

fn push_leaf(
    path: String,
    before: Option<&Value>,
    after: Option<&Value>,
    sensitive: &[&str],
    out: &mut Vec<AttributeChange>,
) {
    if before == after {
        return;
    }
    let masked = sensitive.iter().any(|s| *s == path);
    let mask = |v: Option<&Value>| {
        v.map(|v| {
            if masked {
                Value::String(SENSITIVE_MASK.into())
            } else {
                v.clone()
            }
        })
    };
    out.push(AttributeChange {
        path,
        before: mask(before),
        after: mask(after),
    });
}

/// A planned change for one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    pub address: Address,
    /// Kind of the resource (same as `address.kind`)
    pub resource_type: String,
    pub action: Action,
    /// Attribute-level changes; empty for a no-op
    pub changes: Vec<AttributeChange>,
}

impl ResourceDiff {
    pub fn new(address: Address, action: Action, changes: Vec<AttributeChange>) -> Self {
        Self {
            resource_type: address.kind.clone(),
            address,
            action,
            changes,
        }
    }

    pub fn is_addition(&self) -> bool {
        self.action == Action::Create
    }

    pub fn is_removal(&self) -> bool {
        self.action == Action::Delete
    }

    pub fn is_modification(&self) -> bool {
        self.action == Action::Update
    }

    pub fn is_replacement(&self) -> bool {
        self.action == Action::Replace
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify in place
    pub modifications: usize,
    /// Number of resources to destroy and recreate
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::Replace => summary.replacements += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
