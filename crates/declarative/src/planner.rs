//! Execution planner - builds resource execution plans

use crate::diff::ResourceDiff;
use crate::resource::{BoxedResource, Resource, StateError};

/// An execution plan holding every resource instance in apply order
#[derive(Default)]
pub struct ExecutionPlan<'a> {
    pub resources: Vec<BoxedResource<'a>>,
}

impl<'a> ExecutionPlan<'a> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, resource: BoxedResource<'a>) {
        self.resources.push(resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "kind" or "kind.name"; the name matches as a prefix.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|r| matches_filter(r, &kind, name.as_deref()))
            }
        }
    }

    /// Order resources by kind, keeping declaration order within a kind
    ///
    /// Kinds missing from `order` go last.
    pub fn sort_by_kind(&mut self, order: &[&str]) {
        self.resources.sort_by_key(|r| {
            order
                .iter()
                .position(|k| *k == r.address().kind)
                .unwrap_or(order.len())
        });
    }

    /// Diff every resource in plan order
    pub fn diffs(&self) -> Result<Vec<ResourceDiff>, StateError> {
        self.resources.iter().map(|r| r.diff()).collect()
    }

    /// Total number of resources in the plan
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (String, Option<String>) {
    match target.split_once('.') {
        Some((kind, name)) => (kind.to_string(), Some(name.to_string())),
        None => (target.to_string(), None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, kind: &str, name: Option<&str>) -> bool {
    let address = resource.address();
    if address.kind != kind {
        return false;
    }

    if let Some(n) = name
        && !address.name.starts_with(n)
    {
        return false;
    }

    true
}
