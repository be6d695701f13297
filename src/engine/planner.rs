//! Execution planner
//!
//! A plan holds one resource per address that is declared, recorded, or
//! both. Declared-only resources get created, recorded-only ones deleted.

use anyhow::{Context, Result};
use declarative::{Address, DeadlineSink, ExecutionPlan};
use std::collections::HashSet;
use std::time::Instant;
use superset_client::Api;

use crate::config::Config;
use crate::resource::{self, KINDS};
use crate::state::StateFile;

/// Which resources a plan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Declared and recorded; the remote service converges to the configuration
    Converge,
    /// Recorded only, with no configuration attached; everything in it is deleted
    Recorded,
}

/// Bind every declared and recorded address to its lifecycle
///
/// Declared resources come first, in file order, followed by recorded
/// resources that are no longer declared. The plan is then ordered by kind.
pub fn build_plan<'a>(
    api: &'a dyn Api,
    config: &Config,
    state: &StateFile,
    goal: Goal,
) -> Result<ExecutionPlan<'a>> {
    let mut addresses: Vec<Address> = Vec::new();
    let mut seen: HashSet<Address> = HashSet::new();

    if goal == Goal::Converge {
        for block in &config.resources {
            if seen.insert(block.address.clone()) {
                addresses.push(block.address.clone());
            }
        }
    }
    for address in state.addresses()? {
        if seen.insert(address.clone()) {
            addresses.push(address);
        }
    }

    let mut plan = ExecutionPlan::new();
    for address in &addresses {
        let block = match goal {
            Goal::Converge => config.resource(address),
            Goal::Recorded => None,
        };
        let recorded = state.get(address).map(|r| &r.attributes);
        let resource = resource::build(api, address, block, recorded)
            .with_context(|| format!("Failed to load {address}"))?;
        plan.add_resource(resource);
    }
    plan.sort_by_kind(KINDS);

    log::debug!("planned {} resources ({goal:?})", plan.len());
    Ok(plan)
}

/// Write every resource's recorded state back into `state`
pub fn record(plan: &ExecutionPlan<'_>, state: &mut StateFile) -> Result<()> {
    for resource in &plan.resources {
        state.set(resource.address(), resource.state_value()?);
    }
    Ok(())
}

/// Forwards each operation's deadline to the API client
pub struct ClientDeadline<'a>(pub &'a dyn Api);

impl DeadlineSink for ClientDeadline<'_> {
    fn set_deadline(&self, deadline: Option<Instant>) {
        self.0.set_deadline(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, ExecuteOptions, execute_simple};
    use serde_json::json;
    use superset_client::MockApi;

    fn config(toml: &str) -> Config {
        Config::parse(toml).unwrap()
    }

    #[test]
    fn test_plan_orders_by_kind() {
        let api = MockApi::new();
        let cfg = config(
            r#"
            [user.alice]
            username = "alice"
            first_name = "Alice"
            last_name = "Doe"
            email = "alice@example.com"
            role_names = ["Analysts"]

            [role.analysts]
            name = "Analysts"
            "#,
        );
        let plan = build_plan(&api, &cfg, &StateFile::default(), Goal::Converge).unwrap();
        let kinds: Vec<_> = plan
            .resources
            .iter()
            .map(|r| r.address().kind.clone())
            .collect();
        assert_eq!(kinds, vec!["role", "user"]);
    }

    #[test]
    fn test_recorded_but_undeclared_is_deleted() {
        let api = MockApi::new();
        let id = api.add_role("Old");
        let mut state = StateFile::default();
        state.set(
            &Address::new("role", "old"),
            Some(json!({"id": id, "name": "Old"})),
        );

        let plan = build_plan(&api, &config(""), &state, Goal::Converge).unwrap();
        let diffs = plan.diffs().unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].action, Action::Delete);
    }

    #[test]
    fn test_recorded_goal_ignores_configuration() {
        let api = MockApi::new();
        let cfg = config("[role.new]\nname = \"New\"\n");
        let mut state = StateFile::default();
        state.set(
            &Address::new("tag", "finance"),
            Some(json!({"id": 4, "name": "finance"})),
        );

        let plan = build_plan(&api, &cfg, &state, Goal::Recorded).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.diffs().unwrap()[0].action, Action::Delete);
    }

    #[test]
    fn test_apply_then_record_round_trip() {
        let api = MockApi::new();
        let cfg = config("[role.analysts]\nname = \"Analysts\"\n");
        let mut state = StateFile::default();

        let mut plan = build_plan(&api, &cfg, &state, Goal::Converge).unwrap();
        let report = execute_simple(&mut plan, &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.created, 1);
        record(&plan, &mut state).unwrap();

        let recorded = state.get(&Address::new("role", "analysts")).unwrap();
        assert_eq!(recorded.attributes["name"], "Analysts");

        let replanned = build_plan(&api, &cfg, &state, Goal::Converge).unwrap();
        assert!(replanned.diffs().unwrap().iter().all(|d| d.action == Action::NoOp));
    }
}
