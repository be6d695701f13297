//! Superset resource kinds
//!
//! Each module implements [`declarative::Lifecycle`] for one kind of
//! Superset object on top of the [`superset_client::Api`] trait:
//! - Security: users, roles, role permissions, groups, group role bindings
//! - Datasets: the dataset itself, plus its columns, metrics and folders
//! - Tags
//!
//! [`build`] turns a configuration block and/or a state record into a boxed
//! resource the planner can work with.

use anyhow::{Context, Result, bail};
use declarative::{Address, BoxedResource, Diagnostics, Instance, Lifecycle};
use reconcile::{Certification, Resolution, resolve};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use superset_client::{Api, NamedRef};

use crate::config::ResourceBlock;
use crate::error::{ProviderError, call};

pub mod dataset;
pub mod dataset_columns;
pub mod dataset_folder;
pub mod dataset_metrics;
pub mod group;
pub mod group_role_binding;
pub mod role;
pub mod role_permissions;
pub mod tag;
pub mod user;

/// Every kind, in apply order
///
/// Objects come before the bindings that reference them; deletions run in
/// the reverse order.
pub const KINDS: &[&str] = &[
    role::KIND,
    group::KIND,
    tag::KIND,
    user::KIND,
    role_permissions::KIND,
    group_role_binding::KIND,
    dataset::KIND,
    dataset_columns::KIND,
    dataset_metrics::KIND,
    dataset_folder::KIND,
];

fn instance<'a, L>(
    lifecycle: L,
    address: &Address,
    block: Option<&ResourceBlock>,
    state: Option<&Value>,
) -> Result<BoxedResource<'a>>
where
    L: Lifecycle + 'a,
    L::Config: DeserializeOwned,
{
    let mut instance = Instance::new(lifecycle, address.name.clone());

    if let Some(block) = block {
        let config: L::Config = block
            .body
            .clone()
            .try_into()
            .with_context(|| format!("Invalid configuration for {address}"))?;
        instance = instance.with_config(config).with_timeouts(block.timeouts);
    }

    if let Some(state) = state {
        instance = instance.with_state_value(state.clone())?;
    }

    Ok(Box::new(instance))
}

/// Bind a configuration block and/or recorded state to its lifecycle
pub fn build<'a>(
    api: &'a dyn Api,
    address: &Address,
    block: Option<&ResourceBlock>,
    state: Option<&Value>,
) -> Result<BoxedResource<'a>> {
    match address.kind.as_str() {
        user::KIND => instance(user::UserResource { api }, address, block, state),
        role::KIND => instance(role::RoleResource { api }, address, block, state),
        role_permissions::KIND => instance(
            role_permissions::RolePermissionsResource { api },
            address,
            block,
            state,
        ),
        group::KIND => instance(group::GroupResource { api }, address, block, state),
        group_role_binding::KIND => instance(
            group_role_binding::GroupRoleBindingResource { api },
            address,
            block,
            state,
        ),
        dataset::KIND => instance(dataset::DatasetResource { api }, address, block, state),
        dataset_columns::KIND => instance(
            dataset_columns::DatasetColumnsResource { api },
            address,
            block,
            state,
        ),
        dataset_metrics::KIND => instance(
            dataset_metrics::DatasetMetricsResource { api },
            address,
            block,
            state,
        ),
        dataset_folder::KIND => instance(
            dataset_folder::DatasetFolderResource { api },
            address,
            block,
            state,
        ),
        tag::KIND => instance(tag::TagResource { api }, address, block, state),
        other => bail!("Unknown resource kind '{other}'"),
    }
}

fn check<L>(block: &ResourceBlock) -> Result<Diagnostics>
where
    L: Lifecycle,
    L::Config: DeserializeOwned,
{
    let config: L::Config = block
        .body
        .clone()
        .try_into()
        .with_context(|| format!("Invalid configuration for {}", block.address))?;
    let mut diags = Diagnostics::new();
    L::validate(&config, &mut diags);
    Ok(diags)
}

/// Validate a configuration block without contacting the server
pub fn validate(block: &ResourceBlock) -> Result<Diagnostics> {
    match block.address.kind.as_str() {
        user::KIND => check::<user::UserResource<'_>>(block),
        role::KIND => check::<role::RoleResource<'_>>(block),
        role_permissions::KIND => check::<role_permissions::RolePermissionsResource<'_>>(block),
        group::KIND => check::<group::GroupResource<'_>>(block),
        group_role_binding::KIND => {
            check::<group_role_binding::GroupRoleBindingResource<'_>>(block)
        }
        dataset::KIND => check::<dataset::DatasetResource<'_>>(block),
        dataset_columns::KIND => check::<dataset_columns::DatasetColumnsResource<'_>>(block),
        dataset_metrics::KIND => check::<dataset_metrics::DatasetMetricsResource<'_>>(block),
        dataset_folder::KIND => check::<dataset_folder::DatasetFolderResource<'_>>(block),
        tag::KIND => check::<tag::TagResource<'_>>(block),
        other => bail!("Unknown resource kind '{other}'"),
    }
}

/// Empty strings coming back from the server mean "unset"
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Certification as it reads back from `extra`: blank fields dropped,
/// nothing left means none
pub(crate) fn certification(value: Option<&Certification>) -> Option<Certification> {
    value
        .map(|c| Certification {
            certified_by: non_empty(c.certified_by.clone()),
            details: non_empty(c.details.clone()),
        })
        .filter(|c| !c.is_empty())
}

/// Role ids for `names`, failing with every name that has no role
pub(crate) fn role_ids(api: &dyn Api, names: &BTreeSet<String>) -> crate::error::Result<Vec<i64>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let roles = api.list_roles().map_err(call("list Roles"))?;
    let resolution = resolve(names.iter().map(String::as_str), &roles, |r| r.name.clone());
    complete(resolution, "roles")
}

/// Group ids for `names`, failing with every name that has no group
pub(crate) fn group_ids(api: &dyn Api, names: &BTreeSet<String>) -> crate::error::Result<Vec<i64>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let groups = api.list_groups().map_err(call("list Groups"))?;
    let resolution = resolve(names.iter().map(String::as_str), &groups, |g| g.name.clone());
    complete(resolution, "groups")
}

fn complete(resolution: Resolution, kind: &'static str) -> crate::error::Result<Vec<i64>> {
    if resolution.is_complete() {
        Ok(resolution.ids)
    } else {
        Err(ProviderError::Unresolved {
            kind,
            names: resolution.not_found,
        })
    }
}

/// Names of the referenced objects, as a set
pub(crate) fn names(refs: &[NamedRef]) -> BTreeSet<String> {
    refs.iter().map(|r| r.name.clone()).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use declarative::{ApplyContext, Lifecycle};

    pub fn ctx() -> ApplyContext<'static> {
        ApplyContext::new(false, false)
    }

    /// Create from `config`, then read back and plan again: nothing may differ
    pub fn assert_converges<L>(lifecycle: &L, config: &L::Config) -> L::State
    where
        L: Lifecycle,
        L::State: PartialEq,
        L::Error: std::fmt::Debug,
    {
        let planned = lifecycle.plan(config, None);
        let created = lifecycle.create(&mut ctx(), &planned).unwrap();
        let read = lifecycle.read(&mut ctx(), &created).unwrap().unwrap();
        assert_eq!(read, created, "read-back differs from created state");
        let replanned = lifecycle.plan(config, Some(&read));
        assert_eq!(replanned, read, "second plan shows changes");
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use superset_client::MockApi;

    #[test]
    fn test_every_kind_builds() {
        let api = MockApi::new();
        for kind in KINDS {
            let address = Address::new(*kind, "x");
            let resource = build(&api, &address, None, None).unwrap();
            assert_eq!(resource.address(), &address);
            assert!(!resource.is_declared());
        }
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let config = Config::parse("[role.a]\nname = \"A\"\ncolour = \"red\"\n").unwrap();
        let api = MockApi::new();
        let block = &config.resources[0];
        let err = build(&api, &block.address, Some(block), None)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("colour"));
    }

    #[test]
    fn test_bad_state_record_rejected() {
        let api = MockApi::new();
        let address = Address::new("tag", "a");
        let state = serde_json::json!({"unexpected": true});
        assert!(build(&api, &address, None, Some(&state)).is_err());
    }

    #[test]
    fn test_validate_reports_duplicate_permissions() {
        let config = Config::parse(
            r#"
            [role_permissions.analysts]
            role_name = "Analysts"
            permissions = [
                { permission_name = "can_read", view_menu_name = "Chart" },
                { permission_name = "can_read", view_menu_name = "Chart" },
            ]
            "#,
        )
        .unwrap();
        let diags = validate(&config.resources[0]).unwrap();
        assert!(diags.has_error());
    }
}
