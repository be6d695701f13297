//! Roles granted to a group
//!
//! Addressed by group name. The declared set replaces the group's roles;
//! deleting the binding leaves the group with none.

use declarative::{ApplyContext, Lifecycle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use superset_client::{Api, Group, GroupPut};

use super::{names, role_ids};
use crate::error::{ProviderError, Result, call, natural_key};

pub const KIND: &str = "group_role_binding";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupRoleBindingConfig {
    pub group_name: String,
    pub role_names: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupRoleBindingState {
    #[serde(default)]
    pub group_id: Option<i64>,
    pub group_name: String,
    #[serde(default)]
    pub role_names: BTreeSet<String>,
}

impl From<Group> for GroupRoleBindingState {
    fn from(group: Group) -> Self {
        Self {
            group_id: Some(group.id),
            role_names: names(&group.roles),
            group_name: group.name,
        }
    }
}

pub struct GroupRoleBindingResource<'a> {
    pub api: &'a dyn Api,
}

impl GroupRoleBindingResource<'_> {
    fn group(&self, state: &GroupRoleBindingState) -> Result<Option<Group>> {
        match state.group_id {
            Some(id) => match self.api.get_group(id) {
                Ok(group) => Ok(Some(group)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(ProviderError::client(format!("read Group with ID {id}"), e)),
            },
            None => self
                .api
                .find_group(&state.group_name)
                .map_err(call(format!("find Group '{}'", state.group_name))),
        }
    }

    fn bind(&self, group_id: i64, roles: Vec<i64>) -> Result<Group> {
        let put = GroupPut {
            roles: Some(roles),
            ..GroupPut::default()
        };
        self.api
            .update_group(group_id, &put)
            .map_err(call(format!("update roles of Group with ID {group_id}")))?;
        self.api
            .get_group(group_id)
            .map_err(call(format!("read Group with ID {group_id}")))
    }

    fn write(&self, planned: &GroupRoleBindingState) -> Result<GroupRoleBindingState> {
        let group = self
            .api
            .find_group(&planned.group_name)
            .map_err(call(format!("find Group '{}'", planned.group_name)))?
            .ok_or_else(|| ProviderError::Unresolved {
                kind: "groups",
                names: vec![planned.group_name.clone()],
            })?;
        let roles = role_ids(self.api, &planned.role_names)?;
        Ok(self.bind(group.id, roles)?.into())
    }
}

impl Lifecycle for GroupRoleBindingResource<'_> {
    type Config = GroupRoleBindingConfig;
    type State = GroupRoleBindingState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn plan(
        &self,
        config: &GroupRoleBindingConfig,
        prior: Option<&GroupRoleBindingState>,
    ) -> GroupRoleBindingState {
        GroupRoleBindingState {
            group_id: prior.and_then(|p| p.group_id),
            group_name: config.group_name.clone(),
            role_names: config.role_names.clone(),
        }
    }

    fn requires_replace(&self, planned: &GroupRoleBindingState, prior: &GroupRoleBindingState) -> bool {
        planned.group_name != prior.group_name
    }

    fn create(
        &self,
        _ctx: &mut ApplyContext<'_>,
        planned: &GroupRoleBindingState,
    ) -> Result<GroupRoleBindingState> {
        self.write(planned)
    }

    fn read(
        &self,
        _ctx: &mut ApplyContext<'_>,
        current: &GroupRoleBindingState,
    ) -> Result<Option<GroupRoleBindingState>> {
        Ok(self.group(current)?.map(Into::into))
    }

    fn update(
        &self,
        _ctx: &mut ApplyContext<'_>,
        planned: &GroupRoleBindingState,
        _prior: &GroupRoleBindingState,
    ) -> Result<GroupRoleBindingState> {
        self.write(planned)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &GroupRoleBindingState) -> Result<()> {
        let Some(group) = self.group(current)? else {
            return Ok(());
        };
        match self.bind(group.id, Vec::new()) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn import(&self, id: &str) -> Result<GroupRoleBindingState> {
        Ok(GroupRoleBindingState {
            group_id: None,
            group_name: natural_key("group", id)?,
            role_names: BTreeSet::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{assert_converges, ctx};
    use declarative::Diagnose;
    use superset_client::MockApi;

    fn config(group: &str, roles: &[&str]) -> GroupRoleBindingConfig {
        GroupRoleBindingConfig {
            group_name: group.into(),
            role_names: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }

    #[test]
    fn test_binds_roles_to_group() {
        let api = MockApi::new();
        let group = api.add_group("data-eng");
        api.add_role("Alpha");
        api.add_role("sql_lab");
        let bindings = GroupRoleBindingResource { api: &api };

        let state = assert_converges(&bindings, &config("data-eng", &["Alpha", "sql_lab"]));
        assert_eq!(state.group_id, Some(group));
        let bound = api.group(group).unwrap();
        assert_eq!(names(&bound.roles).len(), 2);
    }

    #[test]
    fn test_unknown_group_and_roles() {
        let api = MockApi::new();
        api.add_group("data-eng");
        let bindings = GroupRoleBindingResource { api: &api };

        let planned = bindings.plan(&config("nobody", &[]), None);
        let err = bindings.create(&mut ctx(), &planned).unwrap_err();
        assert_eq!(err.summary(), "Invalid Groups");

        let planned = bindings.plan(&config("data-eng", &["Ghost"]), None);
        let err = bindings.create(&mut ctx(), &planned).unwrap_err();
        assert_eq!(err.summary(), "Invalid Roles");
        assert!(err.to_string().ends_with("Ghost"));
    }

    #[test]
    fn test_changing_roles_updates_in_place() {
        let api = MockApi::new();
        api.add_group("data-eng");
        api.add_role("Alpha");
        api.add_role("Gamma");
        let bindings = GroupRoleBindingResource { api: &api };
        let prior = assert_converges(&bindings, &config("data-eng", &["Alpha"]));

        let planned = bindings.plan(&config("data-eng", &["Gamma"]), Some(&prior));
        assert!(!bindings.requires_replace(&planned, &prior));
        let updated = bindings.update(&mut ctx(), &planned, &prior).unwrap();
        assert_eq!(updated, planned);
    }

    #[test]
    fn test_delete_leaves_group_without_roles() {
        let api = MockApi::new();
        let group = api.add_group("data-eng");
        api.add_role("Alpha");
        let bindings = GroupRoleBindingResource { api: &api };
        let state = assert_converges(&bindings, &config("data-eng", &["Alpha"]));

        bindings.delete(&mut ctx(), &state).unwrap();
        let group = api.group(group).unwrap();
        assert!(group.roles.is_empty());
        assert_eq!(group.name, "data-eng");
    }

    #[test]
    fn test_import_by_group_name() {
        let api = MockApi::new();
        api.add_group("ops");
        let bindings = GroupRoleBindingResource { api: &api };
        let seed = bindings.import("ops").unwrap();
        let state = bindings.read(&mut ctx(), &seed).unwrap().unwrap();
        assert_eq!(state.group_name, "ops");
        assert!(state.role_names.is_empty());
        assert!(bindings.import("  ").is_err());
    }
}
