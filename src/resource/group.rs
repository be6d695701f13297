//! Group resource

use declarative::{ApplyContext, Lifecycle};
use serde::{Deserialize, Serialize};
use superset_client::{Api, GroupPost, GroupPut};

use super::non_empty;
use crate::error::{ProviderError, Result, call, missing_id, numeric_id};

pub const KIND: &str = "group";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupState {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// A user group; role assignments are managed by `group_role_binding`
pub struct GroupResource<'a> {
    pub api: &'a dyn Api,
}

impl GroupResource<'_> {
    fn fetch(&self, id: i64) -> Result<GroupState> {
        let group = self
            .api
            .get_group(id)
            .map_err(call(format!("read Group with ID {id}")))?;
        Ok(GroupState {
            id: Some(group.id),
            name: group.name,
            label: non_empty(group.label),
        })
    }
}

impl Lifecycle for GroupResource<'_> {
    type Config = GroupConfig;
    type State = GroupState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn plan(&self, config: &GroupConfig, prior: Option<&GroupState>) -> GroupState {
        GroupState {
            id: prior.and_then(|p| p.id),
            name: config.name.clone(),
            label: non_empty(config.label.clone()),
        }
    }

    fn requires_replace(&self, planned: &GroupState, prior: &GroupState) -> bool {
        planned.name != prior.name
    }

    fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &GroupState) -> Result<GroupState> {
        if let Some(existing) = self
            .api
            .find_group(&planned.name)
            .map_err(call("validate Group name uniqueness"))?
        {
            return Err(ProviderError::Conflict {
                kind: "Group",
                field: "name",
                value: planned.name.clone(),
                id: existing.id,
            });
        }

        let id = self
            .api
            .create_group(&GroupPost {
                name: planned.name.clone(),
                label: planned.label.clone(),
            })
            .map_err(call("create Group"))?;
        self.fetch(id)
    }

    fn read(&self, _ctx: &mut ApplyContext<'_>, current: &GroupState) -> Result<Option<GroupState>> {
        let Some(id) = current.id else {
            return Ok(None);
        };
        match self.fetch(id) {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        _ctx: &mut ApplyContext<'_>,
        planned: &GroupState,
        prior: &GroupState,
    ) -> Result<GroupState> {
        let id = prior.id.ok_or_else(|| missing_id(KIND))?;
        // An empty label clears it; roles are left to group_role_binding
        let put = GroupPut {
            name: None,
            label: Some(planned.label.clone().unwrap_or_default()),
            roles: None,
        };
        self.api
            .update_group(id, &put)
            .map_err(call(format!("update Group with ID {id}")))?;
        self.fetch(id)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &GroupState) -> Result<()> {
        let id = current.id.ok_or_else(|| missing_id(KIND))?;
        match self.api.delete_group(id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::client(format!("delete Group with ID {id}"), e)),
        }
    }

    fn import(&self, id: &str) -> Result<GroupState> {
        Ok(GroupState {
            id: Some(numeric_id(KIND, id)?),
            name: String::new(),
            label: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{assert_converges, ctx};
    use superset_client::MockApi;

    fn config(name: &str, label: Option<&str>) -> GroupConfig {
        GroupConfig {
            name: name.into(),
            label: label.map(String::from),
        }
    }

    #[test]
    fn test_create_with_label_converges() {
        let api = MockApi::new();
        let groups = GroupResource { api: &api };
        let state = assert_converges(&groups, &config("data-eng", Some("Data Engineering")));
        assert_eq!(state.label.as_deref(), Some("Data Engineering"));
    }

    #[test]
    fn test_clearing_label_updates_in_place() {
        let api = MockApi::new();
        let groups = GroupResource { api: &api };
        let prior = assert_converges(&groups, &config("data-eng", Some("Data Engineering")));

        let planned = groups.plan(&config("data-eng", None), Some(&prior));
        assert!(!groups.requires_replace(&planned, &prior));
        let updated = groups.update(&mut ctx(), &planned, &prior).unwrap();
        assert_eq!(updated.label, None);
        assert_eq!(updated, planned);
    }

    #[test]
    fn test_existing_group_conflicts() {
        let api = MockApi::new();
        api.add_group("ops");
        let groups = GroupResource { api: &api };
        let err = groups
            .create(&mut ctx(), &groups.plan(&config("ops", None), None))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Conflict { .. }));
    }

    #[test]
    fn test_vanished_group_reads_as_none() {
        let api = MockApi::new();
        let groups = GroupResource { api: &api };
        let state = assert_converges(&groups, &config("ops", None));
        api.delete_group(state.id.unwrap()).unwrap();
        assert_eq!(groups.read(&mut ctx(), &state).unwrap(), None);
    }
}
