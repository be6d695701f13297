//! Role resource

use declarative::{ApplyContext, Lifecycle};
use serde::{Deserialize, Serialize};
use superset_client::Api;

use crate::error::{ProviderError, Result, call, missing_id, numeric_id};

pub const KIND: &str = "role";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleState {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// A security role; its permissions are managed by `role_permissions`
pub struct RoleResource<'a> {
    pub api: &'a dyn Api,
}

impl RoleResource<'_> {
    fn fetch(&self, id: i64) -> Result<RoleState> {
        let role = self
            .api
            .get_role(id)
            .map_err(call(format!("read Role with ID {id}")))?;
        Ok(RoleState {
            id: Some(role.id),
            name: role.name,
        })
    }
}

impl Lifecycle for RoleResource<'_> {
    type Config = RoleConfig;
    type State = RoleState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn plan(&self, config: &RoleConfig, prior: Option<&RoleState>) -> RoleState {
        RoleState {
            id: prior.and_then(|p| p.id),
            name: config.name.clone(),
        }
    }

    fn requires_replace(&self, planned: &RoleState, prior: &RoleState) -> bool {
        planned.name != prior.name
    }

    fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &RoleState) -> Result<RoleState> {
        if let Some(existing) = self
            .api
            .find_role(&planned.name)
            .map_err(call("validate Role name uniqueness"))?
        {
            return Err(ProviderError::Conflict {
                kind: "Role",
                field: "name",
                value: planned.name.clone(),
                id: existing.id,
            });
        }

        let id = self
            .api
            .create_role(&planned.name)
            .map_err(call("create Role"))?;
        log::debug!("created role {} with id {id}", planned.name);
        self.fetch(id)
    }

    fn read(&self, _ctx: &mut ApplyContext<'_>, current: &RoleState) -> Result<Option<RoleState>> {
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
        planned: &RoleState,
        prior: &RoleState,
    ) -> Result<RoleState> {
        let id = prior.id.ok_or_else(|| missing_id(KIND))?;
        self.api
            .update_role(id, &planned.name)
            .map_err(call(format!("update Role with ID {id}")))?;
        self.fetch(id)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &RoleState) -> Result<()> {
        let id = current.id.ok_or_else(|| missing_id(KIND))?;
        match self.api.delete_role(id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::client(format!("delete Role with ID {id}"), e)),
        }
    }

    fn import(&self, id: &str) -> Result<RoleState> {
        Ok(RoleState {
            id: Some(numeric_id(KIND, id)?),
            name: String::new(),
        })
    }
}
