//! Permissions assigned to a role
//!
//! Addressed by role name. The declared list replaces the role's whole
//! permission set on every write; deleting the resource clears it.

use declarative::{ApplyContext, Diagnostic, Diagnostics, Lifecycle};
use reconcile::{PermissionRef, find_duplicates, resolve_permissions};
use serde::{Deserialize, Serialize};
use superset_client::{Api, Role};

use crate::error::{ProviderError, Result, call, natural_key};

pub const KIND: &str = "role_permissions";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolePermissionsConfig {
    pub role_name: String,
    pub permissions: Vec<PermissionRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolePermissionsState {
    #[serde(default)]
    pub role_id: Option<i64>,
    pub role_name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionRef>,
}

/// Live permissions in the recorded order; permissions added outside
/// dashform go last, sorted
fn ordered_like(live: Vec<PermissionRef>, recorded: &[PermissionRef]) -> Vec<PermissionRef> {
    let (mut known, mut extra): (Vec<_>, Vec<_>) =
        live.into_iter().partition(|p| recorded.contains(p));
    known.sort_by_key(|p| recorded.iter().position(|r| r == p));
    extra.sort();
    known.extend(extra);
    known
}

pub struct RolePermissionsResource<'a> {
    pub api: &'a dyn Api,
}

impl RolePermissionsResource<'_> {
    fn role(&self, state: &RolePermissionsState) -> Result<Option<Role>> {
        match state.role_id {
            Some(id) => match self.api.get_role(id) {
                Ok(role) => Ok(Some(role)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(ProviderError::client(format!("read Role with ID {id}"), e)),
            },
            None => self
                .api
                .find_role(&state.role_name)
                .map_err(call(format!("find Role '{}'", state.role_name))),
        }
    }

    fn assign(&self, role_id: i64, permissions: &[PermissionRef]) -> Result<()> {
        let ids = if permissions.is_empty() {
            Vec::new()
        } else {
            let catalog = self
                .api
                .list_permissions()
                .map_err(call("list Permissions"))?;
            let resolution = resolve_permissions(permissions, &catalog);
            if !resolution.is_complete() {
                return Err(ProviderError::Unresolved {
                    kind: "permissions",
                    names: resolution.not_found,
                });
            }
            resolution.ids
        };
        log::debug!("assigning {} permissions to role {role_id}", ids.len());
        self.api
            .set_role_permissions(role_id, &ids)
            .map_err(call(format!("update permissions of Role with ID {role_id}")))
    }

    fn write(&self, ctx: &mut ApplyContext<'_>, planned: &RolePermissionsState) -> Result<RolePermissionsState> {
        let role = self
            .api
            .find_role(&planned.role_name)
            .map_err(call(format!("find Role '{}'", planned.role_name)))?
            .ok_or_else(|| ProviderError::Unresolved {
                kind: "roles",
                names: vec![planned.role_name.clone()],
            })?;
        self.assign(role.id, &planned.permissions)?;

        let seed = RolePermissionsState {
            role_id: Some(role.id),
            ..planned.clone()
        };
        self.read(ctx, &seed)?.ok_or_else(|| {
            ProviderError::Invalid(format!("Role '{}' disappeared during update", planned.role_name))
        })
    }
}

impl Lifecycle for RolePermissionsResource<'_> {
    type Config = RolePermissionsConfig;
    type State = RolePermissionsState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(config: &RolePermissionsConfig, diags: &mut Diagnostics) {
        for duplicate in find_duplicates(&config.permissions) {
            diags.push(
                Diagnostic::error("Duplicate Permission", duplicate.to_string())
                    .at(format!("permissions[{}]", duplicate.second)),
            );
        }
    }

    fn plan(
        &self,
        config: &RolePermissionsConfig,
        prior: Option<&RolePermissionsState>,
    ) -> RolePermissionsState {
        RolePermissionsState {
            role_id: prior.and_then(|p| p.role_id),
            role_name: config.role_name.clone(),
            permissions: config.permissions.clone(),
        }
    }

    fn requires_replace(&self, planned: &RolePermissionsState, prior: &RolePermissionsState) -> bool {
        planned.role_name != prior.role_name
    }

    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &RolePermissionsState,
    ) -> Result<RolePermissionsState> {
        self.write(ctx, planned)
    }

    fn read(
        &self,
        _ctx: &mut ApplyContext<'_>,
        current: &RolePermissionsState,
    ) -> Result<Option<RolePermissionsState>> {
        let Some(role) = self.role(current)? else {
            return Ok(None);
        };
        let live = match self.api.role_permissions(role.id) {
            Ok(live) => live,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(ProviderError::client(
                    format!("read permissions of Role with ID {}", role.id),
                    e,
                ));
            }
        };
        let live: Vec<PermissionRef> = live.iter().map(PermissionRef::from).collect();

        Ok(Some(RolePermissionsState {
            role_id: Some(role.id),
            role_name: role.name,
            permissions: ordered_like(live, &current.permissions),
        }))
    }

    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &RolePermissionsState,
        _prior: &RolePermissionsState,
    ) -> Result<RolePermissionsState> {
        self.write(ctx, planned)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &RolePermissionsState) -> Result<()> {
        let Some(role) = self.role(current)? else {
            return Ok(());
        };
        match self.assign(role.id, &[]) {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    fn import(&self, id: &str) -> Result<RolePermissionsState> {
        Ok(RolePermissionsState {
            role_id: None,
            role_name: natural_key("role", id)?,
            permissions: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{assert_converges, ctx};
    use declarative::Diagnose;
    use superset_client::MockApi;

    fn perm(p: &str, v: &str) -> PermissionRef {
        PermissionRef::new(p, v)
    }

    fn config(role: &str, permissions: Vec<PermissionRef>) -> RolePermissionsConfig {
        RolePermissionsConfig {
            role_name: role.into(),
            permissions,
        }
    }

    #[test]
    fn test_assigns_resolved_permission_ids() {
        let api = MockApi::new();
        let role = api.add_role("Analysts");
        api.add_permission_with_id(10, "can_post", "Group");
        api.add_permission_with_id(11, "can_get", "Group");
        let resource = RolePermissionsResource { api: &api };

        let state = assert_converges(
            &resource,
            &config("Analysts", vec![perm("can_post", "Group"), perm("can_get", "Group")]),
        );
        assert_eq!(state.role_id, Some(role));
        assert_eq!(api.role_permission_ids(role), vec![10, 11]);
    }

    #[test]
    fn test_unknown_permissions_reported_together() {
        let api = MockApi::new();
        api.add_role("Analysts");
        api.add_permission("can_read", "Chart");
        let resource = RolePermissionsResource { api: &api };

        let planned = resource.plan(
            &config(
                "Analysts",
                vec![
                    perm("can_read", "Chart"),
                    perm("can_fly", "Chart"),
                    perm("can_swim", "Chart"),
                ],
            ),
            None,
        );
        let err = resource.create(&mut ctx(), &planned).unwrap_err();
        assert_eq!(err.summary(), "Invalid Permissions");
        assert!(err.to_string().contains("can_fly_Chart, can_swim_Chart"));
    }

    #[test]
    fn test_missing_role_is_invalid_roles() {
        let api = MockApi::new();
        let resource = RolePermissionsResource { api: &api };
        let planned = resource.plan(&config("Nobody", vec![]), None);
        let err = resource.create(&mut ctx(), &planned).unwrap_err();
        assert_eq!(err.summary(), "Invalid Roles");
    }

    #[test]
    fn test_duplicates_fail_validation_with_both_positions() {
        let cfg = config(
            "Analysts",
            vec![
                perm("can_read", "Chart"),
                perm("can_write", "Chart"),
                perm("can_read", "Chart"),
            ],
        );
        let mut diags = Diagnostics::new();
        RolePermissionsResource::validate(&cfg, &mut diags);

        assert_eq!(diags.error_count(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.path.as_deref(), Some("permissions[2]"));
        assert!(diag.detail.contains("permissions[2]"));
        assert!(diag.detail.contains("permissions[0]"));
    }

    #[test]
    fn test_drift_outside_dashform_is_detected() {
        let api = MockApi::new();
        let role = api.add_role("Analysts");
        let read_chart = api.add_permission("can_read", "Chart");
        let write_chart = api.add_permission("can_write", "Chart");
        let resource = RolePermissionsResource { api: &api };
        let cfg = config("Analysts", vec![perm("can_read", "Chart")]);
        assert_converges(&resource, &cfg);

        api.set_role_permissions(role, &[write_chart, read_chart]).unwrap();
        let prior = resource.plan(&cfg, None);
        let prior = RolePermissionsState {
            role_id: Some(role),
            ..prior
        };
        let live = resource.read(&mut ctx(), &prior).unwrap().unwrap();
        assert_eq!(
            live.permissions,
            vec![perm("can_read", "Chart"), perm("can_write", "Chart")]
        );
        assert_ne!(resource.plan(&cfg, Some(&live)), live);
    }

    #[test]
    fn test_delete_clears_permissions() {
        let api = MockApi::new();
        let role = api.add_role("Analysts");
        api.add_permission("can_read", "Chart");
        let resource = RolePermissionsResource { api: &api };
        let state = assert_converges(&resource, &config("Analysts", vec![perm("can_read", "Chart")]));

        resource.delete(&mut ctx(), &state).unwrap();
        assert!(api.role_permission_ids(role).is_empty());
    }

    #[test]
    fn test_import_by_role_name() {
        let api = MockApi::new();
        let role = api.add_role("Gamma");
        let perm_id = api.add_permission("can_read", "Dashboard");
        api.set_role_permissions(role, &[perm_id]).unwrap();
        let resource = RolePermissionsResource { api: &api };

        let seed = resource.import("Gamma").unwrap();
        let state = resource.read(&mut ctx(), &seed).unwrap().unwrap();
        assert_eq!(state.role_id, Some(role));
        assert_eq!(state.permissions, vec![perm("can_read", "Dashboard")]);

        let missing = resource.import("Nobody").unwrap();
        assert_eq!(resource.read(&mut ctx(), &missing).unwrap(), None);
    }
}
