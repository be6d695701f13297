//! User resource
//!
//! Users reference roles and groups by name; both are resolved to ids on
//! every create and update. The password is write-only on the server, so
//! the recorded state keeps the last value that was sent.
//!
//! Superset refuses to delete users that still own objects. When that
//! happens the user is deactivated and removed from every group instead,
//! and a warning is raised.

use declarative::{ApplyContext, Lifecycle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use superset_client::{Api, User, UserPost, UserPut};

use super::{group_ids, names, role_ids};
use crate::error::{ProviderError, Result, call, missing_id, numeric_id};

pub const KIND: &str = "user";

const fn active_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    pub role_names: BTreeSet<String>,
    #[serde(default)]
    pub group_names: BTreeSet<String>,
    #[serde(default = "active_default")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserState {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub role_names: BTreeSet<String>,
    #[serde(default)]
    pub group_names: BTreeSet<String>,
    #[serde(default = "active_default")]
    pub active: bool,
}

impl UserState {
    /// Live attributes of `user`, keeping the recorded password
    fn from_remote(user: User, password: Option<String>) -> Self {
        Self {
            id: Some(user.id),
            role_names: names(&user.roles),
            group_names: names(&user.groups),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password,
            active: user.active,
        }
    }
}

/// A Superset user
pub struct UserResource<'a> {
    pub api: &'a dyn Api,
}

impl UserResource<'_> {
    fn fetch(&self, id: i64, password: Option<String>) -> Result<UserState> {
        let user = self
            .api
            .get_user(id)
            .map_err(call(format!("read User with ID {id}")))?;
        Ok(UserState::from_remote(user, password))
    }
}

impl Lifecycle for UserResource<'_> {
    type Config = UserConfig;
    type State = UserState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn plan(&self, config: &UserConfig, prior: Option<&UserState>) -> UserState {
        UserState {
            id: prior.and_then(|p| p.id),
            username: config.username.clone(),
            first_name: config.first_name.clone(),
            last_name: config.last_name.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            role_names: config.role_names.clone(),
            group_names: config.group_names.clone(),
            active: config.active,
        }
    }

    fn requires_replace(&self, planned: &UserState, prior: &UserState) -> bool {
        planned.username != prior.username || planned.email != prior.email
    }

    fn sensitive(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &UserState) -> Result<UserState> {
        if let Some(existing) = self
            .api
            .find_user(&planned.username)
            .map_err(call("validate User username uniqueness"))?
        {
            return Err(ProviderError::Conflict {
                kind: "user",
                field: "username",
                value: planned.username.clone(),
                id: existing.id,
            });
        }

        let post = UserPost {
            username: planned.username.clone(),
            first_name: planned.first_name.clone(),
            last_name: planned.last_name.clone(),
            email: planned.email.clone(),
            password: planned.password.clone().unwrap_or_default(),
            active: planned.active,
            roles: role_ids(self.api, &planned.role_names)?,
            groups: group_ids(self.api, &planned.group_names)?,
        };
        let id = self.api.create_user(&post).map_err(call("create User"))?;
        log::debug!("created user {} with id {id}", planned.username);
        self.fetch(id, planned.password.clone())
    }

    fn read(&self, _ctx: &mut ApplyContext<'_>, current: &UserState) -> Result<Option<UserState>> {
        let Some(id) = current.id else {
            return Ok(None);
        };
        match self.fetch(id, current.password.clone()) {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        _ctx: &mut ApplyContext<'_>,
        planned: &UserState,
        prior: &UserState,
    ) -> Result<UserState> {
        let id = prior.id.ok_or_else(|| missing_id(KIND))?;
        let put = UserPut {
            first_name: Some(planned.first_name.clone()),
            last_name: Some(planned.last_name.clone()),
            email: Some(planned.email.clone()),
            password: planned
                .password
                .clone()
                .filter(|p| prior.password.as_ref() != Some(p)),
            active: Some(planned.active),
            roles: Some(role_ids(self.api, &planned.role_names)?),
            groups: Some(group_ids(self.api, &planned.group_names)?),
        };
        self.api
            .update_user(id, &put)
            .map_err(call(format!("update User with ID {id}")))?;
        self.fetch(id, planned.password.clone())
    }

    fn delete(&self, ctx: &mut ApplyContext<'_>, current: &UserState) -> Result<()> {
        let id = current.id.ok_or_else(|| missing_id(KIND))?;
        let err = match self.api.delete_user(id) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => e,
        };

        ctx.warn(
            "Deletion Error",
            format!("Unable to delete user with ID {id}: {err}. Deactivating the user instead."),
        );
        let deactivate = UserPut {
            active: Some(false),
            groups: Some(Vec::new()),
            ..Default::default()
        };
        self.api
            .update_user(id, &deactivate)
            .map_err(call(format!("deactivate User with ID {id} after failed deletion")))
    }

    fn import(&self, id: &str) -> Result<UserState> {
        Ok(UserState {
            id: Some(numeric_id(KIND, id)?),
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: None,
            role_names: BTreeSet::new(),
            group_names: BTreeSet::new(),
            active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{assert_converges, ctx};
    use declarative::{Diagnose, Severity};
    use superset_client::MockApi;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn config(username: &str, roles: &[&str]) -> UserConfig {
        UserConfig {
            username: username.into(),
            first_name: "Alice".into(),
            last_name: "Doe".into(),
            email: format!("{username}@example.com"),
            password: Some("s3cret".into()),
            role_names: set(roles),
            group_names: BTreeSet::new(),
            active: true,
        }
    }

    #[test]
    fn test_create_resolves_roles_and_groups() {
        let api = MockApi::new();
        api.add_role("Gamma");
        api.add_role("Alpha");
        api.add_group("analysts");
        let users = UserResource { api: &api };

        let mut cfg = config("alice", &["Gamma", "Alpha"]);
        cfg.group_names = set(&["analysts"]);
        let state = assert_converges(&users, &cfg);

        let id = state.id.unwrap();
        assert_eq!(state.role_names, set(&["Alpha", "Gamma"]));
        assert_eq!(state.group_names, set(&["analysts"]));
        assert_eq!(state.password.as_deref(), Some("s3cret"));
        assert_eq!(api.user_password(id).as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_unknown_roles_reported_together() {
        let api = MockApi::new();
        api.add_role("Gamma");
        let users = UserResource { api: &api };

        let planned = users.plan(&config("alice", &["Gamma", "Missing", "Other"]), None);
        let err = users.create(&mut ctx(), &planned).unwrap_err();
        assert_eq!(err.summary(), "Invalid Roles");
        assert!(err.to_string().contains("Missing, Other"));
        assert!(api.find_user("alice").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let api = MockApi::new();
        api.add_role("Gamma");
        let users = UserResource { api: &api };
        let existing = assert_converges(&users, &config("alice", &["Gamma"]));

        let err = users
            .create(&mut ctx(), &users.plan(&config("alice", &["Gamma"]), None))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "A user with username 'alice' already exists with ID {}",
                existing.id.unwrap()
            )
        );
    }

    #[test]
    fn test_email_change_requires_replace() {
        let api = MockApi::new();
        let users = UserResource { api: &api };
        let prior = users.plan(&config("alice", &[]), None);
        let mut cfg = config("alice", &[]);
        cfg.email = "new@example.com".into();
        assert!(users.requires_replace(&users.plan(&cfg, Some(&prior)), &prior));

        cfg = config("alice", &[]);
        cfg.first_name = "Alicia".into();
        assert!(!users.requires_replace(&users.plan(&cfg, Some(&prior)), &prior));
    }

    #[test]
    fn test_update_changes_roles_and_keeps_password() {
        let api = MockApi::new();
        api.add_role("Gamma");
        api.add_role("Alpha");
        let users = UserResource { api: &api };
        let prior = assert_converges(&users, &config("alice", &["Gamma"]));

        let cfg = config("alice", &["Alpha"]);
        let planned = users.plan(&cfg, Some(&prior));
        let updated = users.update(&mut ctx(), &planned, &prior).unwrap();
        assert_eq!(updated.role_names, set(&["Alpha"]));
        assert_eq!(updated, users.plan(&cfg, Some(&updated)));
        assert_eq!(api.user_password(updated.id.unwrap()).as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_delete_falls_back_to_deactivation() {
        let api = MockApi::new();
        api.add_role("Gamma");
        api.add_group("analysts");
        let users = UserResource { api: &api };
        let mut cfg = config("alice", &["Gamma"]);
        cfg.group_names = set(&["analysts"]);
        let state = assert_converges(&users, &cfg);
        let id = state.id.unwrap();

        api.fail_user_deletes(true);
        let mut ctx = ctx();
        users.delete(&mut ctx, &state).unwrap();

        assert_eq!(ctx.diagnostics.warning_count(), 1);
        let warning = ctx.diagnostics.iter().next().unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.summary, "Deletion Error");

        let user = api.user(id).unwrap();
        assert!(!user.active);
        assert!(user.groups.is_empty());
    }

    #[test]
    fn test_delete_fails_when_deactivation_fails() {
        let api = MockApi::new();
        let users = UserResource { api: &api };
        let state = assert_converges(&users, &config("alice", &[]));

        api.fail_user_deletes(true);
        api.fail_user_updates(true);
        let mut ctx = ctx();
        let err = users.delete(&mut ctx, &state).unwrap_err();
        assert!(err.to_string().contains("deactivate User"));
        assert_eq!(ctx.diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_password_is_sensitive() {
        let api = MockApi::new();
        let users = UserResource { api: &api };
        assert_eq!(users.sensitive(), &["password"]);
    }

    #[test]
    fn test_import_then_read() {
        let api = MockApi::new();
        api.add_role("Gamma");
        let id = api
            .create_user(&UserPost {
                username: "bob".into(),
                first_name: "Bob".into(),
                last_name: "Smith".into(),
                email: "bob@example.com".into(),
                password: "pw".into(),
                active: true,
                roles: vec![1],
                groups: vec![],
            })
            .unwrap();

        let users = UserResource { api: &api };
        let seed = users.import(&id.to_string()).unwrap();
        let state = users.read(&mut ctx(), &seed).unwrap().unwrap();
        assert_eq!(state.username, "bob");
        assert_eq!(state.role_names, set(&["Gamma"]));
        assert_eq!(state.password, None);
    }
}
