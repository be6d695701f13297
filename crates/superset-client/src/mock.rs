//! [`MockApi`]: an in-memory Superset for tests.
//!
//! The mock assigns ids and uuids the way the server does, rejects the
//! payloads the server would reject (unknown ids, duplicate names, folder
//! children that point nowhere) and can be told to fail selected calls.
//! Clones share the same state, so a test can keep a handle for
//! inspection while a handler owns another.

use crate::api::{Api, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::types::{
    Column, ColumnPut, Database, Dataset, DatasetDatabase, DatasetPost, DatasetPut,
    DatasetSummary, FolderType, Group, GroupPost, GroupPut, Metric, MetricPut, Named, NamedRef,
    Owner, Permission, Role, RolePermission, Tag, TagPayload, User, UserPost, UserPut, WireFolder,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug)]
struct MockState {
    page_size: usize,
    next_id: i64,
    users: BTreeMap<i64, User>,
    passwords: BTreeMap<i64, String>,
    roles: BTreeMap<i64, Role>,
    groups: BTreeMap<i64, Group>,
    permissions: BTreeMap<i64, Permission>,
    role_permissions: BTreeMap<i64, Vec<i64>>,
    databases: BTreeMap<i64, Database>,
    datasets: BTreeMap<i64, Dataset>,
    tags: BTreeMap<i64, Tag>,
    fail_user_deletes: bool,
    fail_user_updates: bool,
    deadline: Option<Instant>,
    last_dataset_put: Option<DatasetPut>,
    calls: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            next_id: 1,
            users: BTreeMap::new(),
            passwords: BTreeMap::new(),
            roles: BTreeMap::new(),
            groups: BTreeMap::new(),
            permissions: BTreeMap::new(),
            role_permissions: BTreeMap::new(),
            databases: BTreeMap::new(),
            datasets: BTreeMap::new(),
            tags: BTreeMap::new(),
            fail_user_deletes: false,
            fail_user_updates: false,
            deadline: None,
            last_dataset_put: None,
            calls: Vec::new(),
        }
    }
}

fn unprocessable(message: impl Into<String>) -> Error {
    Error::Api {
        status: 422,
        body: format!(r#"{{"message":"{}"}}"#, message.into()),
    }
}

fn page_of<T>(items: impl Iterator<Item = T>, page: usize, page_size: usize) -> Vec<T> {
    items.skip(page * page_size).take(page_size).collect()
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn role_refs(&self, ids: &[i64]) -> Result<Vec<NamedRef>> {
        ids.iter()
            .map(|id| {
                self.roles
                    .get(id)
                    .map(|r| NamedRef {
                        id: r.id,
                        name: r.name.clone(),
                    })
                    .ok_or_else(|| unprocessable(format!("role {id} does not exist")))
            })
            .collect()
    }

    fn group_refs(&self, ids: &[i64]) -> Result<Vec<NamedRef>> {
        ids.iter()
            .map(|id| {
                self.groups
                    .get(id)
                    .map(|g| NamedRef {
                        id: g.id,
                        name: g.name.clone(),
                    })
                    .ok_or_else(|| unprocessable(format!("group {id} does not exist")))
            })
            .collect()
    }

    fn apply_columns(&mut self, existing: &[Column], puts: &[ColumnPut]) -> Result<Vec<Column>> {
        let mut out = Vec::with_capacity(puts.len());
        for put in puts {
            let (id, uuid, server_type) = match put.id {
                Some(id) => {
                    let current = existing
                        .iter()
                        .find(|c| c.id == id)
                        .ok_or_else(|| unprocessable(format!("column id {id} does not exist")))?;
                    (id, current.uuid, current.data_type.clone())
                }
                None => (self.next_id(), Some(Uuid::new_v4()), None),
            };
            out.push(Column {
                id,
                column_name: put.column_name.clone(),
                uuid,
                data_type: put.data_type.clone().or(server_type),
                advanced_data_type: put.advanced_data_type.clone(),
                description: put.description.clone(),
                expression: put.expression.clone(),
                filterable: Some(put.filterable),
                groupby: Some(put.groupby),
                is_active: Some(put.is_active),
                is_dttm: Some(put.is_dttm),
                verbose_name: put.verbose_name.clone(),
                extra: put.extra.clone(),
            });
        }
        Ok(out)
    }

    fn apply_metrics(&mut self, existing: &[Metric], puts: &[MetricPut]) -> Result<Vec<Metric>> {
        let mut out = Vec::with_capacity(puts.len());
        for put in puts {
            let (id, uuid) = match put.id {
                Some(id) => {
                    let current = existing
                        .iter()
                        .find(|m| m.id == id)
                        .ok_or_else(|| unprocessable(format!("metric id {id} does not exist")))?;
                    (id, current.uuid)
                }
                None => (self.next_id(), Some(Uuid::new_v4())),
            };
            out.push(Metric {
                id,
                metric_name: put.metric_name.clone(),
                uuid,
                expression: put.expression.clone(),
                description: put.description.clone(),
                verbose_name: put.verbose_name.clone(),
                d3format: put.d3format.clone(),
                warning_text: put.warning_text.clone(),
                currency: put.currency.clone(),
                extra: put.extra.clone(),
            });
        }
        Ok(out)
    }
}

/// Every folder child must reference a column or metric of the dataset.
fn check_folders(folders: &[WireFolder], columns: &[Column], metrics: &[Metric]) -> Result<()> {
    let column_uuids: BTreeSet<Uuid> = columns.iter().filter_map(|c| c.uuid).collect();
    let metric_uuids: BTreeSet<Uuid> = metrics.iter().filter_map(|m| m.uuid).collect();

    for folder in folders {
        for child in folder.children.iter().flatten() {
            let known = match child.kind {
                FolderType::Column => column_uuids.contains(&child.uuid),
                FolderType::Metric => metric_uuids.contains(&child.uuid),
                FolderType::Folder => true,
            };
            if !known {
                return Err(unprocessable(format!(
                    "folder child {} references unknown {} {}",
                    child.name,
                    child.kind.as_str(),
                    child.uuid
                )));
            }
        }
    }
    Ok(())
}

/// In-memory [`Api`].
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    /// Empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `page_size` for list operations.
    #[must_use]
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.lock().page_size = page_size;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock for an API call: record it and enforce the deadline.
    fn call(&self, name: &str) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(name.to_string());
        if let Some(deadline) = state.deadline
            && Instant::now() >= deadline
        {
            return Err(Error::Timeout(format!("{name}: deadline exceeded")));
        }
        Ok(state)
    }

    // -- seeding -------------------------------------------------------------

    /// Add a role, returning its id.
    pub fn add_role(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.roles.insert(
            id,
            Role {
                id,
                name: name.into(),
            },
        );
        id
    }

    /// Add a group, returning its id.
    pub fn add_group(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.groups.insert(
            id,
            Group {
                id,
                name: name.into(),
                label: None,
                roles: Vec::new(),
            },
        );
        id
    }

    /// Add a permission/view-menu pair, returning its id.
    pub fn add_permission(&self, permission: &str, view_menu: &str) -> i64 {
        let id = self.lock().next_id();
        self.add_permission_with_id(id, permission, view_menu);
        id
    }

    /// Add a permission/view-menu pair under a fixed id.
    pub fn add_permission_with_id(&self, id: i64, permission: &str, view_menu: &str) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(id + 1);
        state.permissions.insert(
            id,
            Permission {
                id,
                permission: Named {
                    name: permission.into(),
                },
                view_menu: Named {
                    name: view_menu.into(),
                },
            },
        );
    }

    /// Add a database, returning its id.
    pub fn add_database(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.databases.insert(
            id,
            Database {
                id,
                database_name: name.into(),
            },
        );
        id
    }

    /// Add an empty physical dataset, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if the database does not exist.
    pub fn add_dataset(&self, database_id: i64, table_name: &str) -> i64 {
        self.create_dataset(&DatasetPost {
            database: database_id,
            table_name: table_name.into(),
            schema: None,
            catalog: None,
            sql: None,
            is_managed_externally: false,
            normalize_columns: false,
        })
        .unwrap_or_else(|e| panic!("add_dataset: {e}"))
    }

    /// Add a column as the server would after introspecting the table.
    ///
    /// # Panics
    ///
    /// Panics if the dataset does not exist.
    pub fn add_dataset_column(&self, dataset_id: i64, name: &str, data_type: &str) -> (i64, Uuid) {
        let mut state = self.lock();
        let id = state.next_id();
        let uuid = Uuid::new_v4();
        let dataset = state
            .datasets
            .get_mut(&dataset_id)
            .unwrap_or_else(|| panic!("add_dataset_column: dataset {dataset_id} does not exist"));
        dataset.columns.push(Column {
            id,
            column_name: name.into(),
            uuid: Some(uuid),
            data_type: Some(data_type.into()),
            advanced_data_type: None,
            description: None,
            expression: None,
            filterable: Some(true),
            groupby: Some(true),
            is_active: Some(true),
            is_dttm: Some(false),
            verbose_name: None,
            extra: None,
        });
        (id, uuid)
    }

    /// Add a metric to a dataset.
    ///
    /// # Panics
    ///
    /// Panics if the dataset does not exist.
    pub fn add_dataset_metric(&self, dataset_id: i64, name: &str, expression: &str) -> (i64, Uuid) {
        let mut state = self.lock();
        let id = state.next_id();
        let uuid = Uuid::new_v4();
        let dataset = state
            .datasets
            .get_mut(&dataset_id)
            .unwrap_or_else(|| panic!("add_dataset_metric: dataset {dataset_id} does not exist"));
        dataset.metrics.push(Metric {
            id,
            metric_name: name.into(),
            uuid: Some(uuid),
            expression: expression.into(),
            description: None,
            verbose_name: None,
            d3format: None,
            warning_text: None,
            currency: None,
            extra: None,
        });
        (id, uuid)
    }

    // -- failure injection ---------------------------------------------------

    /// Make every user delete fail with a 500.
    pub fn fail_user_deletes(&self, fail: bool) {
        self.lock().fail_user_deletes = fail;
    }

    /// Make every user update fail with a 500.
    pub fn fail_user_updates(&self, fail: bool) {
        self.lock().fail_user_updates = fail;
    }

    // -- inspection ----------------------------------------------------------

    /// Current dataset, if present.
    #[must_use]
    pub fn dataset(&self, id: i64) -> Option<Dataset> {
        self.lock().datasets.get(&id).cloned()
    }

    /// Current user, if present.
    #[must_use]
    pub fn user(&self, id: i64) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    /// Password last sent for a user.
    #[must_use]
    pub fn user_password(&self, id: i64) -> Option<String> {
        self.lock().passwords.get(&id).cloned()
    }

    /// Current group, if present.
    #[must_use]
    pub fn group(&self, id: i64) -> Option<Group> {
        self.lock().groups.get(&id).cloned()
    }

    /// Permission ids assigned to a role.
    #[must_use]
    pub fn role_permission_ids(&self, role_id: i64) -> Vec<i64> {
        self.lock()
            .role_permissions
            .get(&role_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Body of the most recent dataset update.
    #[must_use]
    pub fn last_dataset_put(&self) -> Option<DatasetPut> {
        self.lock().last_dataset_put.clone()
    }

    /// Names of the API calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
}

impl Api for MockApi {
    fn page_size(&self) -> usize {
        self.lock().page_size
    }

    fn set_deadline(&self, deadline: Option<Instant>) {
        self.lock().deadline = deadline;
    }

    // -- users ---------------------------------------------------------------

    fn users_page(&self, page: usize, page_size: usize) -> Result<Vec<User>> {
        let state = self.call("users_page")?;
        Ok(page_of(state.users.values().cloned(), page, page_size))
    }

    fn get_user(&self, id: i64) -> Result<User> {
        let state = self.call("get_user")?;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("User", id))
    }

    fn find_user(&self, username: &str) -> Result<Option<User>> {
        let state = self.call("find_user")?;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    fn create_user(&self, user: &UserPost) -> Result<i64> {
        let mut state = self.call("create_user")?;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(unprocessable(format!("username {} already exists", user.username)));
        }
        let roles = state.role_refs(&user.roles)?;
        let groups = state.group_refs(&user.groups)?;
        let id = state.next_id();
        state.users.insert(
            id,
            User {
                id,
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                active: user.active,
                roles,
                groups,
            },
        );
        state.passwords.insert(id, user.password.clone());
        Ok(id)
    }

    fn update_user(&self, id: i64, user: &UserPut) -> Result<()> {
        let mut state = self.call("update_user")?;
        if state.fail_user_updates {
            return Err(Error::Api {
                status: 500,
                body: "user update failed".into(),
            });
        }
        if !state.users.contains_key(&id) {
            return Err(Error::not_found("User", id));
        }
        let roles = user.roles.as_deref().map(|r| state.role_refs(r)).transpose()?;
        let groups = user.groups.as_deref().map(|g| state.group_refs(g)).transpose()?;
        if let Some(password) = &user.password {
            state.passwords.insert(id, password.clone());
        }
        let Some(current) = state.users.get_mut(&id) else {
            return Err(Error::not_found("User", id));
        };
        if let Some(v) = &user.first_name {
            current.first_name.clone_from(v);
        }
        if let Some(v) = &user.last_name {
            current.last_name.clone_from(v);
        }
        if let Some(v) = &user.email {
            current.email.clone_from(v);
        }
        if let Some(v) = user.active {
            current.active = v;
        }
        if let Some(v) = roles {
            current.roles = v;
        }
        if let Some(v) = groups {
            current.groups = v;
        }
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        let mut state = self.call("delete_user")?;
        if state.fail_user_deletes {
            return Err(Error::Api {
                status: 500,
                body: "user delete failed".into(),
            });
        }
        state.passwords.remove(&id);
        state
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("User", id))
    }

    // -- roles ---------------------------------------------------------------

    fn roles_page(&self, page: usize, page_size: usize) -> Result<Vec<Role>> {
        let state = self.call("roles_page")?;
        Ok(page_of(state.roles.values().cloned(), page, page_size))
    }

    fn get_role(&self, id: i64) -> Result<Role> {
        let state = self.call("get_role")?;
        state
            .roles
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("Role", id))
    }

    fn find_role(&self, name: &str) -> Result<Option<Role>> {
        let state = self.call("find_role")?;
        Ok(state.roles.values().find(|r| r.name == name).cloned())
    }

    fn create_role(&self, name: &str) -> Result<i64> {
        let mut state = self.call("create_role")?;
        if state.roles.values().any(|r| r.name == name) {
            return Err(unprocessable(format!("role {name} already exists")));
        }
        let id = state.next_id();
        state.roles.insert(
            id,
            Role {
                id,
                name: name.into(),
            },
        );
        Ok(id)
    }

    fn update_role(&self, id: i64, name: &str) -> Result<()> {
        let mut state = self.call("update_role")?;
        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Role", id))?;
        role.name = name.into();
        Ok(())
    }

    fn delete_role(&self, id: i64) -> Result<()> {
        let mut state = self.call("delete_role")?;
        state.role_permissions.remove(&id);
        state
            .roles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Role", id))
    }

    fn role_permissions(&self, role_id: i64) -> Result<Vec<RolePermission>> {
        let state = self.call("role_permissions")?;
        if !state.roles.contains_key(&role_id) {
            return Err(Error::not_found("Role", role_id));
        }
        let ids = state.role_permissions.get(&role_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.permissions.get(id))
            .map(|p| RolePermission {
                id: p.id,
                permission_name: p.permission.name.clone(),
                view_menu_name: p.view_menu.name.clone(),
            })
            .collect())
    }

    fn set_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> Result<()> {
        let mut state = self.call("set_role_permissions")?;
        if !state.roles.contains_key(&role_id) {
            return Err(Error::not_found("Role", role_id));
        }
        if let Some(bad) = permission_ids
            .iter()
            .find(|id| !state.permissions.contains_key(id))
        {
            return Err(unprocessable(format!("permission {bad} does not exist")));
        }
        state.role_permissions.insert(role_id, permission_ids.to_vec());
        Ok(())
    }

    // -- groups --------------------------------------------------------------

    fn groups_page(&self, page: usize, page_size: usize) -> Result<Vec<Group>> {
        let state = self.call("groups_page")?;
        Ok(page_of(state.groups.values().cloned(), page, page_size))
    }

    fn get_group(&self, id: i64) -> Result<Group> {
        let state = self.call("get_group")?;
        state
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("Group", id))
    }

    fn find_group(&self, name: &str) -> Result<Option<Group>> {
        let state = self.call("find_group")?;
        Ok(state.groups.values().find(|g| g.name == name).cloned())
    }

    fn create_group(&self, group: &GroupPost) -> Result<i64> {
        let mut state = self.call("create_group")?;
        if state.groups.values().any(|g| g.name == group.name) {
            return Err(unprocessable(format!("group {} already exists", group.name)));
        }
        let id = state.next_id();
        state.groups.insert(
            id,
            Group {
                id,
                name: group.name.clone(),
                label: group.label.clone(),
                roles: Vec::new(),
            },
        );
        Ok(id)
    }

    fn update_group(&self, id: i64, group: &GroupPut) -> Result<()> {
        let mut state = self.call("update_group")?;
        let roles = group.roles.as_deref().map(|r| state.role_refs(r)).transpose()?;
        let current = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Group", id))?;
        if let Some(name) = &group.name {
            current.name.clone_from(name);
        }
        if group.label.is_some() {
            current.label.clone_from(&group.label);
        }
        if let Some(roles) = roles {
            current.roles = roles;
        }
        Ok(())
    }

    fn delete_group(&self, id: i64) -> Result<()> {
        let mut state = self.call("delete_group")?;
        state
            .groups
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Group", id))
    }

    // -- catalog -------------------------------------------------------------

    fn permissions_page(&self, page: usize, page_size: usize) -> Result<Vec<Permission>> {
        let state = self.call("permissions_page")?;
        Ok(page_of(state.permissions.values().cloned(), page, page_size))
    }

    fn databases_page(&self, page: usize, page_size: usize) -> Result<Vec<Database>> {
        let state = self.call("databases_page")?;
        Ok(page_of(state.databases.values().cloned(), page, page_size))
    }

    fn find_database(&self, name: &str) -> Result<Option<Database>> {
        let state = self.call("find_database")?;
        Ok(state
            .databases
            .values()
            .find(|d| d.database_name == name)
            .cloned())
    }

    // -- datasets ------------------------------------------------------------

    fn find_dataset(&self, table_name: &str) -> Result<Option<DatasetSummary>> {
        let state = self.call("find_dataset")?;
        Ok(state
            .datasets
            .values()
            .find(|d| d.table_name == table_name)
            .map(|d| DatasetSummary {
                id: d.id,
                table_name: d.table_name.clone(),
            }))
    }

    fn get_dataset(&self, id: i64) -> Result<Dataset> {
        let state = self.call("get_dataset")?;
        state
            .datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("Dataset", id))
    }

    fn create_dataset(&self, dataset: &DatasetPost) -> Result<i64> {
        let mut state = self.call("create_dataset")?;
        let database = state
            .databases
            .get(&dataset.database)
            .cloned()
            .ok_or_else(|| unprocessable(format!("database {} does not exist", dataset.database)))?;
        if state
            .datasets
            .values()
            .any(|d| d.table_name == dataset.table_name && d.database.id == database.id)
        {
            return Err(unprocessable(format!(
                "dataset {} already exists",
                dataset.table_name
            )));
        }
        let id = state.next_id();
        state.datasets.insert(
            id,
            Dataset {
                id,
                table_name: dataset.table_name.clone(),
                database: DatasetDatabase {
                    id: database.id,
                    database_name: database.database_name,
                },
                schema: dataset.schema.clone(),
                catalog: dataset.catalog.clone(),
                sql: dataset.sql.clone(),
                description: None,
                cache_timeout: None,
                filter_select_enabled: Some(false),
                fetch_values_predicate: None,
                always_filter_main_dttm: Some(false),
                normalize_columns: Some(dataset.normalize_columns),
                is_managed_externally: Some(dataset.is_managed_externally),
                owners: Vec::new(),
                extra: None,
                columns: Vec::new(),
                metrics: Vec::new(),
                folders: None,
            },
        );
        Ok(id)
    }

    fn update_dataset(&self, id: i64, put: &DatasetPut) -> Result<()> {
        let mut state = self.call("update_dataset")?;
        state.last_dataset_put = Some(put.clone());

        let mut dataset = state
            .datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("Dataset", id))?;

        if let Some(database_id) = put.database_id {
            let database = state
                .databases
                .get(&database_id)
                .ok_or_else(|| unprocessable(format!("database {database_id} does not exist")))?;
            dataset.database = DatasetDatabase {
                id: database.id,
                database_name: database.database_name.clone(),
            };
        }
        if let Some(columns) = &put.columns {
            dataset.columns = state.apply_columns(&dataset.columns, columns)?;
        }
        if let Some(metrics) = &put.metrics {
            dataset.metrics = state.apply_metrics(&dataset.metrics, metrics)?;
        }
        if let Some(folders) = &put.folders {
            check_folders(folders, &dataset.columns, &dataset.metrics)?;
            dataset.folders = Some(folders.clone());
        }

        if let Some(v) = &put.table_name {
            dataset.table_name.clone_from(v);
        }
        if put.schema.is_some() {
            dataset.schema.clone_from(&put.schema);
        }
        if put.catalog.is_some() {
            dataset.catalog.clone_from(&put.catalog);
        }
        if put.sql.is_some() {
            dataset.sql.clone_from(&put.sql);
        }
        if put.description.is_some() {
            dataset.description.clone_from(&put.description);
        }
        if put.cache_timeout.is_some() {
            dataset.cache_timeout = put.cache_timeout;
        }
        if put.filter_select_enabled.is_some() {
            dataset.filter_select_enabled = put.filter_select_enabled;
        }
        if put.fetch_values_predicate.is_some() {
            dataset
                .fetch_values_predicate
                .clone_from(&put.fetch_values_predicate);
        }
        if put.always_filter_main_dttm.is_some() {
            dataset.always_filter_main_dttm = put.always_filter_main_dttm;
        }
        if put.normalize_columns.is_some() {
            dataset.normalize_columns = put.normalize_columns;
        }
        if put.is_managed_externally.is_some() {
            dataset.is_managed_externally = put.is_managed_externally;
        }
        if let Some(owners) = &put.owners {
            dataset.owners = owners.iter().map(|&id| Owner { id }).collect();
        }
        if put.extra.is_some() {
            dataset.extra.clone_from(&put.extra);
        }

        state.datasets.insert(id, dataset);
        Ok(())
    }

    fn delete_dataset(&self, id: i64) -> Result<()> {
        let mut state = self.call("delete_dataset")?;
        state
            .datasets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Dataset", id))
    }

    // -- tags ----------------------------------------------------------------

    fn get_tag(&self, id: i64) -> Result<Tag> {
        let state = self.call("get_tag")?;
        state
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("Tag", id))
    }

    fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        let state = self.call("find_tag")?;
        Ok(state.tags.values().find(|t| t.name == name).cloned())
    }

    fn create_tag(&self, tag: &TagPayload) -> Result<i64> {
        let mut state = self.call("create_tag")?;
        if state.tags.values().any(|t| t.name == tag.name) {
            return Err(unprocessable(format!("tag {} already exists", tag.name)));
        }
        let id = state.next_id();
        state.tags.insert(
            id,
            Tag {
                id,
                name: tag.name.clone(),
                description: tag.description.clone(),
            },
        );
        Ok(id)
    }

    fn update_tag(&self, id: i64, tag: &TagPayload) -> Result<()> {
        let mut state = self.call("update_tag")?;
        let current = state
            .tags
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Tag", id))?;
        current.name.clone_from(&tag.name);
        current.description.clone_from(&tag.description);
        Ok(())
    }

    fn delete_tag(&self, id: i64) -> Result<()> {
        let mut state = self.call("delete_tag")?;
        state
            .tags
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Tag", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn column_put(id: Option<i64>, name: &str) -> ColumnPut {
        ColumnPut {
            id,
            column_name: name.into(),
            data_type: None,
            advanced_data_type: None,
            description: None,
            expression: None,
            filterable: true,
            groupby: true,
            is_active: true,
            is_dttm: false,
            verbose_name: None,
            extra: None,
        }
    }

    #[test]
    fn test_ids_are_assigned_in_order() {
        let api = MockApi::new();
        let a = api.add_role("Alpha");
        let b = api.add_role("Gamma");
        assert!(b > a);
        assert_eq!(api.find_role("Gamma").unwrap().unwrap().id, b);
        assert!(api.find_role("Admin").unwrap().is_none());
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let api = MockApi::new();
        assert!(api.get_user(99).unwrap_err().is_not_found());
        assert!(api.delete_tag(99).unwrap_err().is_not_found());
        assert!(api.get_dataset(99).unwrap_err().is_not_found());
    }

    #[test]
    fn test_pagination_over_list() {
        let api = MockApi::new().with_page_size(2);
        for name in ["a", "b", "c", "d", "e"] {
            api.add_role(name);
        }
        let roles = api.list_roles().unwrap();
        assert_eq!(roles.len(), 5);
        let pages = api.calls().iter().filter(|c| *c == "roles_page").count();
        assert_eq!(pages, 3);
    }

    #[test]
    fn test_permissions_listing_stops_at_empty_page() {
        let api = MockApi::new().with_page_size(2);
        api.add_permission("can_read", "Dashboard");
        api.add_permission("can_write", "Dashboard");
        let perms = api.list_permissions().unwrap();
        assert_eq!(perms.len(), 2);
        let pages = api.calls().iter().filter(|c| *c == "permissions_page").count();
        assert_eq!(pages, 2);
    }

    #[test]
    fn test_create_user_resolves_role_refs() {
        let api = MockApi::new();
        let role = api.add_role("Gamma");
        let id = api
            .create_user(&UserPost {
                username: "alice".into(),
                first_name: "Alice".into(),
                last_name: "Liddell".into(),
                email: "alice@example.com".into(),
                password: "secret".into(),
                active: true,
                roles: vec![role],
                groups: vec![],
            })
            .unwrap();

        let user = api.get_user(id).unwrap();
        assert_eq!(user.roles[0].name, "Gamma");
        assert_eq!(api.user_password(id).as_deref(), Some("secret"));
    }

    #[test]
    fn test_new_columns_get_ids_and_uuids() {
        let api = MockApi::new();
        let db = api.add_database("examples");
        let ds = api.add_dataset(db, "orders");
        let (col_id, col_uuid) = api.add_dataset_column(ds, "COL1", "VARCHAR");

        api.update_dataset(
            ds,
            &DatasetPut {
                columns: Some(vec![column_put(Some(col_id), "COL1"), column_put(None, "COL2")]),
                ..DatasetPut::default()
            },
        )
        .unwrap();

        let dataset = api.dataset(ds).unwrap();
        assert_eq!(dataset.columns.len(), 2);
        assert_eq!(dataset.columns[0].uuid, Some(col_uuid));
        assert_eq!(dataset.columns[0].data_type.as_deref(), Some("VARCHAR"));
        assert!(dataset.columns[1].uuid.is_some());
        assert_ne!(dataset.columns[1].id, col_id);
    }

    #[test]
    fn test_unknown_column_id_is_rejected() {
        let api = MockApi::new();
        let db = api.add_database("examples");
        let ds = api.add_dataset(db, "orders");
        let err = api
            .update_dataset(
                ds,
                &DatasetPut {
                    columns: Some(vec![column_put(Some(12345), "COL1")]),
                    ..DatasetPut::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 422, .. }));
    }

    #[test]
    fn test_folder_child_must_reference_dataset() {
        let api = MockApi::new();
        let db = api.add_database("examples");
        let ds = api.add_dataset(db, "orders");
        let folders = vec![WireFolder {
            uuid: Uuid::new_v4(),
            kind: FolderType::Folder,
            name: "f".into(),
            description: None,
            children: Some(vec![WireFolder {
                uuid: Uuid::new_v4(),
                kind: FolderType::Column,
                name: "COL1".into(),
                description: None,
                children: Some(vec![]),
            }]),
        }];
        let err = api
            .update_dataset(
                ds,
                &DatasetPut {
                    folders: Some(folders),
                    ..DatasetPut::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 422, .. }));
        assert!(api.dataset(ds).unwrap().folders.is_none());
    }

    #[test]
    fn test_injected_user_delete_failure() {
        let api = MockApi::new();
        let id = api
            .create_user(&UserPost {
                username: "bob".into(),
                first_name: "Bob".into(),
                last_name: "B".into(),
                email: "bob@example.com".into(),
                password: String::new(),
                active: true,
                roles: vec![],
                groups: vec![],
            })
            .unwrap();
        api.fail_user_deletes(true);
        assert!(matches!(
            api.delete_user(id).unwrap_err(),
            Error::Api { status: 500, .. }
        ));
        assert!(api.user(id).is_some());
    }

    #[test]
    fn test_deadline_elapsed() {
        let api = MockApi::new();
        api.set_deadline(Some(Instant::now()));
        assert!(matches!(api.list_roles().unwrap_err(), Error::Timeout(_)));

        api.set_deadline(Some(Instant::now() + Duration::from_secs(60)));
        assert!(api.list_roles().is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let api = MockApi::new();
        let other = api.clone();
        other.add_group("analysts");
        assert!(api.find_group("analysts").unwrap().is_some());
    }
}
