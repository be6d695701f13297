//! [`HttpApi`]: the [`Api`] implementation backed by a live Superset server.
//!
//! Authentication uses the database login provider: one
//! `POST /api/v1/security/login` returns a bearer token that is attached to
//! every following request.
//!
//! # Timeouts
//!
//! A deadline installed with [`Api::set_deadline`] bounds each request:
//! the request's global timeout is the time left until the deadline, and a
//! request started after the deadline fails with [`Error::Timeout`] without
//! touching the network.

use crate::api::{Api, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::rison::ListQuery;
use crate::types::{
    CreatedResponse, Database, Dataset, DatasetPost, DatasetPut, DatasetSummary, Group, GroupPost,
    GroupPut, ItemResponse, ListResponse, Permission, Role, RolePayload, RolePermission, Tag,
    TagPayload, User, UserPost, UserPut,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const USERS: &str = "/api/v1/security/users/";
const ROLES: &str = "/api/v1/security/roles/";
const GROUPS: &str = "/api/v1/security/groups/";
const PERMISSIONS: &str = "/api/v1/security/permissions-resources/";
const DATABASES: &str = "/api/v1/database/";
const DATASETS: &str = "/api/v1/dataset/";
const TAGS: &str = "/api/v1/tag/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    provider: &'static str,
    refresh: bool,
}

#[derive(serde::Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Serialize)]
struct PermissionIds<'a> {
    permission_view_menu_ids: &'a [i64],
}

/// Blocking client for one Superset server.
pub struct HttpApi {
    /// HTTP agent for requests. Status codes are inspected, not raised.
    agent: ureq::Agent,
    /// Server base URL without a trailing slash.
    base_url: String,
    /// Bearer token from login.
    token: String,
    /// Page size for list operations.
    page_size: usize,
    /// Deadline of the running operation.
    deadline: Mutex<Option<Instant>>,
}

impl HttpApi {
    /// Log in and return an authenticated client.
    ///
    /// A `page_size` of 0 selects [`DEFAULT_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server rejects the credentials, or a
    /// transport error if it cannot be reached.
    pub fn login(
        base_url: impl Into<String>,
        username: &str,
        password: &str,
        page_size: usize,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("server base URL is empty".into()));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        let url = format!("{base_url}/api/v1/security/login");
        log::debug!("POST {url}");
        let mut response = agent.post(&url).send_json(&LoginRequest {
            username,
            password,
            provider: "db",
            refresh: true,
        })?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        if !(200..300).contains(&status) {
            return Err(Error::Auth(format!("status code: {status}, body: {body}")));
        }
        let login: LoginResponse = serde_json::from_str(&body)?;

        Ok(Self {
            agent,
            base_url,
            token: login.access_token,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            deadline: Mutex::new(None),
        })
    }

    /// Server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Time left until the deadline, if one is set.
    fn remaining(&self) -> Result<Option<Duration>> {
        let deadline = *self.deadline.lock().unwrap_or_else(PoisonError::into_inner);
        match deadline {
            None => Ok(None),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    Err(Error::Timeout("deadline exceeded before request".into()))
                } else {
                    Ok(Some(deadline - now))
                }
            }
        }
    }

    /// Attach auth headers and the remaining deadline to a request.
    fn prepare<B>(&self, request: ureq::RequestBuilder<B>) -> Result<ureq::RequestBuilder<B>> {
        let request = request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json");
        Ok(match self.remaining()? {
            Some(left) => request.config().timeout_global(Some(left)).build(),
            None => request,
        })
    }

    /// Map a response to its body, or to `NotFound`/`Api` errors.
    fn finish(
        method: &str,
        path: &str,
        mut response: ureq::http::Response<ureq::Body>,
        resource: &'static str,
        id: &str,
    ) -> Result<String> {
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("{method} {path} -> {status}");
        match status {
            200..=299 => Ok(body),
            404 => Err(Error::not_found(resource, id)),
            _ => Err(Error::Api { status, body }),
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&ListQuery>,
        resource: &'static str,
        id: &str,
    ) -> Result<T> {
        let mut request = self.agent.get(&self.url(path));
        if let Some(query) = query {
            request = request.query("q", query.encode());
        }
        let response = self.prepare(request)?.call()?;
        let body = Self::finish("GET", path, response, resource, id)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        resource: &'static str,
        id: &str,
    ) -> Result<String> {
        let response = self.prepare(self.agent.post(&self.url(path)))?.send_json(body)?;
        Self::finish("POST", path, response, resource, id)
    }

    fn put<B: Serialize>(&self, path: &str, body: &B, resource: &'static str, id: i64) -> Result<()> {
        let response = self.prepare(self.agent.put(&self.url(path)))?.send_json(body)?;
        Self::finish("PUT", path, response, resource, &id.to_string()).map(|_| ())
    }

    fn delete(&self, path: &str, resource: &'static str, id: i64) -> Result<()> {
        let response = self.prepare(self.agent.delete(&self.url(path)))?.call()?;
        Self::finish("DELETE", path, response, resource, &id.to_string()).map(|_| ())
    }

    fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
        resource: &'static str,
    ) -> Result<Vec<T>> {
        let list: ListResponse<T> = self.get(path, Some(query), resource, "*")?;
        Ok(list.result)
    }

    fn find<T: DeserializeOwned>(
        &self,
        path: &str,
        col: &'static str,
        value: &str,
        resource: &'static str,
    ) -> Result<Option<T>> {
        let query = ListQuery::filter_eq(col, value);
        let list: Vec<T> = self.list(path, &query, resource)?;
        Ok(list.into_iter().next())
    }

    fn item<T: DeserializeOwned>(&self, base: &str, id: i64, resource: &'static str) -> Result<T> {
        let item: ItemResponse<T> = self.get(&format!("{base}{id}"), None, resource, &id.to_string())?;
        Ok(item.result)
    }

    fn create(&self, path: &str, body: &impl Serialize, resource: &'static str) -> Result<i64> {
        let body = self.post(path, body, resource, "new")?;
        let created: CreatedResponse = serde_json::from_str(&body)?;
        created
            .id
            .ok_or_else(|| Error::InvalidResponse(format!("{resource} created without an id")))
    }
}

impl Api for HttpApi {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn set_deadline(&self, deadline: Option<Instant>) {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) = deadline;
    }

    fn users_page(&self, page: usize, page_size: usize) -> Result<Vec<User>> {
        self.list(USERS, &ListQuery::page(page, page_size), "User")
    }

    fn get_user(&self, id: i64) -> Result<User> {
        self.item(USERS, id, "User")
    }

    fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.find(USERS, "username", username, "User")
    }

    fn create_user(&self, user: &UserPost) -> Result<i64> {
        self.create(USERS, user, "User")
    }

    fn update_user(&self, id: i64, user: &UserPut) -> Result<()> {
        self.put(&format!("{USERS}{id}"), user, "User", id)
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        self.delete(&format!("{USERS}{id}"), "User", id)
    }

    fn roles_page(&self, page: usize, page_size: usize) -> Result<Vec<Role>> {
        self.list(ROLES, &ListQuery::page(page, page_size), "Role")
    }

    fn get_role(&self, id: i64) -> Result<Role> {
        self.item(ROLES, id, "Role")
    }

    fn find_role(&self, name: &str) -> Result<Option<Role>> {
        self.find(ROLES, "name", name, "Role")
    }

    fn create_role(&self, name: &str) -> Result<i64> {
        self.create(ROLES, &RolePayload { name: name.into() }, "Role")
    }

    fn update_role(&self, id: i64, name: &str) -> Result<()> {
        self.put(
            &format!("{ROLES}{id}"),
            &RolePayload { name: name.into() },
            "Role",
            id,
        )
    }

    fn delete_role(&self, id: i64) -> Result<()> {
        self.delete(&format!("{ROLES}{id}"), "Role", id)
    }

    fn role_permissions(&self, role_id: i64) -> Result<Vec<RolePermission>> {
        let list: ListResponse<RolePermission> = self.get(
            &format!("{ROLES}{role_id}/permissions/"),
            None,
            "Role",
            &role_id.to_string(),
        )?;
        Ok(list.result)
    }

    fn set_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> Result<()> {
        self.post(
            &format!("{ROLES}{role_id}/permissions"),
            &PermissionIds {
                permission_view_menu_ids: permission_ids,
            },
            "Role",
            &role_id.to_string(),
        )
        .map(|_| ())
    }

    fn groups_page(&self, page: usize, page_size: usize) -> Result<Vec<Group>> {
        self.list(GROUPS, &ListQuery::page(page, page_size), "Group")
    }

    fn get_group(&self, id: i64) -> Result<Group> {
        self.item(GROUPS, id, "Group")
    }

    fn find_group(&self, name: &str) -> Result<Option<Group>> {
        self.find(GROUPS, "name", name, "Group")
    }

    fn create_group(&self, group: &GroupPost) -> Result<i64> {
        self.create(GROUPS, group, "Group")
    }

    fn update_group(&self, id: i64, group: &GroupPut) -> Result<()> {
        self.put(&format!("{GROUPS}{id}"), group, "Group", id)
    }

    fn delete_group(&self, id: i64) -> Result<()> {
        self.delete(&format!("{GROUPS}{id}"), "Group", id)
    }

    fn permissions_page(&self, page: usize, page_size: usize) -> Result<Vec<Permission>> {
        self.list(PERMISSIONS, &ListQuery::page(page, page_size), "Permission")
    }

    fn databases_page(&self, page: usize, page_size: usize) -> Result<Vec<Database>> {
        self.list(DATABASES, &ListQuery::page(page, page_size), "Database")
    }

    fn find_database(&self, name: &str) -> Result<Option<Database>> {
        self.find(DATABASES, "database_name", name, "Database")
    }

    fn find_dataset(&self, table_name: &str) -> Result<Option<DatasetSummary>> {
        self.find(DATASETS, "table_name", table_name, "Dataset")
    }

    fn get_dataset(&self, id: i64) -> Result<Dataset> {
        self.item(DATASETS, id, "Dataset")
    }

    fn create_dataset(&self, dataset: &DatasetPost) -> Result<i64> {
        self.create(DATASETS, dataset, "Dataset")
    }

    fn update_dataset(&self, id: i64, dataset: &DatasetPut) -> Result<()> {
        self.put(&format!("{DATASETS}{id}"), dataset, "Dataset", id)
    }

    fn delete_dataset(&self, id: i64) -> Result<()> {
        self.delete(&format!("{DATASETS}{id}"), "Dataset", id)
    }

    fn get_tag(&self, id: i64) -> Result<Tag> {
        self.item(TAGS, id, "Tag")
    }

    fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        self.find(TAGS, "name", name, "Tag")
    }

    fn create_tag(&self, tag: &TagPayload) -> Result<i64> {
        let body = self.post(TAGS, tag, "Tag", "new")?;
        // Some Superset versions answer 201 with an empty object.
        let created: Option<CreatedResponse> = serde_json::from_str(&body).ok();
        if let Some(id) = created.and_then(|c| c.id) {
            return Ok(id);
        }
        self.find_tag(&tag.name)?
            .map(|t| t.id)
            .ok_or_else(|| Error::InvalidResponse(format!("tag {} created without an id", tag.name)))
    }

    fn update_tag(&self, id: i64, tag: &TagPayload) -> Result<()> {
        self.put(&format!("{TAGS}{id}"), tag, "Tag", id)
    }

    fn delete_tag(&self, id: i64) -> Result<()> {
        self.delete(&format!("{TAGS}{id}"), "Tag", id)
    }
}
