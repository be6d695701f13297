//! The [`Api`] trait: typed operations on Superset objects.
//!
//! Lifecycle handlers only ever see this trait. [`crate::HttpApi`] talks to
//! a real server; [`crate::MockApi`] keeps everything in memory for tests.
//!
//! Lookups by natural key (`find_*`) return `Ok(None)` when nothing
//! matches. Get, update and delete of a missing id return
//! [`Error::NotFound`](crate::Error::NotFound).

use crate::error::Result;
use crate::types::{
    Database, Dataset, DatasetPost, DatasetPut, DatasetSummary, Group, GroupPost, GroupPut,
    Permission, Role, RolePermission, Tag, TagPayload, User, UserPost, UserPut,
};
use std::time::Instant;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// When a paginated listing stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEnd {
    /// Stop after a page shorter than the page size.
    Short,
    /// Stop after an empty page.
    Empty,
}

/// Fetch pages `0, 1, 2, ...` until `end` says the listing is complete.
///
/// # Errors
///
/// Returns the first error reported by `fetch`.
pub fn collect_pages<T>(
    page_size: usize,
    end: PageEnd,
    mut fetch: impl FnMut(usize, usize) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut page = 0;
    loop {
        let items = fetch(page, page_size)?;
        let len = items.len();
        log::debug!("page {page}: {len} item(s)");
        all.extend(items);

        let done = match end {
            PageEnd::Short => len < page_size,
            PageEnd::Empty => len == 0,
        };
        if done {
            return Ok(all);
        }
        page += 1;
    }
}

/// Typed operations on a Superset instance.
pub trait Api: Send + Sync {
    /// Page size used by list operations.
    fn page_size(&self) -> usize;

    /// Bound every following request by `deadline` (`None` clears it).
    fn set_deadline(&self, _deadline: Option<Instant>) {}

    // -- users ---------------------------------------------------------------

    /// One page of users.
    fn users_page(&self, page: usize, page_size: usize) -> Result<Vec<User>>;
    /// User by id.
    fn get_user(&self, id: i64) -> Result<User>;
    /// User by username.
    fn find_user(&self, username: &str) -> Result<Option<User>>;
    /// Create a user, returning its id.
    fn create_user(&self, user: &UserPost) -> Result<i64>;
    /// Update a user.
    fn update_user(&self, id: i64, user: &UserPut) -> Result<()>;
    /// Delete a user.
    fn delete_user(&self, id: i64) -> Result<()>;

    // -- roles ---------------------------------------------------------------

    /// One page of roles.
    fn roles_page(&self, page: usize, page_size: usize) -> Result<Vec<Role>>;
    /// Role by id.
    fn get_role(&self, id: i64) -> Result<Role>;
    /// Role by name.
    fn find_role(&self, name: &str) -> Result<Option<Role>>;
    /// Create a role, returning its id.
    fn create_role(&self, name: &str) -> Result<i64>;
    /// Rename a role.
    fn update_role(&self, id: i64, name: &str) -> Result<()>;
    /// Delete a role.
    fn delete_role(&self, id: i64) -> Result<()>;
    /// Permissions currently assigned to a role.
    fn role_permissions(&self, role_id: i64) -> Result<Vec<RolePermission>>;
    /// Replace the permissions assigned to a role.
    fn set_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> Result<()>;

    // -- groups --------------------------------------------------------------

    /// One page of groups.
    fn groups_page(&self, page: usize, page_size: usize) -> Result<Vec<Group>>;
    /// Group by id.
    fn get_group(&self, id: i64) -> Result<Group>;
    /// Group by name.
    fn find_group(&self, name: &str) -> Result<Option<Group>>;
    /// Create a group, returning its id.
    fn create_group(&self, group: &GroupPost) -> Result<i64>;
    /// Update a group.
    fn update_group(&self, id: i64, group: &GroupPut) -> Result<()>;
    /// Delete a group.
    fn delete_group(&self, id: i64) -> Result<()>;

    // -- catalog -------------------------------------------------------------

    /// One page of permission/view-menu pairs.
    fn permissions_page(&self, page: usize, page_size: usize) -> Result<Vec<Permission>>;
    /// One page of databases.
    fn databases_page(&self, page: usize, page_size: usize) -> Result<Vec<Database>>;
    /// Database by name.
    fn find_database(&self, name: &str) -> Result<Option<Database>>;

    // -- datasets ------------------------------------------------------------

    /// Dataset by table name.
    fn find_dataset(&self, table_name: &str) -> Result<Option<DatasetSummary>>;
    /// Dataset by id, with columns, metrics and folders.
    fn get_dataset(&self, id: i64) -> Result<Dataset>;
    /// Create a dataset, returning its id.
    fn create_dataset(&self, dataset: &DatasetPost) -> Result<i64>;
    /// Update a dataset.
    fn update_dataset(&self, id: i64, dataset: &DatasetPut) -> Result<()>;
    /// Delete a dataset.
    fn delete_dataset(&self, id: i64) -> Result<()>;

    // -- tags ----------------------------------------------------------------

    /// Tag by id.
    fn get_tag(&self, id: i64) -> Result<Tag>;
    /// Tag by name.
    fn find_tag(&self, name: &str) -> Result<Option<Tag>>;
    /// Create a tag, returning its id.
    fn create_tag(&self, tag: &TagPayload) -> Result<i64>;
    /// Update a tag.
    fn update_tag(&self, id: i64, tag: &TagPayload) -> Result<()>;
    /// Delete a tag.
    fn delete_tag(&self, id: i64) -> Result<()>;

    // -- paginated listings --------------------------------------------------

    /// Every user.
    fn list_users(&self) -> Result<Vec<User>> {
        collect_pages(self.page_size(), PageEnd::Short, |p, s| self.users_page(p, s))
    }

    /// Every role.
    fn list_roles(&self) -> Result<Vec<Role>> {
        collect_pages(self.page_size(), PageEnd::Short, |p, s| self.roles_page(p, s))
    }

    /// Every group.
    fn list_groups(&self) -> Result<Vec<Group>> {
        collect_pages(self.page_size(), PageEnd::Short, |p, s| self.groups_page(p, s))
    }

    /// Every permission/view-menu pair.
    ///
    /// This endpoint may return short pages before the end, so listing
    /// stops only at an empty page.
    fn list_permissions(&self) -> Result<Vec<Permission>> {
        collect_pages(self.page_size(), PageEnd::Empty, |p, s| {
            self.permissions_page(p, s)
        })
    }

    /// Every database.
    fn list_databases(&self) -> Result<Vec<Database>> {
        collect_pages(self.page_size(), PageEnd::Short, |p, s| self.databases_page(p, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_collect_pages_stops_at_short_page() {
        let mut calls = Vec::new();
        let items = collect_pages(2, PageEnd::Short, |page, size| {
            calls.push(page);
            Ok(match page {
                0 => vec![1, 2],
                1 => vec![3],
                _ => vec![99; size],
            })
        })
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls, vec![0, 1]);
    }

    #[test]
    fn test_collect_pages_stops_at_empty_page() {
        let items = collect_pages(2, PageEnd::Empty, |page, _| {
            Ok(match page {
                0 => vec![1],
                1 => vec![2],
                _ => vec![],
            })
        })
        .unwrap();

        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_collect_pages_propagates_error() {
        let result: Result<Vec<i32>> = collect_pages(10, PageEnd::Short, |_, _| {
            Err(Error::Api {
                status: 500,
                body: "boom".into(),
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let mut sizes = Vec::new();
        let _ = collect_pages(0, PageEnd::Short, |_, size| {
            sizes.push(size);
            Ok(Vec::<i32>::new())
        });
        assert_eq!(sizes, vec![1]);
    }
}
