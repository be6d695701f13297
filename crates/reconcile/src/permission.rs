//! Permission/view-menu pairs assigned to a role.

use crate::resolver::{Resolution, permission_key, resolve};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use superset_client::{Permission, RolePermission};

/// A permission on a view menu, e.g. `can_read` on `Dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionRef {
    /// Permission name.
    pub permission_name: String,
    /// View menu name.
    pub view_menu_name: String,
}

impl PermissionRef {
    /// Build a pair.
    pub fn new(permission_name: impl Into<String>, view_menu_name: impl Into<String>) -> Self {
        Self {
            permission_name: permission_name.into(),
            view_menu_name: view_menu_name.into(),
        }
    }

    /// Lookup key, see [`permission_key`].
    #[must_use]
    pub fn key(&self) -> String {
        permission_key(&self.permission_name, &self.view_menu_name)
    }
}

impl From<&RolePermission> for PermissionRef {
    fn from(p: &RolePermission) -> Self {
        Self::new(&p.permission_name, &p.view_menu_name)
    }
}

/// A pair listed twice in one permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePermission {
    /// Lookup key of the pair.
    pub key: String,
    /// Index of the first occurrence.
    pub first: usize,
    /// Index of the repeated occurrence.
    pub second: usize,
}

impl fmt::Display for DuplicatePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicate permission {:?} at permissions[{}]. It was already specified at permissions[{}].",
            self.key, self.second, self.first
        )
    }
}

/// Every repeated pair, reported at its repeated position.
#[must_use]
pub fn find_duplicates(permissions: &[PermissionRef]) -> Vec<DuplicatePermission> {
    let mut seen: HashMap<&PermissionRef, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for (index, permission) in permissions.iter().enumerate() {
        if let Some(&first) = seen.get(permission) {
            duplicates.push(DuplicatePermission {
                key: permission.key(),
                first,
                second: index,
            });
        } else {
            seen.insert(permission, index);
        }
    }
    duplicates
}

/// Resolve pairs to permission ids against the server's catalog.
#[must_use]
pub fn resolve_permissions(permissions: &[PermissionRef], catalog: &[Permission]) -> Resolution {
    let keys: Vec<String> = permissions.iter().map(PermissionRef::key).collect();
    resolve(keys.iter().map(String::as_str), catalog, |p| {
        permission_key(&p.permission.name, &p.view_menu.name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use superset_client::Named;

    fn catalog_entry(id: i64, permission: &str, view_menu: &str) -> Permission {
        Permission {
            id,
            permission: Named {
                name: permission.into(),
            },
            view_menu: Named {
                name: view_menu.into(),
            },
        }
    }

    #[test]
    fn test_resolve_declared_pairs() {
        let catalog = vec![
            catalog_entry(10, "can_post", "Group"),
            catalog_entry(11, "can_get", "Group"),
            catalog_entry(12, "can_delete", "Group"),
        ];
        let declared = vec![
            PermissionRef::new("can_post", "Group"),
            PermissionRef::new("can_get", "Group"),
        ];

        let resolution = resolve_permissions(&declared, &catalog);
        assert_eq!(resolution.ids, vec![10, 11]);
        assert!(resolution.not_found.is_empty());
    }

    #[test]
    fn test_unknown_pair_reported_by_key() {
        let catalog = vec![catalog_entry(10, "can_post", "Group")];
        let declared = vec![PermissionRef::new("can_fly", "Group")];
        let resolution = resolve_permissions(&declared, &catalog);
        assert_eq!(resolution.not_found, vec!["can_fly_Group".to_string()]);
    }

    #[test]
    fn test_find_duplicates_reports_both_positions() {
        let declared = vec![
            PermissionRef::new("can_read", "Chart"),
            PermissionRef::new("can_write", "Chart"),
            PermissionRef::new("can_read", "Chart"),
        ];
        let duplicates = find_duplicates(&declared);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].first, 0);
        assert_eq!(duplicates[0].second, 2);
        assert_eq!(
            duplicates[0].to_string(),
            "Duplicate permission \"can_read_Chart\" at permissions[2]. It was already specified at permissions[0]."
        );
    }

    #[test]
    fn test_no_duplicates() {
        let declared = vec![
            PermissionRef::new("can_read", "Chart"),
            PermissionRef::new("can_read", "Dashboard"),
        ];
        assert!(find_duplicates(&declared).is_empty());
    }
}
