//! Name-to-id resolution.
//!
//! The Superset API is keyed by integer ids while configuration is keyed
//! by names. [`resolve`] builds a lookup table over a listed collection and
//! maps every requested name through it, reporting all misses at once.

use std::collections::HashMap;
use superset_client::{Database, Group, Permission, Role, Tag, User};

/// A remote object with a server-assigned id.
pub trait Entity {
    /// Server-assigned id.
    fn entity_id(&self) -> i64;
}

macro_rules! entity {
    ($($ty:ty),*) => {
        $(impl Entity for $ty {
            fn entity_id(&self) -> i64 {
                self.id
            }
        })*
    };
}

entity!(Role, Group, Permission, Database, User, Tag);

/// Outcome of resolving a list of names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Ids of the names that matched, in request order.
    pub ids: Vec<i64>,
    /// Names that matched nothing, in request order.
    pub not_found: Vec<String>,
}

impl Resolution {
    /// Whether every name matched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.not_found.is_empty()
    }
}

/// Resolve `names` against `source`, keyed by `key_fn`.
pub fn resolve<'n, T: Entity>(
    names: impl IntoIterator<Item = &'n str>,
    source: &[T],
    key_fn: impl Fn(&T) -> String,
) -> Resolution {
    let table: HashMap<String, i64> = source
        .iter()
        .map(|item| (key_fn(item), item.entity_id()))
        .collect();

    let mut resolution = Resolution::default();
    for name in names {
        match table.get(name) {
            Some(&id) => resolution.ids.push(id),
            None => resolution.not_found.push(name.to_string()),
        }
    }
    if !resolution.not_found.is_empty() {
        log::debug!("unresolved names: {:?}", resolution.not_found);
    }
    resolution
}

/// Lookup key of a permission/view-menu pair.
///
/// Two distinct pairs can collide (`can_a` + `b_c` vs `can_a_b` + `c`);
/// Superset's own naming makes this unlikely in practice.
#[must_use]
pub fn permission_key(permission: &str, view_menu: &str) -> String {
    format!("{permission}_{view_menu}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: i64, name: &str) -> Role {
        Role {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn test_resolve_reports_missing_names() {
        let roles = vec![role(1, "A"), role(3, "C")];
        let resolution = resolve(["A", "B", "C"], &roles, |r| r.name.clone());

        assert_eq!(resolution.ids, vec![1, 3]);
        assert_eq!(resolution.not_found, vec!["B".to_string()]);
        assert!(!resolution.is_complete());
    }

    #[test]
    fn test_resolve_empty_request() {
        let roles = vec![role(1, "A")];
        let resolution = resolve(std::iter::empty(), &roles, |r| r.name.clone());
        assert!(resolution.ids.is_empty());
        assert!(resolution.is_complete());
    }

    #[test]
    fn test_resolve_preserves_request_order() {
        let roles = vec![role(1, "A"), role(2, "B")];
        let resolution = resolve(["B", "A"], &roles, |r| r.name.clone());
        assert_eq!(resolution.ids, vec![2, 1]);
    }

    #[test]
    fn test_permission_key() {
        assert_eq!(permission_key("can_read", "Dashboard"), "can_read_Dashboard");
    }
}
