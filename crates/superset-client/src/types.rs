//! Wire types for the Superset REST API.
//!
//! Only the fields this workspace reads or writes are modelled. Unknown
//! response fields are ignored; `Option` request fields are omitted from
//! the JSON body when `None`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Envelopes
// =============================================================================

/// `{"result": ...}` wrapper used by single-object responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemResponse<T> {
    /// Wrapped object.
    pub result: T,
}

/// `{"count": n, "result": [...]}` wrapper used by list responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    /// Objects on this page.
    #[serde(default)]
    pub result: Vec<T>,
    /// Total number of matches, when reported.
    #[serde(default)]
    pub count: Option<u64>,
}

/// Response to a POST that creates an object.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedResponse {
    /// Server-assigned id.
    #[serde(default)]
    pub id: Option<i64>,
}

/// Reference to another object by id and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Object id.
    pub id: i64,
    /// Object name.
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Security: users, roles, groups, permissions
// =============================================================================

/// A user as returned by `GET /api/v1/security/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Whether the user may log in.
    #[serde(default)]
    pub active: bool,
    /// Roles assigned directly to the user.
    #[serde(default)]
    pub roles: Vec<NamedRef>,
    /// Groups the user belongs to.
    #[serde(default)]
    pub groups: Vec<NamedRef>,
}

/// Body of `POST /api/v1/security/users/`.
#[derive(Debug, Clone, Serialize)]
pub struct UserPost {
    /// Login name.
    pub username: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Initial password.
    pub password: String,
    /// Whether the user may log in.
    pub active: bool,
    /// Role ids.
    pub roles: Vec<i64>,
    /// Group ids.
    pub groups: Vec<i64>,
}

/// Body of `PUT /api/v1/security/users/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPut {
    /// New first name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New active flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Replacement role ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<i64>>,
    /// Replacement group ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<i64>>,
}

/// A role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    pub id: i64,
    /// Role name.
    pub name: String,
}

/// Body of role create and update.
#[derive(Debug, Clone, Serialize)]
pub struct RolePayload {
    /// Role name.
    pub name: String,
}

/// A group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group id.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Roles bound to the group.
    #[serde(default)]
    pub roles: Vec<NamedRef>,
}

/// Body of `POST /api/v1/security/groups/`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPost {
    /// Group name.
    pub name: String,
    /// Display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Body of `PUT /api/v1/security/groups/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupPut {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Replacement role ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<i64>>,
}

/// Name wrapper used inside permission listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    /// The name.
    pub name: String,
}

/// A permission on a view menu, from `/api/v1/security/permissions-resources/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Permission-view id.
    pub id: i64,
    /// Permission part, e.g. `can_read`.
    pub permission: Named,
    /// View menu part, e.g. `Dashboard`.
    pub view_menu: Named,
}

/// A permission assigned to a role, from `/api/v1/security/roles/{id}/permissions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Permission-view id.
    pub id: i64,
    /// Permission part.
    pub permission_name: String,
    /// View menu part.
    pub view_menu_name: String,
}

// =============================================================================
// Databases and datasets
// =============================================================================

/// A database connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Database id.
    pub id: i64,
    /// Display name.
    pub database_name: String,
}

/// A dataset row from the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Dataset id.
    pub id: i64,
    /// Table name.
    pub table_name: String,
}

/// Owner reference on a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// User id.
    pub id: i64,
}

/// A dataset column as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column id.
    pub id: i64,
    /// Column name, unique within the dataset.
    pub column_name: String,
    /// Stable identifier referenced by folders.
    #[serde(default)]
    pub uuid: Option<Uuid>,
    /// Server-inferred SQL type.
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    /// Advanced data type.
    #[serde(default)]
    pub advanced_data_type: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// SQL expression for calculated columns.
    #[serde(default)]
    pub expression: Option<String>,
    /// Usable as a filter.
    #[serde(default)]
    pub filterable: Option<bool>,
    /// Usable as a dimension.
    #[serde(default)]
    pub groupby: Option<bool>,
    /// Whether the column is active.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Temporal column.
    #[serde(default)]
    pub is_dttm: Option<bool>,
    /// Display name.
    #[serde(default)]
    pub verbose_name: Option<String>,
    /// Opaque JSON string.
    #[serde(default)]
    pub extra: Option<String>,
}

/// A column inside a dataset PUT body.
///
/// `id` is set for columns that already exist on the server; a column
/// without `id` is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPut {
    /// Existing column id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Column name.
    pub column_name: String,
    /// SQL type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Advanced data type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_data_type: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// SQL expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Usable as a filter.
    pub filterable: bool,
    /// Usable as a dimension.
    pub groupby: bool,
    /// Whether the column is active.
    pub is_active: bool,
    /// Temporal column.
    pub is_dttm: bool,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    /// Opaque JSON string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

/// Currency formatting of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO currency code, e.g. `USD`.
    pub symbol: String,
    /// `prefix` or `suffix`.
    #[serde(rename = "symbolPosition")]
    pub symbol_position: String,
}

/// A dataset metric as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric id.
    pub id: i64,
    /// Metric name, unique within the dataset.
    pub metric_name: String,
    /// Stable identifier referenced by folders.
    #[serde(default)]
    pub uuid: Option<Uuid>,
    /// SQL aggregate expression.
    #[serde(default)]
    pub expression: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Display name.
    #[serde(default)]
    pub verbose_name: Option<String>,
    /// d3 number format.
    #[serde(default)]
    pub d3format: Option<String>,
    /// Warning shown next to the metric.
    #[serde(default)]
    pub warning_text: Option<String>,
    /// Currency formatting.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Opaque JSON string.
    #[serde(default)]
    pub extra: Option<String>,
}

/// A metric inside a dataset PUT body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPut {
    /// Existing metric id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Metric name.
    pub metric_name: String,
    /// SQL aggregate expression.
    pub expression: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    /// d3 number format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d3format: Option<String>,
    /// Warning text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_text: Option<String>,
    /// Currency formatting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    /// Opaque JSON string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

/// Node type in the dataset folder tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    /// Grouping node.
    Folder,
    /// Reference to a column.
    Column,
    /// Reference to a metric.
    Metric,
}

impl FolderType {
    /// Wire spelling of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Column => "column",
            Self::Metric => "metric",
        }
    }
}

/// A node of the dataset folder tree as sent and received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFolder {
    /// Node identifier; nil when the server omitted it.
    #[serde(default)]
    pub uuid: Uuid,
    /// Node type.
    #[serde(rename = "type")]
    pub kind: FolderType,
    /// Node name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Child nodes.
    #[serde(default)]
    pub children: Option<Vec<WireFolder>>,
}

/// A dataset as returned by `GET /api/v1/dataset/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset id.
    pub id: i64,
    /// Table name.
    pub table_name: String,
    /// Owning database.
    pub database: DatasetDatabase,
    /// Schema.
    #[serde(default)]
    pub schema: Option<String>,
    /// Catalog.
    #[serde(default)]
    pub catalog: Option<String>,
    /// SQL for virtual datasets.
    #[serde(default)]
    pub sql: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cache timeout in seconds.
    #[serde(default)]
    pub cache_timeout: Option<i64>,
    /// Filter select enabled.
    #[serde(default)]
    pub filter_select_enabled: Option<bool>,
    /// Predicate applied when fetching filter values.
    #[serde(default)]
    pub fetch_values_predicate: Option<String>,
    /// Always filter on the main temporal column.
    #[serde(default)]
    pub always_filter_main_dttm: Option<bool>,
    /// Normalize column names.
    #[serde(default)]
    pub normalize_columns: Option<bool>,
    /// Managed outside Superset.
    #[serde(default)]
    pub is_managed_externally: Option<bool>,
    /// Owners.
    #[serde(default)]
    pub owners: Vec<Owner>,
    /// Opaque JSON string.
    #[serde(default)]
    pub extra: Option<String>,
    /// Columns.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Metrics.
    #[serde(default)]
    pub metrics: Vec<Metric>,
    /// Folder tree, if one was ever set.
    #[serde(default)]
    pub folders: Option<Vec<WireFolder>>,
}

/// Database reference embedded in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDatabase {
    /// Database id.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub database_name: String,
}

/// Body of `POST /api/v1/dataset/`.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPost {
    /// Database id.
    pub database: i64,
    /// Table name.
    pub table_name: String,
    /// Schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// SQL for virtual datasets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Managed outside Superset.
    pub is_managed_externally: bool,
    /// Normalize column names.
    pub normalize_columns: bool,
}

/// Body of `PUT /api/v1/dataset/{id}`.
///
/// Only fields that are `Some` are sent. Column, metric and folder lists
/// replace the server's lists wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetPut {
    /// Move to another database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
    /// Table name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// SQL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cache timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timeout: Option<i64>,
    /// Filter select enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_select_enabled: Option<bool>,
    /// Predicate applied when fetching filter values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_values_predicate: Option<String>,
    /// Always filter on the main temporal column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_filter_main_dttm: Option<bool>,
    /// Normalize column names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize_columns: Option<bool>,
    /// Managed outside Superset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_managed_externally: Option<bool>,
    /// Owner user ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<i64>>,
    /// Opaque JSON string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Replacement column list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnPut>>,
    /// Replacement metric list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricPut>>,
    /// Replacement folder tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<WireFolder>>,
}

// =============================================================================
// Tags
// =============================================================================

/// A tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag id.
    pub id: i64,
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of tag create and update.
#[derive(Debug, Clone, Serialize)]
pub struct TagPayload {
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_folder_tree_deserializes() {
        let raw = json!([{
            "uuid": "6f1e1f37-6c3a-4d0d-9d8e-1f2b3c4d5e6f",
            "type": "folder",
            "name": "Sales",
            "children": [
                {"uuid": "0b7d4d7c-3f60-4b7e-8a51-2d3e4f5a6b7c", "type": "column", "name": "COL1"}
            ]
        }]);

        let folders: Vec<WireFolder> = serde_json::from_value(raw).unwrap();
        assert_eq!(folders[0].kind, FolderType::Folder);
        let children = folders[0].children.as_ref().unwrap();
        assert_eq!(children[0].kind, FolderType::Column);
        assert!(children[0].children.is_none());
    }

    #[test]
    fn test_list_response_without_result() {
        let page: ListResponse<RolePermission> =
            serde_json::from_value(json!({"count": 0})).unwrap();
        assert!(page.result.is_empty());
        assert_eq!(page.count, Some(0));
    }

    #[test]
    fn test_missing_folder_uuid_is_nil() {
        let folder: WireFolder =
            serde_json::from_value(json!({"type": "metric", "name": "M"})).unwrap();
        assert!(folder.uuid.is_nil());
    }

    #[test]
    fn test_dataset_put_omits_unset_fields() {
        let put = DatasetPut {
            metrics: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&put).unwrap(), json!({"metrics": []}));
    }

    #[test]
    fn test_currency_wire_spelling() {
        let currency = Currency {
            symbol: "USD".into(),
            symbol_position: "prefix".into(),
        };
        assert_eq!(
            serde_json::to_value(&currency).unwrap(),
            json!({"symbol": "USD", "symbolPosition": "prefix"})
        );
    }

    #[test]
    fn test_column_type_field() {
        let column: Column = serde_json::from_value(json!({
            "id": 3,
            "column_name": "COL1",
            "type": "VARCHAR"
        }))
        .unwrap();
        assert_eq!(column.data_type.as_deref(), Some("VARCHAR"));
        assert!(column.uuid.is_none());
    }
}
