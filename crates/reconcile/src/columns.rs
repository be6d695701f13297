//! Dataset columns.
//!
//! Columns are declared as a map keyed by `column_name`. On every write the
//! whole list is sent; entries that already exist on the server carry the
//! server's id (and inferred type) so they are updated in place rather than
//! dropped and recreated.

use crate::error::{Error, Result};
use crate::extra::{Certification, pack_certification, unpack_certification};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use superset_client::{Column, ColumnPut};

/// A declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetColumn {
    /// Server id (computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Column name; the key of the column.
    pub column_name: String,
    /// Advanced data type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_data_type: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// SQL expression for calculated columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Usable as a filter.
    #[serde(default = "yes")]
    pub filterable: bool,
    /// Usable for grouping.
    #[serde(default = "yes")]
    pub groupby: bool,
    /// Active.
    #[serde(default = "yes")]
    pub is_active: bool,
    /// Temporal.
    #[serde(default)]
    pub is_dttm: bool,
    /// Type inferred by the server (computed).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    /// Certification, stored in `extra`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<Certification>,
}

const fn yes() -> bool {
    true
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// Wire list for the declared columns, in key order.
///
/// # Errors
///
/// Returns [`Error::PackExtra`] if certification cannot be encoded.
pub fn reconcile_columns(
    declared: &BTreeMap<String, DatasetColumn>,
    server: &[Column],
) -> Result<Vec<ColumnPut>> {
    let by_name: HashMap<&str, &Column> =
        server.iter().map(|c| (c.column_name.as_str(), c)).collect();

    declared
        .values()
        .map(|column| {
            let existing = by_name.get(column.column_name.as_str());
            let extra = pack_certification(column.certification.as_ref()).map_err(|source| {
                Error::PackExtra {
                    kind: "column",
                    name: column.column_name.clone(),
                    source,
                }
            })?;
            let data_type = existing
                .and_then(|c| non_empty(c.data_type.as_ref()))
                .or_else(|| column.data_type.clone());

            Ok(ColumnPut {
                id: existing.map(|c| c.id),
                column_name: column.column_name.clone(),
                data_type,
                advanced_data_type: column.advanced_data_type.clone(),
                description: column.description.clone(),
                expression: column.expression.clone(),
                filterable: column.filterable,
                groupby: column.groupby,
                is_active: column.is_active,
                is_dttm: column.is_dttm,
                verbose_name: column.verbose_name.clone(),
                extra,
            })
        })
        .collect()
}

/// Declared shape of the server's columns, keyed by name.
///
/// # Errors
///
/// Returns [`Error::UnpackExtra`] for a column with malformed `extra`.
pub fn columns_from_wire(server: &[Column]) -> Result<BTreeMap<String, DatasetColumn>> {
    server
        .iter()
        .map(|c| {
            let certification =
                unpack_certification(c.extra.as_deref()).map_err(|source| Error::UnpackExtra {
                    kind: "column",
                    name: c.column_name.clone(),
                    source,
                })?;
            let column = DatasetColumn {
                id: Some(c.id),
                column_name: c.column_name.clone(),
                advanced_data_type: non_empty(c.advanced_data_type.as_ref()),
                description: non_empty(c.description.as_ref()),
                expression: non_empty(c.expression.as_ref()),
                filterable: c.filterable.unwrap_or(true),
                groupby: c.groupby.unwrap_or(true),
                is_active: c.is_active.unwrap_or(true),
                is_dttm: c.is_dttm.unwrap_or(false),
                data_type: non_empty(c.data_type.as_ref()),
                verbose_name: non_empty(c.verbose_name.as_ref()),
                certification,
            };
            Ok((c.column_name.clone(), column))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(name: &str) -> DatasetColumn {
        DatasetColumn {
            id: None,
            column_name: name.into(),
            advanced_data_type: None,
            description: None,
            expression: None,
            filterable: true,
            groupby: true,
            is_active: true,
            is_dttm: false,
            data_type: None,
            verbose_name: None,
            certification: None,
        }
    }

    fn server(id: i64, name: &str, data_type: &str) -> Column {
        Column {
            id,
            column_name: name.into(),
            uuid: None,
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
        }
    }

    #[test]
    fn test_server_id_and_type_preserved() {
        let mut map = BTreeMap::new();
        let mut col = declared("COL1");
        col.id = Some(999);
        col.data_type = Some("INTEGER".into());
        col.description = Some("first".into());
        map.insert("COL1".to_string(), col);
        map.insert("COL2".to_string(), declared("COL2"));

        let puts = reconcile_columns(&map, &[server(7, "COL1", "VARCHAR")]).unwrap();

        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].id, Some(7));
        assert_eq!(puts[0].data_type.as_deref(), Some("VARCHAR"));
        assert_eq!(puts[0].description.as_deref(), Some("first"));
        assert_eq!(puts[1].id, None);
        assert_eq!(puts[1].column_name, "COL2");
    }

    #[test]
    fn test_output_ordered_by_key() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), declared("b"));
        map.insert("a".to_string(), declared("a"));
        let puts = reconcile_columns(&map, &[]).unwrap();
        let names: Vec<_> = puts.iter().map(|p| p.column_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_certification_packed() {
        let mut map = BTreeMap::new();
        let mut col = declared("COL1");
        col.certification = Some(Certification {
            certified_by: Some("ops".into()),
            details: None,
        });
        map.insert("COL1".to_string(), col);

        let puts = reconcile_columns(&map, &[]).unwrap();
        assert!(puts[0].extra.as_deref().unwrap().contains("\"certified_by\":\"ops\""));
    }

    #[test]
    fn test_from_wire_normalizes() {
        let mut col = server(3, "ds", "TIMESTAMP");
        col.is_dttm = Some(true);
        col.description = Some(String::new());
        col.extra = Some(r#"{"certification":{"certified_by":"ops","details":""}}"#.into());
        col.filterable = None;

        let map = columns_from_wire(&[col]).unwrap();
        let ds = &map["ds"];
        assert_eq!(ds.id, Some(3));
        assert_eq!(ds.data_type.as_deref(), Some("TIMESTAMP"));
        assert!(ds.is_dttm);
        assert!(ds.filterable);
        assert_eq!(ds.description, None);
        assert_eq!(
            ds.certification.as_ref().unwrap().certified_by.as_deref(),
            Some("ops")
        );
    }

    #[test]
    fn test_from_wire_bad_extra_names_column() {
        let mut col = server(3, "broken", "INT");
        col.extra = Some("{".into());
        let err = columns_from_wire(&[col]).unwrap_err();
        assert!(err.to_string().contains("column 'broken'"));
    }

    #[test]
    fn test_reconcile_then_read_is_idempotent() {
        let mut map = BTreeMap::new();
        let mut col = declared("COL1");
        col.verbose_name = Some("Column one".into());
        map.insert("COL1".to_string(), col);

        let puts = reconcile_columns(&map, &[server(7, "COL1", "VARCHAR")]).unwrap();
        let echoed: Vec<Column> = puts
            .into_iter()
            .map(|p| Column {
                id: p.id.unwrap_or(100),
                column_name: p.column_name,
                uuid: None,
                data_type: p.data_type,
                advanced_data_type: p.advanced_data_type,
                description: p.description,
                expression: p.expression,
                filterable: Some(p.filterable),
                groupby: Some(p.groupby),
                is_active: Some(p.is_active),
                is_dttm: Some(p.is_dttm),
                verbose_name: p.verbose_name,
                extra: p.extra,
            })
            .collect();

        let back = columns_from_wire(&echoed).unwrap();
        let mut expected = map["COL1"].clone();
        expected.id = Some(7);
        expected.data_type = Some("VARCHAR".into());
        assert_eq!(back["COL1"], expected);
    }
}
