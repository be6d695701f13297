//! Dataset folder trees.
//!
//! A dataset's folders are a two-level tree: root nodes of type `folder`
//! whose children reference columns and metrics. The server identifies
//! every node by uuid, and a child's uuid must equal the uuid of the
//! column or metric it references. Configuration names children instead,
//! so [`resolve_columns`] fills in their uuids from the dataset before the
//! tree is sent.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use superset_client::{Column, FolderType, Metric, WireFolder};
use uuid::Uuid;

/// A declared root folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Folder {
    /// Folder name.
    pub name: String,
    /// Node type; must be `folder`.
    #[serde(rename = "type", default = "folder_type")]
    pub kind: FolderType,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Node uuid; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Columns and metrics in the folder.
    #[serde(default)]
    pub children: Vec<FolderChild>,
}

/// A column or metric inside a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderChild {
    /// Column or metric name.
    pub name: String,
    /// `column` or `metric`.
    #[serde(rename = "type")]
    pub kind: FolderType,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Uuid of the referenced column or metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

fn folder_type() -> FolderType {
    FolderType::Folder
}

/// Parse a declared uuid; absent, empty and nil get a fresh one.
fn node_uuid(name: &str, declared: Option<&str>) -> Result<Uuid> {
    match declared.map(str::trim) {
        None | Some("") => Ok(Uuid::new_v4()),
        Some(value) => {
            let parsed = Uuid::parse_str(value).map_err(|source| Error::InvalidUuid {
                name: name.to_string(),
                value: value.to_string(),
                source,
            })?;
            Ok(if parsed.is_nil() { Uuid::new_v4() } else { parsed })
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// Convert declared folders to the wire tree.
///
/// # Errors
///
/// Fails on a root that is not a folder, a child that is a folder, or a
/// malformed uuid.
pub fn to_wire_folders(declared: &[Folder]) -> Result<Vec<WireFolder>> {
    declared
        .iter()
        .map(|folder| {
            if folder.kind != FolderType::Folder {
                return Err(Error::RootNotFolder {
                    name: folder.name.clone(),
                    kind: folder.kind.as_str().to_string(),
                });
            }

            let children = folder
                .children
                .iter()
                .map(|child| {
                    if child.kind == FolderType::Folder {
                        return Err(Error::NestedFolder {
                            name: child.name.clone(),
                            kind: child.kind.as_str().to_string(),
                        });
                    }
                    Ok(WireFolder {
                        uuid: node_uuid(&child.name, child.uuid.as_deref())?,
                        kind: child.kind,
                        name: child.name.clone(),
                        description: non_empty(child.description.as_ref()),
                        children: Some(Vec::new()),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(WireFolder {
                uuid: node_uuid(&folder.name, folder.uuid.as_deref())?,
                kind: FolderType::Folder,
                name: folder.name.clone(),
                description: non_empty(folder.description.as_ref()),
                children: Some(children),
            })
        })
        .collect()
}

/// Set each child's uuid to the uuid of the dataset column or metric with
/// the same name. Children with no match keep their uuid.
pub fn resolve_columns(declared: &mut [Folder], columns: &[Column], metrics: &[Metric]) {
    for folder in declared.iter_mut().filter(|f| f.kind == FolderType::Folder) {
        for child in &mut folder.children {
            let uuid = match child.kind {
                FolderType::Column => columns
                    .iter()
                    .find(|c| c.column_name == child.name)
                    .and_then(|c| c.uuid),
                FolderType::Metric => metrics
                    .iter()
                    .find(|m| m.metric_name == child.name)
                    .and_then(|m| m.uuid),
                FolderType::Folder => None,
            };
            if let Some(uuid) = uuid {
                child.uuid = Some(uuid.to_string());
            }
        }
    }
}

/// Children whose name matches no dataset column or metric, as
/// `folder/child` paths.
#[must_use]
pub fn unresolved_children(declared: &[Folder], columns: &[Column], metrics: &[Metric]) -> Vec<String> {
    let mut missing = Vec::new();
    for folder in declared {
        for child in &folder.children {
            let found = match child.kind {
                FolderType::Column => columns.iter().any(|c| c.column_name == child.name),
                FolderType::Metric => metrics.iter().any(|m| m.metric_name == child.name),
                FolderType::Folder => true,
            };
            if !found {
                missing.push(format!("{}/{}", folder.name, child.name));
            }
        }
    }
    missing
}

/// Convert the server's tree back to declared folders.
///
/// # Errors
///
/// Fails on a root that is not a folder, a nested folder, or a child
/// without a uuid.
pub fn from_wire_folders(wire: &[WireFolder]) -> Result<Vec<Folder>> {
    wire.iter()
        .map(|folder| {
            if folder.kind != FolderType::Folder {
                return Err(Error::RootNotFolder {
                    name: folder.name.clone(),
                    kind: folder.kind.as_str().to_string(),
                });
            }

            let children = folder
                .children
                .iter()
                .flatten()
                .map(|child| {
                    if child.kind == FolderType::Folder {
                        return Err(Error::NestedFolder {
                            name: child.name.clone(),
                            kind: child.kind.as_str().to_string(),
                        });
                    }
                    if child.uuid.is_nil() {
                        return Err(Error::MissingUuid {
                            name: child.name.clone(),
                        });
                    }
                    Ok(FolderChild {
                        name: child.name.clone(),
                        kind: child.kind,
                        description: non_empty(child.description.as_ref()),
                        uuid: Some(child.uuid.to_string()),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Folder {
                name: folder.name.clone(),
                kind: FolderType::Folder,
                description: non_empty(folder.description.as_ref()),
                uuid: (!folder.uuid.is_nil()).then(|| folder.uuid.to_string()),
                children,
            })
        })
        .collect()
}
